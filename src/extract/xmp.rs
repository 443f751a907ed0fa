//! Just enough XMP reading to pull single properties out of a packet.

use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use regex::Regex;
use tracing::debug;

static XML_UNESCAPER: Lazy<AhoCorasick> = Lazy::new(|| AhoCorasick::builder().match_kind(MatchKind::LeftmostLongest).build(["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"]).unwrap());
static CHAR_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(x[0-9A-Fa-f]+|[0-9]+);").unwrap());

/// Replace the five named XML entities and numeric character references.
pub(crate) fn unescape_xml(s: &str) -> String {
    let named = XML_UNESCAPER.replace_all(s, &["&", "<", ">", "\"", "'"]);
    CHAR_REF
        .replace_all(&named, |caps: &regex::Captures| {
            let code = &caps[1];
            let parsed = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            parsed.and_then(char::from_u32).map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Value of property `name` (e.g. `exif:UserComment`), written either as an
/// attribute or as an element whose text may sit inside `rdf:Alt/rdf:li`.
pub(crate) fn xmp_property(
    xmp: &str,
    name: &str,
) -> Option<String> {
    let mut reader = Reader::from_str(xmp);
    let mut buf = Vec::new();
    // element nesting below the property, 0 while outside it
    let mut inside = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if inside > 0 {
                    inside += 1;
                } else if e.name().as_ref() == name.as_bytes() {
                    inside = 1;
                } else if let Some(value) = attribute(e, name) {
                    return Some(value);
                }
            }
            Ok(Event::Empty(ref e)) if inside == 0 => {
                if let Some(value) = attribute(e, name) {
                    return Some(value);
                }
            }
            Ok(Event::Text(ref e)) if inside > 0 => text.push_str(&unescape_xml(&String::from_utf8_lossy(e))),
            Ok(Event::GeneralRef(ref e)) if inside > 0 => {
                let reference = format!("&{};", String::from_utf8_lossy(e));
                text.push_str(&unescape_xml(&reference));
            }
            Ok(Event::CData(ref e)) if inside > 0 => text.push_str(&String::from_utf8_lossy(e)),
            Ok(Event::End(_)) if inside > 0 => {
                inside -= 1;
                if inside == 0 {
                    if let Some(value) = non_empty(&text) {
                        return Some(value);
                    }
                    text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("xmp packet unreadable at {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    None
}

fn attribute(
    element: &BytesStart,
    name: &str,
) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name.as_bytes())
        .and_then(|attr| non_empty(&unescape_xml(&String::from_utf8_lossy(&attr.value))))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_xml("&lt;a &amp; b&gt;"), "<a & b>");
        assert_eq!(unescape_xml("&quot;c&quot;:&#34;x&#x22;"), "\"c\":\"x\"");
        assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
        assert_eq!(unescape_xml("&#xFFFFFFF;"), "&#xFFFFFFF;");
    }

    #[test]
    fn test_attribute_and_element_forms() {
        let xmp = r#"<rdf:Description xmp:CreatorTool="Draw Things" exif:UserComment="{&quot;c&quot;:&quot;a cat&quot;}"><dc:description><rdf:Alt><rdf:li xml:lang="x-default">a lighthouse --v 6</rdf:li></rdf:Alt></dc:description></rdf:Description>"#;
        assert_eq!(xmp_property(xmp, "xmp:CreatorTool").as_deref(), Some("Draw Things"));
        assert_eq!(xmp_property(xmp, "exif:UserComment").as_deref(), Some("{\"c\":\"a cat\"}"));
        assert_eq!(xmp_property(xmp, "dc:description").as_deref(), Some("a lighthouse --v 6"));
        assert_eq!(xmp_property(xmp, "dc:title"), None);
    }

    #[test]
    fn test_names_match_exactly() {
        let xmp = r#"<rdf:Description xexif:UserComment="wrong" exif:UserCommentX="also wrong"><dc:descriptions>no</dc:descriptions></rdf:Description>"#;
        assert_eq!(xmp_property(xmp, "exif:UserComment"), None);
        assert_eq!(xmp_property(xmp, "dc:description"), None);

        let xmp = r#"<rdf:Description xexif:UserComment="wrong" exif:UserComment="right"/>"#;
        assert_eq!(xmp_property(xmp, "exif:UserComment").as_deref(), Some("right"));
    }

    #[test]
    fn test_element_text_forms() {
        let xmp = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF><rdf:Description>
  <exif:UserComment><rdf:Alt><rdf:li xml:lang="x-default"><![CDATA[{"c": "a & b"}]]></rdf:li></rdf:Alt></exif:UserComment>
  <dc:description>
    <rdf:Alt><rdf:li xml:lang="x-default">fish &amp; chips &#x2014; &lt;v6&gt;</rdf:li></rdf:Alt>
  </dc:description>
  <dc:title><rdf:Alt><rdf:li/></rdf:Alt></dc:title>
</rdf:Description></rdf:RDF></x:xmpmeta>"#;
        assert_eq!(xmp_property(xmp, "exif:UserComment").as_deref(), Some(r#"{"c": "a & b"}"#));
        assert_eq!(xmp_property(xmp, "dc:description").as_deref(), Some("fish & chips \u{2014} <v6>"));
        assert_eq!(xmp_property(xmp, "dc:title"), None);
    }

    #[test]
    fn test_malformed_packet_yields_nothing() {
        assert_eq!(xmp_property("<dc:description", "dc:description"), None);
        assert_eq!(xmp_property("", "dc:description"), None);
    }
}
