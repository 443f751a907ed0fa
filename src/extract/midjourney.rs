use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    GenmetaError, Result,
    comfy::seed,
    container::{TextChunks, XMP_KEYWORD, chunk_text},
    extract::{Extractor, xmp::xmp_property},
    model::{FormatFamily, MetadataRecord},
};

static JOB_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"Job ID:\s*([0-9A-Za-z-]+)").unwrap());

/// Midjourney and Niji: the prompt and its `--flag value` suffix in the image description.
pub struct MidjourneyExtractor {
    family: FormatFamily,
}

impl MidjourneyExtractor {
    pub fn new(family: FormatFamily) -> Self {
        Self {
            family,
        }
    }
}

impl Extractor for MidjourneyExtractor {
    fn family(&self) -> FormatFamily {
        self.family
    }

    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord> {
        let text = ["Description", "ImageDescription", "Comment"]
            .iter()
            .filter_map(|k| chunk_text(chunks, k).map(str::to_string))
            .chain(chunk_text(chunks, XMP_KEYWORD).and_then(|xmp| xmp_property(xmp, "dc:description")))
            .find(|t| t.contains("--") || t.contains("Job ID"))
            .ok_or_else(|| GenmetaError::Extract("no midjourney prompt text".into()))?;

        Ok(parse_prompt_line(&text, self.family))
    }
}

/// Parse `prompt --ar 16:9 --v 6 ... Job ID: <uuid>`.
pub fn parse_prompt_line(
    text: &str,
    family: FormatFamily,
) -> MetadataRecord {
    let mut record = MetadataRecord::for_family(family);

    let mut text = text.to_string();
    let job = JOB_ID.captures(&text).and_then(|caps| Some((caps[1].to_string(), caps.get(0)?.range())));
    if let Some((id, range)) = job {
        record.extra.insert("Job ID".to_string(), id);
        text.replace_range(range, "");
    }

    let (prompt, flags) = match text.find("--") {
        Some(at) => (&text[..at], &text[at..]),
        None => (text.as_str(), ""),
    };
    record.prompt = Some(prompt.trim().to_string());

    let mut version = None;
    let mut niji = None;

    for flag in flags.split("--").map(str::trim).filter(|f| !f.is_empty()) {
        let (name, value) = match flag.split_once(char::is_whitespace) {
            Some((name, value)) => (name, value.trim()),
            None => (flag, ""),
        };
        match name {
            "ar" | "aspect" => {
                record.extra.insert("aspect_ratio".to_string(), value.to_string());
            }
            "v" | "version" => version = Some(value.to_string()),
            "niji" => niji = Some(value.to_string()),
            "seed" => record.seed = seed::coerce_str(value),
            "stylize" | "s" => {
                record.extra.insert("stylize".to_string(), value.to_string());
            }
            "chaos" | "c" => {
                record.extra.insert("chaos".to_string(), value.to_string());
            }
            other => {
                record.extra.insert(other.to_string(), value.to_string());
            }
        }
    }

    record.model = match (niji, version) {
        (Some(n), _) if n.is_empty() => Some("Niji".to_string()),
        (Some(n), _) => Some(format!("Niji {}", n)),
        (None, Some(v)) if !v.is_empty() => Some(format!("Midjourney v{}", v)),
        _ => None,
    };
    if record.model.as_deref().is_some_and(|m| m.starts_with("Niji")) {
        record.generator = Some(FormatFamily::Niji);
    }

    record
}
