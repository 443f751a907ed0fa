//! PNG chunk walking.
//!
//! Each chunk is `[4-byte BE length][4-byte type][data][4-byte CRC]`.
//! tEXt chunks use `keyword\0text`, zTXt `keyword\0method\0zlib-data`, and
//! iTXt `keyword\0flag method language\0translated\0text`.

use flate2::Crc;
use tracing::debug;

use crate::{
    Config,
    container::{C2PA_KEYWORD, ContainerText, TagReader, decode_text, insert_chunk},
    decode,
};

/// PNG file signature (8 bytes).
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// One chunk borrowed from the file buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngChunk<'a> {
    pub kind: [u8; 4],
    pub data: &'a [u8],
    pub crc: u32,
}

impl PngChunk<'_> {
    pub fn crc_matches(&self) -> bool {
        let mut crc = Crc::new();
        crc.update(&self.kind);
        crc.update(self.data);
        crc.sum() == self.crc
    }
}

/// Iterator over the chunks following the signature.
///
/// Ends at `IEND`, at the end of the buffer, or at the first chunk whose
/// declared length would read past the buffer.
pub struct PngChunks<'a> {
    bytes: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> PngChunks<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: PNG_SIGNATURE.len(),
            done: !bytes.starts_with(&PNG_SIGNATURE),
        }
    }
}

impl<'a> Iterator for PngChunks<'a> {
    type Item = PngChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let header_end = self.offset + 8;
        if header_end > self.bytes.len() {
            if self.offset < self.bytes.len() {
                debug!("png stream truncated inside a chunk header at offset {}", self.offset);
            }
            self.done = true;
            return None;
        }

        let length = u32::from_be_bytes([self.bytes[self.offset], self.bytes[self.offset + 1], self.bytes[self.offset + 2], self.bytes[self.offset + 3]]) as usize;
        let kind = [self.bytes[self.offset + 4], self.bytes[self.offset + 5], self.bytes[self.offset + 6], self.bytes[self.offset + 7]];

        let data_end = match header_end.checked_add(length) {
            Some(end) if end.saturating_add(4) <= self.bytes.len() => end,
            _ => {
                debug!("png chunk {} declares {} bytes past the end of the buffer", String::from_utf8_lossy(&kind), length);
                self.done = true;
                return None;
            }
        };

        let crc = u32::from_be_bytes([self.bytes[data_end], self.bytes[data_end + 1], self.bytes[data_end + 2], self.bytes[data_end + 3]]);
        self.offset = data_end + 4;
        if &kind == b"IEND" {
            self.done = true;
        }

        Some(PngChunk {
            kind,
            data: &self.bytes[header_end..data_end],
            crc,
        })
    }
}

pub(super) fn read_png(
    bytes: &[u8],
    config: &Config,
    tags: &dyn TagReader,
    out: &mut ContainerText,
) {
    for chunk in PngChunks::new(bytes) {
        if !chunk.crc_matches() {
            debug!("crc mismatch on png chunk {}, using it anyway", String::from_utf8_lossy(&chunk.kind));
        }

        match &chunk.kind {
            b"IHDR" if chunk.data.len() >= 8 => {
                let width = u32::from_be_bytes([chunk.data[0], chunk.data[1], chunk.data[2], chunk.data[3]]);
                let height = u32::from_be_bytes([chunk.data[4], chunk.data[5], chunk.data[6], chunk.data[7]]);
                if width > 0 && height > 0 {
                    out.dimensions = Some((width, height));
                }
            }
            b"tEXt" => {
                if let Some((keyword, text)) = parse_text(chunk.data) {
                    insert_chunk(&mut out.chunks, config, &keyword, text);
                }
            }
            b"zTXt" => {
                if let Some((keyword, text)) = parse_ztxt(chunk.data) {
                    insert_chunk(&mut out.chunks, config, &keyword, text);
                }
            }
            b"iTXt" => {
                if let Some((keyword, text)) = parse_itxt(chunk.data) {
                    insert_chunk(&mut out.chunks, config, &keyword, text);
                }
            }
            b"eXIf" => {
                for (tag, value) in tags.read_exif(chunk.data) {
                    insert_chunk(&mut out.chunks, config, &tag, value);
                }
            }
            b"caBX" => {
                if let Some(text) = tags.read_c2pa(chunk.data) {
                    insert_chunk(&mut out.chunks, config, C2PA_KEYWORD, text);
                }
            }
            _ => {}
        }
    }
}

fn split_keyword(data: &[u8]) -> Option<(String, &[u8])> {
    let null_pos = data.iter().position(|&b| b == 0)?;
    let keyword = decode_text(&data[..null_pos]);
    if keyword.is_empty() {
        return None;
    }
    Some((keyword, &data[null_pos + 1..]))
}

/// Parse a tEXt chunk: keyword\0value.
fn parse_text(data: &[u8]) -> Option<(String, String)> {
    let (keyword, rest) = split_keyword(data)?;
    Some((keyword, decode_text(rest)))
}

/// Parse a zTXt chunk: keyword\0method zlib-data.
fn parse_ztxt(data: &[u8]) -> Option<(String, String)> {
    let (keyword, rest) = split_keyword(data)?;
    let (&method, compressed) = rest.split_first()?;
    if method != 0 {
        return None;
    }
    let inflated = decode::inflate(compressed).ok()?;
    Some((keyword, decode_text(&inflated)))
}

/// Parse an iTXt chunk: keyword\0flag method language\0translated_keyword\0text.
fn parse_itxt(data: &[u8]) -> Option<(String, String)> {
    let (keyword, rest) = split_keyword(data)?;
    if rest.len() < 2 {
        return None;
    }
    let compression_flag = rest[0];
    let mut rest = &rest[2..];

    // language tag, then translated keyword
    for _ in 0..2 {
        let null_pos = rest.iter().position(|&b| b == 0)?;
        rest = &rest[null_pos + 1..];
    }

    let text = if compression_flag == 1 {
        let inflated = decode::inflate(rest).ok()?;
        String::from_utf8_lossy(&inflated).into_owned()
    } else {
        String::from_utf8_lossy(rest).into_owned()
    };
    Some((keyword, text))
}


#[cfg(test)]
mod tests {
    use super::{testing::*, *};
    use crate::container::{BasicTagReader, ImageKind, TextChunks};

    fn read_all(bytes: &[u8]) -> ContainerText {
        let mut out = ContainerText {
            kind: ImageKind::Png,
            chunks: TextChunks::new(),
            dimensions: None,
        };
        read_png(bytes, &Config::default(), &BasicTagReader, &mut out);
        out
    }

    #[test]
    fn test_text_chunk_and_dimensions() {
        let bytes = png(512, 768, &[text_chunk("parameters", "a cat\nSteps: 20")]);
        let out = read_all(&bytes);
        assert_eq!(out.dimensions, Some((512, 768)));
        assert_eq!(out.chunks.get("parameters").map(String::as_str), Some("a cat\nSteps: 20"));
    }

    #[test]
    fn test_unknown_keyword_is_dropped() {
        let bytes = png(1, 1, &[text_chunk("Title", "x"), text_chunk("prompt", "{}")]);
        let out = read_all(&bytes);
        assert!(!out.chunks.contains_key("Title"));
        assert!(out.chunks.contains_key("prompt"));
    }

    #[test]
    fn test_first_duplicate_wins() {
        let bytes = png(1, 1, &[text_chunk("parameters", "first"), text_chunk("parameters", "second")]);
        assert_eq!(read_all(&bytes).chunks["parameters"], "first");
    }

    #[test]
    fn test_itxt_uncompressed_and_compressed() {
        let mut plain = b"workflow\0\0\0en\0Workflow\0".to_vec();
        plain.extend_from_slice(b"{\"nodes\": []}");

        let mut packed = b"Description\0\x01\0\0\0".to_vec();
        packed.extend(zlib("a compressed description".as_bytes()));

        let bytes = png(1, 1, &[chunk(b"iTXt", &plain), chunk(b"iTXt", &packed)]);
        let out = read_all(&bytes);
        assert_eq!(out.chunks["workflow"], "{\"nodes\": []}");
        assert_eq!(out.chunks["Description"], "a compressed description");
    }

    #[test]
    fn test_ztxt_chunk() {
        let mut data = b"Comment\0\0".to_vec();
        data.extend(zlib(b"zipped"));
        let out = read_all(&png(1, 1, &[chunk(b"zTXt", &data)]));
        assert_eq!(out.chunks["Comment"], "zipped");
    }

    #[test]
    fn test_truncated_chunk_ends_stream() {
        let bytes = png(1, 1, &[text_chunk("parameters", "kept"), text_chunk("prompt", "{\"lost\": true}")]);
        let cut = bytes.len() - 20;
        let out = read_all(&bytes[..cut]);
        assert_eq!(out.chunks["parameters"], "kept");
        assert!(!out.chunks.contains_key("prompt"));
    }

    #[test]
    fn test_huge_declared_length_does_not_panic() {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        bytes.extend_from_slice(b"tEXt");
        bytes.extend_from_slice(b"abc");
        assert_eq!(PngChunks::new(&bytes).count(), 0);
    }

    #[test]
    fn test_bad_crc_still_used() {
        let mut c = text_chunk("parameters", "crc is wrong");
        let last = c.len() - 1;
        c[last] ^= 0xFF;
        let bytes = png(1, 1, &[c.clone()]);
        let chunk = PngChunks::new(&bytes).nth(1).unwrap();
        assert!(!chunk.crc_matches());
        assert_eq!(read_all(&png(1, 1, &[c])).chunks["parameters"], "crc is wrong");
    }
}
