//! Chunk reader: locates the text-bearing parts of PNG and JPEG files.
//!
//! The reader never fails on a damaged stream. A chunk or segment whose
//! declared length runs past the end of the buffer ends the walk, and whatever
//! was collected up to that point is returned.

pub(crate) mod jpeg;
pub(crate) mod png;
pub(crate) mod tags;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{Config, GenmetaError, Result};

use png::PNG_SIGNATURE;
pub use tags::{BasicTagReader, TagReader};

/// Keyword -> decoded text, ordered by keyword so output is deterministic.
pub type TextChunks = BTreeMap<String, String>;

/// Keyword under which C2PA manifest text is stored.
pub const C2PA_KEYWORD: &str = "c2pa";
/// Keyword under which the XMP packet is stored.
pub const XMP_KEYWORD: &str = "XML:com.adobe.xmp";

/// Image container detected from magic bytes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&PNG_SIGNATURE) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else {
            None
        }
    }

    /// Extension-based guess. Only used to log disagreements with the magic bytes.
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())?;
        match ext.as_str() {
            "png" => Some(ImageKind::Png),
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }
}

/// Everything the chunk reader recovered from one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerText {
    pub kind: ImageKind,
    pub chunks: TextChunks,
    /// Pixel size from IHDR / SOF.
    pub dimensions: Option<(u32, u32)>,
}

/// Read the text payloads of an image.
///
/// Returns `GenmetaError::Unreadable` only when the bytes are neither PNG nor
/// JPEG. Truncated or corrupted streams yield whatever was read before the damage.
pub fn read(
    bytes: &[u8],
    filename: Option<&str>,
    config: &Config,
    tags: &dyn TagReader,
) -> Result<ContainerText> {
    trace!("container::read({} bytes)", bytes.len());

    let Some(kind) = ImageKind::sniff(bytes) else {
        return Err(GenmetaError::Unreadable(match filename {
            Some(name) => format!("{} is not a PNG or JPEG file", name),
            None => "input is not a PNG or JPEG file".to_string(),
        }));
    };

    if let Some(hinted) = filename.and_then(ImageKind::from_filename) {
        if hinted != kind {
            debug!("extension suggests {} but magic bytes say {}", hinted.as_ref(), kind.as_ref());
        }
    }

    let mut text = ContainerText {
        kind,
        chunks: TextChunks::new(),
        dimensions: None,
    };

    match kind {
        ImageKind::Png => png::read_png(bytes, config, tags, &mut text),
        ImageKind::Jpeg => jpeg::read_jpeg(bytes, config, tags, &mut text),
    }

    Ok(text)
}

/// Case-insensitive chunk lookup.
pub fn chunk_text<'a>(
    chunks: &'a TextChunks,
    keyword: &str,
) -> Option<&'a str> {
    chunks.get(keyword).or_else(|| chunks.iter().find(|(k, _)| k.eq_ignore_ascii_case(keyword)).map(|(_, v)| v)).map(String::as_str)
}

/// Keep the first occurrence of each configured keyword.
fn insert_chunk(
    chunks: &mut TextChunks,
    config: &Config,
    keyword: &str,
    text: String,
) {
    if keyword.is_empty() || !config.is_text_keyword(keyword) {
        return;
    }
    chunks.entry(keyword.to_string()).or_insert(text);
}

/// Decode UTF-8 when valid, otherwise treat the bytes as Latin-1 (the PNG `tEXt` charset).
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
