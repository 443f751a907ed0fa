//! Regex fallback over raw, undecoded chunk text.
//!
//! Each field has its own ordered pattern list; the first pattern that matches
//! anywhere in the text sets the field. A field nothing matches stays null.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{
    Result,
    comfy::seed,
    container::TextChunks,
    extract::Extractor,
    model::{FormatFamily, MetadataRecord},
};

static STEPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Steps:\s*(\d+)").unwrap());
static CFG: Lazy<Regex> = Lazy::new(|| Regex::new(r"CFG scale:\s*([\d.]+)").unwrap());
static SEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"Seed:\s*(-?\d+)").unwrap());
static SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Size:\s*(\d+)x(\d+)").unwrap());
static MODEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Model:\s*([^\n,]+)").unwrap());
static SAMPLER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Sampler:\s*([^\n,]+)").unwrap());
static ASPECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"--ar\s+(\d+:\d+)").unwrap());
static NIJI: Lazy<Regex> = Lazy::new(|| Regex::new(r"--niji(?:\s+(\d+(?:\.\d+)?))?").unwrap());
static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"--v(?:ersion)?\s+(\d+(?:\.\d+)?)").unwrap());

/// Last-resort extractor, used for unknown families and when a structured extractor fails.
pub struct FallbackExtractor;

impl Extractor for FallbackExtractor {
    fn family(&self) -> FormatFamily {
        FormatFamily::Unknown
    }

    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord> {
        Ok(scan(&joined_text(chunks), FormatFamily::Unknown))
    }
}

/// All chunk texts in keyword order, one per line.
pub(crate) fn joined_text(chunks: &TextChunks) -> String {
    chunks.values().map(String::as_str).collect::<Vec<_>>().join("\n")
}

fn first_capture<'t>(
    re: &Regex,
    text: &'t str,
) -> Option<&'t str> {
    re.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str().trim())
}

/// Scan `text` for recognisable `key: value` and `--flag` patterns.
pub fn scan(
    text: &str,
    family: FormatFamily,
) -> MetadataRecord {
    let mut record = MetadataRecord::for_family(family);

    record.steps = first_capture(&STEPS, text).and_then(|v| v.parse().ok());
    record.cfg = first_capture(&CFG, text).and_then(|v| v.parse().ok());
    record.seed = first_capture(&SEED, text).and_then(seed::coerce_str);
    record.sampler = first_capture(&SAMPLER, text).map(str::to_string);
    record.model = first_capture(&MODEL, text).map(str::to_string);

    if let Some(caps) = SIZE.captures(text) {
        record.width = caps[1].parse().ok();
        record.height = caps[2].parse().ok();
    }

    if let Some(ar) = first_capture(&ASPECT, text) {
        record.extra.insert("aspect_ratio".to_string(), ar.to_string());
    }
    if record.model.is_none() {
        if let Some(caps) = NIJI.captures(text) {
            record.model = Some(match caps.get(1) {
                Some(v) => format!("Niji {}", v.as_str()),
                None => "Niji".to_string(),
            });
        } else if let Some(v) = first_capture(&VERSION, text) {
            record.model = Some(format!("Midjourney v{}", v));
        }
    }

    if record.is_empty() {
        debug!("regex fallback found nothing in {} bytes of text", text.len());
    }
    record
}
