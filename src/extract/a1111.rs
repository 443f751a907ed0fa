//! A1111 `parameters` text, shared by Forge and SD.Next.
//!
//! ```text
//! prompt (may span lines)
//! Negative prompt: negative (may span lines)
//! Steps: 20, Sampler: Euler a, CFG scale: 7, Seed: 1, Size: 512x768, Model: name, ...
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    GenmetaError, Result,
    comfy::seed,
    container::{TextChunks, chunk_text},
    extract::{Extractor, parse_size},
    model::{FormatFamily, LoraEntry, MetadataRecord},
};

const NEGATIVE_PREFIX: &str = "Negative prompt:";

static STEPS_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)(?:^|,\s*)Steps:\s*\d+").unwrap());
static FORGE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Version:\s*f\d").unwrap());
static LORA_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<lora:([^:>]+)(?::\s*(-?[\d.]+))?[^>]*>").unwrap());

/// Whether `text` follows the A1111 parameter grammar.
pub(crate) fn is_a1111_text(text: &str) -> bool {
    STEPS_FIELD.is_match(text)
}

pub(crate) fn is_forge(text: &str) -> bool {
    FORGE_VERSION.is_match(text) || text.contains("Hires upscale")
}

/// The chunk holding A1111-grammar text: `parameters`, or the EXIF UserComment of a JPEG.
pub(crate) fn grammar_text(chunks: &TextChunks) -> Option<&str> {
    ["parameters", "UserComment"].iter().filter_map(|k| chunk_text(chunks, k)).find(|text| is_a1111_text(text))
}

pub struct A1111Extractor {
    family: FormatFamily,
}

impl A1111Extractor {
    pub fn new(family: FormatFamily) -> Self {
        Self {
            family,
        }
    }
}

impl Extractor for A1111Extractor {
    fn family(&self) -> FormatFamily {
        self.family
    }

    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord> {
        let text = grammar_text(chunks).ok_or_else(|| GenmetaError::Extract("no parameters text in the A1111 grammar".into()))?;
        Ok(parse_parameters(text, self.family))
    }
}

/// Parse a full `parameters` text.
pub fn parse_parameters(
    text: &str,
    family: FormatFamily,
) -> MetadataRecord {
    let mut record = MetadataRecord::for_family(family);
    let mut lines: Vec<&str> = text.trim().lines().collect();
    let mut block = None;

    if let Some(at) = lines.iter().rposition(|line| line.trim_start().starts_with("Steps:")) {
        // anything after the Steps line (rare, some extensions append) belongs to it
        block = Some(lines[at..].join(", "));
        lines.truncate(at);
    } else if let Some(last) = lines.last().copied() {
        // one-line form, `a cat, Steps: 20, Seed: 5`
        if let Some(found) = STEPS_FIELD.find(last) {
            let separator = |c: char| c == ',' || c.is_whitespace();
            block = Some(last[found.start()..].trim_start_matches(separator).to_string());
            lines.pop();
            let head = last[..found.start()].trim_end_matches(separator);
            if !head.is_empty() {
                lines.push(head);
            }
        }
    }

    let negative_at = lines.iter().position(|line| line.trim_start().starts_with(NEGATIVE_PREFIX));
    let prompt_end = negative_at.unwrap_or(lines.len());
    record.prompt = Some(lines[..prompt_end].join("\n"));

    if let Some(start) = negative_at {
        let negative = lines[start..].join("\n");
        record.negative_prompt = Some(negative.trim_start()[NEGATIVE_PREFIX.len()..].trim().to_string());
    }

    if let Some(block) = block {
        apply_parameter_block(&block, &mut record);
    }

    if let Some(prompt) = record.prompt.as_deref() {
        let tagged: Vec<LoraEntry> = LORA_TAG
            .captures_iter(prompt)
            .map(|caps| {
                let weight = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
                LoraEntry::named(caps[1].trim()).with_strength(weight, weight)
            })
            .collect();
        if !tagged.is_empty() {
            record.loras = tagged;
        }
    }

    record
}

fn apply_parameter_block(
    block: &str,
    record: &mut MetadataRecord,
) {
    let mut distilled_cfg = None;
    let mut lora_hashes = None;

    for pair in split_parameter_pairs(block) {
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = unquote(value.trim());

        match key.to_lowercase().as_str() {
            "steps" => record.steps = value.parse().ok(),
            "sampler" => record.sampler = Some(value.to_string()),
            "schedule type" | "scheduler" => record.scheduler = Some(value.to_string()),
            "cfg scale" => record.cfg = value.parse().ok(),
            "distilled cfg scale" => {
                distilled_cfg = value.parse::<f64>().ok();
                record.extra.insert(key.to_string(), value.to_string());
            }
            "seed" => record.seed = seed::coerce_str(value),
            "size" => {
                if let Some((w, h)) = parse_size(value) {
                    record.width = Some(w);
                    record.height = Some(h);
                }
            }
            "model" => record.model = Some(value.to_string()),
            "vae" => record.vae = Some(value.to_string()),
            "denoising strength" => record.denoise = value.parse().ok(),
            "lora hashes" => {
                lora_hashes = Some(value.to_string());
                record.extra.insert(key.to_string(), value.to_string());
            }
            _ => {
                record.extra.insert(key.to_string(), value.to_string());
            }
        }
    }

    if record.cfg.is_none() {
        record.cfg = distilled_cfg;
    }

    // names only; the prompt's <lora:...> tags override these when present
    if let Some(hashes) = lora_hashes {
        record.loras = hashes
            .split(',')
            .filter_map(|entry| entry.split_once(':'))
            .map(|(name, _)| LoraEntry::named(name.trim()))
            .filter(|l| !l.name.is_empty())
            .collect();
    }
}

fn unquote(value: &str) -> &str {
    value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value)
}

/// Split on commas that start a new `Key: value` pair, leaving commas inside
/// quoted values and free-text values alone.
fn split_parameter_pairs(block: &str) -> Vec<&str> {
    let mut pairs = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (idx, ch) in block.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes && starts_key(&block[idx + 1..]) => {
                let segment = block[start..idx].trim();
                if !segment.is_empty() {
                    pairs.push(segment);
                }
                start = idx + 1;
            }
            _ => {}
        }
    }

    let tail = block[start..].trim();
    if !tail.is_empty() {
        pairs.push(tail);
    }
    pairs
}

/// `rest` begins (after spaces) with an uppercase key followed by `:`.
fn starts_key(rest: &str) -> bool {
    let rest = rest.trim_start();
    if !rest.starts_with(|c: char| c.is_ascii_uppercase()) {
        return false;
    }
    for b in rest.bytes() {
        match b {
            b':' => return true,
            b',' | b'\n' | b'\r' => return false,
            b if b.is_ascii_alphanumeric() || matches!(b, b' ' | b'_' | b'-' | b'/' | b'.' | b'(' | b')') => {}
            _ => return false,
        }
    }
    false
}
