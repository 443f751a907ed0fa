//! Parser - the main entry point for genmeta.
//!
//! One call turns the bytes of one image into one [`MetadataRecord`]:
//! - Chunk reading (PNG text chunks, JPEG APP segments)
//! - Format detection over the recovered chunks
//! - The family's extractor, with the regex fallback behind it
//! - Normalization, sidecar merge and the container dimension fallback

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    Config,
    container::{self, BasicTagReader, TagReader, TextChunks},
    detect,
    extract::{extractor_for, fallback},
    model::{FormatFamily, MetadataRecord},
    normalize,
};

/// How far a parse got.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParseStatus {
    /// At least one generation field was resolved.
    Parsed,
    /// The image was read but carried nothing recognisable.
    NoMetadata,
    /// The bytes are not a PNG or JPEG.
    Unreadable,
}

/// Result of parsing one file. Parsing never fails as a whole.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub record: MetadataRecord,
    pub status: ParseStatus,
    /// The family the detector chose, before any fallback.
    pub family: FormatFamily,
    /// Diagnostic for logging: why a stage degraded, if one did.
    pub note: Option<String>,
}

impl ParseOutcome {
    fn unreadable(note: String) -> Self {
        Self {
            record: MetadataRecord::default(),
            status: ParseStatus::Unreadable,
            family: FormatFamily::Unknown,
            note: Some(note),
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.status == ParseStatus::Parsed
    }
}

/// The metadata parser.
///
/// Holds no mutable state, so one parser can be shared across threads and
/// called concurrently for different files.
///
/// # Example
///
/// ```rust,ignore
/// let parser = ParserBuilder::new().max_depth(32).build()?;
/// let outcome = parser.parse(&bytes, Some("00042.png"));
/// if let Some(prompt) = outcome.record.prompt {
///     println!("{prompt}");
/// }
/// ```
pub struct Parser {
    config: Config,
    tags: Arc<dyn TagReader>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Parser {
    /// Creates a parser with the built-in tag reader.
    pub fn new(config: Config) -> Self {
        Self::with_tag_reader(config, Arc::new(BasicTagReader))
    }

    pub(crate) fn with_tag_reader(
        config: Config,
        tags: Arc<dyn TagReader>,
    ) -> Self {
        Self {
            config,
            tags,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse the bytes of one image. `filename` is only a hint.
    pub fn parse(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
    ) -> ParseOutcome {
        self.parse_with_sidecar(bytes, filename, None)
    }

    /// Parse an image together with the bytes of its same-named `.json`
    /// sidecar. Embedded data wins; the sidecar only fills what is left null.
    pub fn parse_with_sidecar(
        &self,
        bytes: &[u8],
        filename: Option<&str>,
        sidecar: Option<&[u8]>,
    ) -> ParseOutcome {
        trace!("Parser::parse({:?}, {} bytes)", filename, bytes.len());

        let text = match container::read(bytes, filename, &self.config, self.tags.as_ref()) {
            Ok(text) => text,
            Err(e) => {
                warn!("{}", e);
                return ParseOutcome::unreadable(e.to_string());
            }
        };

        let mut outcome = self.parse_text_chunks(&text.chunks);

        if let Some(lower) = sidecar.and_then(|bytes| normalize::sidecar_record(bytes, &self.config)) {
            debug!("merging sidecar record ({:?})", lower.generator);
            outcome.record.merge_missing(&lower);
            if outcome.status == ParseStatus::NoMetadata && !outcome.record.is_empty() {
                outcome.status = ParseStatus::Parsed;
            }
        }

        // pixel size alone is not metadata, so the status stays as is
        if self.config.image_dimensions_fallback {
            normalize::apply_dimensions(&mut outcome.record, text.dimensions);
        }

        outcome
    }

    /// Run detection and extraction over chunks the caller already holds.
    pub fn parse_text_chunks(
        &self,
        chunks: &TextChunks,
    ) -> ParseOutcome {
        if chunks.is_empty() {
            return ParseOutcome {
                record: MetadataRecord::default(),
                status: ParseStatus::NoMetadata,
                family: FormatFamily::Unknown,
                note: None,
            };
        }

        let family = detect::detect(chunks);
        let extractor = extractor_for(family, &self.config);

        let (record, note) = match extractor.extract(chunks) {
            Ok(record) if family == FormatFamily::Unknown || !record.is_empty() || !self.config.fallback_on_empty => (record, None),
            Ok(_) => {
                let family = extractor.family();
                debug!("{} extractor resolved nothing, using the regex fallback", family.as_ref());
                let note = format!("{} payload empty, regex fallback used", family.as_ref());
                (fallback::scan(&fallback::joined_text(chunks), family), Some(note))
            }
            Err(e) => {
                let family = extractor.family();
                debug!("{} extractor failed ({}), using the regex fallback", family.as_ref(), e);
                (fallback::scan(&fallback::joined_text(chunks), family), Some(e.to_string()))
            }
        };

        let record = normalize::normalize(record);
        let status = if record.is_empty() { ParseStatus::NoMetadata } else { ParseStatus::Parsed };

        ParseOutcome {
            record,
            status,
            family,
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::png::testing::{png, text_chunk};

    #[test]
    fn test_parser_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Parser>();
    }

    #[test]
    fn test_unreadable_input() {
        let outcome = Parser::default().parse(b"GIF89a....", Some("a.gif"));
        assert_eq!(outcome.status, ParseStatus::Unreadable);
        assert!(outcome.record.is_empty());
        assert!(outcome.note.is_some());
    }

    #[test]
    fn test_no_metadata_keeps_dimensions_out_of_status() {
        let outcome = Parser::default().parse(&png(300, 200, &[]), None);
        assert_eq!(outcome.status, ParseStatus::NoMetadata);
        assert_eq!(outcome.record.width, Some(300));
        assert_eq!(outcome.record.height, Some(200));

        let config = Config {
            image_dimensions_fallback: false,
            ..Default::default()
        };
        let outcome = Parser::new(config).parse(&png(300, 200, &[]), None);
        assert_eq!(outcome.record.width, None);
    }

    #[test]
    fn test_a1111_parameters() {
        let bytes = png(512, 768, &[text_chunk("parameters", "a cat\nSteps: 20, Sampler: Euler a, CFG scale: 7.5, Seed: 3")]);
        let outcome = Parser::default().parse(&bytes, Some("cat.png"));
        assert!(outcome.is_parsed());
        assert_eq!(outcome.family, FormatFamily::A1111);
        assert_eq!(outcome.record.steps, Some(20));
        assert_eq!(outcome.record.sampler.as_deref(), Some("Euler a"));
        assert_eq!(outcome.note, None);
    }

    #[test]
    fn test_broken_comfy_payload_falls_back_to_regex() {
        let mut chunks = TextChunks::new();
        chunks.insert("prompt".into(), r#"{"1": {"class_type": "KSampler", "inputs": {}}}"#.into());
        chunks.insert("Comment".into(), "Steps: 12, Seed: 5".into());

        let outcome = Parser::default().parse_text_chunks(&chunks);
        assert_eq!(outcome.family, FormatFamily::ComfyUi);
        assert_eq!(outcome.record.generator, Some(FormatFamily::ComfyUi));
        assert_eq!(outcome.record.steps, Some(12));
        assert_eq!(outcome.record.seed, Some(5));
        assert!(outcome.note.is_some());
    }

    #[test]
    fn test_sidecar_fills_gaps_only() {
        let bytes = png(64, 64, &[text_chunk("parameters", "a cat\nSteps: 20, CFG scale: 7")]);
        let sidecar = br#"{"steps": 99, "sampler": "DPM++ 2M", "seed": 42}"#;
        let outcome = Parser::default().parse_with_sidecar(&bytes, None, Some(sidecar));
        assert_eq!(outcome.record.steps, Some(20));
        assert_eq!(outcome.record.sampler.as_deref(), Some("DPM++ 2M"));
        assert_eq!(outcome.record.seed, Some(42));
        assert_eq!(outcome.record.generator, Some(FormatFamily::A1111));

        let outcome = Parser::default().parse_with_sidecar(&png(8, 8, &[]), None, Some(sidecar));
        assert_eq!(outcome.status, ParseStatus::Parsed);
        assert_eq!(outcome.record.steps, Some(99));
    }
}
