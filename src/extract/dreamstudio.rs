use crate::{
    GenmetaError, Result,
    container::{TextChunks, chunk_text},
    decode,
    extract::{Extractor, a1111, record_from_json},
    model::{FormatFamily, MetadataRecord},
};

const SOURCE_KEYWORDS: &[&str] = &["parameters", "Description", "Comment", "ImageDescription", "UserComment"];

/// DreamStudio has written JSON, A1111-style text and bare prompts over the years.
pub struct DreamStudioExtractor;

impl Extractor for DreamStudioExtractor {
    fn family(&self) -> FormatFamily {
        FormatFamily::DreamStudio
    }

    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord> {
        let texts: Vec<&str> = SOURCE_KEYWORDS.iter().filter_map(|k| chunk_text(chunks, k)).collect();

        if let Some(json) = texts.iter().find_map(|t| decode::decode_json(t)).filter(|v| v.is_object()) {
            return Ok(record_from_json(&json, FormatFamily::DreamStudio));
        }
        if let Some(text) = texts.iter().find(|t| a1111::is_a1111_text(t)) {
            return Ok(a1111::parse_parameters(text, FormatFamily::DreamStudio));
        }

        let prompt = texts
            .iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty() && !t.to_lowercase().contains("dreamstudio"))
            .ok_or_else(|| GenmetaError::Extract("no dreamstudio payload".into()))?;
        let mut record = MetadataRecord::for_family(FormatFamily::DreamStudio);
        record.prompt = Some(prompt.to_string());
        Ok(record)
    }
}
