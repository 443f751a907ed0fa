use crate::{
    GenmetaError, Result,
    container::{C2PA_KEYWORD, TextChunks, XMP_KEYWORD, chunk_text},
    extract::{Extractor, xmp::xmp_property},
    model::{FormatFamily, MetadataRecord},
};

const GENERATOR_MARKERS: &[&str] = &["firefly", "adobe", "openai", "chatgpt", "dall"];

/// Hosted platforms that sign their output with a C2PA manifest and embed
/// little else: Adobe Firefly and DALL-E 3.
pub struct PlatformExtractor {
    family: FormatFamily,
}

impl PlatformExtractor {
    pub fn new(family: FormatFamily) -> Self {
        Self {
            family,
        }
    }
}

impl Extractor for PlatformExtractor {
    fn family(&self) -> FormatFamily {
        self.family
    }

    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord> {
        let manifest = chunk_text(chunks, C2PA_KEYWORD).ok_or_else(|| GenmetaError::Extract("no c2pa manifest".into()))?;

        let mut record = MetadataRecord::for_family(self.family);
        record.model = self.family.platform_model().map(str::to_string);
        record.prompt = chunk_text(chunks, XMP_KEYWORD)
            .and_then(|xmp| xmp_property(xmp, "dc:description"))
            .or_else(|| ["Description", "ImageDescription"].iter().find_map(|k| chunk_text(chunks, k)).map(str::to_string));

        // the manifest's claim_generator value, as far as printable runs show it
        if let Some(line) = manifest.lines().map(str::trim).find(|line| {
            let lower = line.to_lowercase();
            GENERATOR_MARKERS.iter().any(|m| lower.contains(m))
        }) {
            record.extra.insert("claim_generator".to_string(), line.to_string());
        }

        Ok(record)
    }
}
