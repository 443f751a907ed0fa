use serde_json::Value;

use crate::{
    GenmetaError, Result,
    container::{TextChunks, XMP_KEYWORD, chunk_text},
    decode,
    extract::{Extractor, first_f64, first_seed, first_str, first_u32, parse_size, xmp::xmp_property},
    model::{FormatFamily, LoraEntry, MetadataRecord},
};

/// Draw Things stores a JSON object in the XMP `exif:UserComment` property.
pub struct DrawThingsExtractor;

impl Extractor for DrawThingsExtractor {
    fn family(&self) -> FormatFamily {
        FormatFamily::DrawThings
    }

    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord> {
        let json = chunk_text(chunks, XMP_KEYWORD)
            .and_then(|xmp| xmp_property(xmp, "exif:UserComment"))
            .and_then(|text| decode::decode_json(&text))
            .or_else(|| chunk_text(chunks, "UserComment").and_then(decode::decode_json))
            .ok_or_else(|| GenmetaError::Extract("no draw things json in xmp".into()))?;

        let mut record = MetadataRecord::for_family(FormatFamily::DrawThings);
        record.prompt = first_str(&json, &["c", "prompt"]);
        record.negative_prompt = first_str(&json, &["uc", "negative_prompt"]);
        record.model = first_str(&json, &["model"]);
        record.seed = first_seed(&json, &["seed"]);
        record.steps = first_u32(&json, &["steps"]);
        record.cfg = first_f64(&json, &["scale", "guidance_scale"]);
        record.sampler = first_str(&json, &["sampler"]);
        record.denoise = first_f64(&json, &["strength"]);
        if let Some((w, h)) = first_str(&json, &["size"]).as_deref().and_then(parse_size) {
            record.width = Some(w);
            record.height = Some(h);
        }

        record.loras = json
            .get("lora")
            .and_then(Value::as_array)
            .map(|loras| {
                loras
                    .iter()
                    .filter_map(|l| {
                        let weight = first_f64(l, &["weight"]);
                        Some(LoraEntry::named(first_str(l, &["file", "model"])?).with_strength(weight, weight))
                    })
                    .collect()
            })
            .unwrap_or_default();

        for key in ["seed_mode", "shift", "clip_skip"] {
            if let Some(v) = first_str(&json, &[key]) {
                record.extra.insert(key.to_string(), v);
            }
        }

        Ok(record)
    }
}
