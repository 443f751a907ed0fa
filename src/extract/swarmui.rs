use serde_json::Value;

use crate::{
    GenmetaError, Result,
    container::{TextChunks, chunk_text},
    decode,
    extract::{Extractor, first_f64, first_seed, first_str, first_u32},
    model::{FormatFamily, LoraEntry, MetadataRecord},
};

/// SwarmUI writes a JSON `parameters` chunk with a `sui_image_params` object.
pub struct SwarmUiExtractor;

impl Extractor for SwarmUiExtractor {
    fn family(&self) -> FormatFamily {
        FormatFamily::SwarmUi
    }

    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord> {
        let json = chunk_text(chunks, "parameters").and_then(decode::decode_json).ok_or_else(|| GenmetaError::Extract("parameters chunk is not json".into()))?;
        let params = json.get("sui_image_params").ok_or_else(|| GenmetaError::Extract("missing sui_image_params".into()))?;

        let mut record = MetadataRecord::for_family(FormatFamily::SwarmUi);
        record.prompt = first_str(params, &["prompt"]);
        record.negative_prompt = first_str(params, &["negativeprompt"]);
        record.model = first_str(params, &["model"]);
        record.vae = first_str(params, &["vae"]);
        record.seed = first_seed(params, &["seed"]);
        record.steps = first_u32(params, &["steps"]);
        record.cfg = first_f64(params, &["cfgscale"]);
        record.sampler = first_str(params, &["sampler"]);
        record.scheduler = first_str(params, &["scheduler"]);
        record.denoise = first_f64(params, &["initimagecreativity"]);
        record.width = first_u32(params, &["width"]);
        record.height = first_u32(params, &["height"]);
        record.loras = loras(params);

        if let Some(version) = first_str(params, &["swarm_version"]) {
            record.extra.insert("swarm_version".to_string(), version);
        }

        Ok(record)
    }
}

fn loras(params: &Value) -> Vec<LoraEntry> {
    let Some(names) = params.get("loras").and_then(Value::as_array) else {
        return Vec::new();
    };
    let weights = params.get("loraweights").and_then(Value::as_array);

    names
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let name = name.as_str()?.trim();
            let weight = weights.and_then(|w| w.get(i)).and_then(|w| w.as_f64().or_else(|| w.as_str()?.trim().parse().ok()));
            (!name.is_empty()).then(|| LoraEntry::named(name).with_strength(weight, weight))
        })
        .collect()
}
