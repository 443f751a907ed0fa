//! Result normalization.
//!
//! Every extractor's output passes through here before it reaches the caller:
//! text is trimmed, empty text becomes null, and numbers outside their valid
//! range are dropped.

use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    Config, comfy, decode, detect,
    extract::{a1111, record_from_json},
    model::{FormatFamily, LoraEntry, MetadataRecord, WorkflowFacts},
};

/// Map interpreted graph facts onto a record.
pub fn from_facts(
    facts: &WorkflowFacts,
    family: FormatFamily,
) -> MetadataRecord {
    let mut record = MetadataRecord::for_family(family);
    record.prompt = facts.prompts.positive.clone();
    record.negative_prompt = facts.prompts.negative.clone();
    record.model = facts.model.base.clone();
    record.vae = facts.model.vae.clone();
    record.loras = facts.loras.clone();
    record.seed = facts.sampling.seed;
    record.steps = facts.sampling.steps;
    record.cfg = facts.sampling.cfg;
    record.sampler = facts.sampling.sampler_name.clone();
    record.scheduler = facts.sampling.scheduler.clone();
    record.denoise = facts.sampling.denoise;
    record.width = facts.dimensions.width;
    record.height = facts.dimensions.height;
    record
}

/// Trim text, null out empty strings and drop out-of-range numbers.
pub fn normalize(mut record: MetadataRecord) -> MetadataRecord {
    record.prompt = clean_text(record.prompt);
    record.negative_prompt = clean_text(record.negative_prompt);
    record.model = clean_text(record.model);
    record.vae = clean_text(record.vae);
    record.sampler = clean_text(record.sampler);
    record.scheduler = clean_text(record.scheduler);

    record.steps = record.steps.filter(|s| *s > 0);
    record.cfg = record.cfg.filter(|c| c.is_finite());
    record.denoise = record.denoise.filter(|d| d.is_finite() && *d >= 0.0);
    record.width = record.width.filter(|w| *w > 0);
    record.height = record.height.filter(|h| *h > 0);

    record.loras = record
        .loras
        .into_iter()
        .filter_map(|lora| {
            let name = lora.name.trim();
            if name.is_empty() {
                return None;
            }
            Some(LoraEntry {
                name: name.to_string(),
                model_strength: lora.model_strength.filter(|s| s.is_finite()),
                clip_strength: lora.clip_strength.filter(|s| s.is_finite()),
            })
        })
        .collect();

    record.extra = record
        .extra
        .into_iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect();

    record
}

fn clean_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Use the container's pixel size for dimensions nothing else resolved.
pub fn apply_dimensions(
    record: &mut MetadataRecord,
    dimensions: Option<(u32, u32)>,
) {
    let Some((width, height)) = dimensions else {
        return;
    };
    if record.width.is_none() && record.height.is_none() && width > 0 && height > 0 {
        record.width = Some(width);
        record.height = Some(height);
    }
}

/// Read a sidecar `.json` document.
///
/// A ComfyUI graph is interpreted, any other JSON object goes through the
/// generic key lookup, and A1111 text is parsed with its line grammar.
pub fn sidecar_record(
    bytes: &[u8],
    config: &Config,
) -> Option<MetadataRecord> {
    trace!("normalize::sidecar_record({} bytes)", bytes.len());

    let text = String::from_utf8_lossy(bytes);
    let Some(payload) = decode::decode_payload(&text) else {
        if a1111::is_a1111_text(&text) {
            return Some(normalize(a1111::parse_parameters(&text, FormatFamily::A1111)));
        }
        debug!("sidecar is not decodable");
        return None;
    };

    let json = &payload.json;
    let record = if detect::is_comfy_api(json) || detect::is_comfy_ui(json) {
        match comfy::interpret(json, config) {
            Ok(facts) => from_facts(&facts, FormatFamily::ComfyUi),
            Err(e) => {
                debug!("sidecar workflow not interpretable: {}", e);
                return None;
            }
        }
    } else if let Some(graph) = embedded_workflow(json) {
        match comfy::interpret(graph, config) {
            Ok(facts) => from_facts(&facts, FormatFamily::ComfyUi),
            Err(_) => record_from_json(json, FormatFamily::Unknown),
        }
    } else if json.is_object() {
        record_from_json(json, FormatFamily::Unknown)
    } else {
        return None;
    };

    let record = normalize(record);
    if record.is_empty() { None } else { Some(record) }
}

/// Sidecars written by gallery tools often wrap the graph in a `prompt` or `workflow` key.
fn embedded_workflow(json: &Value) -> Option<&Value> {
    ["prompt", "workflow"]
        .iter()
        .filter_map(|k| json.get(*k))
        .find(|v| detect::is_comfy_api(v) || detect::is_comfy_ui(v))
}
