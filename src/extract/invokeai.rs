use serde_json::Value;

use crate::{
    GenmetaError, Result,
    container::{TextChunks, chunk_text},
    decode,
    extract::{Extractor, first_f64, first_seed, first_str, first_u32},
    model::{FormatFamily, LoraEntry, MetadataRecord},
};

/// InvokeAI: `invokeai_metadata` JSON (3.x and later), or the older
/// `sd-metadata` JSON and `Dream` command line.
pub struct InvokeAiExtractor;

impl Extractor for InvokeAiExtractor {
    fn family(&self) -> FormatFamily {
        FormatFamily::InvokeAi
    }

    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord> {
        if let Some(json) = chunk_text(chunks, "invokeai_metadata").and_then(decode::decode_json) {
            return Ok(from_metadata(&json));
        }
        if let Some(json) = chunk_text(chunks, "sd-metadata").and_then(decode::decode_json) {
            return Ok(from_legacy(&json));
        }
        if let Some(dream) = chunk_text(chunks, "Dream") {
            return Ok(from_dream(dream));
        }
        Err(GenmetaError::Extract("no invokeai metadata chunk".into()))
    }
}

/// Model fields are either a plain string or `{model_name | name, ...}`.
fn model_name(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        obj @ Value::Object(_) => first_str(obj, &["model_name", "name", "key"]),
        _ => None,
    }
}

fn from_metadata(json: &Value) -> MetadataRecord {
    let mut record = MetadataRecord::for_family(FormatFamily::InvokeAi);
    record.prompt = first_str(json, &["positive_prompt", "positive_style_prompt"]);
    record.negative_prompt = first_str(json, &["negative_prompt", "negative_style_prompt"]);
    record.model = model_name(json.get("model"));
    record.vae = model_name(json.get("vae"));
    record.seed = first_seed(json, &["seed"]);
    record.steps = first_u32(json, &["steps"]);
    record.cfg = first_f64(json, &["cfg_scale"]);
    record.scheduler = first_str(json, &["scheduler"]);
    record.denoise = first_f64(json, &["denoising_strength", "strength"]);
    record.width = first_u32(json, &["width"]);
    record.height = first_u32(json, &["height"]);

    record.loras = json
        .get("loras")
        .and_then(Value::as_array)
        .map(|loras| {
            loras
                .iter()
                .filter_map(|l| {
                    let name = model_name(l.get("model").or_else(|| l.get("lora")))?;
                    let weight = first_f64(l, &["weight"]);
                    Some(LoraEntry::named(name).with_strength(weight, weight))
                })
                .collect()
        })
        .unwrap_or_default();

    for key in ["generation_mode", "app_version"] {
        if let Some(v) = first_str(json, &[key]) {
            record.extra.insert(key.to_string(), v);
        }
    }
    record
}

fn from_legacy(json: &Value) -> MetadataRecord {
    let mut record = MetadataRecord::for_family(FormatFamily::InvokeAi);
    record.model = first_str(json, &["model_weights"]);

    let Some(image) = json.get("image") else {
        return record;
    };

    let prompt = match image.get("prompt") {
        Some(Value::Array(parts)) => {
            let texts: Vec<String> = parts.iter().filter_map(|p| first_str(p, &["prompt"])).collect();
            (!texts.is_empty()).then(|| texts.join(" "))
        }
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };
    if let Some(prompt) = prompt {
        let (positive, negative) = split_bracketed_negative(&prompt);
        record.prompt = Some(positive);
        record.negative_prompt = negative;
    }

    record.seed = first_seed(image, &["seed"]);
    record.steps = first_u32(image, &["steps"]);
    record.cfg = first_f64(image, &["cfg_scale"]);
    record.sampler = first_str(image, &["sampler"]);
    record.denoise = first_f64(image, &["strength"]);
    record.width = first_u32(image, &["width"]);
    record.height = first_u32(image, &["height"]);
    record
}

/// Old InvokeAI prompts carry the negative part as `positive [negative]`.
fn split_bracketed_negative(prompt: &str) -> (String, Option<String>) {
    let trimmed = prompt.trim();
    if let (Some(open), true) = (trimmed.rfind('['), trimmed.ends_with(']')) {
        let negative = trimmed[open + 1..trimmed.len() - 1].trim();
        if !negative.is_empty() {
            return (trimmed[..open].trim().to_string(), Some(negative.to_string()));
        }
    }
    (trimmed.to_string(), None)
}

/// `"prompt text" -s 50 -S 42 -W 512 -H 512 -C 7.5 -A k_lms`
fn from_dream(line: &str) -> MetadataRecord {
    let mut record = MetadataRecord::for_family(FormatFamily::InvokeAi);
    let line = line.trim();

    let (prompt, flags) = match line.strip_prefix('"').and_then(|rest| rest.split_once('"')) {
        Some((prompt, flags)) => (prompt.to_string(), flags),
        None => match line.find(" -") {
            Some(at) => (line[..at].to_string(), &line[at..]),
            None => (line.to_string(), ""),
        },
    };
    let (positive, negative) = split_bracketed_negative(&prompt);
    record.prompt = Some(positive);
    record.negative_prompt = negative;

    let tokens: Vec<&str> = flags.split_whitespace().collect();
    for pair in tokens.windows(2) {
        let value = pair[1];
        match pair[0] {
            "-s" | "--steps" => record.steps = value.parse().ok(),
            "-S" | "--seed" => record.seed = crate::comfy::seed::coerce_str(value),
            "-W" | "--width" => record.width = value.parse().ok(),
            "-H" | "--height" => record.height = value.parse().ok(),
            "-C" | "--cfg_scale" => record.cfg = value.parse().ok(),
            "-A" | "--sampler" => record.sampler = Some(value.to_string()),
            "-f" | "--strength" => record.denoise = value.parse().ok(),
            "-m" | "--model" => record.model = Some(value.to_string()),
            _ => {}
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn chunks(key: &str, value: String) -> TextChunks {
        TextChunks::from([(key.to_string(), value)])
    }

    #[test]
    fn test_invokeai_metadata() {
        let meta = json!({
            "positive_prompt": "castle on a hill",
            "negative_prompt": "fog",
            "model": {"model_name": "juggernautXL", "base_model": "sdxl"},
            "vae": {"model_name": "sdxl-vae"},
            "seed": 3456,
            "steps": 35,
            "cfg_scale": 5.5,
            "scheduler": "dpmpp_2m",
            "width": 1216,
            "height": 832,
            "loras": [{"model": {"name": "castles"}, "weight": 0.7}],
            "generation_mode": "sdxl_txt2img"
        });
        let record = InvokeAiExtractor.extract(&chunks("invokeai_metadata", meta.to_string())).unwrap();
        assert_eq!(record.model.as_deref(), Some("juggernautXL"));
        assert_eq!(record.vae.as_deref(), Some("sdxl-vae"));
        assert_eq!(record.cfg, Some(5.5));
        assert_eq!(record.loras, vec![LoraEntry::named("castles").with_strength(Some(0.7), Some(0.7))]);
        assert_eq!(record.extra["generation_mode"], "sdxl_txt2img");
    }

    #[test]
    fn test_legacy_sd_metadata() {
        let meta = json!({
            "model_weights": "stable-diffusion-1.5",
            "image": {"prompt": [{"prompt": "a lake [people, boats]", "weight": 1.0}], "seed": 12, "steps": 50, "cfg_scale": 7.5, "sampler": "k_lms", "width": 512, "height": 512}
        });
        let record = InvokeAiExtractor.extract(&chunks("sd-metadata", meta.to_string())).unwrap();
        assert_eq!(record.prompt.as_deref(), Some("a lake"));
        assert_eq!(record.negative_prompt.as_deref(), Some("people, boats"));
        assert_eq!(record.model.as_deref(), Some("stable-diffusion-1.5"));
        assert_eq!(record.sampler.as_deref(), Some("k_lms"));
    }

    #[test]
    fn test_dream_command_line() {
        let record = InvokeAiExtractor.extract(&chunks("Dream", "\"a cat in a hat\" -s 50 -S 42 -W 512 -H 640 -C 7.5 -A k_euler_a".to_string())).unwrap();
        assert_eq!(record.prompt.as_deref(), Some("a cat in a hat"));
        assert_eq!(record.steps, Some(50));
        assert_eq!(record.seed, Some(42));
        assert_eq!(record.height, Some(640));
        assert_eq!(record.sampler.as_deref(), Some("k_euler_a"));
    }
}
