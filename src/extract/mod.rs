//! Flat-schema extractors, one per non-graph format family.
//!
//! Every extractor maps the text chunks of one image straight onto a
//! [`MetadataRecord`]. The ComfyUI graph interpreter and the regex fallback are
//! exposed through the same trait so the parser can treat all families alike.

pub(crate) mod a1111;
mod comfy;
mod drawthings;
mod dreamstudio;
pub(crate) mod fallback;
mod firefly;
mod invokeai;
mod midjourney;
mod swarmui;
pub(crate) mod xmp;

use serde_json::Value;

use crate::{
    Config, Result,
    comfy::seed,
    container::TextChunks,
    model::{FormatFamily, MetadataRecord},
};

pub use a1111::A1111Extractor;
pub use comfy::ComfyExtractor;
pub use drawthings::DrawThingsExtractor;
pub use dreamstudio::DreamStudioExtractor;
pub use fallback::FallbackExtractor;
pub use firefly::PlatformExtractor;
pub use invokeai::InvokeAiExtractor;
pub use midjourney::MidjourneyExtractor;
pub use swarmui::SwarmUiExtractor;

pub trait Extractor: Send + Sync {
    /// The family this extractor reports as `generator`.
    fn family(&self) -> FormatFamily;

    /// Map the chunks onto a record.
    ///
    /// Returns `GenmetaError::Extract` when the chunk this family relies on is
    /// missing or unusable, which sends the parser to the regex fallback.
    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord>;
}

/// Pick the extractor for a detected family.
pub fn extractor_for<'a>(
    family: FormatFamily,
    config: &'a Config,
) -> Box<dyn Extractor + 'a> {
    match family {
        FormatFamily::ComfyUi => Box::new(ComfyExtractor::new(config)),
        FormatFamily::InvokeAi => Box::new(InvokeAiExtractor),
        FormatFamily::A1111 | FormatFamily::Forge | FormatFamily::SdNext => Box::new(A1111Extractor::new(family)),
        FormatFamily::SwarmUi => Box::new(SwarmUiExtractor),
        FormatFamily::Midjourney | FormatFamily::Niji => Box::new(MidjourneyExtractor::new(family)),
        FormatFamily::DrawThings => Box::new(DrawThingsExtractor),
        FormatFamily::DreamStudio => Box::new(DreamStudioExtractor),
        FormatFamily::Firefly | FormatFamily::Dalle3 => Box::new(PlatformExtractor::new(family)),
        FormatFamily::Unknown => Box::new(FallbackExtractor),
    }
}

pub(crate) fn first_str(
    value: &Value,
    keys: &[&str],
) -> Option<String> {
    keys.iter().filter_map(|k| value.get(*k)).find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn first_f64(
    value: &Value,
    keys: &[&str],
) -> Option<f64> {
    keys.iter().filter_map(|k| value.get(*k)).find_map(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

pub(crate) fn first_u32(
    value: &Value,
    keys: &[&str],
) -> Option<u32> {
    keys.iter().filter_map(|k| value.get(*k)).find_map(|v| match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)).and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}

pub(crate) fn first_seed(
    value: &Value,
    keys: &[&str],
) -> Option<u64> {
    keys.iter().filter_map(|k| value.get(*k)).find_map(seed::coerce)
}

/// `512x768` -> (512, 768).
pub(crate) fn parse_size(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.trim().split_once(['x', 'X', '×'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Generic key lookup over a loosely structured JSON object.
pub(crate) fn record_from_json(
    value: &Value,
    family: FormatFamily,
) -> MetadataRecord {
    let mut record = MetadataRecord::for_family(family);
    record.prompt = first_str(value, &["prompt", "Prompt", "positive_prompt", "description", "caption", "c"]);
    record.negative_prompt = first_str(value, &["negative_prompt", "negativePrompt", "negative", "uc", "Negative prompt"]);
    record.model = first_str(value, &["model", "model_name", "checkpoint", "ckpt_name", "engine", "engine_id"]);
    record.vae = first_str(value, &["vae", "vae_name"]);
    record.seed = first_seed(value, &["seed", "Seed"]);
    record.steps = first_u32(value, &["steps", "num_inference_steps", "Steps"]);
    record.cfg = first_f64(value, &["cfg_scale", "cfg", "cfgScale", "guidance_scale", "scale"]);
    record.sampler = first_str(value, &["sampler", "sampler_name", "samplerName"]);
    record.scheduler = first_str(value, &["scheduler", "schedule_type"]);
    record.denoise = first_f64(value, &["denoise", "denoising_strength", "strength"]);
    record.width = first_u32(value, &["width", "w"]);
    record.height = first_u32(value, &["height", "h"]);
    if record.width.is_none() {
        if let Some((w, h)) = first_str(value, &["size", "Size"]).as_deref().and_then(parse_size) {
            record.width = Some(w);
            record.height = Some(h);
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_scalar_helpers() {
        let v = json!({"steps": "30", "cfg": 6, "seed": "0x1f", "w": 512.0, "name": "  "});
        assert_eq!(first_u32(&v, &["missing", "steps"]), Some(30));
        assert_eq!(first_f64(&v, &["cfg"]), Some(6.0));
        assert_eq!(first_seed(&v, &["seed"]), Some(31));
        assert_eq!(first_u32(&v, &["w"]), Some(512));
        assert_eq!(first_str(&v, &["name"]), None);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512x768"), Some((512, 768)));
        assert_eq!(parse_size(" 1024 X 1024 "), Some((1024, 1024)));
        assert_eq!(parse_size("big"), None);
    }

    #[test]
    fn test_record_from_json_generic_keys() {
        let v = json!({"prompt": "a cat", "negative_prompt": "dog", "steps": 40, "cfg_scale": 7.0, "seed": 99, "size": "640x448", "engine": "sdxl"});
        let record = record_from_json(&v, FormatFamily::DreamStudio);
        assert_eq!(record.generator, Some(FormatFamily::DreamStudio));
        assert_eq!(record.prompt.as_deref(), Some("a cat"));
        assert_eq!(record.steps, Some(40));
        assert_eq!(record.width, Some(640));
        assert_eq!(record.height, Some(448));
        assert_eq!(record.model.as_deref(), Some("sdxl"));
    }

    #[test]
    fn test_extractor_for_reports_family() {
        let config = Config::default();
        for family in [FormatFamily::A1111, FormatFamily::Niji, FormatFamily::Dalle3, FormatFamily::ComfyUi, FormatFamily::Unknown] {
            assert_eq!(extractor_for(family, &config).family(), family);
        }
    }
}
