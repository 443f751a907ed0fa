//! ComfyUI graph interpretation.
//!
//! A workflow (API or UI serialisation) is loaded into a [`WorkflowGraph`],
//! output nodes are located, and every generation parameter is resolved by
//! walking upstream under the rules of the [`NodeRegistry`].

mod edge;
mod graph;
mod node;
pub mod registry;
mod resolver;
pub mod seed;

use serde_json::Value;
use tracing::{debug, trace};

pub use edge::Link;
pub use graph::WorkflowGraph;
pub use node::{InputValue, NodeId, NodeMode, ParserNode};
pub use registry::{NodeDefinition, NodeRegistry, ParamKey, ParamRule};
pub use resolver::{Traversal, sinks};

use crate::{
    Config, Result,
    model::{LoraEntry, WorkflowFacts},
};

/// Interpret a decoded ComfyUI payload with the built-in registry.
pub fn interpret(
    value: &Value,
    config: &Config,
) -> Result<WorkflowFacts> {
    let graph = WorkflowGraph::try_from(value)?;
    Ok(interpret_graph(&graph, NodeRegistry::global(), config))
}

pub fn interpret_graph(
    graph: &WorkflowGraph,
    registry: &NodeRegistry,
    config: &Config,
) -> WorkflowFacts {
    trace!("comfy::interpret_graph({} nodes, {} edges)", graph.node_count(), graph.edge_count());

    let mut facts = WorkflowFacts::default();
    let sinks = sinks(graph, registry);
    if sinks.is_empty() {
        debug!("workflow has no output node");
        return facts;
    }

    let mut walk = Traversal::new(graph, registry, config);

    facts.prompts.positive = walk.first(&sinks, ParamKey::Prompt, as_text);
    facts.prompts.negative = walk.first(&sinks, ParamKey::NegativePrompt, as_text);
    facts.model.base = walk.first(&sinks, ParamKey::Model, as_text);
    facts.model.vae = walk.first(&sinks, ParamKey::Vae, as_text);
    facts.sampling.seed = walk.first(&sinks, ParamKey::Seed, seed::coerce);
    facts.sampling.steps = walk.first(&sinks, ParamKey::Steps, as_u32);
    facts.sampling.cfg = walk.first(&sinks, ParamKey::Cfg, as_f64);
    facts.sampling.sampler_name = walk.first(&sinks, ParamKey::Sampler, as_text);
    facts.sampling.scheduler = walk.first(&sinks, ParamKey::Scheduler, as_text);
    facts.sampling.denoise = walk.first(&sinks, ParamKey::Denoise, as_f64);
    facts.dimensions.width = walk.first(&sinks, ParamKey::Width, as_u32);
    facts.dimensions.height = walk.first(&sinks, ParamKey::Height, as_u32);

    let accumulated = walk.collect(&sinks, ParamKey::Lora);
    facts.loras = accumulated.iter().filter_map(|(id, value)| lora_entry(&walk, id, value)).collect();

    facts
}

/// LoRA entry from an accumulated value: a bare name read from a loader
/// widget, or a Power Lora Loader object.
fn lora_entry(
    walk: &Traversal<'_>,
    node_id: &str,
    value: &Value,
) -> Option<LoraEntry> {
    if let Some(object) = value.as_object() {
        let name = object.get("lora").or_else(|| object.get("name")).and_then(as_text)?;
        let model = object.get("strength").and_then(as_f64);
        let clip = object.get("strengthTwo").and_then(as_f64).or(model);
        return Some(LoraEntry::named(name).with_strength(model, clip));
    }

    let name = as_text(value)?;
    let node = walk.graph().node(node_id)?;
    let model = ["strength_model", "strength"].iter().find_map(|w| walk.widget_literal(node, w)).as_ref().and_then(as_f64);
    let clip = walk.widget_literal(node, "strength_clip").as_ref().and_then(as_f64);
    Some(LoraEntry::named(name).with_strength(model, clip))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    let v = as_f64(value)?;
    if v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64 { Some(v as u32) } else { None }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn txt2img() -> Value {
        json!({
            "4": {"class_type": "CheckpointLoaderSimple", "inputs": {"ckpt_name": "sd_xl_base_1.0.safetensors"}},
            "5": {"class_type": "EmptyLatentImage", "inputs": {"width": 1024, "height": 1024, "batch_size": 1}},
            "6": {"class_type": "CLIPTextEncode", "inputs": {"text": "a lighthouse on a cliff", "clip": ["4", 1]}},
            "7": {"class_type": "CLIPTextEncode", "inputs": {"text": "blurry", "clip": ["4", 1]}},
            "3": {"class_type": "KSampler", "inputs": {
                "seed": 156680208700286u64, "steps": 20, "cfg": 8, "sampler_name": "euler", "scheduler": "normal", "denoise": 1,
                "model": ["4", 0], "positive": ["6", 0], "negative": ["7", 0], "latent_image": ["5", 0]
            }},
            "8": {"class_type": "VAEDecode", "inputs": {"samples": ["3", 0], "vae": ["4", 2]}},
            "9": {"class_type": "SaveImage", "inputs": {"filename_prefix": "ComfyUI", "images": ["8", 0]}}
        })
    }

    #[test]
    fn test_interpret_api_txt2img() {
        let facts = interpret(&txt2img(), &Config::default()).unwrap();
        assert_eq!(facts.prompts.positive.as_deref(), Some("a lighthouse on a cliff"));
        assert_eq!(facts.prompts.negative.as_deref(), Some("blurry"));
        assert_eq!(facts.model.base.as_deref(), Some("sd_xl_base_1.0.safetensors"));
        assert_eq!(facts.model.vae, None);
        assert_eq!(facts.sampling.seed, Some(156680208700286));
        assert_eq!(facts.sampling.steps, Some(20));
        assert_eq!(facts.sampling.cfg, Some(8.0));
        assert_eq!(facts.sampling.sampler_name.as_deref(), Some("euler"));
        assert_eq!(facts.sampling.scheduler.as_deref(), Some("normal"));
        assert_eq!(facts.sampling.denoise, Some(1.0));
        assert_eq!(facts.dimensions.width, Some(1024));
        assert_eq!(facts.dimensions.height, Some(1024));
        assert!(facts.loras.is_empty());
    }

    #[test]
    fn test_interpret_ui_positional_widgets() {
        let workflow = json!({
            "nodes": [
                {"id": 4, "type": "CheckpointLoaderSimple", "widgets_values": ["dreamshaper_8.safetensors"]},
                {"id": 10, "type": "LoraLoader", "inputs": [{"name": "model", "link": 1}, {"name": "clip", "link": 2}], "widgets_values": ["add_detail.safetensors", 0.7, 0.5]},
                {"id": 6, "type": "CLIPTextEncode", "inputs": [{"name": "clip", "link": 3}], "widgets_values": ["a red bicycle"]},
                {"id": 5, "type": "EmptyLatentImage", "widgets_values": [512, 768, 1]},
                {"id": 3, "type": "KSampler", "inputs": [{"name": "model", "link": 4}, {"name": "positive", "link": 5}, {"name": "latent_image", "link": 6}], "widgets_values": [42, "randomize", 25, 6.5, "dpmpp_2m", "karras", 1]},
                {"id": 9, "type": "SaveImage", "inputs": [{"name": "images", "link": 7}], "widgets_values": ["ComfyUI"]}
            ],
            "links": [
                [1, 4, 0, 10, 0, "MODEL"],
                [2, 4, 1, 10, 1, "CLIP"],
                [3, 10, 1, 6, 0, "CLIP"],
                [4, 10, 0, 3, 0, "MODEL"],
                [5, 6, 0, 3, 1, "CONDITIONING"],
                [6, 5, 0, 3, 3, "LATENT"],
                [7, 3, 0, 9, 0, "LATENT"]
            ]
        });
        let facts = interpret(&workflow, &Config::default()).unwrap();
        assert_eq!(facts.prompts.positive.as_deref(), Some("a red bicycle"));
        assert_eq!(facts.prompts.negative, None);
        assert_eq!(facts.model.base.as_deref(), Some("dreamshaper_8.safetensors"));
        assert_eq!(facts.sampling.seed, Some(42));
        assert_eq!(facts.sampling.steps, Some(25));
        assert_eq!(facts.sampling.cfg, Some(6.5));
        assert_eq!(facts.sampling.sampler_name.as_deref(), Some("dpmpp_2m"));
        assert_eq!(facts.sampling.scheduler.as_deref(), Some("karras"));
        assert_eq!(facts.dimensions.width, Some(512));
        assert_eq!(facts.dimensions.height, Some(768));
        assert_eq!(facts.loras, vec![LoraEntry::named("add_detail.safetensors").with_strength(Some(0.7), Some(0.5))]);
    }

    #[test]
    fn test_interpret_flux_custom_sampler() {
        let workflow = json!({
            "1": {"class_type": "UNETLoader", "inputs": {"unet_name": "flux1-dev.safetensors", "weight_dtype": "default"}},
            "2": {"class_type": "CLIPTextEncode", "inputs": {"text": "an astronaut"}},
            "3": {"class_type": "FluxGuidance", "inputs": {"guidance": 3.5, "conditioning": ["2", 0]}},
            "4": {"class_type": "BasicGuider", "inputs": {"model": ["1", 0], "conditioning": ["3", 0]}},
            "5": {"class_type": "RandomNoise", "inputs": {"noise_seed": 7}},
            "6": {"class_type": "KSamplerSelect", "inputs": {"sampler_name": "euler"}},
            "7": {"class_type": "BasicScheduler", "inputs": {"scheduler": "simple", "steps": 28, "denoise": 1, "model": ["1", 0]}},
            "8": {"class_type": "EmptySD3LatentImage", "inputs": {"width": 896, "height": 1152}},
            "9": {"class_type": "SamplerCustomAdvanced", "inputs": {"noise": ["5", 0], "guider": ["4", 0], "sampler": ["6", 0], "sigmas": ["7", 0], "latent_image": ["8", 0]}},
            "10": {"class_type": "VAEDecode", "inputs": {"samples": ["9", 0], "vae": ["11", 0]}},
            "11": {"class_type": "VAELoader", "inputs": {"vae_name": "ae.safetensors"}},
            "12": {"class_type": "SaveImage", "inputs": {"images": ["10", 0]}}
        });
        let facts = interpret(&workflow, &Config::default()).unwrap();
        assert_eq!(facts.prompts.positive.as_deref(), Some("an astronaut"));
        assert_eq!(facts.model.base.as_deref(), Some("flux1-dev.safetensors"));
        assert_eq!(facts.model.vae.as_deref(), Some("ae.safetensors"));
        assert_eq!(facts.sampling.seed, Some(7));
        assert_eq!(facts.sampling.cfg, Some(3.5));
        assert_eq!(facts.sampling.steps, Some(28));
        assert_eq!(facts.sampling.sampler_name.as_deref(), Some("euler"));
        assert_eq!(facts.sampling.scheduler.as_deref(), Some("simple"));
        assert_eq!(facts.dimensions.width, Some(896));
    }

    #[test]
    fn test_interpret_without_sinks_or_graph() {
        let facts = interpret(&json!({"1": {"class_type": "CheckpointLoaderSimple", "inputs": {"ckpt_name": "m"}}}), &Config::default()).unwrap();
        assert!(facts.is_empty());
        assert!(interpret(&json!({"hello": "world"}), &Config::default()).is_err());
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(as_u32(&json!("30")), Some(30));
        assert_eq!(as_u32(&json!(-3)), None);
        assert_eq!(as_u32(&json!(2.5)), None);
        assert_eq!(as_f64(&json!("7.5")), Some(7.5));
        assert_eq!(as_text(&json!(3)), Some("3".to_string()));
        assert_eq!(as_text(&json!(null)), None);
    }
}
