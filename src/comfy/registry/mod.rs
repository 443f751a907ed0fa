//! Declarative node registry.
//!
//! Each known node type is described once: its role in the graph, its input
//! and output slots, the names of its positional widgets, how each generation
//! parameter is read from it, and how traffic passes through it when it is
//! muted or carries nothing of interest. The resolver only ever consults this
//! table; there is no per-type branching elsewhere.

mod conditioning;
mod custom;
mod latents;
mod loaders;
mod routing;
mod sampling;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::comfy::{node::ParserNode, resolver::Traversal};

static GLOBAL: Lazy<NodeRegistry> = Lazy::new(NodeRegistry::with_defaults);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeCategory {
    Loader,
    Sampler,
    Guider,
    Noise,
    Scheduler,
    Conditioning,
    Text,
    Latent,
    Image,
    /// saves to disk
    Output,
    /// preview only
    Preview,
    Routing,
    Primitive,
    Patch,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeRole {
    Source,
    Sink,
    Transform,
    PassThrough,
    Routing,
}

/// Generation parameters the resolver can look for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParamKey {
    Prompt,
    NegativePrompt,
    Seed,
    Steps,
    Cfg,
    Width,
    Height,
    Model,
    Sampler,
    Scheduler,
    Lora,
    Vae,
    Denoise,
}

impl ParamKey {
    pub const ALL: [ParamKey; 13] = [
        ParamKey::Prompt,
        ParamKey::NegativePrompt,
        ParamKey::Seed,
        ParamKey::Steps,
        ParamKey::Cfg,
        ParamKey::Width,
        ParamKey::Height,
        ParamKey::Model,
        ParamKey::Sampler,
        ParamKey::Scheduler,
        ParamKey::Lora,
        ParamKey::Vae,
        ParamKey::Denoise,
    ];

    /// Whether the parameter holds text rather than a number.
    pub fn is_text(&self) -> bool {
        matches!(self, ParamKey::Prompt | ParamKey::NegativePrompt | ParamKey::Model | ParamKey::Sampler | ParamKey::Scheduler | ParamKey::Lora | ParamKey::Vae)
    }

    /// Literal input names that carry this parameter on nodes nobody described.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ParamKey::Prompt => &["text", "prompt", "positive_prompt", "text_positive"],
            ParamKey::NegativePrompt => &["text", "negative_prompt", "text_negative"],
            ParamKey::Seed => &["seed", "noise_seed"],
            ParamKey::Steps => &["steps"],
            ParamKey::Cfg => &["cfg", "cfg_scale", "guidance"],
            ParamKey::Width => &["width"],
            ParamKey::Height => &["height"],
            ParamKey::Model => &["ckpt_name", "unet_name", "model_name"],
            ParamKey::Sampler => &["sampler_name", "sampler"],
            ParamKey::Scheduler => &["scheduler"],
            ParamKey::Lora => &["lora_name"],
            ParamKey::Vae => &["vae_name"],
            ParamKey::Denoise => &["denoise"],
        }
    }

    /// Linked input names worth following first on nodes nobody described.
    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            ParamKey::Prompt => &["positive", "conditioning", "guider", "samples", "latent", "images", "image"],
            ParamKey::NegativePrompt => &["negative", "guider", "samples", "latent", "images", "image"],
            ParamKey::Seed => &["noise", "samples", "latent", "images", "image"],
            ParamKey::Steps | ParamKey::Scheduler | ParamKey::Denoise => &["sigmas", "samples", "latent", "images", "image"],
            ParamKey::Cfg => &["guider", "positive", "conditioning", "samples", "latent", "images", "image"],
            ParamKey::Width | ParamKey::Height => &["latent_image", "latent", "samples", "images", "image"],
            ParamKey::Model | ParamKey::Lora => &["model", "samples", "latent", "images", "image"],
            ParamKey::Sampler => &["sampler", "samples", "latent", "images", "image"],
            ParamKey::Vae => &["vae", "images", "image"],
        }
    }
}

/// Custom extractor: gets the node, the parameter being resolved, the
/// traversal (graph access, accumulation state, upstream tracing) and the
/// current depth.
pub type CustomExtractor = fn(&ParserNode, ParamKey, &mut Traversal<'_>, usize) -> Option<Value>;

/// How one parameter is read from a node.
#[derive(Debug, Clone, Copy)]
pub enum ParamRule {
    /// Read a named widget. Accumulating widgets record their value and keep
    /// walking upstream through the node's pass-through.
    Widget {
        name: &'static str,
        accumulate: bool,
    },
    /// Follow a linked input upstream.
    Trace {
        input: &'static str,
    },
    /// Take a literal value as is, never following links.
    Input {
        name: &'static str,
    },
    Custom(CustomExtractor),
}

impl ParamRule {
    pub const fn widget(name: &'static str) -> Self {
        ParamRule::Widget {
            name,
            accumulate: false,
        }
    }

    pub const fn accumulate(name: &'static str) -> Self {
        ParamRule::Widget {
            name,
            accumulate: true,
        }
    }

    pub const fn trace(input: &'static str) -> Self {
        ParamRule::Trace {
            input,
        }
    }

    pub const fn input(name: &'static str) -> Self {
        ParamRule::Input {
            name,
        }
    }
}

/// Input that stands in for an output slot when the node is skipped.
/// `input: None` means the first linked input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassThrough {
    pub input: Option<&'static str>,
    pub output_slot: Option<u32>,
}

/// Switch nodes: the `control` widget selects input `{prefix}{index}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalRouting {
    pub control: &'static str,
    pub prefix: &'static str,
}

#[derive(Debug, Clone)]
pub struct NodeDefinition {
    pub class_type: &'static str,
    pub category: NodeCategory,
    pub roles: Vec<NodeRole>,
    /// `(name, type)` pairs
    pub inputs: Vec<(&'static str, &'static str)>,
    /// output types by slot
    pub outputs: Vec<&'static str>,
    /// positional widget names, in `widgets_values` order
    pub widgets: Vec<&'static str>,
    pub rules: Vec<(ParamKey, ParamRule)>,
    pub pass_through: Vec<PassThrough>,
    pub routing: Option<ConditionalRouting>,
}

impl NodeDefinition {
    pub fn new(
        class_type: &'static str,
        category: NodeCategory,
    ) -> Self {
        Self {
            class_type,
            category,
            roles: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            widgets: Vec::new(),
            rules: Vec::new(),
            pass_through: Vec::new(),
            routing: None,
        }
    }

    pub fn role(
        mut self,
        role: NodeRole,
    ) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    pub fn inputs(
        mut self,
        inputs: &[(&'static str, &'static str)],
    ) -> Self {
        self.inputs = inputs.to_vec();
        self
    }

    pub fn outputs(
        mut self,
        outputs: &[&'static str],
    ) -> Self {
        self.outputs = outputs.to_vec();
        self
    }

    pub fn widgets(
        mut self,
        widgets: &[&'static str],
    ) -> Self {
        self.widgets = widgets.to_vec();
        self
    }

    /// Set the rule for `param`, replacing an earlier one.
    pub fn param(
        mut self,
        param: ParamKey,
        rule: ParamRule,
    ) -> Self {
        self.rules.retain(|(p, _)| *p != param);
        self.rules.push((param, rule));
        self
    }

    pub fn params(
        mut self,
        params: &[ParamKey],
        rule: ParamRule,
    ) -> Self {
        for param in params {
            self = self.param(*param, rule);
        }
        self
    }

    /// Trace every parameter without a rule yet through `input`.
    pub fn trace_all(
        mut self,
        input: &'static str,
    ) -> Self {
        for param in ParamKey::ALL {
            if self.rule_for(param).is_none() {
                self.rules.push((param, ParamRule::trace(input)));
            }
        }
        self
    }

    pub fn pass_through(
        mut self,
        input: &'static str,
        output_slot: u32,
    ) -> Self {
        self.pass_through.push(PassThrough {
            input: Some(input),
            output_slot: Some(output_slot),
        });
        self.role(NodeRole::PassThrough)
    }

    /// Pass through whichever input is linked first.
    pub fn pass_through_first(mut self) -> Self {
        self.pass_through.push(PassThrough {
            input: None,
            output_slot: None,
        });
        self.role(NodeRole::PassThrough)
    }

    pub fn routing(
        mut self,
        control: &'static str,
        prefix: &'static str,
    ) -> Self {
        self.routing = Some(ConditionalRouting {
            control,
            prefix,
        });
        self.role(NodeRole::Routing)
    }

    pub fn rule_for(
        &self,
        param: ParamKey,
    ) -> Option<&ParamRule> {
        self.rules.iter().find(|(p, _)| *p == param).map(|(_, r)| r)
    }

    pub fn has_role(
        &self,
        role: NodeRole,
    ) -> bool {
        self.roles.contains(&role)
    }

    pub fn widget_index(
        &self,
        name: &str,
    ) -> Option<usize> {
        self.widgets.iter().position(|w| *w == name)
    }

    /// The input standing in for `via_slot` when traffic passes through.
    ///
    /// Declared pass-through first, then a linked input of the same type as
    /// the output slot, then the first linked input.
    pub fn bypass_input<'a>(
        &self,
        node: &'a ParserNode,
        via_slot: Option<u32>,
    ) -> Option<&'a str> {
        let declared = self.pass_through.iter().find(|p| p.output_slot.is_some() && p.output_slot == via_slot).or_else(|| self.pass_through.first());
        if let Some(pass) = declared {
            match pass.input {
                Some(input) if node.link(input).is_some() => return node.inputs.iter().find(|(n, _)| n == input).map(|(n, _)| n.as_str()),
                Some(_) => {}
                None => return node.first_link().map(|(name, _, _)| name),
            }
        }

        let kind = via_slot.and_then(|slot| self.outputs.get(slot as usize));
        if let Some(kind) = kind {
            let typed = self.inputs.iter().filter(|(_, k)| k == kind).find_map(|(name, _)| node.links().find(|(n, _, _)| n == name).map(|(n, _, _)| n));
            if typed.is_some() {
                return typed;
            }
        }

        node.first_link().map(|(name, _, _)| name)
    }
}

/// Read-only table of node definitions keyed by class type.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    definitions: HashMap<&'static str, NodeDefinition>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in definitions.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        loaders::register(&mut registry);
        sampling::register(&mut registry);
        conditioning::register(&mut registry);
        latents::register(&mut registry);
        routing::register(&mut registry);
        registry
    }

    /// Process-wide registry, built on first use.
    pub fn global() -> &'static NodeRegistry {
        &GLOBAL
    }

    /// Register a definition, replacing any earlier one for the same class type.
    pub fn register(
        &mut self,
        definition: NodeDefinition,
    ) {
        self.definitions.insert(definition.class_type, definition);
    }

    pub fn get(
        &self,
        class_type: &str,
    ) -> Option<&NodeDefinition> {
        self.definitions.get(class_type)
    }

    pub fn contains(
        &self,
        class_type: &str,
    ) -> bool {
        self.definitions.contains_key(class_type)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::ApiNodeModel;

    fn api_node(value: Value) -> ParserNode {
        ParserNode::from_api("1".into(), &ApiNodeModel::from_value_lenient(&value))
    }

    #[test]
    fn test_builtin_coverage() {
        let registry = NodeRegistry::global();
        for class_type in [
            "CheckpointLoaderSimple",
            "UNETLoader",
            "VAELoader",
            "LoraLoader",
            "LoraLoaderModelOnly",
            "Power Lora Loader (rgthree)",
            "KSampler",
            "KSamplerAdvanced",
            "SamplerCustom",
            "SamplerCustomAdvanced",
            "CFGGuider",
            "BasicGuider",
            "DualCFGGuider",
            "RandomNoise",
            "BasicScheduler",
            "KSamplerSelect",
            "FluxGuidance",
            "CLIPTextEncode",
            "CLIPTextEncodeSDXL",
            "CLIPTextEncodeFlux",
            "ConditioningCombine",
            "ConditioningConcat",
            "StringConcatenate",
            "EmptyLatentImage",
            "VAEDecode",
            "SaveImage",
            "PreviewImage",
            "Reroute",
            "PrimitiveNode",
            "ImpactSwitch",
            "CR Text Input Switch",
        ] {
            assert!(registry.contains(class_type), "{} is not registered", class_type);
        }
        assert!(!registry.contains("NoSuchNode"));
    }

    #[test]
    fn test_roles_and_widgets() {
        let registry = NodeRegistry::global();
        let save = registry.get("SaveImage").unwrap();
        assert!(save.has_role(NodeRole::Sink));
        assert_eq!(save.category, NodeCategory::Output);
        assert_eq!(registry.get("PreviewImage").unwrap().category, NodeCategory::Preview);

        let sampler = registry.get("KSampler").unwrap();
        assert_eq!(sampler.widget_index("steps"), Some(2));
        assert_eq!(sampler.widget_index("denoise"), Some(6));
        assert!(matches!(sampler.rule_for(ParamKey::Prompt), Some(ParamRule::Trace { input: "positive" })));

        let advanced = registry.get("KSamplerAdvanced").unwrap();
        assert_eq!(advanced.widget_index("noise_seed"), Some(1));
        assert!(advanced.rule_for(ParamKey::Denoise).is_none());

        assert!(matches!(registry.get("LoraLoader").unwrap().rule_for(ParamKey::Lora), Some(ParamRule::Widget { accumulate: true, .. })));
    }

    #[test]
    fn test_builder_replaces_rules() {
        let def = NodeDefinition::new("X", NodeCategory::Text).param(ParamKey::Prompt, ParamRule::widget("a")).param(ParamKey::Prompt, ParamRule::widget("b")).trace_all("in");
        assert_eq!(def.rules.len(), ParamKey::ALL.len());
        assert!(matches!(def.rule_for(ParamKey::Prompt), Some(ParamRule::Widget { name: "b", .. })));
        assert!(matches!(def.rule_for(ParamKey::Seed), Some(ParamRule::Trace { input: "in" })));
    }

    #[test]
    fn test_bypass_input() {
        let lora = NodeRegistry::global().get("LoraLoader").unwrap();
        let node = api_node(json!({"class_type": "LoraLoader", "inputs": {"clip": ["2", 1], "model": ["2", 0]}}));
        assert_eq!(lora.bypass_input(&node, Some(0)), Some("model"));
        assert_eq!(lora.bypass_input(&node, Some(1)), Some("clip"));

        let sampler = NodeRegistry::global().get("KSampler").unwrap();
        let node = api_node(json!({"class_type": "KSampler", "inputs": {"model": ["2", 0], "latent_image": ["5", 0]}}));
        assert_eq!(sampler.bypass_input(&node, Some(0)), Some("latent_image"));

        let reroute = NodeRegistry::global().get("Reroute").unwrap();
        let node = api_node(json!({"class_type": "Reroute", "inputs": {"input_0": ["7", 0]}}));
        assert_eq!(reroute.bypass_input(&node, Some(0)), Some("input_0"));
    }

    #[test]
    fn test_param_key_names() {
        assert_eq!(ParamKey::NegativePrompt.as_ref(), "negative_prompt");
        assert_eq!("cfg".parse::<ParamKey>().unwrap(), ParamKey::Cfg);
        assert!(ParamKey::Prompt.is_text());
        assert!(!ParamKey::Seed.is_text());
    }
}
