use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::FormatFamily;

/// One LoRA applied during generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoraEntry {
    pub name: String,
    pub model_strength: Option<f64>,
    pub clip_strength: Option<f64>,
}

impl LoraEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_strength(
        mut self,
        model_strength: Option<f64>,
        clip_strength: Option<f64>,
    ) -> Self {
        self.model_strength = model_strength;
        self.clip_strength = clip_strength;
        self
    }
}

/// The canonical, format-agnostic metadata record.
///
/// Every field is optional: `None` means "not resolved", not "absent in the
/// image". This is the only type handed to UI and storage consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub generator: Option<FormatFamily>,
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub model: Option<String>,
    pub vae: Option<String>,
    #[serde(default)]
    pub loras: Vec<LoraEntry>,
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub cfg: Option<f64>,
    pub sampler: Option<String>,
    pub scheduler: Option<String>,
    pub denoise: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl MetadataRecord {
    pub fn for_family(family: FormatFamily) -> Self {
        Self {
            generator: Some(family),
            ..Default::default()
        }
    }

    /// True when no generation field was resolved. `generator` and `extra` do not count.
    pub fn is_empty(&self) -> bool {
        self.prompt.is_none()
            && self.negative_prompt.is_none()
            && self.model.is_none()
            && self.vae.is_none()
            && self.loras.is_empty()
            && self.seed.is_none()
            && self.steps.is_none()
            && self.cfg.is_none()
            && self.sampler.is_none()
            && self.scheduler.is_none()
            && self.denoise.is_none()
            && self.width.is_none()
            && self.height.is_none()
    }

    /// Fill every unresolved field from a lower-priority record. `generator`
    /// stays as is unless unset; `extra` only gains keys it lacks.
    pub fn merge_missing(
        &mut self,
        lower: &MetadataRecord,
    ) {
        fill(&mut self.generator, &lower.generator);
        fill(&mut self.prompt, &lower.prompt);
        fill(&mut self.negative_prompt, &lower.negative_prompt);
        fill(&mut self.model, &lower.model);
        fill(&mut self.vae, &lower.vae);
        fill(&mut self.seed, &lower.seed);
        fill(&mut self.steps, &lower.steps);
        fill(&mut self.cfg, &lower.cfg);
        fill(&mut self.sampler, &lower.sampler);
        fill(&mut self.scheduler, &lower.scheduler);
        fill(&mut self.denoise, &lower.denoise);
        fill(&mut self.width, &lower.width);
        fill(&mut self.height, &lower.height);
        if self.loras.is_empty() {
            self.loras = lower.loras.clone();
        }
        for (key, value) in &lower.extra {
            self.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

fn fill<T: Clone>(
    slot: &mut Option<T>,
    lower: &Option<T>,
) {
    if slot.is_none() {
        *slot = lower.clone();
    }
}
