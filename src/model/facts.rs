use serde::{Deserialize, Serialize};

use crate::model::LoraEntry;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompts {
    pub positive: Option<String>,
    pub negative: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRefs {
    pub base: Option<String>,
    pub vae: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub cfg: Option<f64>,
    pub sampler_name: Option<String>,
    pub scheduler: Option<String>,
    pub denoise: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Structured output of ComfyUI graph interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFacts {
    pub prompts: Prompts,
    pub model: ModelRefs,
    pub loras: Vec<LoraEntry>,
    pub sampling: Sampling,
    pub dimensions: Dimensions,
}

impl WorkflowFacts {
    pub fn is_empty(&self) -> bool {
        *self == WorkflowFacts::default()
    }

    /// Fill every unresolved field from `other`.
    pub fn fill_missing(
        &mut self,
        other: &WorkflowFacts,
    ) {
        fill(&mut self.prompts.positive, &other.prompts.positive);
        fill(&mut self.prompts.negative, &other.prompts.negative);
        fill(&mut self.model.base, &other.model.base);
        fill(&mut self.model.vae, &other.model.vae);
        fill(&mut self.sampling.seed, &other.sampling.seed);
        fill(&mut self.sampling.steps, &other.sampling.steps);
        fill(&mut self.sampling.cfg, &other.sampling.cfg);
        fill(&mut self.sampling.sampler_name, &other.sampling.sampler_name);
        fill(&mut self.sampling.scheduler, &other.sampling.scheduler);
        fill(&mut self.sampling.denoise, &other.sampling.denoise);
        fill(&mut self.dimensions.width, &other.dimensions.width);
        fill(&mut self.dimensions.height, &other.dimensions.height);
        if self.loras.is_empty() {
            self.loras = other.loras.clone();
        }
    }
}

fn fill<T: Clone>(
    slot: &mut Option<T>,
    other: &Option<T>,
) {
    if slot.is_none() {
        *slot = other.clone();
    }
}
