//! Samplers, guiders, noise sources and schedulers.

use super::{
    NodeCategory, NodeDefinition, NodeRegistry,
    NodeRole::{Source, Transform},
    ParamKey::*,
    ParamRule, custom,
};

pub(super) fn register(registry: &mut NodeRegistry) {
    registry.register(
        NodeDefinition::new("KSampler", NodeCategory::Sampler)
            .role(Transform)
            .inputs(&[("model", "MODEL"), ("positive", "CONDITIONING"), ("negative", "CONDITIONING"), ("latent_image", "LATENT")])
            .outputs(&["LATENT"])
            .widgets(&["seed", "control_after_generate", "steps", "cfg", "sampler_name", "scheduler", "denoise"])
            .param(Seed, ParamRule::widget("seed"))
            .param(Steps, ParamRule::widget("steps"))
            .param(Cfg, ParamRule::widget("cfg"))
            .param(Sampler, ParamRule::widget("sampler_name"))
            .param(Scheduler, ParamRule::widget("scheduler"))
            .param(Denoise, ParamRule::widget("denoise"))
            .param(Prompt, ParamRule::trace("positive"))
            .param(NegativePrompt, ParamRule::trace("negative"))
            .params(&[Model, Lora], ParamRule::trace("model"))
            .params(&[Width, Height], ParamRule::trace("latent_image"))
            .pass_through("latent_image", 0),
    );

    registry.register(
        NodeDefinition::new("KSamplerAdvanced", NodeCategory::Sampler)
            .role(Transform)
            .inputs(&[("model", "MODEL"), ("positive", "CONDITIONING"), ("negative", "CONDITIONING"), ("latent_image", "LATENT")])
            .outputs(&["LATENT"])
            .widgets(&["add_noise", "noise_seed", "control_after_generate", "steps", "cfg", "sampler_name", "scheduler", "start_at_step", "end_at_step", "return_with_leftover_noise"])
            .param(Seed, ParamRule::widget("noise_seed"))
            .param(Steps, ParamRule::widget("steps"))
            .param(Cfg, ParamRule::widget("cfg"))
            .param(Sampler, ParamRule::widget("sampler_name"))
            .param(Scheduler, ParamRule::widget("scheduler"))
            .param(Prompt, ParamRule::trace("positive"))
            .param(NegativePrompt, ParamRule::trace("negative"))
            .params(&[Model, Lora], ParamRule::trace("model"))
            .params(&[Width, Height], ParamRule::trace("latent_image"))
            .pass_through("latent_image", 0),
    );

    registry.register(
        NodeDefinition::new("SamplerCustom", NodeCategory::Sampler)
            .role(Transform)
            .inputs(&[("model", "MODEL"), ("positive", "CONDITIONING"), ("negative", "CONDITIONING"), ("sampler", "SAMPLER"), ("sigmas", "SIGMAS"), ("latent_image", "LATENT")])
            .outputs(&["LATENT", "LATENT"])
            .widgets(&["add_noise", "noise_seed", "control_after_generate", "cfg"])
            .param(Seed, ParamRule::widget("noise_seed"))
            .param(Cfg, ParamRule::widget("cfg"))
            .param(Sampler, ParamRule::trace("sampler"))
            .params(&[Steps, Scheduler, Denoise], ParamRule::trace("sigmas"))
            .param(Prompt, ParamRule::trace("positive"))
            .param(NegativePrompt, ParamRule::trace("negative"))
            .params(&[Model, Lora], ParamRule::trace("model"))
            .params(&[Width, Height], ParamRule::trace("latent_image"))
            .pass_through("latent_image", 0)
            .pass_through("latent_image", 1),
    );

    registry.register(
        NodeDefinition::new("SamplerCustomAdvanced", NodeCategory::Sampler)
            .role(Transform)
            .inputs(&[("noise", "NOISE"), ("guider", "GUIDER"), ("sampler", "SAMPLER"), ("sigmas", "SIGMAS"), ("latent_image", "LATENT")])
            .outputs(&["LATENT", "LATENT"])
            .param(Seed, ParamRule::trace("noise"))
            .params(&[Cfg, Prompt, NegativePrompt, Model, Lora], ParamRule::trace("guider"))
            .param(Sampler, ParamRule::trace("sampler"))
            .params(&[Steps, Scheduler, Denoise], ParamRule::trace("sigmas"))
            .params(&[Width, Height], ParamRule::trace("latent_image"))
            .pass_through("latent_image", 0)
            .pass_through("latent_image", 1),
    );

    registry.register(
        NodeDefinition::new("CFGGuider", NodeCategory::Guider)
            .role(Transform)
            .inputs(&[("model", "MODEL"), ("positive", "CONDITIONING"), ("negative", "CONDITIONING")])
            .outputs(&["GUIDER"])
            .widgets(&["cfg"])
            .param(Cfg, ParamRule::widget("cfg"))
            .param(Prompt, ParamRule::trace("positive"))
            .param(NegativePrompt, ParamRule::trace("negative"))
            .params(&[Model, Lora], ParamRule::trace("model")),
    );
    // flux: guidance lives on a FluxGuidance node in the conditioning chain
    registry.register(
        NodeDefinition::new("BasicGuider", NodeCategory::Guider)
            .role(Transform)
            .inputs(&[("model", "MODEL"), ("conditioning", "CONDITIONING")])
            .outputs(&["GUIDER"])
            .params(&[Prompt, Cfg], ParamRule::trace("conditioning"))
            .params(&[Model, Lora], ParamRule::trace("model")),
    );
    registry.register(
        NodeDefinition::new("DualCFGGuider", NodeCategory::Guider)
            .role(Transform)
            .inputs(&[("model", "MODEL"), ("cond1", "CONDITIONING"), ("cond2", "CONDITIONING"), ("negative", "CONDITIONING")])
            .outputs(&["GUIDER"])
            .widgets(&["cfg_conds", "cfg_cond2_negative", "style"])
            .param(Cfg, ParamRule::widget("cfg_conds"))
            .param(Prompt, ParamRule::Custom(custom::dual_guider_prompt))
            .param(NegativePrompt, ParamRule::trace("negative"))
            .params(&[Model, Lora], ParamRule::trace("model")),
    );

    registry.register(NodeDefinition::new("RandomNoise", NodeCategory::Noise).role(Source).outputs(&["NOISE"]).widgets(&["noise_seed", "control_after_generate"]).param(Seed, ParamRule::widget("noise_seed")));
    registry.register(NodeDefinition::new("DisableNoise", NodeCategory::Noise).role(Source).outputs(&["NOISE"]));

    registry.register(NodeDefinition::new("KSamplerSelect", NodeCategory::Scheduler).role(Source).outputs(&["SAMPLER"]).widgets(&["sampler_name"]).param(Sampler, ParamRule::widget("sampler_name")));

    registry.register(
        NodeDefinition::new("BasicScheduler", NodeCategory::Scheduler)
            .role(Transform)
            .inputs(&[("model", "MODEL")])
            .outputs(&["SIGMAS"])
            .widgets(&["scheduler", "steps", "denoise"])
            .param(Scheduler, ParamRule::widget("scheduler"))
            .param(Steps, ParamRule::widget("steps"))
            .param(Denoise, ParamRule::widget("denoise")),
    );
    registry.register(
        NodeDefinition::new("SDTurboScheduler", NodeCategory::Scheduler)
            .role(Transform)
            .inputs(&[("model", "MODEL")])
            .outputs(&["SIGMAS"])
            .widgets(&["steps", "denoise"])
            .param(Steps, ParamRule::widget("steps"))
            .param(Denoise, ParamRule::widget("denoise")),
    );
    registry.register(
        NodeDefinition::new("AlignYourStepsScheduler", NodeCategory::Scheduler)
            .role(Source)
            .outputs(&["SIGMAS"])
            .widgets(&["model_type", "steps", "denoise"])
            .param(Steps, ParamRule::widget("steps"))
            .param(Denoise, ParamRule::widget("denoise")),
    );
    registry.register(NodeDefinition::new("KarrasScheduler", NodeCategory::Scheduler).role(Source).outputs(&["SIGMAS"]).widgets(&["steps", "sigma_max", "sigma_min", "rho"]).param(Steps, ParamRule::widget("steps")));
}
