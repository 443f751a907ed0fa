//! Checkpoint, UNET, VAE and LoRA loaders plus model patches.

use super::{
    NodeCategory, NodeDefinition, NodeRegistry,
    NodeRole::{Source, Transform},
    ParamKey::{Lora, Model, Vae},
    ParamRule, custom,
};

pub(super) fn register(registry: &mut NodeRegistry) {
    let checkpoints: &[(&'static str, &[&'static str])] = &[
        ("CheckpointLoaderSimple", &["ckpt_name"]),
        ("CheckpointLoader", &["config_name", "ckpt_name"]),
        ("unCLIPCheckpointLoader", &["ckpt_name"]),
        ("ImageOnlyCheckpointLoader", &["ckpt_name"]),
        ("CheckpointLoader|pysssss", &["ckpt_name"]),
    ];
    for &(class_type, widgets) in checkpoints {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Loader).role(Source).outputs(&["MODEL", "CLIP", "VAE"]).widgets(widgets).param(Model, ParamRule::widget("ckpt_name")));
    }

    let unets: &[(&'static str, &[&'static str])] = &[("UNETLoader", &["unet_name", "weight_dtype"]), ("UnetLoaderGGUF", &["unet_name"]), ("UnetLoaderGGUFAdvanced", &["unet_name", "dequant_dtype", "patch_dtype", "patch_on_device"])];
    for &(class_type, widgets) in unets {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Loader).role(Source).outputs(&["MODEL"]).widgets(widgets).param(Model, ParamRule::widget("unet_name")));
    }

    registry.register(NodeDefinition::new("VAELoader", NodeCategory::Loader).role(Source).outputs(&["VAE"]).widgets(&["vae_name"]).param(Vae, ParamRule::widget("vae_name")));

    registry.register(
        NodeDefinition::new("LoraLoader", NodeCategory::Loader)
            .role(Transform)
            .inputs(&[("model", "MODEL"), ("clip", "CLIP")])
            .outputs(&["MODEL", "CLIP"])
            .widgets(&["lora_name", "strength_model", "strength_clip"])
            .param(Lora, ParamRule::accumulate("lora_name"))
            .param(Model, ParamRule::trace("model"))
            .pass_through("model", 0)
            .pass_through("clip", 1),
    );
    registry.register(
        NodeDefinition::new("LoraLoaderModelOnly", NodeCategory::Loader)
            .role(Transform)
            .inputs(&[("model", "MODEL")])
            .outputs(&["MODEL"])
            .widgets(&["lora_name", "strength_model"])
            .param(Lora, ParamRule::accumulate("lora_name"))
            .param(Model, ParamRule::trace("model"))
            .pass_through("model", 0),
    );
    registry.register(
        NodeDefinition::new("Power Lora Loader (rgthree)", NodeCategory::Loader)
            .role(Transform)
            .inputs(&[("model", "MODEL"), ("clip", "CLIP")])
            .outputs(&["MODEL", "CLIP"])
            .param(Lora, ParamRule::Custom(custom::power_lora))
            .param(Model, ParamRule::trace("model"))
            .pass_through("model", 0)
            .pass_through("clip", 1),
    );

    // model patches sit between the loader and the sampler
    let patches: &[(&'static str, &[&'static str])] = &[
        ("ModelSamplingDiscrete", &["sampling", "zsnr"]),
        ("ModelSamplingSD3", &["shift"]),
        ("ModelSamplingAuraFlow", &["shift"]),
        ("ModelSamplingFlux", &["max_shift", "base_shift", "width", "height"]),
        ("FreeU_V2", &["b1", "b2", "s1", "s2"]),
        ("PerturbedAttentionGuidance", &["scale"]),
        ("DifferentialDiffusion", &[]),
    ];
    for &(class_type, widgets) in patches {
        registry.register(
            NodeDefinition::new(class_type, NodeCategory::Patch)
                .role(Transform)
                .inputs(&[("model", "MODEL")])
                .outputs(&["MODEL"])
                .widgets(widgets)
                .params(&[Model, Lora], ParamRule::trace("model"))
                .pass_through("model", 0),
        );
    }

    registry.register(NodeDefinition::new("CLIPSetLastLayer", NodeCategory::Patch).role(Transform).inputs(&[("clip", "CLIP")]).outputs(&["CLIP"]).widgets(&["stop_at_clip_layer"]).pass_through("clip", 0));
}
