//! Latent sources, VAE decode, image operations and output nodes.

use super::{
    NodeCategory, NodeDefinition, NodeRegistry,
    NodeRole::{Sink, Source, Transform},
    ParamKey::{Height, Vae, Width},
    ParamRule, custom,
};

pub(super) fn register(registry: &mut NodeRegistry) {
    let empties: &[(&'static str, &[&'static str])] = &[
        ("EmptyLatentImage", &["width", "height", "batch_size"]),
        ("EmptySD3LatentImage", &["width", "height", "batch_size"]),
        ("EmptyHunyuanLatentVideo", &["width", "height", "length", "batch_size"]),
        ("EmptyLTXVLatentVideo", &["width", "height", "length", "batch_size"]),
    ];
    for &(class_type, widgets) in empties {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Latent).role(Source).outputs(&["LATENT"]).widgets(widgets).param(Width, ParamRule::widget("width")).param(Height, ParamRule::widget("height")));
    }

    registry.register(
        NodeDefinition::new("LatentUpscale", NodeCategory::Latent)
            .role(Transform)
            .inputs(&[("samples", "LATENT")])
            .outputs(&["LATENT"])
            .widgets(&["upscale_method", "width", "height", "crop"])
            .param(Width, ParamRule::widget("width"))
            .param(Height, ParamRule::widget("height"))
            .pass_through("samples", 0),
    );
    registry.register(
        NodeDefinition::new("LatentUpscaleBy", NodeCategory::Latent)
            .role(Transform)
            .inputs(&[("samples", "LATENT")])
            .outputs(&["LATENT"])
            .widgets(&["upscale_method", "scale_by"])
            .params(&[Width, Height], ParamRule::Custom(custom::scaled_dimension))
            .pass_through("samples", 0),
    );

    for class_type in ["VAEDecode", "VAEDecodeTiled"] {
        registry.register(
            NodeDefinition::new(class_type, NodeCategory::Latent)
                .role(Transform)
                .inputs(&[("samples", "LATENT"), ("vae", "VAE")])
                .outputs(&["IMAGE"])
                .widgets(&["tile_size", "overlap", "temporal_size", "temporal_overlap"])
                .param(Vae, ParamRule::trace("vae"))
                .trace_all("samples"),
        );
    }

    // image-space post-processing keeps the generation's parameters
    let image_ops: &[(&'static str, &[&'static str])] = &[
        ("ImageUpscaleWithModel", &[]),
        ("ImageScale", &["upscale_method", "width", "height", "crop"]),
        ("ImageScaleBy", &["upscale_method", "scale_by"]),
        ("ImageSharpen", &["sharpen_radius", "sigma", "alpha"]),
    ];
    for &(class_type, widgets) in image_ops {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Image).role(Transform).inputs(&[("image", "IMAGE")]).outputs(&["IMAGE"]).widgets(widgets).trace_all("image").pass_through("image", 0));
    }

    let saves: &[(&'static str, &[&'static str])] = &[
        ("SaveImage", &["filename_prefix"]),
        ("Image Save", &["output_path", "filename_prefix"]),
        ("SaveImageWebsocket", &[]),
        ("SaveAnimatedWEBP", &["filename_prefix", "fps", "lossless", "quality", "method"]),
        ("VHS_VideoCombine", &[]),
    ];
    for &(class_type, widgets) in saves {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Output).role(Sink).inputs(&[("images", "IMAGE")]).widgets(widgets).trace_all("images"));
    }
    for class_type in ["PreviewImage", "PreviewBridge"] {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Preview).role(Sink).inputs(&[("images", "IMAGE")]).trace_all("images"));
    }
}
