//! Text encoders, conditioning operations and string nodes.

use super::{
    NodeCategory, NodeDefinition, NodeRegistry,
    NodeRole::{Source, Transform},
    ParamKey::{Cfg, NegativePrompt, Prompt},
    ParamRule, custom,
};

const PROMPTS: &[super::ParamKey] = &[Prompt, NegativePrompt];

pub(super) fn register(registry: &mut NodeRegistry) {
    // encoders with a single text widget
    let encoders: &[(&'static str, &[&'static str])] = &[
        ("CLIPTextEncode", &["text"]),
        ("CLIPTextEncodeSDXLRefiner", &["ascore", "width", "height", "text"]),
        ("BNK_CLIPTextEncodeAdvanced", &["text", "token_normalization", "weight_interpretation"]),
        ("CLIPTextEncodeHunyuanDiT", &["bert", "mt5xl"]),
    ];
    for &(class_type, widgets) in encoders {
        let text = if widgets.contains(&"text") { "text" } else { widgets[0] };
        registry.register(NodeDefinition::new(class_type, NodeCategory::Conditioning).role(Source).inputs(&[("clip", "CLIP")]).outputs(&["CONDITIONING"]).widgets(widgets).params(PROMPTS, ParamRule::widget(text)));
    }

    registry.register(
        NodeDefinition::new("CLIPTextEncodeSDXL", NodeCategory::Conditioning)
            .role(Source)
            .inputs(&[("clip", "CLIP")])
            .outputs(&["CONDITIONING"])
            .widgets(&["width", "height", "crop_w", "crop_h", "target_width", "target_height", "text_g", "text_l"])
            .params(PROMPTS, ParamRule::Custom(custom::sdxl_text)),
    );
    registry.register(
        NodeDefinition::new("CLIPTextEncodeFlux", NodeCategory::Conditioning)
            .role(Source)
            .inputs(&[("clip", "CLIP")])
            .outputs(&["CONDITIONING"])
            .widgets(&["clip_l", "t5xxl", "guidance"])
            .params(PROMPTS, ParamRule::Custom(custom::flux_text))
            .param(Cfg, ParamRule::widget("guidance")),
    );
    registry.register(
        NodeDefinition::new("CLIPTextEncodeSD3", NodeCategory::Conditioning)
            .role(Source)
            .inputs(&[("clip", "CLIP")])
            .outputs(&["CONDITIONING"])
            .widgets(&["clip_l", "clip_g", "t5xxl", "empty_padding"])
            .params(PROMPTS, ParamRule::Custom(custom::sd3_text)),
    );

    registry.register(
        NodeDefinition::new("FluxGuidance", NodeCategory::Conditioning)
            .role(Transform)
            .inputs(&[("conditioning", "CONDITIONING")])
            .outputs(&["CONDITIONING"])
            .widgets(&["guidance"])
            .param(Cfg, ParamRule::widget("guidance"))
            .params(PROMPTS, ParamRule::trace("conditioning"))
            .pass_through("conditioning", 0),
    );

    registry.register(
        NodeDefinition::new("ConditioningCombine", NodeCategory::Conditioning)
            .role(Transform)
            .inputs(&[("conditioning_1", "CONDITIONING"), ("conditioning_2", "CONDITIONING")])
            .outputs(&["CONDITIONING"])
            .params(PROMPTS, ParamRule::Custom(custom::combine_conditioning))
            .param(Cfg, ParamRule::trace("conditioning_1"))
            .pass_through("conditioning_1", 0),
    );
    for class_type in ["ConditioningConcat", "ConditioningAverage"] {
        registry.register(
            NodeDefinition::new(class_type, NodeCategory::Conditioning)
                .role(Transform)
                .inputs(&[("conditioning_to", "CONDITIONING"), ("conditioning_from", "CONDITIONING")])
                .outputs(&["CONDITIONING"])
                .params(PROMPTS, ParamRule::Custom(custom::concat_conditioning))
                .param(Cfg, ParamRule::trace("conditioning_to"))
                .pass_through("conditioning_to", 0),
        );
    }

    // single-conditioning modifiers: prompts and guidance pass straight through
    let modifiers: &[(&'static str, &[&'static str])] = &[
        ("ConditioningSetArea", &["width", "height", "x", "y", "strength"]),
        ("ConditioningSetAreaPercentage", &["width", "height", "x", "y", "strength"]),
        ("ConditioningSetMask", &["strength", "set_cond_area"]),
        ("ConditioningSetTimestepRange", &["start", "end"]),
        ("ControlNetApply", &["strength"]),
    ];
    for &(class_type, widgets) in modifiers {
        registry.register(
            NodeDefinition::new(class_type, NodeCategory::Conditioning)
                .role(Transform)
                .inputs(&[("conditioning", "CONDITIONING")])
                .outputs(&["CONDITIONING"])
                .widgets(widgets)
                .params(&[Prompt, NegativePrompt, Cfg], ParamRule::trace("conditioning"))
                .pass_through("conditioning", 0),
        );
    }
    registry.register(
        NodeDefinition::new("ControlNetApplyAdvanced", NodeCategory::Conditioning)
            .role(Transform)
            .inputs(&[("positive", "CONDITIONING"), ("negative", "CONDITIONING"), ("control_net", "CONTROL_NET"), ("image", "IMAGE")])
            .outputs(&["CONDITIONING", "CONDITIONING"])
            .widgets(&["strength", "start_percent", "end_percent"])
            .params(&[Prompt, Cfg], ParamRule::trace("positive"))
            .param(NegativePrompt, ParamRule::trace("negative"))
            .pass_through("positive", 0)
            .pass_through("negative", 1),
    );
    // an empty negative, not a prompt
    registry.register(NodeDefinition::new("ConditioningZeroOut", NodeCategory::Conditioning).role(Transform).inputs(&[("conditioning", "CONDITIONING")]).outputs(&["CONDITIONING"]));

    let concatenators: &[(&'static str, &[&'static str])] = &[
        ("StringConcatenate", &["string_a", "string_b", "delimiter"]),
        ("Text Concatenate", &["delimiter", "clean_whitespace"]),
        ("JoinStrings", &["string1", "string2", "delimiter"]),
        ("CR Text Concatenate", &["text1", "text2", "separator"]),
    ];
    for &(class_type, widgets) in concatenators {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Text).role(Transform).outputs(&["STRING"]).widgets(widgets).params(PROMPTS, ParamRule::Custom(custom::concat_strings)));
    }

    let texts: &[(&'static str, &'static str)] = &[("Text Multiline", "text"), ("CR Text", "text"), ("String Literal", "string"), ("PrimitiveString", "value"), ("PrimitiveStringMultiline", "value")];
    for &(class_type, widget) in texts {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Text).role(Source).outputs(&["STRING"]).widgets(&[widget]).params(&super::ParamKey::ALL, ParamRule::input(widget)));
    }
}
