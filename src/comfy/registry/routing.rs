//! Reroutes, primitives and switches.

use super::{
    NodeCategory, NodeDefinition, NodeRegistry,
    NodeRole::{Routing, Source},
    ParamKey, ParamRule,
};

pub(super) fn register(registry: &mut NodeRegistry) {
    for class_type in ["Reroute", "Any Switch (rgthree)", "Reroute (rgthree)"] {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Routing).role(Routing).pass_through_first());
    }

    // UI-only widget holders; whatever they hold is what the consumer asked for
    let primitives: &[(&'static str, &[&'static str])] = &[
        ("PrimitiveNode", &["value", "control_after_generate"]),
        ("PrimitiveInt", &["value"]),
        ("PrimitiveFloat", &["value"]),
        ("Int Literal", &["int"]),
        ("Float Literal", &["float"]),
        ("Seed (rgthree)", &["seed"]),
        ("CR Seed", &["seed"]),
    ];
    for &(class_type, widgets) in primitives {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Primitive).role(Source).widgets(widgets).params(&ParamKey::ALL, ParamRule::input(widgets[0])));
    }

    registry.register(NodeDefinition::new("ImpactSwitch", NodeCategory::Routing).widgets(&["select", "sel_mode"]).routing("select", "input"));
    let switches: &[(&'static str, &'static str)] = &[
        ("CR Text Input Switch", "text"),
        ("CR Model Input Switch", "model"),
        ("CR Conditioning Input Switch", "conditioning"),
        ("CR Latent Input Switch", "latent"),
        ("CR Image Input Switch", "image"),
    ];
    for &(class_type, prefix) in switches {
        registry.register(NodeDefinition::new(class_type, NodeCategory::Routing).widgets(&["Input"]).routing("Input", prefix));
    }
}
