//! Graph nodes of a ComfyUI workflow.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ApiNodeModel, UiNodeModel, id_to_string};

/// node id, as a string in both serialisations
pub type NodeId = String;

/// Execution mode of a node. ComfyUI stores it as an integer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeMode {
    #[default]
    Active,
    /// mode 2 ("never")
    Muted,
    /// mode 4
    Bypassed,
}

impl NodeMode {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(2) => NodeMode::Muted,
            Some(4) => NodeMode::Bypassed,
            _ => NodeMode::Active,
        }
    }

    pub fn is_skipped(&self) -> bool {
        !matches!(self, NodeMode::Active)
    }
}

/// One input of a node: either a literal baked into the graph or a reference
/// to another node's output slot.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Literal(Value),
    Link {
        node: NodeId,
        slot: u32,
    },
}

impl InputValue {
    /// API-format inputs reference other nodes as `["node_id", slot]`.
    pub fn from_api(value: &Value) -> Self {
        if let Value::Array(items) = value {
            if let [Value::String(node), slot] = items.as_slice() {
                if let Some(slot) = slot.as_u64() {
                    return InputValue::Link {
                        node: node.clone(),
                        slot: slot as u32,
                    };
                }
            }
        }
        InputValue::Literal(value.clone())
    }

    pub fn as_link(&self) -> Option<(&NodeId, u32)> {
        match self {
            InputValue::Link {
                node,
                slot,
            } => Some((node, *slot)),
            InputValue::Literal(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParserNode {
    pub id: NodeId,
    /// node type tag; empty for nodes whose type could not be read
    pub class_type: String,
    pub title: Option<String>,
    /// inputs in authored order
    pub inputs: Vec<(String, InputValue)>,
    /// positional widget values (UI format)
    pub widgets: Vec<Value>,
    pub mode: NodeMode,
}

impl ParserNode {
    pub fn from_api(
        id: NodeId,
        model: &ApiNodeModel,
    ) -> Self {
        Self {
            id,
            class_type: model.class_type.clone(),
            title: model.meta.as_ref().and_then(|m| m.title.clone()),
            inputs: model.inputs.iter().map(|(name, value)| (name.clone(), InputValue::from_api(value))).collect(),
            widgets: match &model.widgets_values {
                Some(Value::Array(values)) => values.clone(),
                _ => Vec::new(),
            },
            mode: NodeMode::from_code(model.mode),
        }
    }

    /// UI nodes carry their links by id; `resolve_link` maps a link id to its
    /// origin `(node, slot)`.
    pub fn from_ui(
        model: &UiNodeModel,
        resolve_link: impl Fn(i64) -> Option<(NodeId, u32)>,
    ) -> Option<Self> {
        let id = id_to_string(&model.id)?;

        let mut inputs = Vec::new();
        for (i, input) in model.inputs.iter().enumerate() {
            let Some((node, slot)) = input.link.and_then(&resolve_link) else {
                continue;
            };
            let name = match (&input.widget, input.name.is_empty()) {
                (Some(widget), _) if !widget.name.is_empty() => widget.name.clone(),
                (_, true) => format!("input_{}", i),
                _ => input.name.clone(),
            };
            inputs.push((name, InputValue::Link {
                node,
                slot,
            }));
        }

        let mut widgets = Vec::new();
        match &model.widgets_values {
            Some(Value::Array(values)) => widgets = values.clone(),
            // some custom nodes save widgets keyed by name
            Some(Value::Object(named)) => {
                for (name, value) in named {
                    if !inputs.iter().any(|(n, _)| n == name) {
                        inputs.push((name.clone(), InputValue::Literal(value.clone())));
                    }
                }
            }
            _ => {}
        }

        Some(Self {
            id,
            class_type: model.node_type.clone(),
            title: model.title.clone(),
            inputs,
            widgets,
            mode: NodeMode::from_code(model.mode),
        })
    }

    pub fn input(
        &self,
        name: &str,
    ) -> Option<&InputValue> {
        self.inputs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Literal input value, ignoring links and nulls.
    pub fn literal(
        &self,
        name: &str,
    ) -> Option<&Value> {
        match self.input(name)? {
            InputValue::Literal(Value::Null) => None,
            InputValue::Literal(v) => Some(v),
            InputValue::Link {
                ..
            } => None,
        }
    }

    pub fn link(
        &self,
        name: &str,
    ) -> Option<(&NodeId, u32)> {
        self.input(name)?.as_link()
    }

    /// All linked inputs in authored order.
    pub fn links(&self) -> impl Iterator<Item = (&str, &NodeId, u32)> {
        self.inputs.iter().filter_map(|(name, value)| value.as_link().map(|(node, slot)| (name.as_str(), node, slot)))
    }

    pub fn first_link(&self) -> Option<(&str, &NodeId, u32)> {
        self.links().next()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::UiInputModel;

    #[test]
    fn test_api_inputs() {
        let model: ApiNodeModel = serde_json::from_value(json!({
            "class_type": "KSampler",
            "inputs": {"seed": 5, "model": ["4", 0], "size": [512, 512]},
            "mode": 2,
            "_meta": {"title": "Sampler"}
        }))
        .unwrap();
        let node = ParserNode::from_api("3".into(), &model);
        assert_eq!(node.literal("seed"), Some(&json!(5)));
        assert_eq!(node.link("model"), Some((&"4".to_string(), 0)));
        assert_eq!(node.literal("size"), Some(&json!([512, 512])));
        assert_eq!(node.mode, NodeMode::Muted);
        assert_eq!(node.title.as_deref(), Some("Sampler"));
        assert_eq!(node.first_link().map(|(name, _, _)| name), Some("model"));
    }

    #[test]
    fn test_ui_inputs_and_converted_widgets() {
        let model = UiNodeModel {
            id: json!(7),
            node_type: "KSampler".into(),
            mode: Some(4),
            inputs: vec![
                UiInputModel {
                    name: "model".into(),
                    link: Some(1),
                    widget: None,
                },
                UiInputModel {
                    name: "positive".into(),
                    link: None,
                    widget: None,
                },
                UiInputModel {
                    name: "seed".into(),
                    link: Some(2),
                    widget: Some(crate::model::UiWidgetRef {
                        name: "seed".into(),
                    }),
                },
            ],
            widgets_values: Some(json!([1, "fixed", 20])),
            title: None,
        };
        let node = ParserNode::from_ui(&model, |link| Some((format!("n{}", link), 0))).unwrap();
        assert_eq!(node.id, "7");
        assert_eq!(node.mode, NodeMode::Bypassed);
        assert_eq!(node.links().count(), 2);
        assert_eq!(node.link("seed"), Some((&"n2".to_string(), 0)));
        assert!(node.input("positive").is_none());
        assert_eq!(node.widgets.len(), 3);
    }
}
