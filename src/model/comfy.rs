//! Serde models of the two ComfyUI workflow serialisations.
//!
//! The API format (`prompt` chunk) is an object keyed by node id. The UI
//! format (`workflow` chunk) carries a `nodes` array and a `links` table.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiNodeMeta {
    #[serde(default)]
    pub title: Option<String>,
}

/// A node of the API format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiNodeModel {
    #[serde(default)]
    pub class_type: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub widgets_values: Option<Value>,
    #[serde(default)]
    pub mode: Option<i64>,
    #[serde(default, rename = "_meta")]
    pub meta: Option<ApiNodeMeta>,
}

impl ApiNodeModel {
    /// Deserialize one node, degrading to an opaque node (class type only) when
    /// its shape is off.
    pub fn from_value_lenient(value: &Value) -> Self {
        match serde_json::from_value::<ApiNodeModel>(value.clone()) {
            Ok(node) => node,
            Err(_) => Self {
                class_type: value.get("class_type").and_then(Value::as_str).unwrap_or_default().to_string(),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiWidgetRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiInputModel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: Option<i64>,
    #[serde(default)]
    pub widget: Option<UiWidgetRef>,
}

/// A node of the UI format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiNodeModel {
    #[serde(default)]
    pub id: Value,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub mode: Option<i64>,
    #[serde(default)]
    pub inputs: Vec<UiInputModel>,
    #[serde(default)]
    pub widgets_values: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
}

/// A link of the UI format: `origin_id:origin_slot -> target_id:target_slot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiLinkModel {
    pub id: i64,
    pub origin_id: String,
    pub origin_slot: u32,
    pub target_id: String,
    pub target_slot: u32,
}

impl UiLinkModel {
    /// Links are arrays `[id, origin, origin_slot, target, target_slot, type]`
    /// in older exports and objects in newer ones.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) if items.len() >= 5 => Some(Self {
                id: items[0].as_i64()?,
                origin_id: id_to_string(&items[1])?,
                origin_slot: items[2].as_u64()? as u32,
                target_id: id_to_string(&items[3])?,
                target_slot: items[4].as_u64()? as u32,
            }),
            Value::Object(obj) => Some(Self {
                id: obj.get("id")?.as_i64()?,
                origin_id: id_to_string(obj.get("origin_id")?)?,
                origin_slot: obj.get("origin_slot")?.as_u64()? as u32,
                target_id: id_to_string(obj.get("target_id")?)?,
                target_slot: obj.get("target_slot")?.as_u64()? as u32,
            }),
            _ => None,
        }
    }
}

/// The UI format document. Nodes and links stay raw so one malformed entry
/// does not reject the whole workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiWorkflowModel {
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub links: Vec<Value>,
}

impl UiWorkflowModel {
    pub fn from_value(value: &Value) -> Option<Self> {
        let nodes = value.get("nodes")?.as_array()?;
        Some(Self {
            nodes: nodes.clone(),
            links: value.get("links").and_then(Value::as_array).cloned().unwrap_or_default(),
        })
    }

    pub fn node_models(&self) -> Vec<UiNodeModel> {
        self.nodes.iter().filter_map(|v| serde_json::from_value::<UiNodeModel>(v.clone()).ok()).collect()
    }

    pub fn link_models(&self) -> Vec<UiLinkModel> {
        self.links.iter().filter_map(UiLinkModel::from_value).collect()
    }
}

/// Node ids appear as strings in the API format and as integers in the UI format.
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => n.as_i64().map(|i| i.to_string()).or_else(|| Some(n.to_string())),
        _ => None,
    }
}
