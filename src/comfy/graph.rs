//! ComfyUI workflow as a directed graph.
//!
//! Both serialisations land in the same `DiGraph<ParserNode, Link>`, with an
//! id index on the side. Edges point from producer to consumer.

use std::collections::HashMap;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    GenmetaError, Result,
    comfy::{
        edge::Link,
        node::{NodeId, ParserNode},
    },
    detect,
    model::{ApiNodeModel, UiWorkflowModel},
};

#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    graph: DiGraph<ParserNode, Link>,
    index: HashMap<NodeId, NodeIndex>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the API format: an object keyed by node id.
    pub fn from_api(value: &Value) -> Result<Self> {
        let entries = value.as_object().ok_or_else(|| GenmetaError::Graph("api workflow is not an object".into()))?;

        let mut workflow = Self::new();
        for (id, entry) in entries {
            if !entry.is_object() {
                continue;
            }
            let model = ApiNodeModel::from_value_lenient(entry);
            workflow.add_node(ParserNode::from_api(id.clone(), &model));
        }
        workflow.link_inputs();
        Ok(workflow)
    }

    /// Build from the UI format: `nodes` plus a `links` table.
    pub fn from_ui(value: &Value) -> Result<Self> {
        let model = UiWorkflowModel::from_value(value).ok_or_else(|| GenmetaError::Graph("ui workflow has no nodes".into()))?;

        let links: HashMap<i64, (NodeId, u32)> = model.link_models().into_iter().map(|l| (l.id, (l.origin_id, l.origin_slot))).collect();

        let mut workflow = Self::new();
        for node in model.node_models() {
            match ParserNode::from_ui(&node, |id| links.get(&id).cloned()) {
                Some(node) => {
                    workflow.add_node(node);
                }
                None => debug!("skipping ui node without an id: {}", node.node_type),
            }
        }
        workflow.link_inputs();
        Ok(workflow)
    }

    /// Output a human-readable representation of the workflow graph
    pub fn schema(&self) -> String {
        let graph = &self.graph;
        let mut lines = Vec::new();

        lines.push("=== Workflow Graph ===".to_string());
        lines.push(format!("Nodes: {}, Edges: {}", graph.node_count(), graph.edge_count()));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for idx in graph.node_indices() {
            let node = &graph[idx];
            lines.push(format!("[{}] {} (type: {}, mode: {})", node.id, node.title.as_deref().unwrap_or(""), node.class_type, node.mode.as_ref()));
        }
        lines.push(String::new());

        lines.push("--- Edges ---".to_string());
        for edge in graph.edge_references() {
            let link = edge.weight();
            lines.push(format!("{}:{} --> {}.{}", graph[edge.source()].id, link.slot, graph[edge.target()].id, link.input));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for idx in graph.node_indices() {
            let node = &graph[idx];
            let consumers: Vec<String> = graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| format!("{}({})", graph[e.target()].id, e.weight().input))
                .collect();

            if consumers.is_empty() {
                lines.push(format!("{} -> (end)", node.id));
            } else {
                lines.push(format!("{} -> {}", node.id, consumers.join(", ")));
            }
        }

        lines.join("\n")
    }

    /// Add a node. A node whose id is already present replaces nothing and is dropped.
    pub fn add_node(
        &mut self,
        node: ParserNode,
    ) -> Option<NodeIndex> {
        if self.index.contains_key(&node.id) {
            debug!("duplicate node id {}", node.id);
            return None;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        Some(idx)
    }

    /// Turn every linked input into an edge. Links to nodes that are not in
    /// the graph stay on the node and resolve to nothing later.
    fn link_inputs(&mut self) {
        let mut edges = Vec::new();
        for target in self.graph.node_indices() {
            for (input, source, slot) in self.graph[target].links() {
                match self.index.get(source) {
                    Some(source) => edges.push((*source, target, Link {
                        input: input.to_string(),
                        slot,
                    })),
                    None => debug!("node {} input {} links to missing node {}", self.graph[target].id, input, source),
                }
            }
        }
        for (source, target, link) in edges {
            self.graph.add_edge(source, target, link);
        }
    }

    pub fn node(
        &self,
        id: &str,
    ) -> Option<&ParserNode> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ParserNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether no other node consumes any output of `id`.
    pub fn is_leaf(
        &self,
        id: &str,
    ) -> bool {
        self.index.get(id).map(|idx| self.graph.neighbors_directed(*idx, Direction::Outgoing).next().is_none()).unwrap_or(false)
    }
}

impl TryFrom<&Value> for WorkflowGraph {
    type Error = GenmetaError;

    fn try_from(value: &Value) -> Result<Self> {
        if detect::is_comfy_ui(value) {
            Self::from_ui(value)
        } else if detect::is_comfy_api(value) {
            Self::from_api(value)
        } else {
            Err(GenmetaError::Graph("not a comfyui workflow".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::comfy::node::NodeMode;

    #[test]
    fn test_api_graph() {
        let value = json!({
            "4": {"class_type": "CheckpointLoaderSimple", "inputs": {"ckpt_name": "sd15.safetensors"}},
            "3": {"class_type": "KSampler", "inputs": {"seed": 1, "model": ["4", 0], "positive": ["6", 0]}},
            "9": {"class_type": "SaveImage", "inputs": {"images": ["3", 0]}}
        });
        let graph = WorkflowGraph::try_from(&value).unwrap();
        assert_eq!(graph.node_count(), 3);
        // "6" is missing, its link yields no edge
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.is_leaf("9"));
        assert!(!graph.is_leaf("4"));
        assert_eq!(graph.nodes().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["4", "3", "9"]);
        assert!(graph.node("3").unwrap().link("positive").is_some());
    }

    #[test]
    fn test_ui_graph() {
        let value = json!({
            "nodes": [
                {"id": 4, "type": "CheckpointLoaderSimple", "widgets_values": ["sd15.safetensors"]},
                {"id": 3, "type": "KSampler", "mode": 2, "inputs": [{"name": "model", "link": 1}], "widgets_values": [1, "fixed", 20, 7, "euler", "normal", 1]},
                {"type": "Note"}
            ],
            "links": [[1, 4, 0, 3, 0, "MODEL"]]
        });
        let graph = WorkflowGraph::try_from(&value).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node("3").unwrap().mode, NodeMode::Muted);
        assert_eq!(graph.node("3").unwrap().link("model"), Some((&"4".to_string(), 0)));
    }

    #[test]
    fn test_schema() {
        let value = json!({
            "1": {"class_type": "EmptyLatentImage", "inputs": {"width": 512, "height": 512}},
            "2": {"class_type": "SaveImage", "inputs": {"images": ["1", 0]}, "_meta": {"title": "Save"}}
        });
        let schema = WorkflowGraph::try_from(&value).unwrap().schema();
        assert!(schema.starts_with("=== Workflow Graph ==="));
        assert!(schema.contains("Nodes: 2, Edges: 1"));
        assert!(schema.contains("[2] Save (type: SaveImage, mode: active)"));
        assert!(schema.contains("1:0 --> 2.images"));
        assert!(schema.contains("1 -> 2(images)"));
        assert!(schema.contains("2 -> (end)"));
    }

    #[test]
    fn test_not_a_workflow() {
        assert!(WorkflowGraph::try_from(&json!({"a": 1})).is_err());
        assert!(WorkflowGraph::from_ui(&json!({"links": []})).is_err());
    }
}
