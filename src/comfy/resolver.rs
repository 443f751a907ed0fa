//! Upstream parameter resolution.
//!
//! Resolution starts at an output node and walks links towards the sources,
//! asking the registry at every node how the parameter is read there. Each
//! resolution call owns a visited set, so cycles end the walk instead of
//! looping. Two ceilings bound pathological chains: `max_depth` counts
//! resolution steps, where reroute hops are free, and a hop ceiling of twice
//! that counts every node on the current path.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    Config,
    config::MAX_DEPTH,
    comfy::{
        graph::WorkflowGraph,
        node::{InputValue, NodeId, ParserNode},
        registry::{ConditionalRouting, NodeCategory, NodeDefinition, NodeRegistry, NodeRole, ParamKey, ParamRule},
        seed,
    },
};

/// Literal inputs a primitive-like node keeps its value in.
const SCALAR_INPUTS: &[&str] = &["value", "int", "float", "seed", "select", "Input"];

pub struct Traversal<'g> {
    graph: &'g WorkflowGraph,
    registry: &'g NodeRegistry,
    max_depth: usize,
    max_hops: usize,
    heuristics: bool,
    /// Nodes on the path currently being walked.
    hops: usize,
    visited: HashSet<NodeId>,
    accumulated: Vec<(NodeId, Value)>,
}

impl<'g> Traversal<'g> {
    pub fn new(
        graph: &'g WorkflowGraph,
        registry: &'g NodeRegistry,
        config: &Config,
    ) -> Self {
        let max_depth = config.max_depth.clamp(1, MAX_DEPTH);
        Self {
            graph,
            registry,
            max_depth,
            max_hops: max_depth * 2,
            heuristics: config.unknown_node_heuristics,
            hops: 0,
            visited: HashSet::new(),
            accumulated: Vec::new(),
        }
    }

    pub fn graph(&self) -> &'g WorkflowGraph {
        self.graph
    }

    pub fn registry(&self) -> &'g NodeRegistry {
        self.registry
    }

    /// Resolve `param` starting at node `start`, with a fresh visited set.
    pub fn resolve(
        &mut self,
        start: &str,
        param: ParamKey,
    ) -> Option<Value> {
        self.visited.clear();
        self.hops = 0;
        self.visit(start, None, param, 0)
    }

    /// Values recorded by accumulating rules, in traversal order.
    pub fn accumulated(&self) -> &[(NodeId, Value)] {
        &self.accumulated
    }

    pub fn take_accumulated(&mut self) -> Vec<(NodeId, Value)> {
        std::mem::take(&mut self.accumulated)
    }

    pub fn accumulate(
        &mut self,
        node: &str,
        value: Value,
    ) {
        self.accumulated.push((node.to_string(), value));
    }

    /// Follow input `input` of `node` upstream. Literal inputs answer directly.
    pub fn trace(
        &mut self,
        node: &ParserNode,
        input: &str,
        param: ParamKey,
        depth: usize,
    ) -> Option<Value> {
        match node.input(input)? {
            InputValue::Literal(Value::Null) => None,
            InputValue::Literal(value) => Some(value.clone()),
            InputValue::Link {
                node: source,
                slot,
            } => self.visit(source, Some(*slot), param, depth + 1),
        }
    }

    /// A widget by name: literal input, then linked input (a widget converted
    /// to an input), then the positional widget value.
    pub fn widget(
        &mut self,
        node: &ParserNode,
        name: &str,
        param: ParamKey,
        depth: usize,
    ) -> Option<Value> {
        match node.input(name) {
            Some(InputValue::Link {
                ..
            }) => self.trace(node, name, param, depth),
            Some(InputValue::Literal(value)) if !value.is_null() => Some(value.clone()),
            _ => self.positional(node, name),
        }
    }

    /// A widget by name without following links.
    pub fn widget_literal(
        &self,
        node: &ParserNode,
        name: &str,
    ) -> Option<Value> {
        node.literal(name).cloned().or_else(|| self.positional(node, name))
    }

    fn positional(
        &self,
        node: &ParserNode,
        name: &str,
    ) -> Option<Value> {
        let definition = self.registry.get(&node.class_type)?;
        let index = definition.widget_index(name)?;
        node.widgets.get(index).filter(|v| !v.is_null()).cloned()
    }

    fn visit(
        &mut self,
        id: &str,
        via_slot: Option<u32>,
        param: ParamKey,
        depth: usize,
    ) -> Option<Value> {
        if depth > self.max_depth {
            debug!("depth ceiling {} reached at node {} resolving {}", self.max_depth, id, param.as_ref());
            return None;
        }
        if self.hops >= self.max_hops {
            debug!("hop ceiling {} reached at node {} resolving {}", self.max_hops, id, param.as_ref());
            return None;
        }
        if !self.visited.insert(id.to_string()) {
            debug!("cycle at node {} resolving {}", id, param.as_ref());
            return None;
        }

        let graph = self.graph;
        let Some(node) = graph.node(id) else {
            debug!("node {} is referenced but missing", id);
            return None;
        };
        let registry = self.registry;
        let definition = registry.get(&node.class_type);

        self.hops += 1;
        let value = if node.mode.is_skipped() {
            self.bypass(node, definition, via_slot, param, depth)
        } else {
            match definition {
                Some(definition) => self.apply(node, definition, via_slot, param, depth),
                None => self.guess(node, param, depth),
            }
        };
        self.hops -= 1;
        value
    }

    fn apply(
        &mut self,
        node: &ParserNode,
        definition: &NodeDefinition,
        via_slot: Option<u32>,
        param: ParamKey,
        depth: usize,
    ) -> Option<Value> {
        if let Some(rule) = definition.rule_for(param) {
            return match *rule {
                ParamRule::Widget {
                    name,
                    accumulate: false,
                } => self.widget(node, name, param, depth),
                ParamRule::Widget {
                    name,
                    accumulate: true,
                } => {
                    if let Some(value) = self.widget(node, name, param, depth) {
                        self.accumulate(&node.id, value);
                    }
                    self.bypass(node, Some(definition), via_slot, param, depth)
                }
                ParamRule::Trace {
                    input,
                } => self.trace(node, input, param, depth),
                ParamRule::Input {
                    name,
                } => self.widget_literal(node, name),
                ParamRule::Custom(extract) => extract(node, param, self, depth),
            };
        }

        if let Some(routing) = &definition.routing {
            return self.route(node, routing, param, depth);
        }
        // reroute-like hops do not count towards the depth ceiling
        if !definition.pass_through.is_empty() {
            return self.bypass(node, Some(definition), via_slot, param, depth.saturating_sub(1));
        }
        None
    }

    /// Continue through the input standing in for `via_slot`.
    fn bypass(
        &mut self,
        node: &ParserNode,
        definition: Option<&NodeDefinition>,
        via_slot: Option<u32>,
        param: ParamKey,
        depth: usize,
    ) -> Option<Value> {
        let input = match definition {
            Some(definition) => definition.bypass_input(node, via_slot),
            None => node.first_link().map(|(name, _, _)| name),
        }?;
        self.trace(node, input, param, depth)
    }

    fn route(
        &mut self,
        node: &ParserNode,
        routing: &ConditionalRouting,
        param: ParamKey,
        depth: usize,
    ) -> Option<Value> {
        let selected = self
            .scalar(node, routing.control, depth)
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())));

        let mut branches: Vec<(i64, &str)> = node
            .inputs
            .iter()
            .filter(|(_, value)| !matches!(value, InputValue::Literal(Value::Null)))
            .filter_map(|(name, _)| {
                let index = name.strip_prefix(routing.prefix)?.parse::<i64>().ok()?;
                Some((index, name.as_str()))
            })
            .collect();
        branches.sort_by_key(|(index, _)| *index);

        let branch = match selected.and_then(|s| branches.iter().find(|(index, _)| *index == s)) {
            Some(branch) => branch,
            None => {
                debug!("switch {} selection {:?} unresolved, using its first branch", node.id, selected);
                branches.first()?
            }
        };
        self.trace(node, branch.1, param, depth)
    }

    /// Scalar behind a control widget, following links to primitive-like nodes.
    fn scalar(
        &self,
        node: &ParserNode,
        name: &str,
        depth: usize,
    ) -> Option<Value> {
        let mut current = match node.input(name) {
            Some(InputValue::Link {
                node: source,
                ..
            }) => source,
            Some(InputValue::Literal(value)) if !value.is_null() => return Some(value.clone()),
            _ => return self.positional(node, name),
        };
        for _ in depth..self.max_depth {
            let node = self.graph.node(current)?;
            let value = SCALAR_INPUTS.iter().find_map(|k| node.literal(k)).or_else(|| node.widgets.first()).filter(|v| is_scalar(v));
            if value.is_some() {
                return value.cloned();
            }
            current = node.first_link()?.1;
        }
        None
    }

    /// Resolution on a node type the registry does not describe.
    fn guess(
        &mut self,
        node: &ParserNode,
        param: ParamKey,
        depth: usize,
    ) -> Option<Value> {
        if !self.heuristics {
            debug!("no definition for {} ({}), stopping", node.class_type, node.id);
            return None;
        }

        if param == ParamKey::Seed {
            if let Some(seed) = derived_seed(node) {
                return Some(Value::from(seed));
            }
        }
        if let Some(value) = param.aliases().iter().find_map(|alias| node.literal(alias)) {
            return Some(value.clone());
        }
        if let Some(hint) = param.hints().iter().find(|hint| node.link(hint).is_some()) {
            return self.trace(node, hint, param, depth);
        }
        if let Some((input, _, _)) = node.first_link() {
            return self.trace(node, input, param, depth);
        }

        // a source nobody described: take its first widget of the right kind
        node.widgets.iter().find(|v| if param.is_text() { v.is_string() } else { v.is_number() }).cloned()
    }

    /// Resolve `param` from each sink in turn; the first convertible value wins.
    pub fn first<T>(
        &mut self,
        sinks: &[&ParserNode],
        param: ParamKey,
        convert: impl Fn(&Value) -> Option<T>,
    ) -> Option<T> {
        sinks.iter().find_map(|sink| self.resolve(&sink.id, param).as_ref().and_then(&convert))
    }

    /// Accumulated values for `param` from the first sink that yields any.
    pub fn collect(
        &mut self,
        sinks: &[&ParserNode],
        param: ParamKey,
    ) -> Vec<(NodeId, Value)> {
        for sink in sinks {
            self.accumulated.clear();
            self.resolve(&sink.id, param);
            if !self.accumulated.is_empty() {
                return self.take_accumulated();
            }
        }
        Vec::new()
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::String(_) | Value::Bool(_))
}

/// Custom noise nodes that expose a base seed and an offset.
fn derived_seed(node: &ParserNode) -> Option<u64> {
    let mut parts = Map::new();
    for key in ["seed", "base_seed", "offset", "seed_offset"] {
        if let Some(value) = node.literal(key) {
            parts.insert(key.to_string(), value.clone());
        }
    }
    if !parts.contains_key("offset") && !parts.contains_key("seed_offset") {
        return None;
    }
    seed::coerce(&Value::Object(parts))
}

/// Output nodes to start resolution from.
///
/// Save sinks come before preview sinks, active before muted, then graph
/// order. Without any registered sink, every leaf with an input is used.
pub fn sinks<'g>(
    graph: &'g WorkflowGraph,
    registry: &NodeRegistry,
) -> Vec<&'g ParserNode> {
    let mut ranked: Vec<(u8, usize, &ParserNode)> = graph
        .nodes()
        .enumerate()
        .filter_map(|(order, node)| {
            let definition = registry.get(&node.class_type).filter(|d| d.has_role(NodeRole::Sink))?;
            let rank = match definition.category {
                NodeCategory::Preview => 2,
                _ => 0,
            } + node.mode.is_skipped() as u8;
            Some((rank, order, node))
        })
        .collect();

    if ranked.is_empty() {
        debug!("no registered output node, falling back to graph leaves");
        ranked = graph
            .nodes()
            .enumerate()
            .filter(|(_, node)| node.first_link().is_some() && graph.is_leaf(&node.id))
            .map(|(order, node)| (node.mode.is_skipped() as u8, order, node))
            .collect();
    }

    ranked.sort_by_key(|(rank, order, _)| (*rank, *order));
    ranked.into_iter().map(|(_, _, node)| node).collect()
}
