//! Custom extractors for nodes whose parameters no single widget or input holds.

use serde_json::Value;

use super::ParamKey;
use crate::comfy::{
    node::{InputValue, ParserNode},
    resolver::Traversal,
};

const DEFAULT_SEPARATOR: &str = ", ";

/// Join the distinct non-empty texts in order.
fn join(parts: impl IntoIterator<Item = Option<Value>>) -> Option<Value> {
    join_with(parts, DEFAULT_SEPARATOR)
}

fn join_with(
    parts: impl IntoIterator<Item = Option<Value>>,
    separator: &str,
) -> Option<Value> {
    let mut texts: Vec<String> = Vec::new();
    for part in parts.into_iter().flatten() {
        let text = match part {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        let text = text.trim().to_string();
        if !text.is_empty() && !texts.contains(&text) {
            texts.push(text);
        }
    }
    if texts.is_empty() { None } else { Some(Value::String(texts.join(separator))) }
}

fn widgets(
    node: &ParserNode,
    names: &[&str],
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    let parts: Vec<Option<Value>> = names.iter().map(|name| walk.widget(node, name, param, depth)).collect();
    join(parts)
}

fn branches(
    node: &ParserNode,
    inputs: &[&str],
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    let parts: Vec<Option<Value>> = inputs.iter().map(|input| walk.trace(node, input, param, depth)).collect();
    join(parts)
}

pub(super) fn sdxl_text(
    node: &ParserNode,
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    widgets(node, &["text_g", "text_l"], param, walk, depth)
}

pub(super) fn flux_text(
    node: &ParserNode,
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    widgets(node, &["t5xxl", "clip_l"], param, walk, depth)
}

pub(super) fn sd3_text(
    node: &ParserNode,
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    widgets(node, &["t5xxl", "clip_g", "clip_l"], param, walk, depth)
}

pub(super) fn combine_conditioning(
    node: &ParserNode,
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    branches(node, &["conditioning_1", "conditioning_2"], param, walk, depth)
}

pub(super) fn concat_conditioning(
    node: &ParserNode,
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    branches(node, &["conditioning_to", "conditioning_from"], param, walk, depth)
}

pub(super) fn dual_guider_prompt(
    node: &ParserNode,
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    branches(node, &["cond1", "cond2"], param, walk, depth)
}

/// String concatenation nodes of the core set and the common packs.
pub(super) fn concat_strings(
    node: &ParserNode,
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    const PARTS: &[&str] = &["string_a", "string_b", "string_c", "string_d", "text_a", "text_b", "text_c", "text_d", "string1", "string2", "text1", "text2"];

    let separator = ["delimiter", "separator"]
        .iter()
        .find_map(|name| walk.widget_literal(node, name))
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());

    let parts: Vec<Option<Value>> = PARTS.iter().map(|name| walk.widget(node, name, param, depth)).collect();
    join_with(parts, &separator)
}

/// rgthree's Power Lora Loader keeps its LoRAs as `{on, lora, strength,
/// strengthTwo}` objects, in `lora_N` inputs (API) or in its widgets (UI).
pub(super) fn power_lora(
    node: &ParserNode,
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    let literals = node.inputs.iter().filter(|(name, _)| name.starts_with("lora_")).filter_map(|(_, value)| match value {
        InputValue::Literal(v) => Some(v),
        InputValue::Link {
            ..
        } => None,
    });
    let entries: Vec<Value> = literals
        .chain(node.widgets.iter())
        .filter(|v| {
            let named = v.get("lora").and_then(Value::as_str).is_some_and(|l| !l.is_empty() && l != "None");
            named && v.get("on").and_then(Value::as_bool) != Some(false)
        })
        .cloned()
        .collect();

    for entry in entries {
        walk.accumulate(&node.id, entry);
    }
    walk.trace(node, "model", param, depth)
}

/// `LatentUpscaleBy`: upstream dimension times `scale_by`.
pub(super) fn scaled_dimension(
    node: &ParserNode,
    param: ParamKey,
    walk: &mut Traversal<'_>,
    depth: usize,
) -> Option<Value> {
    let base = walk.trace(node, "samples", param, depth)?.as_f64()?;
    let scale = walk.widget_literal(node, "scale_by").and_then(|v| v.as_f64()).unwrap_or(1.0);
    Some(Value::from((base * scale).round() as u64))
}
