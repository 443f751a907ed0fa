//! Format detection over the text chunks of one image.
//!
//! Families are checked in a fixed priority order and the first match wins:
//! ComfyUI graph, InvokeAI, the A1111 line grammar (with its Forge, SD.Next and
//! SwarmUI derivatives), then hosted-platform markers.

use serde_json::Value;
use tracing::trace;

use crate::{
    container::{C2PA_KEYWORD, TextChunks, XMP_KEYWORD, chunk_text},
    decode,
    extract::a1111,
    model::FormatFamily,
};

/// Chunks searched for platform marker strings.
const MARKER_KEYWORDS: &[&str] = &["Software", "Description", "ImageDescription", "Comment", "Artist", XMP_KEYWORD];

/// Decide which tool produced `chunks`.
pub fn detect(chunks: &TextChunks) -> FormatFamily {
    trace!("detect({:?})", chunks.keys().collect::<Vec<_>>());

    if ["prompt", "workflow"].iter().filter_map(|k| chunk_text(chunks, k)).filter_map(decode::decode_json).any(|v| is_comfy_api(&v) || is_comfy_ui(&v)) {
        return FormatFamily::ComfyUi;
    }

    if is_invokeai(chunks) {
        return FormatFamily::InvokeAi;
    }

    if let Some(parameters) = chunk_text(chunks, "parameters") {
        if decode::decode_json(parameters).is_some_and(|v| v.get("sui_image_params").is_some()) {
            return FormatFamily::SwarmUi;
        }
    }

    if let Some(text) = a1111::grammar_text(chunks) {
        return a1111_variant(text);
    }

    platform_family(chunks)
}

/// API format: an object whose values are nodes carrying `class_type`.
pub fn is_comfy_api(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| !obj.is_empty() && obj.values().any(|node| node.get("class_type").is_some_and(Value::is_string)))
}

/// UI format: an object with a `nodes` array of typed nodes.
pub fn is_comfy_ui(value: &Value) -> bool {
    value.get("nodes").and_then(Value::as_array).is_some_and(|nodes| nodes.iter().any(|n| n.get("type").is_some_and(Value::is_string)))
}

fn is_invokeai(chunks: &TextChunks) -> bool {
    if chunk_text(chunks, "invokeai_metadata").and_then(decode::decode_json).is_some_and(|v| v.is_object()) {
        return true;
    }
    if chunk_text(chunks, "sd-metadata").and_then(decode::decode_json).is_some_and(|v| v.get("image").is_some() || v.get("model_weights").is_some()) {
        return true;
    }
    chunk_text(chunks, "Dream").is_some_and(|t| !t.trim().is_empty())
}

fn a1111_variant(text: &str) -> FormatFamily {
    if text.contains("App: SD.Next") {
        FormatFamily::SdNext
    } else if a1111::is_forge(text) {
        FormatFamily::Forge
    } else {
        FormatFamily::A1111
    }
}

fn platform_family(chunks: &TextChunks) -> FormatFamily {
    let markers: Vec<String> = MARKER_KEYWORDS.iter().filter_map(|k| chunk_text(chunks, k)).map(str::to_lowercase).collect();
    let has = |needle: &str| markers.iter().any(|m| m.contains(needle));

    if has("niji") {
        return FormatFamily::Niji;
    }
    if has("midjourney") || (has("job id:") && has(" --")) {
        return FormatFamily::Midjourney;
    }
    if has("draw things") {
        return FormatFamily::DrawThings;
    }
    if has("dreamstudio") {
        return FormatFamily::DreamStudio;
    }

    if let Some(manifest) = chunk_text(chunks, C2PA_KEYWORD).map(str::to_lowercase) {
        if manifest.contains("openai") || manifest.contains("dall") {
            return FormatFamily::Dalle3;
        }
        if manifest.contains("firefly") || manifest.contains("adobe") {
            return FormatFamily::Firefly;
        }
    }

    FormatFamily::Unknown
}
