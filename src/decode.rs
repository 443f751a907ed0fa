//! Decompression pipeline: text -> (base64 -> (zlib ->)) JSON.
//!
//! Every stage falls through silently to the next one. A payload that decodes
//! at no stage is reported as `None`, leaving the original text to the regex
//! fallback.

use std::io::Read;

use base64::{Engine, engine::general_purpose};
use flate2::read::ZlibDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::{
    GenmetaError, Result,
    model::{PayloadEncoding, RawPayload},
};

/// Upper bound on inflated output, guards against zlib bombs.
const MAX_INFLATED_LEN: u64 = 64 * 1024 * 1024;

static NON_FINITE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\b(?:NaN|Infinity)\b").unwrap());

/// A payload that parsed as a JSON object or array.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub json: Value,
    pub payload: RawPayload,
}

/// Inflate zlib-wrapped bytes.
pub(crate) fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).take(MAX_INFLATED_LEN).read_to_end(&mut out)?;
    if out.is_empty() {
        return Err(GenmetaError::Decode("zlib stream inflated to nothing".into()));
    }
    Ok(out)
}

/// Run the pipeline over one chunk's text.
pub fn decode_payload(text: &str) -> Option<DecodedPayload> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(json) = parse_json(trimmed) {
        return Some(DecodedPayload {
            json,
            payload: RawPayload::new(trimmed.as_bytes().to_vec(), PayloadEncoding::PlainText),
        });
    }

    let decoded = match decode_base64(trimmed) {
        Ok(bytes) => bytes,
        Err(e) => {
            trace!("payload is neither json nor base64: {}", e);
            return None;
        }
    };

    if let Some(json) = std::str::from_utf8(&decoded).ok().and_then(parse_json) {
        return Some(DecodedPayload {
            json,
            payload: RawPayload::new(decoded, PayloadEncoding::Base64),
        });
    }

    let inflated = inflate(&decoded).ok()?;
    let json = std::str::from_utf8(&inflated).ok().and_then(parse_json)?;
    Some(DecodedPayload {
        json,
        payload: RawPayload::new(inflated, PayloadEncoding::Base64Zlib),
    })
}

/// Decode the pipeline and keep only the JSON.
pub fn decode_json(text: &str) -> Option<Value> {
    decode_payload(text).map(|decoded| decoded.json)
}

fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() < 4 {
        return Err(GenmetaError::Decode("too short for base64".into()));
    }
    let bytes = general_purpose::STANDARD.decode(&compact).or_else(|_| general_purpose::STANDARD_NO_PAD.decode(compact.trim_end_matches('=')))?;
    Ok(bytes)
}

/// Parse an object or array, tolerating non-finite number tokens and one
/// level of string wrapping.
fn parse_json(text: &str) -> Option<Value> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) if NON_FINITE_TOKEN.is_match(text) => serde_json::from_str::<Value>(&NON_FINITE_TOKEN.replace_all(text, "null")).ok()?,
        Err(_) => return None,
    };

    match value {
        Value::Object(_) | Value::Array(_) => Some(value),
        Value::String(inner) => {
            let inner = inner.trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                serde_json::from_str::<Value>(inner).ok().filter(|v| v.is_object() || v.is_array())
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::container::png::testing::zlib;

    #[test]
    fn test_plain_json() {
        let decoded = decode_payload("  {\"a\": 1}\n").unwrap();
        assert_eq!(decoded.json, json!({"a": 1}));
        assert_eq!(decoded.payload.encoding(), PayloadEncoding::PlainText);
    }

    #[test]
    fn test_base64_json_with_line_breaks() {
        let encoded = general_purpose::STANDARD.encode(br#"{"seed": 42, "steps": 30}"#);
        let wrapped = format!("{}\n{}", &encoded[..10], &encoded[10..]);
        let decoded = decode_payload(&wrapped).unwrap();
        assert_eq!(decoded.json["seed"], 42);
        assert_eq!(decoded.payload.encoding(), PayloadEncoding::Base64);
    }

    #[test]
    fn test_base64_zlib_json() {
        let encoded = general_purpose::STANDARD.encode(zlib(br#"{"3": {"class_type": "KSampler"}}"#));
        let decoded = decode_payload(&encoded).unwrap();
        assert_eq!(decoded.json["3"]["class_type"], "KSampler");
        assert_eq!(decoded.payload.encoding(), PayloadEncoding::Base64Zlib);
        assert!(decoded.payload.text().unwrap().contains("KSampler"));
    }

    #[test]
    fn test_non_finite_tokens_become_null() {
        let value = decode_json(r#"{"cfg": NaN, "denoise": -Infinity, "name": "NaNa"}"#).unwrap();
        assert_eq!(value["cfg"], Value::Null);
        assert_eq!(value["denoise"], Value::Null);
        assert_eq!(value["name"], "NaNa");
    }

    #[test]
    fn test_string_wrapped_json() {
        let value = decode_json(r#""{\"prompt\": \"a cat\"}""#).unwrap();
        assert_eq!(value["prompt"], "a cat");
    }

    #[test]
    fn test_undecodable_is_none() {
        assert!(decode_payload("a cat\nNegative prompt: blurry\nSteps: 20").is_none());
        assert!(decode_payload("12345").is_none());
        assert!(decode_payload("").is_none());
        assert!(inflate(b"not zlib").is_err());
    }
}
