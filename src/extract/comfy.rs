use tracing::debug;

use crate::{
    Config, GenmetaError, Result, comfy,
    container::{TextChunks, chunk_text},
    decode,
    extract::Extractor,
    model::{FormatFamily, MetadataRecord, WorkflowFacts},
    normalize,
};

/// ComfyUI: interpret the API graph (`prompt`) first, then fill what it left
/// unresolved from the UI graph (`workflow`).
pub struct ComfyExtractor<'a> {
    config: &'a Config,
}

impl<'a> ComfyExtractor<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
        }
    }

    fn interpret_chunk(
        &self,
        chunks: &TextChunks,
        keyword: &str,
    ) -> Option<WorkflowFacts> {
        let payload = decode::decode_payload(chunk_text(chunks, keyword)?)?;
        match comfy::interpret(&payload.json, self.config) {
            Ok(facts) => Some(facts),
            Err(e) => {
                debug!("{} chunk ({}) is not a usable workflow: {}", keyword, payload.payload.encoding().as_ref(), e);
                None
            }
        }
    }
}

impl Extractor for ComfyExtractor<'_> {
    fn family(&self) -> FormatFamily {
        FormatFamily::ComfyUi
    }

    fn extract(
        &self,
        chunks: &TextChunks,
    ) -> Result<MetadataRecord> {
        let api = self.interpret_chunk(chunks, "prompt");
        let ui = self.interpret_chunk(chunks, "workflow");

        let facts = match (api, ui) {
            (Some(mut api), Some(ui)) => {
                api.fill_missing(&ui);
                api
            }
            (Some(facts), None) | (None, Some(facts)) => facts,
            (None, None) => return Err(GenmetaError::Extract("no interpretable comfyui workflow".into())),
        };

        Ok(normalize::from_facts(&facts, FormatFamily::ComfyUi))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_api_graph_preferred_and_ui_fills_gaps() {
        let api = json!({
            "1": {"class_type": "KSampler", "inputs": {"seed": 11, "steps": 30}},
            "2": {"class_type": "SaveImage", "inputs": {"images": ["1", 0]}}
        });
        let ui = json!({
            "nodes": [
                {"id": 1, "type": "KSampler", "widgets_values": [99, "fixed", 12, 5.5, "euler", "normal", 1]},
                {"id": 2, "type": "SaveImage", "inputs": [{"name": "images", "link": 1}]}
            ],
            "links": [[1, 1, 0, 2, 0, "LATENT"]]
        });
        let chunks = TextChunks::from([("prompt".to_string(), api.to_string()), ("workflow".to_string(), ui.to_string())]);

        let config = Config::default();
        let record = ComfyExtractor::new(&config).extract(&chunks).unwrap();
        assert_eq!(record.generator, Some(FormatFamily::ComfyUi));
        assert_eq!(record.seed, Some(11));
        assert_eq!(record.steps, Some(30));
        assert_eq!(record.cfg, Some(5.5));
        assert_eq!(record.sampler.as_deref(), Some("euler"));
    }

    #[test]
    fn test_unusable_chunks() {
        let config = Config::default();
        let chunks = TextChunks::from([("prompt".to_string(), "a plain prompt".to_string())]);
        assert!(ComfyExtractor::new(&config).extract(&chunks).is_err());
    }
}
