use std::{fs, path::Path};

use serde::Deserialize;

use crate::{GenmetaError, Result};

/// Keywords the chunk reader keeps by default, matched case-insensitively.
pub const DEFAULT_TEXT_KEYWORDS: &[&str] = &[
    "parameters",
    "prompt",
    "workflow",
    "Comment",
    "Description",
    "ImageDescription",
    "XML:com.adobe.xmp",
    "invokeai_metadata",
    "sd-metadata",
    "Dream",
    "Software",
    "Artist",
    "UserComment",
    "generation_data",
    "c2pa",
];

/// Largest accepted `max_depth`. Traversal clamps to it as well.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// ceiling on graph traversal steps, 1..=128, defaults to 64; paths are also capped at twice this many nodes
    pub max_depth: usize,
    /// text chunk keywords to keep
    pub text_keywords: Vec<String>,
    /// follow name hints and the first linked input on node types the registry does not know
    pub unknown_node_heuristics: bool,
    /// use the container's pixel size when no extractor resolved width/height
    pub image_dimensions_fallback: bool,
    /// run the regex fallback when a structured extractor produced an empty record
    pub fallback_on_empty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 64,
            text_keywords: DEFAULT_TEXT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            unknown_node_heuristics: true,
            image_dimensions_fallback: true,
            fallback_on_empty: true,
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| GenmetaError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(GenmetaError::Config("max_depth must be greater than 0".into()));
        }
        if self.max_depth > MAX_DEPTH {
            return Err(GenmetaError::Config(format!("max_depth must be at most {}, got {}", MAX_DEPTH, self.max_depth)));
        }
        Ok(())
    }

    /// Whether `keyword` is one of the configured text keywords.
    pub fn is_text_keyword(
        &self,
        keyword: &str,
    ) -> bool {
        self.text_keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword))
    }
}

#[cfg(test)]
mod test {
    use crate::Config;

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
        max_depth = 12
        unknown_node_heuristics = false
        text_keywords = ["parameters", "prompt"]
        "#;
        let config = Config::load_from_str(toml_str).unwrap();
        assert_eq!(config.max_depth, 12);
        assert!(!config.unknown_node_heuristics);
        assert!(config.image_dimensions_fallback);
        assert_eq!(config.text_keywords, vec!["parameters", "prompt"]);
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config.max_depth, 64);
        assert!(config.is_text_keyword("PARAMETERS"));
        assert!(config.is_text_keyword("xml:com.adobe.xmp"));
        assert!(!config.is_text_keyword("tEXt"));
    }

    #[test]
    fn test_config_rejects_zero_depth() {
        assert!(Config::load_from_str("max_depth = 0").is_err());
    }

    #[test]
    fn test_config_rejects_oversized_depth() {
        assert!(Config::load_from_str("max_depth = 128").is_ok());
        assert!(Config::load_from_str("max_depth = 129").is_err());
        assert!(Config::load_from_str("max_depth = 100000").is_err());
    }
}
