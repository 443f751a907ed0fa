use std::sync::Arc;

use crate::{Config, GenmetaError, Parser, Result, container::TagReader};

/// Assembles a [`Parser`].
#[derive(Default)]
pub struct ParserBuilder {
    config: Config,
    max_depth: Option<usize>,
    tags: Option<Arc<dyn TagReader>>,
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    /// Overrides `Config::max_depth`.
    pub fn max_depth(
        mut self,
        n: usize,
    ) -> Self {
        self.max_depth = Some(n);
        self
    }

    /// Swaps the built-in EXIF/C2PA reader for another implementation.
    pub fn tag_reader(
        mut self,
        reader: Arc<dyn TagReader>,
    ) -> Self {
        self.tags = Some(reader);
        self
    }

    pub fn build(&self) -> Result<Parser> {
        let mut config = self.config.clone();
        if let Some(n) = self.max_depth {
            config.max_depth = n;
        }
        config.validate().map_err(|e| GenmetaError::Config(format!("invalid parser config: {}", e)))?;

        let parser = match &self.tags {
            Some(tags) => Parser::with_tag_reader(config, tags.clone()),
            None => Parser::new(config),
        };

        Ok(parser)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    struct FixedTags;

    impl TagReader for FixedTags {
        fn read_exif(
            &self,
            _exif: &[u8],
        ) -> BTreeMap<String, String> {
            BTreeMap::from([("Software".to_string(), "Midjourney".to_string())])
        }

        fn read_c2pa(
            &self,
            _manifest: &[u8],
        ) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_build_overrides_depth() {
        let parser = ParserBuilder::new().max_depth(8).build().unwrap();
        assert_eq!(parser.config().max_depth, 8);
        assert_eq!(ParserBuilder::new().build().unwrap().config().max_depth, 64);
    }

    #[test]
    fn test_build_rejects_zero_depth() {
        assert!(matches!(ParserBuilder::new().max_depth(0).build(), Err(GenmetaError::Config(_))));
        assert!(matches!(ParserBuilder::new().max_depth(10_000).build(), Err(GenmetaError::Config(_))));
    }

    #[test]
    fn test_custom_tag_reader() {
        use crate::container::jpeg::testing::{jpeg, segment};

        let bytes = jpeg(16, 16, &[segment(0xE1, b"Exif\0\0II*\0")]);
        let parser = ParserBuilder::new().tag_reader(Arc::new(FixedTags)).build().unwrap();
        let outcome = parser.parse(&bytes, None);
        assert_eq!(outcome.family, crate::FormatFamily::Midjourney);
    }
}
