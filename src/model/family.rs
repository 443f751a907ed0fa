use serde::{Deserialize, Serialize};

/// The tool family that produced an image's metadata.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FormatFamily {
    ComfyUi,
    InvokeAi,
    A1111,
    Forge,
    SdNext,
    SwarmUi,
    Midjourney,
    Niji,
    DrawThings,
    Firefly,
    DreamStudio,
    Dalle3,
    #[default]
    Unknown,
}

impl FormatFamily {
    /// Model name implied by hosted platforms that never embed one.
    pub fn platform_model(&self) -> Option<&'static str> {
        match self {
            FormatFamily::Firefly => Some("Adobe Firefly"),
            FormatFamily::Dalle3 => Some("DALL-E 3"),
            _ => None,
        }
    }

    /// Families whose parameters text follows the A1111 line grammar.
    pub fn is_a1111_family(&self) -> bool {
        matches!(self, FormatFamily::A1111 | FormatFamily::Forge | FormatFamily::SdNext)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_family_names() {
        assert_eq!(FormatFamily::ComfyUi.as_ref(), "comfy_ui");
        assert_eq!(FormatFamily::from_str("sd_next").unwrap(), FormatFamily::SdNext);
        assert_eq!(serde_json::to_string(&FormatFamily::Dalle3).unwrap(), "\"dalle3\"");
    }
}
