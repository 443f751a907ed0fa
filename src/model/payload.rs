use serde::{Deserialize, Serialize};

/// Outermost layer a payload was wrapped in before it became JSON.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
pub enum PayloadEncoding {
    #[default]
    #[serde(rename = "plain-text")]
    #[strum(serialize = "plain-text")]
    PlainText,
    #[serde(rename = "base64")]
    #[strum(serialize = "base64")]
    Base64,
    #[serde(rename = "base64+zlib")]
    #[strum(serialize = "base64+zlib")]
    Base64Zlib,
}

/// Decoded payload bytes together with the encoding they were recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    bytes: Vec<u8>,
    encoding: PayloadEncoding,
}

impl RawPayload {
    pub fn new(
        bytes: Vec<u8>,
        encoding: PayloadEncoding,
    ) -> Self {
        Self {
            bytes,
            encoding,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    /// The payload as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}
