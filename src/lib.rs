//! # Genmeta
//!
//! Genmeta reads the generation metadata that AI image tools embed in PNG and
//! JPEG files and folds it into one canonical record.
//!
//! ## Core Features
//!
//! - **Container Reading**: PNG `tEXt`/`iTXt`/`zTXt` chunks, JPEG EXIF/XMP/C2PA segments, safe on truncated streams
//! - **Layered Payloads**: plain JSON, base64 and base64+zlib payloads are unwrapped transparently
//! - **Format Detection**: A1111, Forge, SD.Next, SwarmUI, InvokeAI, ComfyUI, Midjourney/Niji, Draw Things, DreamStudio, Firefly, DALL-E 3
//! - **ComfyUI Interpretation**: workflows are walked backwards from their outputs under a declarative per-node rule registry
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use genmeta::{ParserBuilder, ParseStatus};
//!
//! let parser = ParserBuilder::new().build()?;
//! let outcome = parser.parse(&bytes, Some("image.png"));
//! if outcome.status == ParseStatus::Parsed {
//!     println!("{:?} {:?}", outcome.record.prompt, outcome.record.seed);
//! }
//! ```

mod builder;
pub mod comfy;
mod config;
mod container;
mod decode;
mod detect;
mod error;
mod extract;
mod model;
mod normalize;
mod parser;

pub use builder::ParserBuilder;
pub use config::{Config, DEFAULT_TEXT_KEYWORDS};
pub use container::{BasicTagReader, ContainerText, ImageKind, TagReader, TextChunks};
pub use decode::{DecodedPayload, decode_json, decode_payload};
pub use detect::detect;
pub use error::GenmetaError;
pub use model::*;
pub use parser::{ParseOutcome, ParseStatus, Parser};

/// Result type alias for genmeta operations.
pub type Result<T> = std::result::Result<T, GenmetaError>;
