mod comfy;
mod facts;
mod family;
mod payload;
mod record;

pub use comfy::{ApiNodeMeta, ApiNodeModel, UiInputModel, UiLinkModel, UiNodeModel, UiWidgetRef, UiWorkflowModel, id_to_string};
pub use facts::{Dimensions, ModelRefs, Prompts, Sampling, WorkflowFacts};
pub use family::FormatFamily;
pub use payload::{PayloadEncoding, RawPayload};
pub use record::{LoraEntry, MetadataRecord};
