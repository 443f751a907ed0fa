//! Edges of the workflow graph.
//!
//! An edge runs from the node producing a value to the node consuming it, so
//! a sink has no outgoing edges.

use serde::{Deserialize, Serialize};

/// Link weight: which input of the consumer is fed from which output slot of the producer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Input name on the consuming node.
    pub input: String,
    /// Output slot on the producing node.
    pub slot: u32,
}
