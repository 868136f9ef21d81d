//! The signal routing graph.
//!
//! A [`ProcessingContext`] owns every node and connection of one chain.
//! Callers hold plain [`NodeId`]/[`EdgeId`] handles and go through the
//! context for every mutation, which lets the context enforce the
//! structural rules centrally: no fan-in, no fan-out, nothing into a
//! source, nothing out of the output, no loops. Rendering walks the one
//! path that can exist and processes a block in place at each node.

mod context;
mod edge;
mod node;

pub use context::{GraphError, ProcessingContext};
pub use edge::EdgeId;
pub use node::NodeId;
