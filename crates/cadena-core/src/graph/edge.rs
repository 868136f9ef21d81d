//! Edge bookkeeping for the routing graph.

use super::node::NodeId;

/// Identifies one connection inside a [`ProcessingContext`].
///
/// Ids are handed out sequentially and never reused, so an id held
/// across a disconnect stays invalid instead of aliasing a newer edge.
///
/// [`ProcessingContext`]: super::ProcessingContext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Slot index backing this id.
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "edge#{}", self.0)
    }
}

/// One directed connection between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Edge {
    pub(crate) id: EdgeId,
    pub(crate) from: NodeId,
    pub(crate) to: NodeId,
}
