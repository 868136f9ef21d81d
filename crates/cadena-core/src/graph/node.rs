//! Node bookkeeping for the routing graph.

use alloc::vec::Vec;

use super::edge::EdgeId;
use crate::dynamics::DynamicsCompressor;
use crate::media::MediaHandle;
use crate::smooth::SmoothedParam;

/// Identifies one node inside a [`ProcessingContext`].
///
/// Like edge ids, node ids are sequential and never reused.
///
/// [`ProcessingContext`]: super::ProcessingContext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Slot index backing this id.
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// What a node does to the signal passing through it.
pub(crate) enum NodeKind {
    /// Pulls samples from a media element.
    Source(MediaHandle),
    /// Applies dynamic range compression in place.
    Compressor(DynamicsCompressor),
    /// Scales the signal by a smoothed linear gain.
    Gain(SmoothedParam),
    /// Terminal sink. Every context owns exactly one.
    Output,
}

impl NodeKind {
    /// Short name for logs and error text.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Source(_) => "source",
            Self::Compressor(_) => "compressor",
            Self::Gain(_) => "gain",
            Self::Output => "output",
        }
    }
}

/// A node plus its adjacency lists.
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) incoming: Vec<EdgeId>,
    pub(crate) outgoing: Vec<EdgeId>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }
}
