//! The processing context: node storage, connection rules, and the
//! block renderer.

use alloc::{vec, vec::Vec};

use super::edge::{Edge, EdgeId};
use super::node::{NodeData, NodeId, NodeKind};
use crate::dynamics::DynamicsCompressor;
use crate::media::MediaHandle;
use crate::smooth::SmoothedParam;

/// Errors from graph mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphError {
    /// The node id does not belong to this context.
    NodeNotFound(NodeId),
    /// The edge id does not name a live connection.
    EdgeNotFound(EdgeId),
    /// The exact connection already exists.
    DuplicateEdge {
        /// Source end of the attempted connection.
        from: NodeId,
        /// Destination end of the attempted connection.
        to: NodeId,
    },
    /// The connection breaks a structural rule.
    InvalidConnection {
        /// Source end of the attempted connection.
        from: NodeId,
        /// Destination end of the attempted connection.
        to: NodeId,
        /// Which rule was broken.
        reason: &'static str,
    },
    /// The connection would close a loop.
    CycleDetected {
        /// Source end of the attempted connection.
        from: NodeId,
        /// Destination end of the attempted connection.
        to: NodeId,
    },
}

impl core::fmt::Display for GraphError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "{id} not found"),
            Self::EdgeNotFound(id) => write!(f, "{id} not found"),
            Self::DuplicateEdge { from, to } => {
                write!(f, "{from} is already connected to {to}")
            }
            Self::InvalidConnection { from, to, reason } => {
                write!(f, "cannot connect {from} -> {to}: {reason}")
            }
            Self::CycleDetected { from, to } => {
                write!(f, "connecting {from} -> {to} would close a loop")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GraphError {}

/// Owns the nodes and connections of one signal chain and renders it.
///
/// A context is created with its output node already present; sources,
/// compressors, and gains are added on demand. Nodes live for the life
/// of the context (tearing a chain down means dropping the context),
/// while connections come and go. Edge ids are sequential and never
/// reused.
///
/// Connections are kept single-path by construction: every node accepts
/// at most one inbound and one outbound edge, nothing may feed a
/// source, and nothing may leave the output. [`connect`](Self::connect)
/// additionally refuses duplicates and loops, so any graph that exists
/// is a straight line from a source toward the output.
pub struct ProcessingContext {
    nodes: Vec<NodeData>,
    edges: Vec<Option<Edge>>,
    output: NodeId,
    sample_rate: f32,
}

impl ProcessingContext {
    /// Creates an empty context rendering at `sample_rate`, with its
    /// output node in place.
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        let mut context = Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            output: NodeId(0),
            sample_rate,
        };
        context.output = context.add_node(NodeKind::Output);
        context
    }

    /// Sample rate this context renders at, in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The context's terminal output node.
    #[must_use]
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Adds a node that pulls from `media`.
    pub fn create_media_source(&mut self, media: MediaHandle) -> NodeId {
        self.add_node(NodeKind::Source(media))
    }

    /// Adds a compressor node with the stock profile.
    pub fn create_compressor(&mut self) -> NodeId {
        self.add_node(NodeKind::Compressor(DynamicsCompressor::new(self.sample_rate)))
    }

    /// Adds a gain node at unity.
    pub fn create_gain(&mut self) -> NodeId {
        self.add_node(NodeKind::Gain(SmoothedParam::new(1.0, self.sample_rate)))
    }

    /// Connects `from` to `to`, returning the new edge's id.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if either id is foreign,
    /// [`GraphError::DuplicateEdge`] if the connection already exists,
    /// [`GraphError::InvalidConnection`] if it breaks a structural rule,
    /// [`GraphError::CycleDetected`] if it would close a loop.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId, GraphError> {
        self.get_node(from)?;
        self.get_node(to)?;
        if self.find_edge(from, to).is_some() {
            return Err(GraphError::DuplicateEdge { from, to });
        }
        self.validate_connection(from, to)?;
        if self.can_reach(to, from) {
            return Err(GraphError::CycleDetected { from, to });
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(Edge { id, from, to }));
        if let Some(node) = self.nodes.get_mut(from.index()) {
            node.outgoing.push(id);
        }
        if let Some(node) = self.nodes.get_mut(to.index()) {
            node.incoming.push(id);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {from} -> {to} as {id}");
        Ok(id)
    }

    /// Removes one connection.
    ///
    /// # Errors
    ///
    /// [`GraphError::EdgeNotFound`] if `id` is not a live edge.
    pub fn disconnect(&mut self, id: EdgeId) -> Result<(), GraphError> {
        let edge = self
            .edges
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(GraphError::EdgeNotFound(id))?;
        if let Some(node) = self.nodes.get_mut(edge.from.index()) {
            node.outgoing.retain(|candidate| *candidate != id);
        }
        if let Some(node) = self.nodes.get_mut(edge.to.index()) {
            node.incoming.retain(|candidate| *candidate != id);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect: {} -> {} ({id})", edge.from, edge.to);
        Ok(())
    }

    /// Removes every connection leaving `id`, returning how many were
    /// removed. Removing zero is not an error; the node merely had no
    /// outbound edges.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if `id` is foreign.
    pub fn disconnect_outgoing(&mut self, id: NodeId) -> Result<usize, GraphError> {
        let outgoing = self.get_node(id)?.outgoing.clone();
        for edge_id in &outgoing {
            self.disconnect(*edge_id)?;
        }
        Ok(outgoing.len())
    }

    /// True if `id` names a node in this context.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Number of nodes, the output included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live connections.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.iter().flatten().count()
    }

    /// Number of live connections leaving `id` (zero for foreign ids).
    #[must_use]
    pub fn outgoing_count(&self, id: NodeId) -> usize {
        self.nodes.get(id.index()).map_or(0, |node| node.outgoing.len())
    }

    /// Number of live connections entering `id` (zero for foreign ids).
    #[must_use]
    pub fn incoming_count(&self, id: NodeId) -> usize {
        self.nodes.get(id.index()).map_or(0, |node| node.incoming.len())
    }

    /// Live connections as `(from, to)` pairs in creation order.
    #[must_use]
    pub fn edge_list(&self) -> Vec<(NodeId, NodeId)> {
        self.edges.iter().flatten().map(|edge| (edge.from, edge.to)).collect()
    }

    /// The live edge from `from` to `to`, if it exists.
    #[must_use]
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.edges
            .iter()
            .flatten()
            .find(|edge| edge.from == from && edge.to == to)
            .map(|edge| edge.id)
    }

    /// Mutable access to a compressor node's processor.
    ///
    /// Returns `None` when `id` is foreign or names a different kind.
    pub fn compressor_mut(&mut self, id: NodeId) -> Option<&mut DynamicsCompressor> {
        match &mut self.nodes.get_mut(id.index())?.kind {
            NodeKind::Compressor(compressor) => Some(compressor),
            _ => None,
        }
    }

    /// Shared access to a compressor node's processor.
    #[must_use]
    pub fn compressor_ref(&self, id: NodeId) -> Option<&DynamicsCompressor> {
        match &self.nodes.get(id.index())?.kind {
            NodeKind::Compressor(compressor) => Some(compressor),
            _ => None,
        }
    }

    /// Mutable access to a gain node's level.
    ///
    /// Returns `None` when `id` is foreign or names a different kind.
    pub fn gain_mut(&mut self, id: NodeId) -> Option<&mut SmoothedParam> {
        match &mut self.nodes.get_mut(id.index())?.kind {
            NodeKind::Gain(level) => Some(level),
            _ => None,
        }
    }

    /// Shared access to a gain node's level.
    #[must_use]
    pub fn gain_ref(&self, id: NodeId) -> Option<&SmoothedParam> {
        match &self.nodes.get(id.index())?.kind {
            NodeKind::Gain(level) => Some(level),
            _ => None,
        }
    }

    /// Renders one block into `out`.
    ///
    /// The walk starts at the source and follows outbound edges until
    /// it reaches the output. A source with no route is still pulled
    /// (the element keeps playing whether or not it is heard) but the
    /// block comes back silent. A context with no source is silent.
    pub fn process_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if out.is_empty() {
            return;
        }
        let Some(start) = self.first_source() else {
            return;
        };

        let mut current = start;
        let mut reached_output = false;
        for _ in 0..=self.nodes.len() {
            let Some(node) = self.nodes.get_mut(current.index()) else {
                break;
            };
            match &mut node.kind {
                NodeKind::Source(media) => {
                    media.pull(out);
                }
                NodeKind::Compressor(compressor) => compressor.process_block(out),
                NodeKind::Gain(level) => {
                    for sample in out.iter_mut() {
                        *sample *= level.advance();
                    }
                }
                NodeKind::Output => {
                    reached_output = true;
                    break;
                }
            }
            let Some(edge_id) = node.outgoing.first().copied() else {
                break;
            };
            let Some(edge) = self.edges.get(edge_id.index()).and_then(Option::as_ref) else {
                break;
            };
            current = edge.to;
        }

        if !reached_output {
            out.fill(0.0);
        }
    }

    fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add_node: {} {id}", kind.name());
        self.nodes.push(NodeData::new(kind));
        id
    }

    fn get_node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes.get(id.index()).ok_or(GraphError::NodeNotFound(id))
    }

    fn validate_connection(&self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        let from_node = self.get_node(from)?;
        let to_node = self.get_node(to)?;
        if matches!(to_node.kind, NodeKind::Source(_)) {
            return Err(GraphError::InvalidConnection {
                from,
                to,
                reason: "a source accepts no input",
            });
        }
        if matches!(from_node.kind, NodeKind::Output) {
            return Err(GraphError::InvalidConnection {
                from,
                to,
                reason: "the output is a sink",
            });
        }
        if !from_node.outgoing.is_empty() {
            return Err(GraphError::InvalidConnection {
                from,
                to,
                reason: "node already has an outgoing connection",
            });
        }
        if !to_node.incoming.is_empty() {
            return Err(GraphError::InvalidConnection {
                from,
                to,
                reason: "node already has an incoming connection",
            });
        }
        Ok(())
    }

    fn can_reach(&self, start: NodeId, goal: NodeId) -> bool {
        if start == goal {
            return true;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if current == goal {
                return true;
            }
            let idx = current.index();
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            if let Some(node) = self.nodes.get(idx) {
                for edge_id in &node.outgoing {
                    if let Some(edge) = self.edges.get(edge_id.index()).and_then(Option::as_ref) {
                        stack.push(edge.to);
                    }
                }
            }
        }
        false
    }

    fn first_source(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| matches!(node.kind, NodeKind::Source(_)))
            .map(|idx| NodeId(idx as u32))
    }
}

impl core::fmt::Debug for ProcessingContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessingContext")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edge_count())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{BufferStream, ToneStream};

    fn tone_handle(sample_rate: f32) -> MediaHandle {
        MediaHandle::new(ToneStream::new(440.0, 0.5, sample_rate))
    }

    #[test]
    fn test_new_context_has_only_the_output() {
        let ctx = ProcessingContext::new(48_000.0);
        assert_eq!(ctx.node_count(), 1);
        assert_eq!(ctx.edge_count(), 0);
        assert!(ctx.contains(ctx.output()));
    }

    #[test]
    fn test_straight_line_wiring() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(tone_handle(48_000.0));
        let gain = ctx.create_gain();
        let out = ctx.output();

        ctx.connect(source, gain).unwrap();
        ctx.connect(gain, out).unwrap();

        assert_eq!(ctx.edge_list(), [(source, gain), (gain, out)]);
        assert_eq!(ctx.outgoing_count(source), 1);
        assert_eq!(ctx.incoming_count(out), 1);
    }

    #[test]
    fn test_nothing_may_feed_a_source() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(tone_handle(48_000.0));
        let gain = ctx.create_gain();
        let err = ctx.connect(gain, source).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConnection { .. }));
    }

    #[test]
    fn test_nothing_may_leave_the_output() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let gain = ctx.create_gain();
        let out = ctx.output();
        let err = ctx.connect(out, gain).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConnection { .. }));
    }

    #[test]
    fn test_single_outbound_edge_is_enforced() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(tone_handle(48_000.0));
        let gain = ctx.create_gain();
        let out = ctx.output();
        ctx.connect(source, gain).unwrap();
        let err = ctx.connect(source, out).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConnection { reason, .. }
            if reason.contains("outgoing")));
    }

    #[test]
    fn test_single_inbound_edge_is_enforced() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(tone_handle(48_000.0));
        let comp = ctx.create_compressor();
        let out = ctx.output();
        ctx.connect(source, out).unwrap();
        let err = ctx.connect(comp, out).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConnection { reason, .. }
            if reason.contains("incoming")));
    }

    #[test]
    fn test_duplicate_connection_is_named_as_such() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(tone_handle(48_000.0));
        let out = ctx.output();
        ctx.connect(source, out).unwrap();
        let err = ctx.connect(source, out).unwrap_err();
        assert_eq!(err, GraphError::DuplicateEdge { from: source, to: out });
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let gain = ctx.create_gain();
        let err = ctx.connect(gain, gain).unwrap_err();
        assert_eq!(err, GraphError::CycleDetected { from: gain, to: gain });
    }

    #[test]
    fn test_foreign_id_is_rejected() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let gain = ctx.create_gain();
        let foreign = NodeId(99);
        let err = ctx.connect(gain, foreign).unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound(foreign));
    }

    #[test]
    fn test_disconnect_then_disconnect_again() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(tone_handle(48_000.0));
        let out = ctx.output();
        let edge = ctx.connect(source, out).unwrap();

        ctx.disconnect(edge).unwrap();
        assert_eq!(ctx.edge_count(), 0);
        assert_eq!(ctx.outgoing_count(source), 0);
        assert_eq!(ctx.disconnect(edge).unwrap_err(), GraphError::EdgeNotFound(edge));
    }

    #[test]
    fn test_edge_ids_are_never_reused() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(tone_handle(48_000.0));
        let out = ctx.output();
        let first = ctx.connect(source, out).unwrap();
        ctx.disconnect(first).unwrap();
        let second = ctx.connect(source, out).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_disconnect_outgoing_reports_the_count() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(tone_handle(48_000.0));
        let out = ctx.output();
        ctx.connect(source, out).unwrap();

        assert_eq!(ctx.disconnect_outgoing(source).unwrap(), 1);
        assert_eq!(ctx.disconnect_outgoing(source).unwrap(), 0);
        assert!(ctx.disconnect_outgoing(NodeId(42)).is_err());
    }

    #[test]
    fn test_render_passthrough() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let media = MediaHandle::new(BufferStream::new(vec![0.25; 64], 48_000.0));
        let source = ctx.create_media_source(media);
        let out = ctx.output();
        ctx.connect(source, out).unwrap();

        let mut block = [0.0_f32; 64];
        ctx.process_block(&mut block);
        assert!(block.iter().all(|s| (*s - 0.25).abs() < 1e-9));
    }

    #[test]
    fn test_render_applies_gain() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(MediaHandle::new(BufferStream::new(vec![0.5; 32], 48_000.0)));
        let gain = ctx.create_gain();
        let out = ctx.output();
        ctx.connect(source, gain).unwrap();
        ctx.connect(gain, out).unwrap();
        ctx.gain_mut(gain).unwrap().set_immediate(2.0);

        let mut block = [0.0_f32; 32];
        ctx.process_block(&mut block);
        assert!(block.iter().all(|s| (*s - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_unrouted_source_is_consumed_but_silent() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let media = MediaHandle::new(BufferStream::new(vec![0.9; 16], 48_000.0));
        let source = ctx.create_media_source(media);
        let out = ctx.output();

        let mut block = [0.0_f32; 16];
        ctx.process_block(&mut block);
        assert!(block.iter().all(|s| *s == 0.0), "unrouted block must be silent");

        // The stream advanced while unrouted, so routing it now plays
        // from where the element got to: past the end.
        ctx.connect(source, out).unwrap();
        ctx.process_block(&mut block);
        assert!(block.iter().all(|s| *s == 0.0), "the buffer was already drained");
    }

    #[test]
    fn test_sourceless_context_is_silent() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let mut block = [0.5_f32; 8];
        ctx.process_block(&mut block);
        assert!(block.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_compressor_in_the_path_reduces_loud_input() {
        let mut ctx = ProcessingContext::new(48_000.0);
        let source = ctx.create_media_source(MediaHandle::new(BufferStream::new(vec![1.0; 256], 48_000.0)));
        let comp = ctx.create_compressor();
        let out = ctx.output();
        ctx.connect(source, comp).unwrap();
        ctx.connect(comp, out).unwrap();

        let compressor = ctx.compressor_mut(comp).unwrap();
        compressor.set_threshold_db(-20.0);
        compressor.set_knee_db(0.0);
        compressor.set_ratio(4.0);
        compressor.set_attack_sec(0.0);

        let mut block = [0.0_f32; 256];
        ctx.process_block(&mut block);
        assert!(block[255] < 0.5, "0 dB input over a -20 dB threshold must be reduced");
        assert!(ctx.compressor_ref(comp).unwrap().reduction_db() > 0.0);
    }

    #[test]
    fn test_error_display_text() {
        let not_found = GraphError::NodeNotFound(NodeId(3));
        assert_eq!(not_found.to_string(), "node#3 not found");
        let cycle = GraphError::CycleDetected { from: NodeId(1), to: NodeId(1) };
        assert_eq!(cycle.to_string(), "connecting node#1 -> node#1 would close a loop");
    }
}
