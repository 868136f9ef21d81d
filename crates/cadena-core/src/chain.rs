//! Chain manager: owns the routing graph and keeps it in step with the
//! parameter store.
//!
//! The manager holds the only mutable access to its [`ProcessingContext`]
//! and the node ids inside it. Nodes are created in exactly one place
//! each and connected in exactly one routine, [`rewire`], which always
//! tears the whole path down before rebuilding it. There is no
//! incremental patching, so there is no state in which two paths exist.
//!
//! [`rewire`]: ChainManager::set_enabled

use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use crate::graph::{GraphError, NodeId, ProcessingContext};
use crate::media::MediaHandle;
use crate::notify::{Notifier, Subscription};
use crate::params::CompressorParams;
use crate::store::{ChangeCause, ParameterStore, StoreChange};

/// Where the chain currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// No graph exists yet (or it was disposed). The media element
    /// plays untouched.
    Uninitialized,
    /// The graph exists and routes around the compressor.
    Bypassed,
    /// The graph exists and routes through the compressor.
    Compressing,
}

/// Errors from routing operations.
///
/// [`SourceUnavailable`](Self::SourceUnavailable) and
/// [`SourceClaimed`](Self::SourceClaimed) are recoverable: the chain
/// stays uninitialized and the call may be retried once the media
/// situation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// The media element has no stream behind it.
    SourceUnavailable,
    /// Another chain already taps this media element.
    SourceClaimed,
    /// A graph mutation failed while rewiring.
    Graph(GraphError),
}

impl core::fmt::Display for RouteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SourceUnavailable => write!(f, "media source is not available"),
            Self::SourceClaimed => write!(f, "media source is already feeding another chain"),
            Self::Graph(err) => write!(f, "graph rewiring failed: {err}"),
        }
    }
}

impl From<GraphError> for RouteError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Graph(err) => Some(err),
            _ => None,
        }
    }
}

/// The graph half of an initialized chain: the context plus the ids of
/// the nodes this manager created in it.
struct ActiveGraph {
    context: ProcessingContext,
    source: NodeId,
    gain: NodeId,
    compressor: Option<NodeId>,
}

/// Routes one media element through an optional compressor and a gain
/// stage, driven either directly or by a [`ParameterStore`].
///
/// Everything is lazy. Construction allocates nothing; the context,
/// source tap, and gain appear on the first enable, and the compressor
/// node appears on the first enable only, surviving later bypasses so
/// re-enabling never recreates it.
pub struct ChainManager {
    media: MediaHandle,
    sample_rate: f32,
    params: CompressorParams,
    enabled: bool,
    active: Option<ActiveGraph>,
    state_notifier: Notifier<ChainState>,
    store_sub: Option<Subscription>,
    last_state: ChainState,
}

impl ChainManager {
    /// Creates an unwired manager for `media`, rendering at `sample_rate`.
    ///
    /// The manager starts with default tunables and must be driven by
    /// direct calls. Use [`attach`](Self::attach) to drive it from a
    /// store instead.
    #[must_use]
    pub fn new(media: MediaHandle, sample_rate: f32) -> Self {
        Self {
            media,
            sample_rate,
            params: CompressorParams::default(),
            enabled: false,
            active: None,
            state_notifier: Notifier::new(),
            store_sub: None,
            last_state: ChainState::Uninitialized,
        }
    }

    /// Creates a manager subscribed to `store`.
    ///
    /// The manager adopts the store's current tunables, reacts to every
    /// later commit, and folds in the current enabled flag once at
    /// attach time. The subscription lives until [`dispose`](Self::dispose).
    pub fn attach(
        media: MediaHandle,
        sample_rate: f32,
        store: &mut ParameterStore,
    ) -> Rc<RefCell<Self>> {
        let manager = Rc::new(RefCell::new(Self::new(media, sample_rate)));
        manager.borrow_mut().params = store.params();

        let weak: Weak<RefCell<Self>> = Rc::downgrade(&manager);
        let sub = store.subscribe(move |change| {
            if let Some(strong) = weak.upgrade() {
                strong.borrow_mut().apply_change(change);
            }
        });
        manager.borrow_mut().store_sub = Some(sub);

        if store.is_enabled() {
            let result = manager.borrow_mut().set_enabled(true);
            if let Err(_err) = result {
                #[cfg(feature = "tracing")]
                tracing::warn!("chain_attach: enable deferred, source not ready: {_err}");
            }
        }
        manager
    }

    /// Routes the chain through or around the compressor.
    ///
    /// The first call of either value initializes the graph, claiming
    /// the media element; enabling additionally creates the compressor
    /// on first use. Asking an initialized chain for its current mode
    /// again is a no-op and touches no edges.
    ///
    /// # Errors
    ///
    /// [`RouteError::SourceUnavailable`] or [`RouteError::SourceClaimed`]
    /// when the call has to initialize and cannot; both leave the chain
    /// exactly as it was.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), RouteError> {
        if self.active.is_some() && enabled == self.enabled {
            return Ok(());
        }

        self.ensure_initialized()?;
        if enabled {
            self.ensure_compressor();
        }
        let prev = self.enabled;
        self.enabled = enabled;
        if let Err(err) = self.rewire() {
            self.enabled = prev;
            return Err(err);
        }
        self.announce_transition();
        Ok(())
    }

    /// Replaces the cached tunables and pushes them into any live nodes.
    ///
    /// Values are clamped on the way in. The first call on an
    /// uninitialized chain builds the bypass graph; compressor values
    /// stay cached until that node exists. An already routed chain has
    /// its topology left alone: tuning while compressing must not
    /// interrupt the stream, so this path only writes node parameters.
    ///
    /// # Errors
    ///
    /// Initialization errors as in [`set_enabled`](Self::set_enabled);
    /// the new tunables stay cached either way.
    pub fn apply_params(&mut self, params: CompressorParams) -> Result<(), RouteError> {
        self.params = params.clamped();
        let building = self.active.is_none();
        self.ensure_initialized()?;
        if building {
            self.rewire()?;
        }
        if let Some(active) = self.active.as_mut() {
            if let Some(comp_id) = active.compressor {
                if let Some(compressor) = active.context.compressor_mut(comp_id) {
                    compressor.configure(&self.params);
                }
            }
            if let Some(level) = active.context.gain_mut(active.gain) {
                level.set_target(self.params.output_gain);
            }
        }
        self.announce_transition();
        Ok(())
    }

    /// Tears the chain down: cancels the store subscription, drops the
    /// graph with all its nodes, and releases the media claim.
    ///
    /// Safe to call from any state, any number of times. A later
    /// [`set_enabled`](Self::set_enabled) starts over from scratch,
    /// though a store subscription is not re-created.
    pub fn dispose(&mut self) {
        if let Some(sub) = self.store_sub.take() {
            sub.cancel();
        }
        if self.active.take().is_some() {
            self.media.release();
            #[cfg(feature = "tracing")]
            tracing::debug!("chain_dispose: graph dropped, media released");
        }
        self.enabled = false;
        self.announce_transition();
    }

    /// Current routing state.
    #[must_use]
    pub fn state(&self) -> ChainState {
        match &self.active {
            None => ChainState::Uninitialized,
            Some(_) if self.enabled => ChainState::Compressing,
            Some(_) => ChainState::Bypassed,
        }
    }

    /// Registers a callback for routing state transitions.
    ///
    /// Fires only on actual changes, synchronously, after the chain has
    /// already reached the announced state.
    pub fn subscribe_state(&mut self, callback: impl FnMut(&ChainState) + 'static) -> Subscription {
        self.state_notifier.subscribe(callback)
    }

    /// Renders one block through the chain.
    ///
    /// Before initialization the media element plays straight through,
    /// untouched; this mirrors an element that nothing has tapped yet.
    pub fn process_block(&mut self, out: &mut [f32]) {
        match self.active.as_mut() {
            Some(active) => active.context.process_block(out),
            None => {
                self.media.pull(out);
            }
        }
    }

    /// The cached tunables.
    #[must_use]
    pub fn params(&self) -> CompressorParams {
        self.params
    }

    /// True while the chain routes through the compressor.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Read access to the live graph, if one exists.
    #[must_use]
    pub fn context(&self) -> Option<&ProcessingContext> {
        self.active.as_ref().map(|active| &active.context)
    }

    /// The source node, once the chain is initialized.
    #[must_use]
    pub fn source_id(&self) -> Option<NodeId> {
        self.active.as_ref().map(|active| active.source)
    }

    /// The gain node, once the chain is initialized.
    #[must_use]
    pub fn gain_id(&self) -> Option<NodeId> {
        self.active.as_ref().map(|active| active.gain)
    }

    /// The compressor node, once it has been created.
    #[must_use]
    pub fn compressor_id(&self) -> Option<NodeId> {
        self.active.as_ref().and_then(|active| active.compressor)
    }

    /// Gain reduction the compressor is applying right now, in dB.
    ///
    /// `None` until the compressor node exists.
    #[must_use]
    pub fn reduction_db(&self) -> Option<f32> {
        let active = self.active.as_ref()?;
        let comp_id = active.compressor?;
        active.context.compressor_ref(comp_id).map(|c| c.reduction_db())
    }

    fn apply_change(&mut self, change: &StoreChange) {
        match change.cause {
            ChangeCause::Toggle => {
                self.params = change.params;
                if let Err(_err) = self.set_enabled(change.enabled) {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("chain_toggle: enable request left the chain unchanged: {_err}");
                }
            }
            ChangeCause::Param(_) => {
                if let Err(_err) = self.apply_params(change.params) {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "chain_params: tunables cached, graph not built: {_err}"
                    );
                }
            }
        }
    }

    // Builds context, source tap, and gain on first use. The compressor
    // is deliberately not created here.
    fn ensure_initialized(&mut self) -> Result<(), RouteError> {
        if self.active.is_some() {
            return Ok(());
        }
        if !self.media.is_live() {
            return Err(RouteError::SourceUnavailable);
        }
        if !self.media.claim() {
            return Err(RouteError::SourceClaimed);
        }

        let mut context = ProcessingContext::new(self.sample_rate);
        let source = context.create_media_source(self.media.clone());
        let gain = context.create_gain();
        if let Some(level) = context.gain_mut(gain) {
            level.set_immediate(self.params.output_gain);
        }
        self.active = Some(ActiveGraph {
            context,
            source,
            gain,
            compressor: None,
        });
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_init: context ready at {} Hz", self.sample_rate);
        Ok(())
    }

    fn ensure_compressor(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.compressor.is_some() {
            return;
        }
        let id = active.context.create_compressor();
        if let Some(compressor) = active.context.compressor_mut(id) {
            compressor.configure(&self.params);
        }
        active.compressor = Some(id);
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_init: compressor {id} created on first enable");
    }

    // The one reconnection routine. Disconnects everything this chain
    // may have wired, in path order, then rebuilds the single path for
    // the current mode. Running it from any prior shape converges on
    // the same result.
    fn rewire(&mut self) -> Result<(), RouteError> {
        let enabled = self.enabled;
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let ctx = &mut active.context;

        ctx.disconnect_outgoing(active.source)?;
        if let Some(comp) = active.compressor {
            ctx.disconnect_outgoing(comp)?;
        }
        ctx.disconnect_outgoing(active.gain)?;

        let out = ctx.output();
        match (enabled, active.compressor) {
            (true, Some(comp)) => {
                ctx.connect(active.source, comp)?;
                ctx.connect(comp, active.gain)?;
            }
            _ => {
                ctx.connect(active.source, active.gain)?;
            }
        }
        ctx.connect(active.gain, out)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "chain_rewire: {}",
            if enabled {
                "source -> compressor -> gain -> output"
            } else {
                "source -> gain -> output"
            }
        );
        Ok(())
    }

    fn announce_transition(&mut self) {
        let state = self.state();
        if state == self.last_state {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("chain_state: {:?} -> {state:?}", self.last_state);
        self.last_state = state;
        self.state_notifier.notify(&state);
    }
}

impl core::fmt::Debug for ChainManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChainManager")
            .field("state", &self.state())
            .field("sample_rate", &self.sample_rate)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ToneStream;
    use crate::params::ParamKey;

    use alloc::{vec, vec::Vec};

    fn tone_media() -> MediaHandle {
        MediaHandle::new(ToneStream::new(440.0, 0.5, 48_000.0))
    }

    #[test]
    fn construction_builds_nothing() {
        let manager = ChainManager::new(tone_media(), 48_000.0);
        assert_eq!(manager.state(), ChainState::Uninitialized);
        assert!(manager.context().is_none());
    }

    #[test]
    fn first_disable_still_builds_the_bypass_path() {
        let mut manager = ChainManager::new(tone_media(), 48_000.0);
        manager.set_enabled(false).unwrap();
        assert_eq!(manager.state(), ChainState::Bypassed);
        assert!(manager.compressor_id().is_none());

        let source = manager.source_id().unwrap();
        let gain = manager.gain_id().unwrap();
        let ctx = manager.context().unwrap();
        assert_eq!(ctx.edge_list(), [(source, gain), (gain, ctx.output())]);
    }

    #[test]
    fn enable_builds_the_full_path() {
        let mut manager = ChainManager::new(tone_media(), 48_000.0);
        manager.set_enabled(true).unwrap();
        assert_eq!(manager.state(), ChainState::Compressing);

        let source = manager.source_id().unwrap();
        let comp = manager.compressor_id().unwrap();
        let gain = manager.gain_id().unwrap();
        let ctx = manager.context().unwrap();
        assert_eq!(
            ctx.edge_list(),
            [(source, comp), (comp, gain), (gain, ctx.output())]
        );
    }

    #[test]
    fn disable_routes_around_but_keeps_the_compressor() {
        let mut manager = ChainManager::new(tone_media(), 48_000.0);
        manager.set_enabled(true).unwrap();
        let comp = manager.compressor_id().unwrap();

        manager.set_enabled(false).unwrap();
        assert_eq!(manager.state(), ChainState::Bypassed);
        assert_eq!(manager.compressor_id(), Some(comp));

        let source = manager.source_id().unwrap();
        let gain = manager.gain_id().unwrap();
        let ctx = manager.context().unwrap();
        assert_eq!(ctx.edge_list(), [(source, gain), (gain, ctx.output())]);
        assert_eq!(ctx.outgoing_count(comp), 0);
    }

    #[test]
    fn reenable_reuses_every_node() {
        let mut manager = ChainManager::new(tone_media(), 48_000.0);
        manager.set_enabled(true).unwrap();
        let before = (
            manager.source_id(),
            manager.compressor_id(),
            manager.gain_id(),
        );
        manager.set_enabled(false).unwrap();
        manager.set_enabled(true).unwrap();
        let after = (
            manager.source_id(),
            manager.compressor_id(),
            manager.gain_id(),
        );
        assert_eq!(before, after);
        assert_eq!(manager.context().unwrap().node_count(), 4);
    }

    #[test]
    fn redundant_enable_touches_no_edges() {
        let mut manager = ChainManager::new(tone_media(), 48_000.0);
        manager.set_enabled(true).unwrap();
        let gain = manager.gain_id().unwrap();
        let out = manager.context().unwrap().output();
        let edge_before = manager.context().unwrap().find_edge(gain, out).unwrap();

        manager.set_enabled(true).unwrap();
        let edge_after = manager.context().unwrap().find_edge(gain, out).unwrap();
        assert_eq!(edge_before, edge_after, "a rewire would have minted a new edge id");
    }

    #[test]
    fn missing_stream_is_recoverable() {
        let media = MediaHandle::detached();
        let mut manager = ChainManager::new(media.clone(), 48_000.0);

        let err = manager.set_enabled(true).unwrap_err();
        assert_eq!(err, RouteError::SourceUnavailable);
        assert_eq!(manager.state(), ChainState::Uninitialized);
        assert!(manager.context().is_none());
        assert!(!media.is_claimed());

        media.attach_stream(ToneStream::new(330.0, 0.4, 48_000.0));
        manager.set_enabled(true).unwrap();
        assert_eq!(manager.state(), ChainState::Compressing);
    }

    #[test]
    fn a_second_chain_cannot_tap_the_same_element() {
        let media = tone_media();
        let mut first = ChainManager::new(media.clone(), 48_000.0);
        let mut second = ChainManager::new(media, 48_000.0);

        first.set_enabled(true).unwrap();
        let err = second.set_enabled(true).unwrap_err();
        assert_eq!(err, RouteError::SourceClaimed);
        assert_eq!(second.state(), ChainState::Uninitialized);

        first.dispose();
        second.set_enabled(true).unwrap();
        assert_eq!(second.state(), ChainState::Compressing);
    }

    #[test]
    fn dispose_is_idempotent_from_any_state() {
        let mut manager = ChainManager::new(tone_media(), 48_000.0);
        manager.dispose();
        assert_eq!(manager.state(), ChainState::Uninitialized);

        manager.set_enabled(true).unwrap();
        manager.dispose();
        manager.dispose();
        assert_eq!(manager.state(), ChainState::Uninitialized);
        assert!(manager.context().is_none());
    }

    #[test]
    fn apply_params_reaches_live_nodes_without_rewiring() {
        let mut manager = ChainManager::new(tone_media(), 48_000.0);
        manager.set_enabled(true).unwrap();
        let edges_before = manager.context().unwrap().edge_list();

        let mut params = manager.params();
        params.threshold_db = -33.0;
        params.output_gain = 2.5;
        manager.apply_params(params).unwrap();

        let comp = manager.compressor_id().unwrap();
        let gain = manager.gain_id().unwrap();
        let ctx = manager.context().unwrap();
        assert!((ctx.compressor_ref(comp).unwrap().threshold_db() + 33.0).abs() < 1e-6);
        assert!((ctx.gain_ref(gain).unwrap().target() - 2.5).abs() < 1e-6);
        assert_eq!(ctx.edge_list(), edges_before);
    }

    #[test]
    fn apply_params_before_enable_builds_bypass_and_caches() {
        let mut manager = ChainManager::new(tone_media(), 48_000.0);
        let params = CompressorParams {
            ratio: 99.0,
            ..CompressorParams::default()
        };
        manager.apply_params(params).unwrap();
        assert_eq!(manager.state(), ChainState::Bypassed);
        assert!(manager.compressor_id().is_none(), "tuning alone must not create the compressor");
        assert!((manager.params().ratio - 20.0).abs() < 1e-9, "cached values are clamped");

        manager.set_enabled(true).unwrap();
        let comp = manager.compressor_id().unwrap();
        let ratio = manager.context().unwrap().compressor_ref(comp).unwrap().ratio();
        assert!((ratio - 20.0).abs() < 1e-6, "the cache reaches the compressor when it appears");
    }

    #[test]
    fn state_observer_fires_only_on_transitions() {
        let seen: Rc<RefCell<Vec<ChainState>>> = Rc::new(RefCell::new(Vec::new()));
        let mut manager = ChainManager::new(tone_media(), 48_000.0);
        let sink = Rc::clone(&seen);
        let _sub = manager.subscribe_state(move |state| sink.borrow_mut().push(*state));

        manager.set_enabled(true).unwrap();
        manager.set_enabled(true).unwrap();
        manager.set_enabled(false).unwrap();
        manager.dispose();
        manager.dispose();

        assert_eq!(
            *seen.borrow(),
            [
                ChainState::Compressing,
                ChainState::Bypassed,
                ChainState::Uninitialized
            ]
        );
    }

    #[test]
    fn store_drives_the_chain_through_attach() {
        let mut store = ParameterStore::new();
        let manager = ChainManager::attach(tone_media(), 48_000.0, &mut store);
        assert_eq!(manager.borrow().state(), ChainState::Uninitialized);

        store.toggle();
        assert_eq!(manager.borrow().state(), ChainState::Compressing);

        store.set_param(ParamKey::Knee, 12.0);
        {
            let guard = manager.borrow();
            let comp = guard.compressor_id().unwrap();
            let knee = guard.context().unwrap().compressor_ref(comp).unwrap().knee_db();
            assert!((knee - 12.0).abs() < 1e-6);
        }

        store.toggle();
        assert_eq!(manager.borrow().state(), ChainState::Bypassed);
    }

    #[test]
    fn dispose_detaches_from_the_store() {
        let mut store = ParameterStore::new();
        let manager = ChainManager::attach(tone_media(), 48_000.0, &mut store);
        store.toggle();
        manager.borrow_mut().dispose();

        store.toggle();
        store.toggle();
        assert_eq!(manager.borrow().state(), ChainState::Uninitialized);
    }

    #[test]
    fn attach_folds_in_an_already_enabled_store() {
        let mut store = ParameterStore::new();
        store.toggle();
        let manager = ChainManager::attach(tone_media(), 48_000.0, &mut store);
        assert_eq!(manager.borrow().state(), ChainState::Compressing);
    }

    #[test]
    fn passthrough_before_init() {
        let media = MediaHandle::new(crate::media::BufferStream::new(vec![0.3; 16], 48_000.0));
        let mut manager = ChainManager::new(media, 48_000.0);
        let mut block = [0.0_f32; 16];
        manager.process_block(&mut block);
        assert!(block.iter().all(|s| (*s - 0.3).abs() < 1e-9));
    }
}
