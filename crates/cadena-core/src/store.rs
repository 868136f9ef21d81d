//! Single source of truth for the chain's tunables.
//!
//! The store owns the six compressor parameters plus the enabled flag.
//! Writes clamp, commit, then notify subscribers synchronously with a
//! snapshot of the committed state. Reads between notifications always
//! see the latest committed values; there is no failure mode on this
//! path.

use crate::notify::{Notifier, Subscription};
use crate::params::{CompressorParams, ParamKey};

/// What a [`StoreChange`] was caused by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    /// One tunable was written.
    Param(ParamKey),
    /// The enabled flag was written.
    Toggle,
}

/// Snapshot delivered to store subscribers after each commit.
///
/// Carrying the committed state in the event means subscribers never
/// have to read back through the store while it is mid-notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreChange {
    /// The tunables as of this commit.
    pub params: CompressorParams,
    /// The enabled flag as of this commit.
    pub enabled: bool,
    /// Which write produced this commit.
    pub cause: ChangeCause,
}

/// Holds the tunables and the enabled flag, and announces every commit.
#[derive(Debug, Default)]
pub struct ParameterStore {
    params: CompressorParams,
    enabled: bool,
    notifier: Notifier<StoreChange>,
}

impl ParameterStore {
    /// Creates a store with default tunables, disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from `params`, clamping each field. Starts disabled.
    #[must_use]
    pub fn with_params(params: CompressorParams) -> Self {
        Self {
            params: params.clamped(),
            enabled: false,
            notifier: Notifier::new(),
        }
    }

    /// The current committed tunables.
    #[must_use]
    pub fn params(&self) -> CompressorParams {
        self.params
    }

    /// The current committed enabled flag.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Reads one tunable.
    #[must_use]
    pub fn param(&self, key: ParamKey) -> f32 {
        self.params.value(key)
    }

    /// Writes one tunable, clamping into its range, and notifies.
    ///
    /// Returns the value actually committed. Out-of-range input is not
    /// an error; the caller learns what was kept from the return value.
    pub fn set_param(&mut self, key: ParamKey, value: f32) -> f32 {
        let stored = self.params.set_value(key, value);
        #[cfg(feature = "tracing")]
        tracing::debug!("store_set: {} = {stored}{}", key.name(), key.unit());
        self.announce(ChangeCause::Param(key));
        stored
    }

    /// Writes the enabled flag and notifies.
    ///
    /// A write of the current value still commits and still notifies;
    /// it is the subscribers' business to deduplicate.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        #[cfg(feature = "tracing")]
        tracing::debug!("store_set: enabled = {enabled}");
        self.announce(ChangeCause::Toggle);
    }

    /// Flips the enabled flag, notifies, and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    /// Registers a subscriber for future commits.
    ///
    /// The callback runs inline on the mutating call's stack, after the
    /// commit. It is not invoked with the current state at subscription
    /// time; callers that need it read the store first.
    pub fn subscribe(&mut self, callback: impl FnMut(&StoreChange) + 'static) -> Subscription {
        self.notifier.subscribe(callback)
    }

    fn announce(&mut self, cause: ChangeCause) {
        let change = StoreChange {
            params: self.params,
            enabled: self.enabled,
            cause,
        };
        self.notifier.notify(&change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloc::{rc::Rc, vec::Vec};
    use core::cell::RefCell;

    #[test]
    fn starts_disabled_with_defaults() {
        let store = ParameterStore::new();
        assert!(!store.is_enabled());
        assert_eq!(store.params(), CompressorParams::default());
    }

    #[test]
    fn set_param_returns_the_committed_value() {
        let mut store = ParameterStore::new();
        let stored = store.set_param(ParamKey::Ratio, 50.0);
        assert!((stored - 20.0).abs() < 1e-9);
        assert!((store.param(ParamKey::Ratio) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn commits_are_announced_with_a_snapshot() {
        let seen: Rc<RefCell<Vec<StoreChange>>> = Rc::new(RefCell::new(Vec::new()));
        let mut store = ParameterStore::new();
        let sink = Rc::clone(&seen);
        let _sub = store.subscribe(move |change| sink.borrow_mut().push(*change));

        store.set_param(ParamKey::Threshold, -30.0);
        store.toggle();

        let log = seen.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].cause, ChangeCause::Param(ParamKey::Threshold));
        assert!((log[0].params.threshold_db + 30.0).abs() < 1e-9);
        assert!(!log[0].enabled);
        assert_eq!(log[1].cause, ChangeCause::Toggle);
        assert!(log[1].enabled);
    }

    #[test]
    fn the_snapshot_carries_the_clamped_value() {
        let seen: Rc<RefCell<Vec<f32>>> = Rc::new(RefCell::new(Vec::new()));
        let mut store = ParameterStore::new();
        let sink = Rc::clone(&seen);
        let _sub = store.subscribe(move |change| sink.borrow_mut().push(change.params.output_gain));

        store.set_param(ParamKey::OutputGain, 25.0);
        assert_eq!(*seen.borrow(), [3.0]);
    }

    #[test]
    fn redundant_enable_still_notifies() {
        let hits = Rc::new(core::cell::Cell::new(0));
        let mut store = ParameterStore::new();
        let counter = Rc::clone(&hits);
        let _sub = store.subscribe(move |_| counter.set(counter.get() + 1));

        store.set_enabled(false);
        store.set_enabled(false);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn cancelled_subscribers_miss_later_commits() {
        let hits = Rc::new(core::cell::Cell::new(0));
        let mut store = ParameterStore::new();
        let counter = Rc::clone(&hits);
        let sub = store.subscribe(move |_| counter.set(counter.get() + 1));

        store.toggle();
        sub.cancel();
        store.toggle();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn with_params_clamps_on_entry() {
        let store = ParameterStore::with_params(CompressorParams {
            threshold_db: 40.0,
            ..CompressorParams::default()
        });
        assert!(store.param(ParamKey::Threshold).abs() < 1e-9);
    }
}
