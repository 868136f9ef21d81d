//! Toggleable dynamics processing for a live media stream.
//!
//! `cadena-core` routes one playing media element through an optional
//! [`DynamicsCompressor`] and a gain stage. The [`ParameterStore`] holds
//! the tunables and the enabled flag; the [`ChainManager`] owns the
//! routing graph and reshapes it when the store changes. Everything is
//! synchronous and single-threaded: by the time a store write returns,
//! the graph already has its new shape.
//!
//! The crate is `no_std`-compatible (with `alloc`) so the same chain
//! logic can run inside embedded render loops; the `std` feature is on
//! by default.
//!
//! # Example
//!
//! ```
//! use cadena_core::{ChainManager, ChainState, MediaHandle, ParamKey, ParameterStore, ToneStream};
//!
//! let mut store = ParameterStore::new();
//! let media = MediaHandle::new(ToneStream::new(440.0, 0.8, 48_000.0));
//! let chain = ChainManager::attach(media, 48_000.0, &mut store);
//!
//! // Flipping the flag reroutes the live graph through the compressor.
//! store.toggle();
//! assert_eq!(chain.borrow().state(), ChainState::Compressing);
//!
//! // Tuning reaches the live nodes without touching the topology.
//! store.set_param(ParamKey::Threshold, -40.0);
//!
//! let mut block = [0.0_f32; 128];
//! chain.borrow_mut().process_block(&mut block);
//!
//! chain.borrow_mut().dispose();
//! assert_eq!(chain.borrow().state(), ChainState::Uninitialized);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod chain;
pub mod dynamics;
pub mod envelope;
pub mod graph;
pub mod math;
pub mod media;
pub mod notify;
pub mod params;
pub mod smooth;
pub mod store;

pub use chain::{ChainManager, ChainState, RouteError};
pub use dynamics::DynamicsCompressor;
pub use envelope::EnvelopeFollower;
pub use graph::{EdgeId, GraphError, NodeId, ProcessingContext};
pub use media::{BufferStream, MediaHandle, MediaStream, ToneStream};
pub use notify::{Notifier, Subscription};
pub use params::{CompressorParams, ParamKey, ParamRange};
pub use smooth::SmoothedParam;
pub use store::{ChangeCause, ParameterStore, StoreChange};
