//! Client side of Strata.
//!
//! A per-client reconciliation store that merges REST results, optimistic local
//! toggles and pushed sync-channel events into one converging view of the layers.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod api;
pub mod prelude;
pub mod sink;
pub mod store;

pub use api::{HttpLayerApi, LayerApi};
pub use sink::{FlumeSink, SyncSink};
pub use store::{ClientIdentity, ErrorScope, Filters, LayerStore, StoreError, TieredContent};

// vim: ts=4
