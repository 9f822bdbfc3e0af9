//! Layer management for Strata.
//!
//! The authoritative layer registry with its audit log, the service wrapping it
//! with the visibility cache and event fan-out, the REST handlers and the
//! sync-channel protocol.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod audit;
pub mod directory;
pub mod handler;
pub mod prelude;
pub mod registry;
pub mod service;
pub mod sync;

pub use app::{App, AppState};
pub use directory::{MemoryUserDirectory, UserDirectory};
pub use registry::LayerRegistry;
pub use service::LayerService;

// vim: ts=4
