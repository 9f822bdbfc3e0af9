//! Strata is a layered visibility engine.
//!
//! # Features
//!
//! - Role-tiered permission evaluation with per-session overrides
//! - Layer registry with access policies and an append-only audit log
//! - Read-through visibility cache, flushed on every mutation
//! - Realtime sync channel pushing every confirmed mutation to all clients

pub use strata_core as core;
pub use strata_layer as layer;
pub use strata_types::{error, event, permission, role, types};

pub mod app;
pub mod prelude;
pub mod routes;
pub mod webserver;
pub mod websocket;

pub use crate::app::{AppBuilder, AppBuilderOpts};
pub use strata_layer::app::{App, AppState};

// vim: ts=4
