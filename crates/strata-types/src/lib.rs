//! Shared types for the Strata layered visibility engine.
//!
//! This crate holds the data model that the server crates and the client store agree
//! on: roles and security tiers with the pure permission evaluator over them,
//! layer records and their access policies, audit entries, push-channel events and
//! the common error type.

pub mod error;
pub mod event;
pub mod layer;
pub mod permission;
pub mod prelude;
pub mod role;
pub mod types;
pub mod utils;

// vim: ts=4
