//! Core infrastructure for Strata.
//!
//! Shared server-side building blocks: the visibility cache, the sync-channel
//! connection registry with its event fan-out, bearer-token handling, request
//! extractors and role-gating middleware.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod cache;
pub mod extract;
pub mod perm;
pub mod prelude;
pub mod ws_broadcast;

// Re-export commonly used types
pub use auth::{AuthCtx, TokenKeys};
pub use cache::{CacheKey, CacheValue, VisibilityCache};
pub use extract::{Auth, OptionalAuth};
pub use ws_broadcast::{BroadcastManager, EventPublisher};

// vim: ts=4
