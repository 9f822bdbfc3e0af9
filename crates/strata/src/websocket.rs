//! WebSocket upgrade handler for the sync channel
//!
//! Browsers cannot set headers on upgrades, so the bearer token may also arrive as
//! `?token=`. Anonymous clients are accepted and act as guests.

use axum::{
	extract::{State, ws::WebSocketUpgrade},
	response::Response,
};

use crate::prelude::*;
use strata_core::extract::OptionalAuth;
use strata_layer::sync::{self, SyncPeer};

/// GET /ws
pub async fn get_ws_sync(
	ws: WebSocketUpgrade,
	State(app): State<App>,
	OptionalAuth(auth): OptionalAuth,
) -> Response {
	let peer = SyncPeer::new(auth.as_ref());
	debug!("Sync WebSocket request: user_id={}, roles={:?}", peer.user_id, peer.roles);

	ws.on_upgrade(move |socket| sync::handle_sync_connection(socket, peer, app))
}

// vim: ts=4
