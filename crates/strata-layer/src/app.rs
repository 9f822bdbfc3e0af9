//! App state type

use std::sync::Arc;

use crate::service::LayerService;
use strata_core::auth::TokenKeys;
use strata_core::ws_broadcast::BroadcastManager;

pub struct AppState {
	pub layers: Arc<LayerService>,
	pub broadcast: Arc<BroadcastManager>,
	pub tokens: TokenKeys,
}

impl AppState {
	pub fn new(layers: Arc<LayerService>, broadcast: Arc<BroadcastManager>, tokens: TokenKeys) -> Self {
		Self { layers, broadcast, tokens }
	}
}

pub type App = Arc<AppState>;

// vim: ts=4
