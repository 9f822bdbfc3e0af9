use axum::{
	Router, middleware,
	routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::prelude::*;
use crate::websocket;
use strata_core::perm::{optional_auth, require_admin, require_moderator};
use strata_layer::handler;

pub fn init(app: App) -> Router {
	let layer_by_key = get(handler::get_layer_by_domain)
		.merge(put(handler::put_layer).route_layer(middleware::from_fn(require_moderator)))
		.merge(delete(handler::delete_layer).route_layer(middleware::from_fn(require_admin)));

	let moderator_router = Router::new()
		.route("/layers/metrics/summary", get(handler::get_metrics_summary))
		.route("/layers/audit", get(handler::list_audit))
		.route_layer(middleware::from_fn(require_moderator));

	let admin_router = Router::new()
		.route("/layers/new", post(handler::post_layer))
		.route_layer(middleware::from_fn(require_admin));

	let public_router = Router::new()
		.route("/layers", get(handler::list_layers))
		.route("/layers/by-id/{id}/users", get(handler::get_layer_users))
		.route("/layers/{id}", layer_by_key)
		.route("/ws", get(websocket::get_ws_sync));

	Router::new()
		.merge(public_router)
		.merge(moderator_router)
		.merge(admin_router)
		.layer(middleware::from_fn_with_state(app.tokens.clone(), optional_auth))
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(app)
}

// vim: ts=4
