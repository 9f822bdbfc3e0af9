//! Layer REST handlers

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	Json,
};
use serde::Deserialize;

use crate::prelude::*;
use strata_core::auth::{role_set, AuthCtx};
use strata_core::extract::{Auth, OptionalAuth};
use strata_types::layer::{
	Actor, AuditListResponse, CreateLayer, Layer, LayerListResponse, LayerPatch, LayerResponse,
	LayerUsersResponse, MetricsSnapshot,
};

pub const DEFAULT_AUDIT_LIMIT: usize = 50;

fn actor(auth: &AuthCtx) -> Actor {
	Actor::new(auth.user_id.as_ref(), auth.name.as_ref())
}

/// Layer with its roster, if the requester's roles are admitted by its policy
async fn layer_with_users(
	app: &App,
	layer: Layer,
	auth: Option<&AuthCtx>,
) -> ClResult<Json<LayerUsersResponse>> {
	let roles = role_set(auth);
	if !layer.access.admits(&roles) {
		warn!(layer = %layer.name, roles = ?roles, "Restricted layer requested without a matching role");
		return Err(Error::PermissionDenied);
	}

	let users = app.layers.members(&layer).await?;
	Ok(Json(LayerUsersResponse { layer, users: users.to_vec() }))
}

/// GET /layers - Layers visible to the requester
pub async fn list_layers(
	State(app): State<App>,
	OptionalAuth(auth): OptionalAuth,
) -> ClResult<Json<LayerListResponse>> {
	let roles = role_set(auth.as_ref());
	let layers = app.layers.get_visible(&roles).await;

	Ok(Json(LayerListResponse { layers: layers.to_vec() }))
}

/// GET /layers/metrics/summary
pub async fn get_metrics_summary(State(app): State<App>) -> ClResult<Json<MetricsSnapshot>> {
	Ok(Json(app.layers.metrics_summary().await))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
	pub limit: Option<usize>,
}

/// GET /layers/audit - Most recent audit entries, newest first
pub async fn list_audit(
	State(app): State<App>,
	Query(q): Query<AuditQuery>,
) -> ClResult<Json<AuditListResponse>> {
	let entries = app.layers.audit(q.limit.unwrap_or(DEFAULT_AUDIT_LIMIT)).await;

	Ok(Json(AuditListResponse { entries }))
}

/// GET /layers/by-id/:id/users
pub async fn get_layer_users(
	State(app): State<App>,
	OptionalAuth(auth): OptionalAuth,
	Path(id): Path<String>,
) -> ClResult<Json<LayerUsersResponse>> {
	let layer = app.layers.get(&id).await?;
	layer_with_users(&app, layer, auth.as_ref()).await
}

/// GET /layers/:domain - Resolve a domain by name or slug
pub async fn get_layer_by_domain(
	State(app): State<App>,
	OptionalAuth(auth): OptionalAuth,
	Path(domain): Path<String>,
) -> ClResult<Json<LayerUsersResponse>> {
	let layer = app.layers.find_by_domain(&domain).await?;
	layer_with_users(&app, layer, auth.as_ref()).await
}

/// POST /layers/new
pub async fn post_layer(
	State(app): State<App>,
	Auth(auth): Auth,
	Json(input): Json<CreateLayer>,
) -> ClResult<(StatusCode, Json<LayerResponse>)> {
	let layer = app.layers.create(input, &actor(&auth)).await?;

	Ok((StatusCode::CREATED, Json(LayerResponse { layer })))
}

/// PUT /layers/:id
pub async fn put_layer(
	State(app): State<App>,
	Auth(auth): Auth,
	Path(id): Path<String>,
	Json(patch): Json<LayerPatch>,
) -> ClResult<Json<LayerResponse>> {
	let layer = app.layers.update(&id, patch, &actor(&auth)).await?;

	Ok(Json(LayerResponse { layer }))
}

/// DELETE /layers/:id
pub async fn delete_layer(
	State(app): State<App>,
	Auth(auth): Auth,
	Path(id): Path<String>,
) -> ClResult<Json<LayerResponse>> {
	let layer = app.layers.remove(&id, &actor(&auth)).await?;

	Ok(Json(LayerResponse { layer }))
}

// vim: ts=4
