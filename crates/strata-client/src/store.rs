//! Client reconciliation store
//!
//! Holds the server-confirmed layer snapshot and the locally pending visibility
//! toggles as two separate maps merged by id. Confirmed records are only ever
//! replaced whole, by id, so a pending toggle cannot outlive the server's answer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::LayerApi;
use crate::prelude::*;
use crate::sink::SyncSink;
use strata_types::event::{ClientEvent, LayerRef, ServerEvent, ToggleRequest};
use strata_types::layer::{CreateLayer, Layer, LayerPatch, User};
use strata_types::permission;
use strata_types::role::{OverrideUpdate, PermissionContext, Role, SecurityTier};

/// Operation an error is reported against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorScope {
	FetchLayers,
	FetchUsers,
	Toggle,
	Create,
	Update,
	Remove,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreError {
	pub scope: ErrorScope,
	pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filters {
	/// Case-insensitive substring of name or description
	pub search: String,
	pub show_hidden: bool,
}

/// Content items that carry a security tier and optionally belong to a layer
pub trait TieredContent {
	fn tier(&self) -> SecurityTier;

	fn layer_id(&self) -> Option<&str> {
		None
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIdentity {
	pub user_id: String,
	pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingToggle {
	visible: bool,
	/// Sent over the sync channel, awaiting `layer:updated` or `layer:error`
	sent: bool,
}

pub struct LayerStore {
	api: Arc<dyn LayerApi>,
	sink: Arc<dyn SyncSink>,
	identity: ClientIdentity,

	confirmed: Vec<Layer>,
	pending: HashMap<String, PendingToggle>,
	selected_layer_ids: Vec<String>,
	filters: Filters,
	layer_users: HashMap<String, Vec<User>>,
	presence: HashMap<String, String>,
	permission_context: PermissionContext,
	error: Option<StoreError>,
}

impl LayerStore {
	pub fn new(
		api: Arc<dyn LayerApi>,
		sink: Arc<dyn SyncSink>,
		identity: ClientIdentity,
		role: Role,
	) -> Self {
		Self {
			api,
			sink,
			identity,
			confirmed: Vec::new(),
			pending: HashMap::new(),
			selected_layer_ids: Vec::new(),
			filters: Filters::default(),
			layer_users: HashMap::new(),
			presence: HashMap::new(),
			permission_context: PermissionContext::new(role),
			error: None,
		}
	}

	// Layers //
	//********//

	/// Confirmed layers with pending toggles applied
	pub fn layers(&self) -> Vec<Layer> {
		self.confirmed
			.iter()
			.map(|layer| match self.pending.get(&layer.id) {
				Some(pending) => Layer { is_visible: pending.visible, ..layer.clone() },
				None => layer.clone(),
			})
			.collect()
	}

	pub fn layer(&self, id: &str) -> Option<Layer> {
		self.layers().into_iter().find(|layer| layer.id == id)
	}

	/// Layers matching the current filters
	pub fn filtered_layers(&self) -> Vec<Layer> {
		let search = self.filters.search.trim().to_lowercase();
		self.layers()
			.into_iter()
			.filter(|layer| self.filters.show_hidden || layer.is_visible)
			.filter(|layer| {
				search.is_empty()
					|| layer.name.to_lowercase().contains(&search)
					|| layer
						.description
						.as_deref()
						.is_some_and(|d| d.to_lowercase().contains(&search))
			})
			.collect()
	}

	fn contains(&self, id: &str) -> bool {
		self.confirmed.iter().any(|layer| layer.id == id)
	}

	fn upsert(&mut self, layer: Layer) {
		self.pending.remove(&layer.id);
		match self.confirmed.iter_mut().find(|existing| existing.id == layer.id) {
			Some(existing) => *existing = layer,
			None => self.confirmed.push(layer),
		}
	}

	/// Drop a layer and everything cached for it
	fn purge(&mut self, id: &str) {
		self.confirmed.retain(|layer| layer.id != id);
		self.pending.remove(id);
		self.layer_users.remove(id);
		self.selected_layer_ids.retain(|selected| selected != id);
	}

	fn replace_all(&mut self, layers: Vec<Layer>) {
		self.confirmed = layers;
		let ids: Vec<String> = self.confirmed.iter().map(|l| l.id.clone()).collect();
		self.pending.retain(|id, _| ids.contains(id));
		self.layer_users.retain(|id, _| ids.contains(id));
		self.selected_layer_ids.retain(|id| ids.contains(id));
	}

	fn fail(&mut self, scope: ErrorScope, err: Error) -> Error {
		warn!(scope = ?scope, "Layer store operation failed: {}", err);
		self.error = Some(StoreError { scope, message: err.to_string() });
		err
	}

	fn succeed(&mut self, scope: ErrorScope) {
		if self.error.as_ref().is_some_and(|e| e.scope == scope) {
			self.error = None;
		}
	}

	/// Replace local layers with the ones visible to this client's credentials
	///
	/// The role filtering happens server side, from the bearer token the [`LayerApi`]
	/// adapter carries. The local permission context only affects `filter_content`.
	pub async fn fetch_layers(&mut self) -> ClResult<()> {
		match self.api.list_layers().await {
			Ok(layers) => {
				debug!(count = layers.len(), "Layers fetched");
				self.replace_all(layers);
				self.succeed(ErrorScope::FetchLayers);
				Ok(())
			}
			Err(e) => Err(self.fail(ErrorScope::FetchLayers, e)),
		}
	}

	/// Merge one pushed event
	///
	/// Merging is keyed by id, so applying the same event twice is a no-op.
	pub fn apply_event(&mut self, event: ServerEvent) {
		match event {
			ServerEvent::LayersInit(layers) => self.replace_all(layers),
			ServerEvent::LayerCreated(layer) | ServerEvent::LayerUpdated(layer) => self.upsert(layer),
			ServerEvent::LayerDeleted(LayerRef { layer_id }) => self.purge(&layer_id),
			ServerEvent::LayerError(err) => {
				// the server answered a toggle of ours with an error
				self.pending.retain(|_, pending| !pending.sent);
				self.error = Some(StoreError { scope: ErrorScope::Toggle, message: err.message });
			}
			ServerEvent::UserPresence(presence) => {
				self.presence.insert(presence.user_id, presence.status);
			}
		}
	}

	/// Optimistically show or hide a layer, optionally asking the server to apply it
	pub async fn toggle_layer_visibility(
		&mut self,
		id: &str,
		visible: bool,
		broadcast: bool,
	) -> ClResult<()> {
		if !self.contains(id) {
			return Err(self.fail(ErrorScope::Toggle, Error::NotFound));
		}
		let previous = self.pending.insert(id.to_string(), PendingToggle { visible, sent: broadcast });
		if !broadcast {
			return Ok(());
		}

		let event = ClientEvent::LayerToggle(ToggleRequest {
			layer_id: id.to_string(),
			visible,
			actor_id: self.identity.user_id.clone(),
			actor_name: Some(self.identity.name.clone()),
		});
		if let Err(e) = self.sink.emit(event).await {
			match previous {
				Some(previous) => self.pending.insert(id.to_string(), previous),
				None => self.pending.remove(id),
			};
			return Err(self.fail(ErrorScope::Toggle, e));
		}
		self.succeed(ErrorScope::Toggle);
		Ok(())
	}

	pub async fn create_layer(&mut self, input: CreateLayer) -> ClResult<Layer> {
		let layer = match self.api.create_layer(&input).await {
			Ok(layer) => layer,
			Err(e) => return Err(self.fail(ErrorScope::Create, e)),
		};
		self.upsert(layer.clone());
		self.succeed(ErrorScope::Create);

		if let Err(e) = self.sink.emit(ClientEvent::LayerCreated(layer.clone())).await {
			debug!(layer = %layer.id, "Create relay not sent: {}", e);
		}
		Ok(layer)
	}

	pub async fn update_layer(&mut self, id: &str, patch: LayerPatch) -> ClResult<Layer> {
		let layer = match self.api.update_layer(id, &patch).await {
			Ok(layer) => layer,
			Err(e) => return Err(self.fail(ErrorScope::Update, e)),
		};
		self.upsert(layer.clone());
		self.succeed(ErrorScope::Update);
		Ok(layer)
	}

	pub async fn remove_layer(&mut self, id: &str) -> ClResult<Layer> {
		let layer = match self.api.remove_layer(id).await {
			Ok(layer) => layer,
			Err(e) => return Err(self.fail(ErrorScope::Remove, e)),
		};
		self.purge(&layer.id);
		self.succeed(ErrorScope::Remove);

		let relay = ClientEvent::LayerDeleted(LayerRef { layer_id: layer.id.clone() });
		if let Err(e) = self.sink.emit(relay).await {
			debug!(layer = %layer.id, "Delete relay not sent: {}", e);
		}
		Ok(layer)
	}

	// Members //
	//*********//

	/// Public member roster of a layer, fetched once per layer id
	pub async fn fetch_users_for_layer(&mut self, layer: &Layer) -> ClResult<Vec<User>> {
		if let Some(users) = self.layer_users.get(&layer.id) {
			return Ok(users.clone());
		}
		match self.api.layer_users(&layer.name).await {
			Ok(res) => {
				self.layer_users.insert(layer.id.clone(), res.users.clone());
				self.succeed(ErrorScope::FetchUsers);
				Ok(res.users)
			}
			Err(e) => Err(self.fail(ErrorScope::FetchUsers, e)),
		}
	}

	pub fn layer_users(&self, id: &str) -> Option<&[User]> {
		self.layer_users.get(id).map(Vec::as_slice)
	}

	pub fn presence(&self, user_id: &str) -> Option<&str> {
		self.presence.get(user_id).map(String::as_str)
	}

	// Selection //
	//***********//

	pub fn selected_layer_ids(&self) -> &[String] {
		&self.selected_layer_ids
	}

	/// Select a known layer; unknown ids are ignored
	pub fn select(&mut self, id: &str) {
		if self.contains(id) && !self.selected_layer_ids.iter().any(|s| s == id) {
			self.selected_layer_ids.push(id.to_string());
		}
	}

	pub fn deselect(&mut self, id: &str) {
		self.selected_layer_ids.retain(|selected| selected != id);
	}

	pub fn toggle_selection(&mut self, id: &str) {
		if self.selected_layer_ids.iter().any(|s| s == id) {
			self.deselect(id);
		} else {
			self.select(id);
		}
	}

	pub fn clear_selection(&mut self) {
		self.selected_layer_ids.clear();
	}

	// Filters //
	//*********//

	pub fn filters(&self) -> &Filters {
		&self.filters
	}

	pub fn set_search(&mut self, search: impl Into<String>) {
		self.filters.search = search.into();
	}

	pub fn set_show_hidden(&mut self, show_hidden: bool) {
		self.filters.show_hidden = show_hidden;
	}

	// Permissions //
	//*************//

	pub fn permission_context(&self) -> &PermissionContext {
		&self.permission_context
	}

	/// Apply a batch of overrides; updates lacking authority are dropped
	pub fn apply_overrides(&mut self, updates: &[OverrideUpdate]) {
		self.permission_context = permission::apply_overrides(&self.permission_context, updates);
	}

	pub fn elevate(&mut self, role: Role) {
		info!(from = %self.permission_context.role, to = %role, "Role elevated");
		self.permission_context = permission::elevate(&self.permission_context, role);
	}

	pub fn can_access_tier(&self, tier: SecurityTier) -> bool {
		permission::can_access_tier(&self.permission_context, tier)
	}

	pub fn accessible_tiers(&self) -> Vec<SecurityTier> {
		permission::accessible_tiers(&self.permission_context)
	}

	/// Items whose tier is accessible and whose layer, if any, is currently shown
	pub fn filter_content<'a, T: TieredContent>(&self, items: &'a [T]) -> Vec<&'a T> {
		let shown: Vec<String> =
			self.layers().into_iter().filter(|l| l.is_visible).map(|l| l.id).collect();
		items
			.iter()
			.filter(|item| self.can_access_tier(item.tier()))
			.filter(|item| item.layer_id().is_none_or(|id| shown.iter().any(|s| s == id)))
			.collect()
	}

	// Errors //
	//********//

	pub fn error(&self) -> Option<&StoreError> {
		self.error.as_ref()
	}

	pub fn clear_error(&mut self) {
		self.error = None;
	}
}

// vim: ts=4
