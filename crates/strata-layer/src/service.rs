//! Layer service
//!
//! Couples the registry with the visibility cache and the event publisher. Every
//! mutation runs under the registry lock in the same order: mutate (which audits),
//! flush the cache, publish the confirmed record, release. Reads that miss the cache
//! are computed and stored under the same lock, so a cached value can never predate
//! an acknowledged mutation.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::directory::UserDirectory;
use crate::prelude::*;
use crate::registry::LayerRegistry;
use strata_core::cache::{CacheKey, CacheValue, VisibilityCache};
use strata_core::ws_broadcast::EventPublisher;
use strata_types::event::ServerEvent;
use strata_types::layer::{
	Actor, AuditLogEntry, CreateLayer, Layer, LayerPatch, MetricsSnapshot, User,
};

pub struct LayerService {
	registry: Mutex<LayerRegistry>,
	cache: VisibilityCache,
	publisher: Arc<dyn EventPublisher>,
	directory: Arc<dyn UserDirectory>,
	metrics: parking_lot::RwLock<Option<MetricsSnapshot>>,
}

impl LayerService {
	pub fn new(
		registry: LayerRegistry,
		cache: VisibilityCache,
		publisher: Arc<dyn EventPublisher>,
		directory: Arc<dyn UserDirectory>,
	) -> Self {
		Self {
			registry: Mutex::new(registry),
			cache,
			publisher,
			directory,
			metrics: parking_lot::RwLock::new(None),
		}
	}

	/// Full registry snapshot, hidden and restricted layers included
	pub async fn list(&self) -> Vec<Layer> {
		self.registry.lock().await.list()
	}

	pub async fn get(&self, id: &str) -> ClResult<Layer> {
		self.registry.lock().await.get(id).cloned().ok_or(Error::NotFound)
	}

	/// Resolve a domain (layer name or its slug)
	pub async fn find_by_domain(&self, domain: &str) -> ClResult<Layer> {
		self.registry.lock().await.find_by_domain(domain).cloned().ok_or(Error::NotFound)
	}

	/// Visible layers for a role-set, read through the cache
	pub async fn get_visible(&self, roles: &[String]) -> Arc<[Layer]> {
		let key = CacheKey::roles(roles);
		if let Some(layers) = self.cache.get_layers(&key) {
			return layers;
		}

		let registry = self.registry.lock().await;
		let layers: Arc<[Layer]> = registry.get_visible(roles).into();
		self.cache.set(key, CacheValue::Layers(layers.clone()));
		layers
	}

	/// Public member roster of a layer, read through the cache
	pub async fn members(&self, layer: &Layer) -> ClResult<Arc<[User]>> {
		let key = CacheKey::members(&layer.name);
		if let Some(users) = self.cache.get_users(&key) {
			return Ok(users);
		}

		let _registry = self.registry.lock().await;
		let users: Arc<[User]> = self.directory.users_in_layer(layer).await?.into();
		self.cache.set(key, CacheValue::Users(users.clone()));
		Ok(users)
	}

	pub async fn create(&self, input: CreateLayer, actor: &Actor) -> ClResult<Layer> {
		let mut registry = self.registry.lock().await;
		let layer = registry.create(input, actor)?;
		self.cache.flush_all();
		info!(id = %layer.id, name = %layer.name, actor = %actor.id, "Layer created");
		self.publisher.publish(ServerEvent::LayerCreated(layer.clone())).await;
		Ok(layer)
	}

	pub async fn update(&self, id: &str, patch: LayerPatch, actor: &Actor) -> ClResult<Layer> {
		let mut registry = self.registry.lock().await;
		let layer = registry.update(id, patch, actor)?;
		self.cache.flush_all();
		info!(id = %layer.id, actor = %actor.id, "Layer updated");
		self.publisher.publish(ServerEvent::LayerUpdated(layer.clone())).await;
		Ok(layer)
	}

	pub async fn toggle_visibility(&self, id: &str, visible: bool, actor: &Actor) -> ClResult<Layer> {
		self.update(id, LayerPatch::visibility(visible), actor).await
	}

	pub async fn remove(&self, id: &str, actor: &Actor) -> ClResult<Layer> {
		let mut registry = self.registry.lock().await;
		let layer = registry.remove(id, actor)?;
		self.cache.flush_all();
		info!(id = %layer.id, name = %layer.name, actor = %actor.id, "Layer deleted");
		self.publisher.publish(ServerEvent::deleted(layer.id.clone())).await;
		Ok(layer)
	}

	/// Most recent audit entries, newest first
	pub async fn audit(&self, limit: usize) -> Vec<AuditLogEntry> {
		let registry = self.registry.lock().await;
		let limit = limit.min(registry.audit().capacity());
		registry.audit().recent(limit)
	}

	/// Recount layer members from the user directory
	///
	/// Changed layers invalidate the cache and are published as updates. Returns the
	/// number of changed layers.
	pub async fn refresh_user_counts(&self) -> ClResult<usize> {
		let users = self.directory.list_users().await?;
		let mut registry = self.registry.lock().await;
		let changed = registry.refresh_user_counts(&users);
		if changed.is_empty() {
			return Ok(0);
		}

		self.cache.flush_all();
		for layer in &changed {
			self.publisher.publish(ServerEvent::LayerUpdated(layer.clone())).await;
		}
		debug!(changed = changed.len(), "User counts refreshed");
		Ok(changed.len())
	}

	/// Recompute and store the metrics snapshot
	pub async fn refresh_metrics(&self) -> MetricsSnapshot {
		let online_connections = self.publisher.connection_count().await;
		let registry = self.registry.lock().await;
		let layers = registry.list();

		let snapshot = MetricsSnapshot {
			total_layers: layers.len(),
			visible_layers: layers.iter().filter(|l| l.is_visible).count(),
			public_layers: layers.iter().filter(|l| l.access.public).count(),
			restricted_layers: layers.iter().filter(|l| !l.access.public).count(),
			total_members: layers.iter().map(|l| u64::from(l.user_count)).sum(),
			online_connections,
			audit_entries: registry.audit().len(),
			generated_at: Timestamp::now(),
		};
		*self.metrics.write() = Some(snapshot.clone());
		snapshot
	}

	/// Latest snapshot, computed on demand if the reconciliation pass has not run yet
	pub async fn metrics_summary(&self) -> MetricsSnapshot {
		let latest = self.metrics.read().clone();
		match latest {
			Some(snapshot) => snapshot,
			None => self.refresh_metrics().await,
		}
	}

	/// One reconciliation pass: user counts, then metrics
	pub async fn reconcile(&self) -> ClResult<MetricsSnapshot> {
		self.refresh_user_counts().await?;
		let stats = self.cache.stats();
		debug!(entries = stats.entries, hits = stats.hits, misses = stats.misses, "Visibility cache");
		Ok(self.refresh_metrics().await)
	}
}

/// Run [`LayerService::reconcile`] every `period` until the runtime shuts down
pub fn spawn_reconciler(
	service: Arc<LayerService>,
	period: Duration,
) -> tokio::task::JoinHandle<()> {
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(period);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			interval.tick().await;
			match service.reconcile().await {
				Ok(snapshot) => debug!(
					layers = snapshot.total_layers,
					members = snapshot.total_members,
					"Reconciliation pass finished"
				),
				Err(e) => warn!("Reconciliation pass failed: {}", e),
			}
		}
	})
}


// vim: ts=4
