//! App builder - constructs and runs the Strata application

use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::prelude::*;
use crate::{routes, webserver};
use strata_core::auth::TokenKeys;
use strata_core::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, VisibilityCache};
use strata_core::ws_broadcast::BroadcastManager;
use strata_layer::app::AppState;
use strata_layer::audit::{AuditLog, DEFAULT_AUDIT_CAPACITY, spawn_jsonl_writer};
use strata_layer::directory::{MemoryUserDirectory, UserDirectory};
use strata_layer::registry::LayerRegistry;
use strata_layer::service::{LayerService, spawn_reconciler};
use strata_types::layer::{Actor, CreateLayer};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Used when no secret is configured; never suitable outside development
pub const DEV_JWT_SECRET: &str = "strata-dev-secret";

pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub struct AppBuilderOpts {
	pub listen: Box<str>,
	pub jwt_secret: Option<Box<str>>,
	pub cache_ttl: Duration,
	pub cache_capacity: usize,
	pub audit_capacity: usize,
	pub reconcile_interval: Duration,
	/// JSON array of users seeding the in-memory directory
	pub users_file: Option<Box<Path>>,
	/// JSON array of layer inputs created at startup
	pub layers_file: Option<Box<Path>>,
	/// JSON-lines mirror of the audit log
	pub audit_file: Option<Box<Path>>,
}

impl Default for AppBuilderOpts {
	fn default() -> Self {
		Self {
			listen: "127.0.0.1:8080".into(),
			jwt_secret: None,
			cache_ttl: DEFAULT_CACHE_TTL,
			cache_capacity: DEFAULT_CACHE_CAPACITY,
			audit_capacity: DEFAULT_AUDIT_CAPACITY,
			reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
			users_file: None,
			layers_file: None,
			audit_file: None,
		}
	}
}

pub struct AppBuilder {
	opts: AppBuilderOpts,
	directory: Option<Arc<dyn UserDirectory>>,
}

impl AppBuilder {
	pub fn new() -> Self {
		let subscriber = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.try_init();
		if let Err(e) = subscriber {
			debug!("Keeping the installed tracing subscriber: {}", e);
		}
		AppBuilder { opts: AppBuilderOpts::default(), directory: None }
	}

	// Opts
	pub fn listen(&mut self, listen: impl Into<Box<str>>) -> &mut Self {
		self.opts.listen = listen.into();
		self
	}

	pub fn jwt_secret(&mut self, secret: impl Into<Box<str>>) -> &mut Self {
		self.opts.jwt_secret = Some(secret.into());
		self
	}

	pub fn cache_ttl(&mut self, ttl: Duration) -> &mut Self {
		self.opts.cache_ttl = ttl;
		self
	}

	pub fn cache_capacity(&mut self, capacity: usize) -> &mut Self {
		self.opts.cache_capacity = capacity;
		self
	}

	pub fn audit_capacity(&mut self, capacity: usize) -> &mut Self {
		self.opts.audit_capacity = capacity;
		self
	}

	pub fn reconcile_interval(&mut self, interval: Duration) -> &mut Self {
		self.opts.reconcile_interval = interval;
		self
	}

	pub fn users_file(&mut self, path: impl Into<Box<Path>>) -> &mut Self {
		self.opts.users_file = Some(path.into());
		self
	}

	pub fn layers_file(&mut self, path: impl Into<Box<Path>>) -> &mut Self {
		self.opts.layers_file = Some(path.into());
		self
	}

	pub fn audit_file(&mut self, path: impl Into<Box<Path>>) -> &mut Self {
		self.opts.audit_file = Some(path.into());
		self
	}

	// Adapters
	pub fn user_directory(&mut self, directory: Arc<dyn UserDirectory>) -> &mut Self {
		self.directory = Some(directory);
		self
	}

	pub fn opts(&self) -> &AppBuilderOpts {
		&self.opts
	}

	/// Assemble the application state and its router without serving it
	pub async fn build(self) -> ClResult<(App, Router)> {
		let opts = self.opts;

		let secret = match opts.jwt_secret.as_deref() {
			Some(secret) if !secret.is_empty() => secret.to_string(),
			_ => {
				warn!("JWT_SECRET not set, using the development secret");
				DEV_JWT_SECRET.to_string()
			}
		};
		let tokens = TokenKeys::new(secret.as_bytes());

		let directory: Arc<dyn UserDirectory> = match (self.directory, opts.users_file.as_deref()) {
			(Some(directory), _) => directory,
			(None, Some(path)) => Arc::new(MemoryUserDirectory::from_file(path).await?),
			(None, None) => Arc::new(MemoryUserDirectory::default()),
		};

		let mut audit = AuditLog::new(opts.audit_capacity);
		if let Some(path) = opts.audit_file.as_deref() {
			info!("Mirroring audit log to {}", path.display());
			audit = audit.with_sink(Box::new(spawn_jsonl_writer(path)));
		}

		let broadcast = Arc::new(BroadcastManager::new());
		let service = Arc::new(LayerService::new(
			LayerRegistry::new(audit),
			VisibilityCache::new(opts.cache_capacity, opts.cache_ttl),
			broadcast.clone(),
			directory,
		));

		if let Some(path) = opts.layers_file.as_deref() {
			seed_layers(&service, path).await?;
		}

		let app: App = Arc::new(AppState::new(service, broadcast, tokens));
		let router = routes::init(app.clone());
		Ok((app, router))
	}

	pub async fn run(self) -> ClResult<()> {
		info!("Strata V{}", VERSION);

		let listen = self.opts.listen.clone();
		let reconcile_interval = self.opts.reconcile_interval;
		let (app, router) = self.build().await?;

		if let Err(e) = app.layers.reconcile().await {
			warn!("Initial reconciliation failed: {}", e);
		}
		let reconciler = spawn_reconciler(app.layers.clone(), reconcile_interval);

		let result = webserver::serve(&listen, router).await;
		reconciler.abort();
		result
	}
}

impl Default for AppBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Create the layers listed in a JSON file as the system actor
async fn seed_layers(service: &LayerService, path: &Path) -> ClResult<usize> {
	let content = tokio::fs::read(path).await?;
	let inputs: Vec<CreateLayer> = serde_json::from_slice(&content)?;
	let actor = Actor::system();

	let mut created = 0;
	for input in inputs {
		let name = input.name.clone();
		match service.create(input, &actor).await {
			Ok(_) => created += 1,
			Err(e) => warn!(layer = %name, "Skipping seed layer: {}", e),
		}
	}
	info!("Seeded {} layers from {}", created, path.display());
	Ok(created)
}

// vim: ts=4
