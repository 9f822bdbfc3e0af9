//! WebSocket connection registry and event fan-out
//!
//! Tracks every connected sync-channel client and delivers server events either to
//! all of them or to a single connection. Supports multiple connections per user
//! (multiple tabs/devices).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use strata_types::event::ServerEvent;
use tokio::sync::{RwLock, broadcast};

/// Stateless fan-out seam called after every confirmed registry mutation
#[async_trait]
pub trait EventPublisher: Send + Sync {
	/// Deliver `event` to every connected client; returns the number of deliveries
	async fn publish(&self, event: ServerEvent) -> usize;

	/// Number of currently connected clients
	async fn connection_count(&self) -> usize {
		0
	}
}

/// A client connection on the sync channel
#[derive(Debug)]
pub struct UserConnection {
	/// Authenticated user id, or an anonymous placeholder
	pub user_id: Box<str>,
	/// Unique connection ID (UUID)
	pub connection_id: Box<str>,
	/// When this connection was established
	pub connected_at: u64,
	/// Sender for this connection
	sender: broadcast::Sender<ServerEvent>,
}

/// Result of sending an event to one connection or user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
	/// Delivered to N connections
	Delivered(usize),
	/// Target is not connected
	Offline,
}

/// Connection registry statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRegistryStats {
	/// Number of unique online users
	pub online_users: usize,
	/// Total number of connections (may be > users if multiple tabs)
	pub total_connections: usize,
}

/// user_id -> connections
type UserRegistryMap = HashMap<Box<str>, Vec<UserConnection>>;

#[derive(Clone, Debug)]
pub struct BroadcastConfig {
	/// Maximum number of events to buffer per connection
	pub buffer_size: usize,
}

impl Default for BroadcastConfig {
	fn default() -> Self {
		Self { buffer_size: 128 }
	}
}

/// Manages sync-channel connections
pub struct BroadcastManager {
	users: Arc<RwLock<UserRegistryMap>>,
	config: BroadcastConfig,
}

impl BroadcastManager {
	/// Create a new manager with default config
	pub fn new() -> Self {
		Self::with_config(BroadcastConfig::default())
	}

	/// Create with custom config
	pub fn with_config(config: BroadcastConfig) -> Self {
		Self { users: Arc::new(RwLock::new(HashMap::new())), config }
	}

	/// Register a connection
	///
	/// Returns a receiver for events targeted at this connection. The
	/// connection_id must be unique per connection.
	pub async fn register(
		&self,
		user_id: &str,
		connection_id: &str,
	) -> broadcast::Receiver<ServerEvent> {
		let (sender, receiver) = broadcast::channel(self.config.buffer_size);

		let connection = UserConnection {
			user_id: user_id.into(),
			connection_id: connection_id.into(),
			connected_at: now_timestamp(),
			sender,
		};

		let mut users = self.users.write().await;
		users.entry(user_id.into()).or_default().push(connection);

		tracing::debug!(user_id = %user_id, connection_id = %connection_id, "Connection registered");
		receiver
	}

	/// Unregister a connection
	///
	/// Other connections for the same user are preserved.
	pub async fn unregister(&self, user_id: &str, connection_id: &str) {
		let mut users = self.users.write().await;

		if let Some(connections) = users.get_mut(user_id) {
			connections.retain(|conn| conn.connection_id.as_ref() != connection_id);

			if connections.is_empty() {
				users.remove(user_id);
			}
		}

		tracing::debug!(user_id = %user_id, connection_id = %connection_id, "Connection unregistered");
	}

	/// Send an event to every connection
	pub async fn send_to_all(&self, event: &ServerEvent) -> usize {
		let users = self.users.read().await;

		let mut delivered = 0;
		for connections in users.values() {
			for conn in connections {
				if conn.sender.send(event.clone()).is_ok() {
					delivered += 1;
				}
			}
		}
		delivered
	}

	/// Send an event to one specific connection
	pub async fn send_to_connection(&self, connection_id: &str, event: ServerEvent) -> DeliveryResult {
		let users = self.users.read().await;

		let target = users
			.values()
			.flat_map(|connections| connections.iter())
			.find(|conn| conn.connection_id.as_ref() == connection_id);

		match target {
			Some(conn) if conn.sender.send(event).is_ok() => DeliveryResult::Delivered(1),
			_ => DeliveryResult::Offline,
		}
	}

	pub async fn stats(&self) -> UserRegistryStats {
		let users = self.users.read().await;

		UserRegistryStats {
			online_users: users.len(),
			total_connections: users.values().map(Vec::len).sum(),
		}
	}
}

impl Default for BroadcastManager {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl EventPublisher for BroadcastManager {
	async fn publish(&self, event: ServerEvent) -> usize {
		let delivered = self.send_to_all(&event).await;
		tracing::debug!(event = event.name(), delivered, "Event published");
		delivered
	}

	async fn connection_count(&self) -> usize {
		self.stats().await.total_connections
	}
}

/// Get current timestamp
fn now_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}


// vim: ts=4
