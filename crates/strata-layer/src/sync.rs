//! Sync channel protocol
//!
//! One duplex websocket per client. The server pushes `layers:init` on connect and
//! then every confirmed registry event; clients send toggles, presence and relays of
//! their own REST mutations. Frames are `{ "event": "...", "data": ... }`.

use axum::extract::ws::{Message, WebSocket};
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

use crate::prelude::*;
use crate::service::LayerService;
use strata_core::auth::{AuthCtx, ANONYMOUS_ROLE};
use strata_core::perm::MODERATOR_ROLES;
use strata_core::ws_broadcast::{DeliveryResult, EventPublisher};
use strata_types::event::{ClientEvent, ServerEvent, ToggleRequest};
use strata_types::layer::Actor;

const HEARTBEAT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Identity of one sync-channel connection
#[derive(Debug, Clone)]
pub struct SyncPeer {
	pub user_id: String,
	pub name: String,
	pub roles: Vec<String>,
	pub connection_id: String,
}

impl SyncPeer {
	pub fn new(auth: Option<&AuthCtx>) -> Self {
		let connection_id = Uuid::new_v4().to_string();
		match auth {
			Some(auth) => Self {
				user_id: auth.user_id.to_string(),
				name: auth.name.to_string(),
				roles: auth.roles.iter().map(ToString::to_string).collect(),
				connection_id,
			},
			None => Self {
				user_id: format!("anon-{}", connection_id.get(..8).unwrap_or_default()),
				name: "Anonymous".into(),
				roles: vec![ANONYMOUS_ROLE.into()],
				connection_id,
			},
		}
	}

	pub fn can_toggle(&self) -> bool {
		self.roles.iter().any(|role| MODERATOR_ROLES.contains(&role.as_str()))
	}

	fn actor(&self) -> Actor {
		Actor::new(self.user_id.as_str(), self.name.as_str())
	}

	fn short_id(&self) -> &str {
		self.connection_id.get(..8).unwrap_or(&self.connection_id)
	}
}

fn to_ws_message(event: &ServerEvent) -> ClResult<Message> {
	Ok(Message::Text(event.to_json()?.into()))
}

fn toggle_error(req: &ToggleRequest, err: &Error) -> ServerEvent {
	match err {
		Error::NotFound => ServerEvent::error(format!("Layer {} not found", req.layer_id)),
		Error::ValidationError(msg) => ServerEvent::error(msg.as_str()),
		Error::PermissionDenied => ServerEvent::error("Not allowed to toggle layers"),
		_ => ServerEvent::error("Could not toggle layer"),
	}
}

/// Apply one inbound event
///
/// Returns the reply for the sending connection only, if any. Everything meant for
/// all clients goes through `publisher`.
pub async fn handle_client_event(
	layers: &LayerService,
	publisher: &dyn EventPublisher,
	peer: &SyncPeer,
	event: ClientEvent,
) -> Option<ServerEvent> {
	match event {
		ClientEvent::LayerToggle(req) => {
			if !peer.can_toggle() {
				warn!(user = %peer.user_id, layer = %req.layer_id, "Toggle rejected - admin or moderator role required");
				return Some(toggle_error(&req, &Error::PermissionDenied));
			}
			if req.actor_id != peer.user_id {
				debug!(user = %peer.user_id, claimed = %req.actor_id, "Toggle actor differs from connection identity");
			}
			// The service publishes the confirmed layer:updated itself
			match layers.toggle_visibility(&req.layer_id, req.visible, &peer.actor()).await {
				Ok(_) => None,
				Err(e) => {
					info!(user = %peer.user_id, layer = %req.layer_id, "Toggle failed: {}", e);
					Some(toggle_error(&req, &e))
				}
			}
		}
		ClientEvent::UserPresence(presence) => {
			publisher.publish(ServerEvent::UserPresence(presence)).await;
			None
		}
		ClientEvent::LayerCreated(layer) => {
			// Republish the canonical record, never the relayed payload
			match layers.get(&layer.id).await {
				Ok(canonical) => {
					publisher.publish(ServerEvent::LayerCreated(canonical)).await;
				}
				Err(_) => debug!(layer = %layer.id, "Ignoring relay of unknown layer"),
			}
			None
		}
		ClientEvent::LayerDeleted(layer_ref) => {
			if layers.get(&layer_ref.layer_id).await.is_err() {
				publisher.publish(ServerEvent::LayerDeleted(layer_ref)).await;
			} else {
				debug!(layer = %layer_ref.layer_id, "Ignoring deletion relay of an existing layer");
			}
			None
		}
	}
}

/// Handle a sync-channel connection until either side closes it
pub async fn handle_sync_connection(ws: WebSocket, peer: SyncPeer, app: App) {
	info!("Sync connection: {} (conn={})", peer.user_id, peer.short_id());

	// Register before the snapshot so no event falls between the two
	let mut events_rx = app.broadcast.register(&peer.user_id, &peer.connection_id).await;

	let (ws_tx, mut ws_rx) = ws.split();
	let ws_tx = Arc::new(tokio::sync::Mutex::new(ws_tx));

	let init = ServerEvent::LayersInit(app.layers.list().await);
	match to_ws_message(&init) {
		Ok(msg) => {
			if ws_tx.lock().await.send(msg).await.is_err() {
				debug!("Client disconnected before layers:init");
				app.broadcast.unregister(&peer.user_id, &peer.connection_id).await;
				return;
			}
		}
		Err(e) => error!("Cannot encode layers:init: {}", e),
	}

	// Heartbeat task - sends ping frames to keep connection alive
	let ws_tx_heartbeat = ws_tx.clone();
	let heartbeat_user = peer.user_id.clone();
	let heartbeat_task = tokio::spawn(async move {
		let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
		loop {
			interval.tick().await;
			debug!("Sync heartbeat: {}", heartbeat_user);

			let mut tx = ws_tx_heartbeat.lock().await;
			if tx.send(Message::Ping(vec![].into())).await.is_err() {
				debug!("Client disconnected during heartbeat");
				return;
			}
		}
	});

	// WebSocket receive task - handles incoming events
	let recv_app = app.clone();
	let recv_peer = peer.clone();
	let ws_recv_task = tokio::spawn(async move {
		while let Some(msg) = ws_rx.next().await {
			let text = match msg {
				Ok(Message::Text(text)) => text,
				Ok(Message::Close(_)) => break,
				Ok(_) => continue,
				Err(e) => {
					warn!("Sync connection error: {}", e);
					break;
				}
			};
			let event = match ClientEvent::from_json(&text) {
				Ok(event) => event,
				Err(e) => {
					warn!(user = %recv_peer.user_id, "Failed to parse sync message: {}", e);
					continue;
				}
			};
			debug!(user = %recv_peer.user_id, event = event.name(), "Sync event received");

			let publisher = recv_app.broadcast.as_ref();
			let reply =
				handle_client_event(&recv_app.layers, publisher, &recv_peer, event).await;
			if let Some(reply) = reply {
				let delivery =
					recv_app.broadcast.send_to_connection(&recv_peer.connection_id, reply).await;
				if delivery == DeliveryResult::Offline {
					warn!("Failed to send sync reply");
					break;
				}
			}
		}
	});

	// Forward task - pushes fanned-out events to this socket
	let ws_tx_forward = ws_tx.clone();
	let forward_task = tokio::spawn(async move {
		loop {
			match events_rx.recv().await {
				Ok(event) => {
					let msg = match to_ws_message(&event) {
						Ok(msg) => msg,
						Err(e) => {
							error!("Cannot encode {}: {}", event.name(), e);
							continue;
						}
					};
					if ws_tx_forward.lock().await.send(msg).await.is_err() {
						debug!("Client disconnected while forwarding event");
						return;
					}
				}
				Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
					warn!("Sync receiver lagged, skipped {} events", n);
				}
				Err(tokio::sync::broadcast::error::RecvError::Closed) => {
					debug!("Sync receiver channel closed");
					return;
				}
			}
		}
	});

	let recv_abort = ws_recv_task.abort_handle();
	let forward_abort = forward_task.abort_handle();

	// Wait for any task to complete
	tokio::select! {
		_ = ws_recv_task => {
			debug!("Sync receive task ended");
		}
		_ = forward_task => {
			debug!("Sync forward task ended");
		}
	}

	// Cleanup
	app.broadcast.unregister(&peer.user_id, &peer.connection_id).await;
	heartbeat_task.abort();
	recv_abort.abort();
	forward_abort.abort();
	info!("Sync connection closed: {} (conn={})", peer.user_id, peer.short_id());
}


// vim: ts=4
