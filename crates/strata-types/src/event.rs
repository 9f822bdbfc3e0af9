//! Push-channel events
//!
//! Every frame is a JSON object `{ "event": "<name>", "data": <payload> }`.

use serde::{Deserialize, Serialize};

use crate::error::ClResult;
use crate::layer::Layer;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRef {
	pub layer_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
	pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
	pub user_id: String,
	pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
	pub layer_id: String,
	pub visible: bool,
	pub actor_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub actor_name: Option<String>,
}

/// Server to client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
	#[serde(rename = "layers:init")]
	LayersInit(Vec<Layer>),
	#[serde(rename = "layer:created")]
	LayerCreated(Layer),
	#[serde(rename = "layer:updated")]
	LayerUpdated(Layer),
	#[serde(rename = "layer:deleted")]
	LayerDeleted(LayerRef),
	#[serde(rename = "layer:error")]
	LayerError(ErrorMessage),
	#[serde(rename = "user:presence")]
	UserPresence(Presence),
}

impl ServerEvent {
	pub fn deleted(layer_id: impl Into<String>) -> Self {
		ServerEvent::LayerDeleted(LayerRef { layer_id: layer_id.into() })
	}

	pub fn error(message: impl Into<String>) -> Self {
		ServerEvent::LayerError(ErrorMessage { message: message.into() })
	}

	pub fn name(&self) -> &'static str {
		match self {
			ServerEvent::LayersInit(_) => "layers:init",
			ServerEvent::LayerCreated(_) => "layer:created",
			ServerEvent::LayerUpdated(_) => "layer:updated",
			ServerEvent::LayerDeleted(_) => "layer:deleted",
			ServerEvent::LayerError(_) => "layer:error",
			ServerEvent::UserPresence(_) => "user:presence",
		}
	}

	pub fn to_json(&self) -> ClResult<String> {
		Ok(serde_json::to_string(self)?)
	}

	pub fn from_json(text: &str) -> ClResult<Self> {
		Ok(serde_json::from_str(text)?)
	}
}

/// Client to server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
	#[serde(rename = "layer:toggle")]
	LayerToggle(ToggleRequest),
	/// Relay of a REST-created layer to peers
	#[serde(rename = "layer:created")]
	LayerCreated(Layer),
	/// Relay of a REST deletion to peers
	#[serde(rename = "layer:deleted")]
	LayerDeleted(LayerRef),
	#[serde(rename = "user:presence")]
	UserPresence(Presence),
}

impl ClientEvent {
	pub fn name(&self) -> &'static str {
		match self {
			ClientEvent::LayerToggle(_) => "layer:toggle",
			ClientEvent::LayerCreated(_) => "layer:created",
			ClientEvent::LayerDeleted(_) => "layer:deleted",
			ClientEvent::UserPresence(_) => "user:presence",
		}
	}

	pub fn to_json(&self) -> ClResult<String> {
		Ok(serde_json::to_string(self)?)
	}

	pub fn from_json(text: &str) -> ClResult<Self> {
		Ok(serde_json::from_str(text)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_server_event_framing() {
		let json = ServerEvent::deleted("abc").to_json().unwrap();
		let value: serde_json::Value = serde_json::from_str(&json).unwrap();
		assert_eq!(value, json!({ "event": "layer:deleted", "data": { "layerId": "abc" } }));
	}

	#[test]
	fn test_client_toggle_parse() {
		let text = r#"{"event":"layer:toggle","data":{"layerId":"l1","visible":false,"actorId":"u1","actorName":"Ann"}}"#;
		let event = ClientEvent::from_json(text).unwrap();
		assert_eq!(
			event,
			ClientEvent::LayerToggle(ToggleRequest {
				layer_id: "l1".into(),
				visible: false,
				actor_id: "u1".into(),
				actor_name: Some("Ann".into()),
			})
		);
		assert_eq!(event.name(), "layer:toggle");
	}

	#[test]
	fn test_unknown_event_rejected() {
		assert!(ClientEvent::from_json(r#"{"event":"layer:nuke","data":{}}"#).is_err());
	}
}

// vim: ts=4
