//! Integration tests for the `/ws` sync channel over a real socket

mod common;

use axum::http::{Method, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use common::{TestApp, test_app};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(t: &TestApp) -> String {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let router = t.router.clone();
	tokio::spawn(async move {
		axum::serve(listener, router).await.unwrap();
	});
	format!("ws://{}/ws", addr)
}

async fn connect(url: &str, token: Option<&str>) -> WsClient {
	let url = match token {
		Some(token) => format!("{}?token={}", url, token),
		None => url.to_string(),
	};
	let (ws, _) = connect_async(url).await.unwrap();
	ws
}

/// Next text frame as JSON, skipping heartbeat pings
async fn next_event(ws: &mut WsClient) -> Value {
	loop {
		let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
			.await
			.expect("no frame within 5s")
			.expect("socket closed")
			.unwrap();
		if let Message::Text(text) = msg {
			return serde_json::from_str(text.as_str()).unwrap();
		}
	}
}

async fn send(ws: &mut WsClient, event: Value) {
	ws.send(Message::Text(event.to_string().into())).await.unwrap();
}

async fn wait_for_connections(t: &TestApp, expected: usize) {
	for _ in 0..200 {
		if t.app.broadcast.stats().await.total_connections == expected {
			return;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("connection count never reached {}", expected);
}

async fn create(t: &TestApp, name: &str) -> Value {
	let admin = t.token(&["admin"]);
	let (status, body) =
		t.call(Method::POST, "/layers/new", Some(&admin), Some(json!({ "name": name }))).await;
	assert_eq!(status, StatusCode::CREATED);
	body["layer"].clone()
}

#[tokio::test]
async fn test_connection_lifecycle() {
	let t = test_app().await;
	let music = create(&t, "Music").await;
	let url = serve(&t).await;

	let mut ws = connect(&url, None).await;
	let init = next_event(&mut ws).await;
	assert_eq!(init["event"], "layers:init");
	assert_eq!(init["data"], json!([music]));
	wait_for_connections(&t, 1).await;

	let games = create(&t, "Games").await;
	let created = next_event(&mut ws).await;
	assert_eq!(created["event"], "layer:created");
	assert_eq!(created["data"], games);

	ws.close(None).await.unwrap();
	wait_for_connections(&t, 0).await;
}

#[tokio::test]
async fn test_toggle_is_republished_to_everyone() {
	let t = test_app().await;
	let music = create(&t, "Music").await;
	let url = serve(&t).await;

	let moderator = t.token(&["moderator"]);
	let mut actor = connect(&url, Some(&moderator)).await;
	let mut peer = connect(&url, None).await;
	next_event(&mut actor).await;
	next_event(&mut peer).await;
	wait_for_connections(&t, 2).await;

	let toggle = json!({
		"event": "layer:toggle",
		"data": { "layerId": music["id"], "visible": false, "actorId": "moderator-1" }
	});
	send(&mut actor, toggle).await;

	for ws in [&mut actor, &mut peer] {
		let updated = next_event(ws).await;
		assert_eq!(updated["event"], "layer:updated");
		assert_eq!(updated["data"]["id"], music["id"]);
		assert_eq!(updated["data"]["isVisible"], false);
	}
}

#[tokio::test]
async fn test_toggle_errors_reach_only_the_sender() {
	let t = test_app().await;
	let music = create(&t, "Music").await;
	let url = serve(&t).await;

	let moderator = t.token(&["moderator"]);
	let mut actor = connect(&url, Some(&moderator)).await;
	let mut guest = connect(&url, None).await;
	next_event(&mut actor).await;
	next_event(&mut guest).await;
	wait_for_connections(&t, 2).await;

	let unknown = json!({
		"event": "layer:toggle",
		"data": { "layerId": "nope", "visible": true, "actorId": "moderator-1" }
	});
	send(&mut actor, unknown).await;
	let error = next_event(&mut actor).await;
	assert_eq!(error["event"], "layer:error");
	assert_eq!(error["data"]["message"], "Layer nope not found");

	let denied = json!({
		"event": "layer:toggle",
		"data": { "layerId": music["id"], "visible": false, "actorId": "anyone" }
	});
	send(&mut guest, denied).await;
	let error = next_event(&mut guest).await;
	assert_eq!(error["event"], "layer:error");

	// neither error was fanned out: the next frame both see is the presence update
	let presence = json!({ "event": "user:presence", "data": { "userId": "ann", "status": "away" } });
	send(&mut actor, presence.clone()).await;
	assert_eq!(next_event(&mut guest).await, presence);
	assert_eq!(next_event(&mut actor).await, presence);

	let (_, body) = t.get(&format!("/layers/by-id/{}/users", music["id"].as_str().unwrap()), None).await;
	assert_eq!(body["layer"]["isVisible"], true);
}

// vim: ts=4
