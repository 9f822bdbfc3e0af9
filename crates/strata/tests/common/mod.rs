//! Common test utilities and helpers
//!
//! Builds the full router against an in-memory user directory and drives it with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use strata::{App, AppBuilder};
use strata_core::auth::{AuthCtx, TokenKeys};
use strata_layer::directory::MemoryUserDirectory;
use strata_types::layer::User;

pub const SECRET: &str = "test-secret";

pub struct TestApp {
	pub app: App,
	pub router: Router,
	pub keys: TokenKeys,
}

fn user(id: &str, domains: &[&str]) -> User {
	User {
		id: id.into(),
		name: id.into(),
		roles: vec![],
		domains: domains.iter().map(|d| (*d).to_string()).collect(),
	}
}

pub async fn test_app() -> TestApp {
	let directory = MemoryUserDirectory::new(vec![
		user("ann", &["digital-art", "music"]),
		user("bob", &["Music"]),
		user("cid", &["games"]),
	]);
	let mut builder = AppBuilder::new();
	builder.jwt_secret(SECRET).user_directory(Arc::new(directory));
	let (app, router) = builder.build().await.unwrap();

	TestApp { app, router, keys: TokenKeys::new(SECRET.as_bytes()) }
}

impl TestApp {
	pub fn token(&self, roles: &[&str]) -> String {
		let id = roles.first().copied().unwrap_or("nobody");
		self.keys.issue(&AuthCtx::new(&format!("{}-1", id), id, roles.iter().copied())).unwrap()
	}

	pub async fn call(
		&self,
		method: Method,
		uri: &str,
		token: Option<&str>,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let mut req = Request::builder().method(method).uri(uri);
		if let Some(token) = token {
			req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
		}
		let body = match body {
			Some(body) => {
				req = req.header(header::CONTENT_TYPE, "application/json");
				Body::from(body.to_string())
			}
			None => Body::empty(),
		};

		let res = self.router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
		let status = res.status();
		let bytes = res.into_body().collect().await.unwrap().to_bytes();
		let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
		(status, value)
	}

	pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
		self.call(Method::GET, uri, token, None).await
	}
}

// vim: ts=4
