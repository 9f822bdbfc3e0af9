//! Authentication and role middleware

use axum::{
	extract::{Request, State},
	http::header,
	middleware::Next,
	response::Response,
};

use crate::auth::TokenKeys;
use crate::extract::Auth;
use crate::prelude::*;

/// Roles allowed to run moderator-level routes
pub const MODERATOR_ROLES: &[&str] = &["admin", "moderator"];

fn bearer_token(req: &Request) -> Option<&str> {
	if let Some(value) = req.headers().get(header::AUTHORIZATION).and_then(|h| h.to_str().ok()) {
		return value.strip_prefix("Bearer ");
	}
	// Browsers cannot set headers on websocket upgrades
	req.uri()
		.query()?
		.split('&')
		.find_map(|pair| pair.strip_prefix("token="))
		.filter(|token| !token.is_empty())
}

/// Decode a bearer token if present and attach it as an `Auth` extension
///
/// Missing or invalid tokens leave the request anonymous.
pub async fn optional_auth(State(keys): State<TokenKeys>, mut req: Request, next: Next) -> Response {
	let auth = bearer_token(&req).and_then(|token| keys.validate(token).ok());
	if let Some(auth) = auth {
		req.extensions_mut().insert(Auth(auth));
	}
	next.run(req).await
}

/// Middleware that requires the `admin` role
pub async fn require_admin(Auth(auth): Auth, req: Request, next: Next) -> Result<Response, Error> {
	if !auth.has_role("admin") {
		warn!(
			subject = %auth.user_id,
			roles = ?auth.roles,
			"Permission denied - admin role required"
		);
		return Err(Error::PermissionDenied);
	}

	Ok(next.run(req).await)
}

/// Middleware that requires the `admin` or `moderator` role
pub async fn require_moderator(
	Auth(auth): Auth,
	req: Request,
	next: Next,
) -> Result<Response, Error> {
	if !auth.has_any_role(MODERATOR_ROLES) {
		warn!(
			subject = %auth.user_id,
			roles = ?auth.roles,
			"Permission denied - admin or moderator role required"
		);
		return Err(Error::PermissionDenied);
	}

	Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::auth::AuthCtx;
	use crate::extract::OptionalAuth;
	use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
	use tower::ServiceExt;

	async fn whoami(OptionalAuth(auth): OptionalAuth) -> String {
		auth.map(|a| a.user_id.to_string()).unwrap_or_else(|| "anonymous".to_string())
	}

	fn router(keys: &TokenKeys) -> Router {
		let admin = Router::new()
			.route("/admin", get(whoami))
			.route_layer(middleware::from_fn(require_admin));
		let moderator = Router::new()
			.route("/moderator", get(whoami))
			.route_layer(middleware::from_fn(require_moderator));
		Router::new()
			.route("/open", get(whoami))
			.merge(admin)
			.merge(moderator)
			.layer(middleware::from_fn_with_state(keys.clone(), optional_auth))
	}

	async fn call(router: Router, uri: &str, token: Option<&str>) -> (StatusCode, String) {
		let mut req = axum::http::Request::builder().uri(uri);
		if let Some(token) = token {
			req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
		}
		let res = router.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
		let status = res.status();
		let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
		(status, String::from_utf8_lossy(&body).to_string())
	}

	#[tokio::test]
	async fn test_anonymous_and_bearer() {
		let keys = TokenKeys::new(b"secret");
		let token = keys.issue(&AuthCtx::new("ann", "Ann", ["member"])).unwrap();

		assert_eq!(call(router(&keys), "/open", None).await, (StatusCode::OK, "anonymous".into()));
		assert_eq!(call(router(&keys), "/open", Some(&token)).await, (StatusCode::OK, "ann".into()));
		assert_eq!(
			call(router(&keys), &format!("/open?token={}", token), None).await,
			(StatusCode::OK, "ann".into())
		);
		assert_eq!(
			call(router(&keys), "/open", Some("garbage")).await,
			(StatusCode::OK, "anonymous".into())
		);
	}

	#[tokio::test]
	async fn test_role_gates() {
		let keys = TokenKeys::new(b"secret");
		let member = keys.issue(&AuthCtx::new("ann", "Ann", ["member"])).unwrap();
		let moderator = keys.issue(&AuthCtx::new("bob", "Bob", ["moderator"])).unwrap();
		let admin = keys.issue(&AuthCtx::new("eve", "Eve", ["admin"])).unwrap();

		assert_eq!(call(router(&keys), "/admin", None).await.0, StatusCode::UNAUTHORIZED);
		assert_eq!(call(router(&keys), "/admin", Some(&member)).await.0, StatusCode::FORBIDDEN);
		assert_eq!(call(router(&keys), "/admin", Some(&moderator)).await.0, StatusCode::FORBIDDEN);
		assert_eq!(call(router(&keys), "/admin", Some(&admin)).await.0, StatusCode::OK);

		assert_eq!(call(router(&keys), "/moderator", Some(&member)).await.0, StatusCode::FORBIDDEN);
		assert_eq!(call(router(&keys), "/moderator", Some(&moderator)).await.0, StatusCode::OK);
		assert_eq!(call(router(&keys), "/moderator", Some(&admin)).await.0, StatusCode::OK);
	}
}

// vim: ts=4
