//! Error type shared by the registry, the REST surface and the client store

use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde::Serialize;

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Unknown layer id or domain
	NotFound,
	/// Role lacks the authority required by a route or a restricted layer
	PermissionDenied,
	/// No usable credentials were presented
	Unauthorized,
	/// Missing or malformed input
	ValidationError(String),
	/// Upstream request failed (client side)
	NetworkError(String),
	/// Payload could not be decoded
	Parse,
	Internal(String),

	// externals
	Io(std::io::Error),
}

impl Error {
	/// Stable error code used in JSON bodies and socket errors
	pub fn code(&self) -> &'static str {
		match self {
			Error::NotFound => "E-CORE-NOTFOUND",
			Error::PermissionDenied => "E-AUTH-NOPERM",
			Error::Unauthorized => "E-AUTH-UNAUTH",
			Error::ValidationError(_) => "E-VAL-INVALID",
			Error::NetworkError(_) => "E-NET-FAILED",
			Error::Parse => "E-CORE-PARSE",
			Error::Internal(_) | Error::Io(_) => "E-CORE-INTERNAL",
		}
	}

	pub fn status(&self) -> StatusCode {
		match self {
			Error::NotFound => StatusCode::NOT_FOUND,
			Error::PermissionDenied => StatusCode::FORBIDDEN,
			Error::Unauthorized => StatusCode::UNAUTHORIZED,
			Error::ValidationError(_) | Error::Parse => StatusCode::BAD_REQUEST,
			Error::NetworkError(_) => StatusCode::BAD_GATEWAY,
			Error::Internal(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Error::NotFound => write!(f, "not found"),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::Unauthorized => write!(f, "unauthorized"),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::NetworkError(msg) => write!(f, "network error: {}", msg),
			Error::Parse => write!(f, "parse error"),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		tracing::debug!("json error: {}", err);
		Self::Parse
	}
}

#[derive(Serialize)]
struct ErrorBody<'a> {
	code: &'a str,
	message: String,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
	error: ErrorBody<'a>,
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = self.status();
		// Internal details stay in the log
		let message = match &self {
			Error::Internal(msg) => {
				tracing::error!("internal error: {}", msg);
				"internal error".to_string()
			}
			Error::Io(err) => {
				tracing::error!("io error: {}", err);
				"internal error".to_string()
			}
			other => other.to_string(),
		};
		let body = ErrorResponse { error: ErrorBody { code: self.code(), message } };
		(status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_mapping() {
		assert_eq!(Error::NotFound.status(), StatusCode::NOT_FOUND);
		assert_eq!(Error::PermissionDenied.status(), StatusCode::FORBIDDEN);
		assert_eq!(Error::ValidationError("x".into()).status(), StatusCode::BAD_REQUEST);
		assert_eq!(Error::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn test_display() {
		assert_eq!(Error::NotFound.to_string(), "not found");
		assert_eq!(
			Error::ValidationError("name is required".into()).to_string(),
			"validation error: name is required"
		);
	}
}

// vim: ts=4
