//! Bearer token issuing and validation
//!
//! Identity verification happens elsewhere; this module only carries an already
//! established identity (user id, display name, role names) between requests.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::prelude::*;

/// Default token lifetime
pub const TOKEN_EXPIRE_SECS: i64 = 8 * 3600;

/// Anonymous requesters are evaluated with this role-set
pub const ANONYMOUS_ROLE: &str = "guest";

/// Authenticated request context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
	pub user_id: Box<str>,
	pub name: Box<str>,
	pub roles: Box<[Box<str>]>,
}

impl AuthCtx {
	pub fn new<I, S>(user_id: &str, name: &str, roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self {
			user_id: user_id.into(),
			name: name.into(),
			roles: roles
				.into_iter()
				.map(|r| Box::<str>::from(r.as_ref().trim().to_lowercase()))
				.collect(),
		}
	}

	pub fn has_role(&self, role: &str) -> bool {
		self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
	}

	pub fn has_any_role(&self, roles: &[&str]) -> bool {
		roles.iter().any(|role| self.has_role(role))
	}
}

/// Role-set used for visibility decisions; anonymous requesters count as guests
pub fn role_set(auth: Option<&AuthCtx>) -> Vec<String> {
	match auth {
		Some(auth) if !auth.roles.is_empty() => auth.roles.iter().map(ToString::to_string).collect(),
		_ => vec![ANONYMOUS_ROLE.to_string()],
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
	sub: String,
	#[serde(default)]
	name: String,
	#[serde(default)]
	roles: Vec<String>,
	exp: i64,
}

struct Keys {
	encoding: EncodingKey,
	decoding: DecodingKey,
}

/// HS256 key pair shared by the token issuer and the auth middleware
#[derive(Clone)]
pub struct TokenKeys(Arc<Keys>);

impl TokenKeys {
	pub fn new(secret: &[u8]) -> Self {
		Self(Arc::new(Keys {
			encoding: EncodingKey::from_secret(secret),
			decoding: DecodingKey::from_secret(secret),
		}))
	}

	pub fn issue(&self, auth: &AuthCtx) -> ClResult<String> {
		self.issue_with_expiry(auth, Timestamp::now().add_seconds(TOKEN_EXPIRE_SECS))
	}

	pub fn issue_with_expiry(&self, auth: &AuthCtx, expires_at: Timestamp) -> ClResult<String> {
		let claims = Claims {
			sub: auth.user_id.to_string(),
			name: auth.name.to_string(),
			roles: auth.roles.iter().map(ToString::to_string).collect(),
			exp: expires_at.0,
		};
		encode(&Header::new(Algorithm::HS256), &claims, &self.0.encoding)
			.map_err(|e| Error::Internal(format!("token encoding failed: {}", e)))
	}

	pub fn validate(&self, token: &str) -> ClResult<AuthCtx> {
		let data = decode::<Claims>(token, &self.0.decoding, &Validation::new(Algorithm::HS256))
			.map_err(|e| {
				debug!("Token rejected: {}", e);
				Error::Unauthorized
			})?;
		let claims = data.claims;
		let name = if claims.name.is_empty() { claims.sub.clone() } else { claims.name };
		Ok(AuthCtx::new(&claims.sub, &name, claims.roles))
	}
}

impl std::fmt::Debug for TokenKeys {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenKeys").finish_non_exhaustive()
	}
}


// vim: ts=4
