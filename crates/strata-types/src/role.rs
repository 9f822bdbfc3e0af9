//! Role hierarchy, security tiers and per-session permission contexts
//!
//! Roles are totally ordered (`Guest < Member < Operator < Admin`); that ordering is
//! the only source of default tier accessibility and of authority over a tier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Session role, ordered by rank
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Guest,
	Member,
	Operator,
	Admin,
}

impl Role {
	pub const ALL: [Role; 4] = [Role::Guest, Role::Member, Role::Operator, Role::Admin];

	pub fn rank(self) -> u8 {
		match self {
			Role::Guest => 0,
			Role::Member => 1,
			Role::Operator => 2,
			Role::Admin => 3,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Role::Guest => "guest",
			Role::Member => "member",
			Role::Operator => "operator",
			Role::Admin => "admin",
		}
	}

	pub fn parse(s: &str) -> Option<Role> {
		match s.to_ascii_lowercase().as_str() {
			"guest" => Some(Role::Guest),
			"member" => Some(Role::Member),
			"operator" => Some(Role::Operator),
			"admin" => Some(Role::Admin),
			_ => None,
		}
	}
}

impl std::fmt::Display for Role {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Abstract visibility level
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityTier {
	Public,
	Trusted,
	Restricted,
}

impl SecurityTier {
	pub const ALL: [SecurityTier; 3] =
		[SecurityTier::Public, SecurityTier::Trusted, SecurityTier::Restricted];

	/// Lowest role allowed to grant or revoke access to this tier
	pub fn minimum_role(self) -> Role {
		match self {
			SecurityTier::Public => Role::Guest,
			SecurityTier::Trusted => Role::Member,
			SecurityTier::Restricted => Role::Operator,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			SecurityTier::Public => "public",
			SecurityTier::Trusted => "trusted",
			SecurityTier::Restricted => "restricted",
		}
	}
}

impl std::fmt::Display for SecurityTier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Per-session lens over the default role/tier table
///
/// Overrides are client-local and never persisted server-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionContext {
	pub role: Role,
	#[serde(default)]
	pub overrides: BTreeMap<SecurityTier, bool>,
}

impl PermissionContext {
	/// Fresh session context: base role, no overrides
	pub fn new(role: Role) -> Self {
		Self { role, overrides: BTreeMap::new() }
	}
}

/// One entry of an override batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideUpdate {
	pub tier: SecurityTier,
	pub allow: bool,
	/// Role of the actor requesting the change; defaults to the subject's own role
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub actor_role: Option<Role>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_role_order() {
		assert!(Role::Guest < Role::Member);
		assert!(Role::Member < Role::Operator);
		assert!(Role::Operator < Role::Admin);
		for pair in Role::ALL.windows(2) {
			assert!(pair[0].rank() < pair[1].rank());
		}
	}

	#[test]
	fn test_role_parse() {
		assert_eq!(Role::parse("Operator"), Some(Role::Operator));
		assert_eq!(Role::parse("artist"), None);
	}

	#[test]
	fn test_context_serde() {
		let json = r#"{ "role": "member", "overrides": { "restricted": true } }"#;
		let ctx: PermissionContext = serde_json::from_str(json).unwrap();
		assert_eq!(ctx.role, Role::Member);
		assert_eq!(ctx.overrides.get(&SecurityTier::Restricted), Some(&true));
	}
}

// vim: ts=4
