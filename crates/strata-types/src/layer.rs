//! Layer records, their access policy, audit entries and member records

use serde::{Deserialize, Serialize};

use crate::types::{Patch, Timestamp};

pub const DEFAULT_COLOR: &str = "#808080";
pub const DEFAULT_OPACITY: f32 = 1.0;

/// Access policy of a layer
///
/// When `public` is set `restricted_roles` is ignored. A non-public policy with no
/// restricted roles admits nobody.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
	pub public: bool,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub restricted_roles: Vec<String>,
}

impl AccessPolicy {
	pub fn public() -> Self {
		Self { public: true, restricted_roles: Vec::new() }
	}

	pub fn restricted<I, S>(roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut policy = Self { public: false, restricted_roles: Vec::new() };
		policy.restricted_roles = roles.into_iter().map(Into::into).collect();
		policy.normalize();
		policy
	}

	/// Lower-case and de-duplicate the restricted role names
	pub fn normalize(&mut self) {
		for role in &mut self.restricted_roles {
			*role = role.trim().to_lowercase();
		}
		self.restricted_roles.retain(|r| !r.is_empty());
		self.restricted_roles.sort();
		self.restricted_roles.dedup();
	}

	/// Whether a requester holding `roles` may see content under this policy
	pub fn admits<S: AsRef<str>>(&self, roles: &[S]) -> bool {
		if self.public {
			return true;
		}
		roles.iter().any(|role| {
			let role = role.as_ref();
			self.restricted_roles.iter().any(|r| r.eq_ignore_ascii_case(role))
		})
	}
}

impl Default for AccessPolicy {
	fn default() -> Self {
		Self::public()
	}
}

/// A named, content-bearing visibility domain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
	pub id: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	pub color: String,
	pub opacity: f32,
	pub is_visible: bool,
	pub created_by: String,
	pub user_count: u32,
	pub access: AccessPolicy,
	pub created_at: Timestamp,
	pub updated_at: Timestamp,
}

impl Layer {
	/// Whether `domain` names this layer (case-insensitive name or slug)
	pub fn matches_domain(&self, domain: &str) -> bool {
		let domain = domain.trim();
		self.name.eq_ignore_ascii_case(domain) || slugify(&self.name) == slugify(domain)
	}
}

/// Input for creating a layer
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLayer {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default)]
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub opacity: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub visible: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access: Option<AccessPolicy>,
}

impl CreateLayer {
	pub fn named(name: impl Into<String>) -> Self {
		Self { name: name.into(), ..Default::default() }
	}
}

/// Partial update of a layer
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPatch {
	#[serde(default, skip_serializing_if = "Patch::is_undefined")]
	pub name: Patch<String>,
	#[serde(default, skip_serializing_if = "Patch::is_undefined")]
	pub description: Patch<String>,
	#[serde(default, skip_serializing_if = "Patch::is_undefined")]
	pub color: Patch<String>,
	#[serde(default, skip_serializing_if = "Patch::is_undefined")]
	pub opacity: Patch<f32>,
	#[serde(default, alias = "isVisible", skip_serializing_if = "Patch::is_undefined")]
	pub visible: Patch<bool>,
	#[serde(default, skip_serializing_if = "Patch::is_undefined")]
	pub access: Patch<AccessPolicy>,
}

impl LayerPatch {
	pub fn visibility(visible: bool) -> Self {
		Self { visible: Patch::Value(visible), ..Default::default() }
	}

	/// Names of the fields this patch touches
	pub fn fields(&self) -> Vec<&'static str> {
		let mut fields = Vec::new();
		if !self.name.is_undefined() {
			fields.push("name");
		}
		if !self.description.is_undefined() {
			fields.push("description");
		}
		if !self.color.is_undefined() {
			fields.push("color");
		}
		if !self.opacity.is_undefined() {
			fields.push("opacity");
		}
		if !self.visible.is_undefined() {
			fields.push("isVisible");
		}
		if !self.access.is_undefined() {
			fields.push("access");
		}
		fields
	}
}

/// Audited registry mutations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
	#[serde(rename = "layer:create")]
	Create,
	#[serde(rename = "layer:update")]
	Update,
	#[serde(rename = "layer:delete")]
	Delete,
}

impl AuditAction {
	pub fn as_str(self) -> &'static str {
		match self {
			AuditAction::Create => "layer:create",
			AuditAction::Update => "layer:update",
			AuditAction::Delete => "layer:delete",
		}
	}
}

/// Immutable record of one registry mutation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
	pub id: u64,
	pub actor_id: String,
	pub actor_name: String,
	pub action: AuditAction,
	pub target_id: String,
	pub details: serde_json::Value,
	pub created_at: Timestamp,
}

/// Who performed a mutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
	pub id: String,
	pub name: String,
}

impl Actor {
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self { id: id.into(), name: name.into() }
	}

	pub fn system() -> Self {
		Self::new("system", "System")
	}
}

/// Public member record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub roles: Vec<String>,
	/// Publicly visible domain memberships
	#[serde(default)]
	pub domains: Vec<String>,
}

impl User {
	pub fn is_member_of(&self, layer: &Layer) -> bool {
		self.domains.iter().any(|d| layer.matches_domain(d))
	}
}

/// Aggregate view over the registry, refreshed by the reconciliation pass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
	pub total_layers: usize,
	pub visible_layers: usize,
	pub public_layers: usize,
	pub restricted_layers: usize,
	pub total_members: u64,
	pub online_connections: usize,
	pub audit_entries: usize,
	pub generated_at: Timestamp,
}

// Response bodies //
//****************//
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerListResponse {
	pub layers: Vec<Layer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerResponse {
	pub layer: Layer,
}

/// A layer with its public member roster
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerUsersResponse {
	pub layer: Layer,
	pub users: Vec<User>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditListResponse {
	pub entries: Vec<AuditLogEntry>,
}

/// Lower-case, dash-separated form of a layer name (`"Digital Art"` -> `"digital-art"`)
pub fn slugify(name: &str) -> String {
	let mut slug = String::with_capacity(name.len());
	let mut pending_dash = false;
	for c in name.trim().chars() {
		if c.is_alphanumeric() {
			if pending_dash && !slug.is_empty() {
				slug.push('-');
			}
			pending_dash = false;
			slug.extend(c.to_lowercase());
		} else {
			pending_dash = true;
		}
	}
	slug
}


// vim: ts=4
