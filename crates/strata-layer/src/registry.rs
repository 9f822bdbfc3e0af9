//! Layer registry
//!
//! Authoritative table of layer records keyed by id. The map is never handed out;
//! every mutation goes through [`LayerRegistry::create`], [`LayerRegistry::update`] or
//! [`LayerRegistry::remove`], each of which appends exactly one audit entry.

use serde_json::json;
use std::collections::HashMap;

use crate::audit::AuditLog;
use crate::prelude::*;
use strata_types::layer::{
	AccessPolicy, Actor, AuditAction, CreateLayer, DEFAULT_COLOR, DEFAULT_OPACITY, Layer,
	LayerPatch, User, slugify,
};
use strata_types::utils::random_id;

pub struct LayerRegistry {
	layers: HashMap<String, Layer>,
	/// Insertion order of ids
	order: Vec<String>,
	audit: AuditLog,
}

fn validate_name(name: &str) -> ClResult<String> {
	let name = name.trim();
	if name.is_empty() {
		return Err(Error::ValidationError("Layer name is required".into()));
	}
	Ok(name.to_string())
}

fn validate_opacity(opacity: f32) -> ClResult<f32> {
	if !opacity.is_finite() || !(0.0..=1.0).contains(&opacity) {
		return Err(Error::ValidationError("Opacity must be between 0 and 1".into()));
	}
	Ok(opacity)
}

fn validate_color(color: &str) -> ClResult<String> {
	let color = color.trim();
	if color.is_empty() {
		return Err(Error::ValidationError("Color cannot be empty".into()));
	}
	Ok(color.to_string())
}

fn check_policy(name: &str, policy: &mut AccessPolicy) {
	policy.normalize();
	if !policy.public && policy.restricted_roles.is_empty() {
		warn!(layer = %name, "Restricted layer has no roles and is accessible to nobody");
	}
}

impl LayerRegistry {
	pub fn new(audit: AuditLog) -> Self {
		Self { layers: HashMap::new(), order: Vec::new(), audit }
	}

	pub fn len(&self) -> usize {
		self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	/// All layers in creation order
	pub fn list(&self) -> Vec<Layer> {
		self.order.iter().filter_map(|id| self.layers.get(id)).cloned().collect()
	}

	pub fn get(&self, id: &str) -> Option<&Layer> {
		self.layers.get(id)
	}

	/// Visible layers whose policy admits any of `roles`
	pub fn get_visible<S: AsRef<str>>(&self, roles: &[S]) -> Vec<Layer> {
		self.order
			.iter()
			.filter_map(|id| self.layers.get(id))
			.filter(|layer| layer.is_visible && layer.access.admits(roles))
			.cloned()
			.collect()
	}

	/// Case-insensitive exact name match
	pub fn find_by_name(&self, name: &str) -> Option<&Layer> {
		let name = name.trim();
		self.order
			.iter()
			.filter_map(|id| self.layers.get(id))
			.find(|layer| layer.name.eq_ignore_ascii_case(name))
	}

	/// Name match first, then slug match (`digital-art` -> `Digital Art`)
	pub fn find_by_domain(&self, domain: &str) -> Option<&Layer> {
		self.find_by_name(domain).or_else(|| {
			self.order
				.iter()
				.filter_map(|id| self.layers.get(id))
				.find(|layer| layer.matches_domain(domain))
		})
	}

	/// Names must stay unique both as written and as domain slugs
	fn ensure_unique_name(&self, name: &str, except_id: Option<&str>) -> ClResult<()> {
		let slug = slugify(name);
		let conflict = self.layers.values().find(|layer| {
			Some(layer.id.as_str()) != except_id
				&& (layer.name.eq_ignore_ascii_case(name)
					|| (!slug.is_empty() && slugify(&layer.name) == slug))
		});
		match conflict {
			Some(existing) if existing.name.eq_ignore_ascii_case(name) => Err(
				Error::ValidationError(format!("Layer name '{}' is already in use", name)),
			),
			Some(existing) => Err(Error::ValidationError(format!(
				"Layer name '{}' conflicts with '{}'",
				name, existing.name
			))),
			None => Ok(()),
		}
	}

	pub fn create(&mut self, input: CreateLayer, actor: &Actor) -> ClResult<Layer> {
		let name = validate_name(&input.name)?;
		self.ensure_unique_name(&name, None)?;

		let id = match input.id.as_deref().map(str::trim) {
			Some(id) if !id.is_empty() => {
				if self.layers.contains_key(id) {
					return Err(Error::ValidationError(format!("Layer id '{}' already exists", id)));
				}
				id.to_string()
			}
			_ => random_id()?,
		};
		let color = match input.color.as_deref() {
			Some(color) => validate_color(color)?,
			None => DEFAULT_COLOR.to_string(),
		};
		let opacity = validate_opacity(input.opacity.unwrap_or(DEFAULT_OPACITY))?;
		let mut access = input.access.unwrap_or_default();
		check_policy(&name, &mut access);

		let now = Timestamp::now();
		let layer = Layer {
			id: id.clone(),
			name,
			description: input.description.filter(|d| !d.trim().is_empty()),
			color,
			opacity,
			is_visible: input.visible.unwrap_or(true),
			created_by: actor.id.clone(),
			user_count: 0,
			access,
			created_at: now,
			updated_at: now,
		};

		self.audit.append(
			actor,
			AuditAction::Create,
			&layer.id,
			json!({ "name": layer.name, "access": layer.access }),
		);
		self.layers.insert(id.clone(), layer.clone());
		self.order.push(id);
		Ok(layer)
	}

	pub fn update(&mut self, id: &str, patch: LayerPatch, actor: &Actor) -> ClResult<Layer> {
		let current = self.layers.get(id).ok_or(Error::NotFound)?;
		let mut layer = current.clone();

		match patch.name.as_ref() {
			Patch::Value(name) => {
				let name = validate_name(name)?;
				self.ensure_unique_name(&name, Some(id))?;
				layer.name = name;
			}
			Patch::Null => return Err(Error::ValidationError("Layer name is required".into())),
			Patch::Undefined => {}
		}
		match patch.description.as_ref() {
			Patch::Value(description) if !description.trim().is_empty() => {
				layer.description = Some(description.clone());
			}
			Patch::Value(_) | Patch::Null => layer.description = None,
			Patch::Undefined => {}
		}
		match patch.color.as_ref() {
			Patch::Value(color) => layer.color = validate_color(color)?,
			Patch::Null => layer.color = DEFAULT_COLOR.to_string(),
			Patch::Undefined => {}
		}
		match patch.opacity {
			Patch::Value(opacity) => layer.opacity = validate_opacity(opacity)?,
			Patch::Null => layer.opacity = DEFAULT_OPACITY,
			Patch::Undefined => {}
		}
		match patch.visible {
			Patch::Value(visible) => layer.is_visible = visible,
			Patch::Null => return Err(Error::ValidationError("Visibility cannot be null".into())),
			Patch::Undefined => {}
		}
		match patch.access.as_ref() {
			Patch::Value(access) => {
				let mut access = access.clone();
				check_policy(&layer.name, &mut access);
				layer.access = access;
			}
			Patch::Null => layer.access = AccessPolicy::public(),
			Patch::Undefined => {}
		}
		layer.updated_at = Timestamp::now();

		self.audit.append(
			actor,
			AuditAction::Update,
			id,
			json!({ "name": layer.name, "fields": patch.fields() }),
		);
		self.layers.insert(id.to_string(), layer.clone());
		Ok(layer)
	}

	pub fn toggle_visibility(&mut self, id: &str, visible: bool, actor: &Actor) -> ClResult<Layer> {
		self.update(id, LayerPatch::visibility(visible), actor)
	}

	/// Hard-remove a layer and return its last record
	pub fn remove(&mut self, id: &str, actor: &Actor) -> ClResult<Layer> {
		let layer = self.layers.remove(id).ok_or(Error::NotFound)?;
		self.order.retain(|existing| existing != id);

		self.audit.append(actor, AuditAction::Delete, id, json!({ "name": layer.name }));
		Ok(layer)
	}

	/// Recount members per layer from public domain memberships
	///
	/// Returns the layers whose count changed. Not audited: this is a reconciliation
	/// pass, not a mutation.
	pub fn refresh_user_counts(&mut self, users: &[User]) -> Vec<Layer> {
		let mut changed = Vec::new();
		for id in &self.order {
			let Some(layer) = self.layers.get_mut(id) else { continue };
			let count = users.iter().filter(|user| user.is_member_of(layer)).count();
			let count = u32::try_from(count).unwrap_or(u32::MAX);
			if layer.user_count != count {
				layer.user_count = count;
				changed.push(layer.clone());
			}
		}
		changed
	}

	pub fn audit(&self) -> &AuditLog {
		&self.audit
	}
}

impl Default for LayerRegistry {
	fn default() -> Self {
		Self::new(AuditLog::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn admin() -> Actor {
		Actor::new("admin-1", "Admin")
	}

	fn digital_art() -> CreateLayer {
		CreateLayer {
			name: "Digital Art".into(),
			access: Some(AccessPolicy::restricted(["admin", "moderator", "artist"])),
			..Default::default()
		}
	}

	fn user(id: &str, domains: &[&str]) -> User {
		User {
			id: id.into(),
			name: id.into(),
			roles: vec![],
			domains: domains.iter().map(|d| (*d).to_string()).collect(),
		}
	}

	#[test]
	fn test_create_defaults() {
		let mut registry = LayerRegistry::default();
		let layer = registry.create(CreateLayer::named("  Music "), &admin()).unwrap();

		assert_eq!(layer.name, "Music");
		assert_eq!(layer.id.len(), strata_types::utils::ID_LENGTH);
		assert_eq!(layer.user_count, 0);
		assert_eq!(layer.created_by, "admin-1");
		assert_eq!(layer.created_at, layer.updated_at);
		assert!(layer.is_visible);
		assert!(layer.access.public);
		assert_eq!(registry.list(), vec![layer]);
	}

	#[test]
	fn test_create_validation() {
		let mut registry = LayerRegistry::default();
		assert!(matches!(
			registry.create(CreateLayer::named("  "), &admin()),
			Err(Error::ValidationError(_))
		));
		let bad_opacity = CreateLayer { opacity: Some(1.5), ..CreateLayer::named("x") };
		assert!(matches!(registry.create(bad_opacity, &admin()), Err(Error::ValidationError(_))));

		registry.create(CreateLayer::named("Music"), &admin()).unwrap();
		assert!(matches!(
			registry.create(CreateLayer::named("MUSIC"), &admin()),
			Err(Error::ValidationError(_))
		));
		// failed creates are not audited
		assert_eq!(registry.audit().len(), 1);
	}

	#[test]
	fn test_explicit_id() {
		let mut registry = LayerRegistry::default();
		let input = CreateLayer { id: Some("music".into()), ..CreateLayer::named("Music") };
		assert_eq!(registry.create(input.clone(), &admin()).unwrap().id, "music");
		let dup = CreateLayer { name: "Other".into(), ..input };
		assert!(registry.create(dup, &admin()).is_err());
	}

	#[test]
	fn test_get_visible() {
		let mut registry = LayerRegistry::default();
		let art = registry.create(digital_art(), &admin()).unwrap();
		let music = registry.create(CreateLayer::named("Music"), &admin()).unwrap();
		let hidden = CreateLayer { visible: Some(false), ..CreateLayer::named("Hidden") };
		registry.create(hidden, &admin()).unwrap();

		let names = |layers: Vec<Layer>| layers.into_iter().map(|l| l.name).collect::<Vec<_>>();
		assert_eq!(names(registry.get_visible(&["user"])), vec!["Music"]);
		assert_eq!(names(registry.get_visible(&["artist"])), vec!["Digital Art", "Music"]);
		assert_eq!(names(registry.get_visible(&["user", "moderator"])), vec!["Digital Art", "Music"]);

		registry.toggle_visibility(&art.id, false, &admin()).unwrap();
		assert_eq!(names(registry.get_visible(&["artist"])), vec!["Music"]);
		assert_eq!(registry.get(&music.id).map(|l| l.is_visible), Some(true));
	}

	#[test]
	fn test_update_merges_fields() {
		let mut registry = LayerRegistry::default();
		let layer = registry.create(CreateLayer::named("Music"), &admin()).unwrap();

		let patch = LayerPatch {
			color: Patch::Value("#ff0000".into()),
			opacity: Patch::Value(0.5),
			..Default::default()
		};
		let updated = registry.update(&layer.id, patch, &admin()).unwrap();
		assert_eq!(updated.name, "Music");
		assert_eq!(updated.color, "#ff0000");
		assert!((updated.opacity - 0.5).abs() < f32::EPSILON);
		assert!(updated.updated_at >= layer.updated_at);
		assert_eq!(updated.created_at, layer.created_at);

		let rename = LayerPatch { name: Patch::Null, ..Default::default() };
		assert!(matches!(registry.update(&layer.id, rename, &admin()), Err(Error::ValidationError(_))));
	}

	#[test]
	fn test_rename_conflict() {
		let mut registry = LayerRegistry::default();
		let music = registry.create(CreateLayer::named("Music"), &admin()).unwrap();
		registry.create(CreateLayer::named("Games"), &admin()).unwrap();

		let to_games = LayerPatch { name: Patch::Value("games".into()), ..Default::default() };
		assert!(registry.update(&music.id, to_games, &admin()).is_err());
		// renaming to its own name with different case is allowed
		let recase = LayerPatch { name: Patch::Value("MUSIC".into()), ..Default::default() };
		assert_eq!(registry.update(&music.id, recase, &admin()).unwrap().name, "MUSIC");
	}

	#[test]
	fn test_not_found() {
		let mut registry = LayerRegistry::default();
		assert!(matches!(
			registry.update("nope", LayerPatch::default(), &admin()),
			Err(Error::NotFound)
		));
		assert!(matches!(registry.toggle_visibility("nope", true, &admin()), Err(Error::NotFound)));
		assert!(matches!(registry.remove("nope", &admin()), Err(Error::NotFound)));
		assert!(registry.audit().is_empty());
	}

	#[test]
	fn test_audit_completeness() {
		let mut registry = LayerRegistry::default();
		let actor = admin();

		let layer = registry.create(CreateLayer::named("Music"), &actor).unwrap();
		let entry = &registry.audit().recent(1)[0];
		assert_eq!((entry.action, entry.target_id.as_str()), (AuditAction::Create, layer.id.as_str()));

		registry.update(&layer.id, LayerPatch::visibility(false), &actor).unwrap();
		let entry = &registry.audit().recent(1)[0];
		assert_eq!((entry.action, entry.target_id.as_str()), (AuditAction::Update, layer.id.as_str()));
		assert_eq!(entry.details["fields"], json!(["isVisible"]));

		let removed = registry.remove(&layer.id, &actor).unwrap();
		assert_eq!(removed.id, layer.id);
		let entry = &registry.audit().recent(1)[0];
		assert_eq!((entry.action, entry.target_id.as_str()), (AuditAction::Delete, layer.id.as_str()));

		assert_eq!(registry.audit().len(), 3);
		assert!(registry.is_empty());
		assert!(registry.list().is_empty());
	}

	#[test]
	fn test_find_by_name_and_domain() {
		let mut registry = LayerRegistry::default();
		let art = registry.create(digital_art(), &admin()).unwrap();

		assert_eq!(registry.find_by_name("digital art").map(|l| &l.id), Some(&art.id));
		assert!(registry.find_by_name("digital-art").is_none());
		assert_eq!(registry.find_by_domain("digital-art").map(|l| &l.id), Some(&art.id));
		assert!(registry.find_by_domain("digital").is_none());
	}

	#[test]
	fn test_names_unique_by_slug() {
		let mut registry = LayerRegistry::default();
		let art = registry.create(digital_art(), &admin()).unwrap();

		let clash = registry.create(CreateLayer::named("Digital-Art"), &admin());
		assert!(matches!(clash, Err(Error::ValidationError(_))));
		let clash = registry.create(CreateLayer::named(" digital   art! "), &admin());
		assert!(matches!(clash, Err(Error::ValidationError(_))));

		let music = registry.create(CreateLayer::named("Music"), &admin()).unwrap();
		let rename = LayerPatch { name: Patch::Value("digital_art".into()), ..Default::default() };
		assert!(matches!(registry.update(&music.id, rename, &admin()), Err(Error::ValidationError(_))));
		// renaming within the same slug keeps the layer's own domain
		let rename = LayerPatch { name: Patch::Value("Digital-Art".into()), ..Default::default() };
		assert_eq!(registry.update(&art.id, rename, &admin()).unwrap().name, "Digital-Art");

		assert_eq!(registry.len(), 2);
		assert_eq!(registry.find_by_domain("digital-art").map(|l| &l.id), Some(&art.id));
		let changed = registry.refresh_user_counts(&[user("a", &["Digital Art"])]);
		assert_eq!(changed.len(), 1);
		assert_eq!(registry.get(&music.id).map(|l| l.user_count), Some(0));
	}

	#[test]
	fn test_refresh_user_counts() {
		let mut registry = LayerRegistry::default();
		let art = registry.create(digital_art(), &admin()).unwrap();
		registry.create(CreateLayer::named("Music"), &admin()).unwrap();

		let users = vec![
			user("a", &["digital-art", "music"]),
			user("b", &["Digital Art"]),
			user("c", &["games"]),
		];
		let changed = registry.refresh_user_counts(&users);
		assert_eq!(changed.len(), 2);
		assert_eq!(registry.get(&art.id).map(|l| l.user_count), Some(2));
		assert_eq!(registry.find_by_name("music").map(|l| l.user_count), Some(1));

		// second pass with the same users changes nothing
		assert!(registry.refresh_user_counts(&users).is_empty());
		assert_eq!(registry.audit().len(), 2);
	}
}

// vim: ts=4
