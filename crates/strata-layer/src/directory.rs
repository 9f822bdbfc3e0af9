//! User directory adapter
//!
//! Member records live outside the visibility engine. The registry only needs to
//! read public domain memberships, for rosters and for the user-count pass.

use async_trait::async_trait;
use std::path::Path;

use crate::prelude::*;
use strata_types::layer::{Layer, User};

#[async_trait]
pub trait UserDirectory: Send + Sync {
	async fn list_users(&self) -> ClResult<Vec<User>>;

	/// Users whose public domain membership matches `layer`
	async fn users_in_layer(&self, layer: &Layer) -> ClResult<Vec<User>> {
		let users = self.list_users().await?;
		Ok(users.into_iter().filter(|user| user.is_member_of(layer)).collect())
	}
}

/// In-memory directory, optionally seeded from a JSON array
#[derive(Default)]
pub struct MemoryUserDirectory {
	users: Vec<User>,
}

impl MemoryUserDirectory {
	pub fn new(users: Vec<User>) -> Self {
		Self { users }
	}

	pub async fn from_file(path: &Path) -> ClResult<Self> {
		let content = tokio::fs::read(path).await?;
		let users: Vec<User> = serde_json::from_slice(&content)?;
		info!("Loaded {} users from {}", users.len(), path.display());
		Ok(Self::new(users))
	}
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
	async fn list_users(&self) -> ClResult<Vec<User>> {
		Ok(self.users.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use strata_types::layer::{AccessPolicy, DEFAULT_COLOR};

	fn user(id: &str, domains: &[&str]) -> User {
		User {
			id: id.into(),
			name: id.into(),
			roles: vec![],
			domains: domains.iter().map(|d| (*d).to_string()).collect(),
		}
	}

	fn layer(name: &str) -> Layer {
		Layer {
			id: name.into(),
			name: name.into(),
			description: None,
			color: DEFAULT_COLOR.into(),
			opacity: 1.0,
			is_visible: true,
			created_by: "admin".into(),
			user_count: 0,
			access: AccessPolicy::public(),
			created_at: Timestamp(0),
			updated_at: Timestamp(0),
		}
	}

	#[tokio::test]
	async fn test_users_in_layer() {
		let directory = MemoryUserDirectory::new(vec![
			user("a", &["music"]),
			user("b", &["games"]),
			user("c", &["Music", "games"]),
		]);
		let members = directory.users_in_layer(&layer("Music")).await.unwrap();
		let ids: Vec<&str> = members.iter().map(|u| u.id.as_str()).collect();
		assert_eq!(ids, vec!["a", "c"]);
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("users.json");
		tokio::fs::write(&path, r#"[{ "id": "a", "name": "Ann", "domains": ["music"] }]"#)
			.await
			.unwrap();

		let directory = MemoryUserDirectory::from_file(&path).await.unwrap();
		let users = directory.list_users().await.unwrap();
		assert_eq!(users.len(), 1);
		assert!(users[0].roles.is_empty());
	}
}

// vim: ts=4
