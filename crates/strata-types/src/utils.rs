//! Utility functions

use crate::prelude::*;
use rand::RngExt;

pub const ID_LENGTH: usize = 24;
pub const SAFE: [char; 62] = [
	'0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
	'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
	'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
	'V', 'W', 'X', 'Y', 'Z',
];

pub fn random_id() -> ClResult<String> {
	let mut rng = rand::rng();
	let mut result = String::with_capacity(ID_LENGTH);

	for _ in 0..ID_LENGTH {
		result.push(SAFE[rng.random_range(0..SAFE.len())]);
	}
	Ok(result)
}

/// Canonical cache signature of a role-set: trimmed, lower-cased, sorted, de-duplicated,
/// comma-joined
///
/// # Examples
/// ```
/// use strata_types::utils::role_signature;
/// assert_eq!(role_signature(&["Member", "admin", "member"]), "admin,member");
/// ```
pub fn role_signature<S: AsRef<str>>(roles: &[S]) -> String {
	let mut roles: Vec<String> = roles
		.iter()
		.map(|r| r.as_ref().trim().to_lowercase())
		.filter(|r| !r.is_empty())
		.collect();
	roles.sort();
	roles.dedup();
	roles.join(",")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_random_id() {
		let a = random_id().unwrap();
		let b = random_id().unwrap();
		assert_eq!(a.len(), ID_LENGTH);
		assert!(a.chars().all(|c| SAFE.contains(&c)));
		assert_ne!(a, b);
	}

	#[test]
	fn test_role_signature() {
		assert_eq!(role_signature(&["member"]), "member");
		assert_eq!(role_signature(&["b", "a", "B", " "]), "a,b");
		assert_eq!(role_signature::<&str>(&[]), "");
	}
}

// vim: ts=4
