//! Permission evaluator
//!
//! Pure, total functions over [`PermissionContext`]s. Shared by the server and the
//! client store so both filter content with identical rules.

use crate::role::{OverrideUpdate, PermissionContext, Role, SecurityTier};

/// Default role/tier accessibility, indexed by `[role.rank()][tier]`.
/// Every role sees tiers at or below its own rank.
const DEFAULT_ACCESS: [[bool; 3]; 4] = [
	// public, trusted, restricted
	[true, false, false], // guest
	[true, true, false],  // member
	[true, true, true],   // operator
	[true, true, true],   // admin
];

fn tier_index(tier: SecurityTier) -> usize {
	match tier {
		SecurityTier::Public => 0,
		SecurityTier::Trusted => 1,
		SecurityTier::Restricted => 2,
	}
}

/// Default accessibility of `tier` for `role`, ignoring overrides
pub fn default_access(role: Role) -> impl Iterator<Item = (SecurityTier, bool)> {
	let row = DEFAULT_ACCESS[usize::from(role.rank())];
	SecurityTier::ALL.into_iter().map(move |tier| (tier, row[tier_index(tier)]))
}

/// An explicit override wins; otherwise the default table decides
pub fn can_access_tier(ctx: &PermissionContext, tier: SecurityTier) -> bool {
	match ctx.overrides.get(&tier) {
		Some(allow) => *allow,
		None => DEFAULT_ACCESS[usize::from(ctx.role.rank())][tier_index(tier)],
	}
}

/// Authority: the role's rank meets the tier's minimum managing role
pub fn can_manage_tier(role: Role, tier: SecurityTier) -> bool {
	role.rank() >= tier.minimum_role().rank()
}

pub fn accessible_tiers(ctx: &PermissionContext) -> Vec<SecurityTier> {
	SecurityTier::ALL.into_iter().filter(|tier| can_access_tier(ctx, *tier)).collect()
}

/// Apply an override batch in input order
///
/// Updates whose actor lacks authority over the tier are dropped without error, so a
/// batch mixing authorized and unauthorized entries is applied partially. A later
/// update for the same tier overwrites an earlier one.
pub fn apply_overrides(ctx: &PermissionContext, updates: &[OverrideUpdate]) -> PermissionContext {
	let mut overrides = ctx.overrides.clone();
	for update in updates {
		let actor_role = update.actor_role.unwrap_or(ctx.role);
		if can_manage_tier(actor_role, update.tier) {
			overrides.insert(update.tier, update.allow);
		} else {
			tracing::debug!(
				tier = %update.tier,
				actor_role = %actor_role,
				"Override dropped - actor lacks authority over tier"
			);
		}
	}
	PermissionContext { role: ctx.role, overrides }
}

/// Replace the role, keeping overrides
pub fn elevate(ctx: &PermissionContext, role: Role) -> PermissionContext {
	PermissionContext { role, overrides: ctx.overrides.clone() }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn update(tier: SecurityTier, allow: bool, actor_role: Option<Role>) -> OverrideUpdate {
		OverrideUpdate { tier, allow, actor_role }
	}

	#[test]
	fn test_default_hierarchy() {
		let member = PermissionContext::new(Role::Member);
		assert!(can_access_tier(&member, SecurityTier::Public));
		assert!(can_access_tier(&member, SecurityTier::Trusted));
		assert!(!can_access_tier(&member, SecurityTier::Restricted));

		let operator = PermissionContext::new(Role::Operator);
		for tier in SecurityTier::ALL {
			assert!(can_access_tier(&operator, tier));
		}

		let guest = PermissionContext::new(Role::Guest);
		assert_eq!(accessible_tiers(&guest), vec![SecurityTier::Public]);
	}

	#[test]
	fn test_default_table_matches_rank() {
		for role in Role::ALL {
			for (tier, allowed) in default_access(role) {
				assert_eq!(allowed, role >= tier.minimum_role(), "{} / {}", role, tier);
			}
		}
	}

	#[test]
	fn test_can_manage_tier() {
		assert!(can_manage_tier(Role::Guest, SecurityTier::Public));
		assert!(!can_manage_tier(Role::Guest, SecurityTier::Trusted));
		assert!(can_manage_tier(Role::Member, SecurityTier::Trusted));
		assert!(!can_manage_tier(Role::Member, SecurityTier::Restricted));
		assert!(can_manage_tier(Role::Operator, SecurityTier::Restricted));
		assert!(can_manage_tier(Role::Admin, SecurityTier::Restricted));
	}

	#[test]
	fn test_authority_gated_override() {
		let member = PermissionContext::new(Role::Member);

		let granted = apply_overrides(
			&member,
			&[update(SecurityTier::Restricted, true, Some(Role::Operator))],
		);
		assert!(can_access_tier(&granted, SecurityTier::Restricted));

		let denied =
			apply_overrides(&granted, &[update(SecurityTier::Trusted, false, Some(Role::Guest))]);
		assert!(can_access_tier(&denied, SecurityTier::Trusted));
		assert_eq!(denied, granted);
	}

	#[test]
	fn test_self_service_uses_own_role() {
		let member = PermissionContext::new(Role::Member);
		// A member has no authority over restricted
		let ctx = apply_overrides(&member, &[update(SecurityTier::Restricted, true, None)]);
		assert!(!can_access_tier(&ctx, SecurityTier::Restricted));
		// but may revoke its own trusted access
		let ctx = apply_overrides(&member, &[update(SecurityTier::Trusted, false, None)]);
		assert!(!can_access_tier(&ctx, SecurityTier::Trusted));
	}

	#[test]
	fn test_batch_order_and_partial_application() {
		let member = PermissionContext::new(Role::Member);
		let ctx = apply_overrides(
			&member,
			&[
				update(SecurityTier::Restricted, true, Some(Role::Admin)),
				update(SecurityTier::Public, false, Some(Role::Guest)),
				update(SecurityTier::Restricted, false, Some(Role::Member)),
				update(SecurityTier::Restricted, false, Some(Role::Operator)),
			],
		);
		assert!(!can_access_tier(&ctx, SecurityTier::Restricted));
		assert!(!can_access_tier(&ctx, SecurityTier::Public));
		assert!(can_access_tier(&ctx, SecurityTier::Trusted));
		// input untouched
		assert!(member.overrides.is_empty());
	}

	#[test]
	fn test_elevate_keeps_overrides() {
		let ctx = apply_overrides(
			&PermissionContext::new(Role::Guest),
			&[update(SecurityTier::Public, false, None)],
		);
		let elevated = elevate(&ctx, Role::Admin);
		assert_eq!(elevated.role, Role::Admin);
		assert!(!can_access_tier(&elevated, SecurityTier::Public));
		assert!(can_access_tier(&elevated, SecurityTier::Restricted));
	}
}

// vim: ts=4
