//! Minimal role mutations that converge a member onto a target role set.

use std::collections::BTreeSet;

use tokengate_types::RoleId;

/// Roles to add and remove for one member. Both sets are disjoint subsets of
/// the managed role set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleMutationPlan {
    pub roles_to_add: BTreeSet<RoleId>,
    pub roles_to_remove: BTreeSet<RoleId>,
}

impl RoleMutationPlan {
    /// Diff `target` against `current`, touching only `managed` roles.
    ///
    /// - add = (target ∩ managed) − current
    /// - remove = (managed − target) ∩ current
    pub fn compute(
        target: &BTreeSet<RoleId>,
        current: &BTreeSet<RoleId>,
        managed: &BTreeSet<RoleId>,
    ) -> Self {
        let roles_to_add = target
            .iter()
            .filter(|r| managed.contains(r) && !current.contains(r))
            .copied()
            .collect();
        let roles_to_remove = managed
            .iter()
            .filter(|r| !target.contains(r) && current.contains(r))
            .copied()
            .collect();
        Self {
            roles_to_add,
            roles_to_remove,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roles_to_add.is_empty() && self.roles_to_remove.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roles(ids: &[u64]) -> BTreeSet<RoleId> {
        ids.iter().copied().map(RoleId::new).collect()
    }

    /// The role set a member holding `current` ends up with.
    fn apply(plan: &RoleMutationPlan, current: &BTreeSet<RoleId>) -> BTreeSet<RoleId> {
        current
            .iter()
            .filter(|r| !plan.roles_to_remove.contains(r))
            .chain(plan.roles_to_add.iter())
            .copied()
            .collect()
    }

    #[test]
    fn unmanaged_roles_are_untouched() {
        let plan = RoleMutationPlan::compute(&roles(&[42]), &roles(&[7]), &roles(&[42]));
        assert_eq!(plan.roles_to_add, roles(&[42]));
        assert!(plan.roles_to_remove.is_empty());
    }

    #[test]
    fn lost_qualification_removes_managed_role() {
        let plan = RoleMutationPlan::compute(&roles(&[]), &roles(&[7, 42, 43]), &roles(&[42, 43]));
        assert!(plan.roles_to_add.is_empty());
        assert_eq!(plan.roles_to_remove, roles(&[42, 43]));
    }

    #[test]
    fn converged_member_needs_nothing() {
        let plan = RoleMutationPlan::compute(&roles(&[42]), &roles(&[7, 42]), &roles(&[42, 43]));
        assert!(plan.is_empty());
    }

    proptest! {
        /// Applying a plan and recomputing yields an empty plan, and the
        /// add/remove sets never overlap or leave the managed set.
        #[test]
        fn plan_converges(
            target in prop::collection::btree_set(0u64..20, 0..10),
            current in prop::collection::btree_set(0u64..20, 0..10),
            managed in prop::collection::btree_set(0u64..20, 0..10),
        ) {
            let managed: BTreeSet<RoleId> = managed.into_iter().map(RoleId::new).collect();
            let target: BTreeSet<RoleId> = target
                .into_iter()
                .map(RoleId::new)
                .filter(|r| managed.contains(r))
                .collect();
            let current: BTreeSet<RoleId> = current.into_iter().map(RoleId::new).collect();

            let plan = RoleMutationPlan::compute(&target, &current, &managed);
            prop_assert!(plan.roles_to_add.is_disjoint(&plan.roles_to_remove));
            prop_assert!(plan.roles_to_add.is_subset(&managed));
            prop_assert!(plan.roles_to_remove.is_subset(&managed));

            let after = apply(&plan, &current);
            prop_assert!(RoleMutationPlan::compute(&target, &after, &managed).is_empty());
            let unmanaged_before: BTreeSet<_> = current.difference(&managed).collect();
            let unmanaged_after: BTreeSet<_> = after.difference(&managed).collect();
            prop_assert_eq!(unmanaged_before, unmanaged_after);
        }
    }
}
