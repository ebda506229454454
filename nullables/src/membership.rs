//! Nullable membership directory: records mutations instead of sending them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tokengate_membership::{MembershipDirectory, MembershipError};
use tokengate_types::{RoleId, SubjectId};

/// One role mutation the directory was asked to apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Add(SubjectId, BTreeSet<RoleId>),
    Remove(SubjectId, BTreeSet<RoleId>),
}

/// An in-memory community roster.
///
/// Accepted mutations are applied to the roster and recorded, so a second
/// sync pass sees the roles the first one granted.
pub struct NullMembership {
    members: Mutex<HashMap<SubjectId, BTreeSet<RoleId>>>,
    forbidden: Mutex<HashSet<SubjectId>>,
    unreachable: Mutex<HashSet<SubjectId>>,
    guild_roles: Mutex<Option<BTreeSet<RoleId>>>,
    mutations: Mutex<Vec<Mutation>>,
}

impl NullMembership {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
            forbidden: Mutex::new(HashSet::new()),
            unreachable: Mutex::new(HashSet::new()),
            guild_roles: Mutex::new(None),
            mutations: Mutex::new(Vec::new()),
        }
    }

    pub fn add_member(&self, subject: &SubjectId, roles: impl IntoIterator<Item = RoleId>) {
        self.members
            .lock()
            .unwrap()
            .insert(subject.clone(), roles.into_iter().collect());
    }

    /// Reject every mutation for `subject` as if the bot lacked privilege.
    pub fn forbid(&self, subject: &SubjectId) {
        self.forbidden.lock().unwrap().insert(subject.clone());
    }

    /// Fail every call for `subject` with a transient error.
    pub fn make_unreachable(&self, subject: &SubjectId) {
        self.unreachable.lock().unwrap().insert(subject.clone());
    }

    /// Make `guild_roles` answer with `roles`. Until set, it fails.
    pub fn set_guild_roles(&self, roles: impl IntoIterator<Item = RoleId>) {
        *self.guild_roles.lock().unwrap() = Some(roles.into_iter().collect());
    }

    pub fn roles_of(&self, subject: &SubjectId) -> Option<BTreeSet<RoleId>> {
        self.members.lock().unwrap().get(subject).cloned()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn clear_mutations(&self) {
        self.mutations.lock().unwrap().clear();
    }

    fn check_reachable(&self, subject: &SubjectId) -> Result<(), MembershipError> {
        if self.unreachable.lock().unwrap().contains(subject) {
            return Err(MembershipError::Transient(format!(
                "null membership scripted failure for {subject}"
            )));
        }
        Ok(())
    }

    fn mutate(
        &self,
        subject: &SubjectId,
        roles: &BTreeSet<RoleId>,
        add: bool,
    ) -> Result<(), MembershipError> {
        self.check_reachable(subject)?;
        if self.forbidden.lock().unwrap().contains(subject) {
            return Err(MembershipError::Forbidden(format!("cannot edit {subject}")));
        }
        let mut members = self.members.lock().unwrap();
        let held = members
            .get_mut(subject)
            .ok_or_else(|| MembershipError::NotFound(subject.to_string()))?;
        if add {
            held.extend(roles.iter().copied());
        } else {
            held.retain(|r| !roles.contains(r));
        }
        let mutation = if add {
            Mutation::Add(subject.clone(), roles.clone())
        } else {
            Mutation::Remove(subject.clone(), roles.clone())
        };
        self.mutations.lock().unwrap().push(mutation);
        Ok(())
    }
}

impl Default for NullMembership {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipDirectory for NullMembership {
    async fn member_roles(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<BTreeSet<RoleId>>, MembershipError> {
        self.check_reachable(subject)?;
        Ok(self.roles_of(subject))
    }

    async fn add_roles(
        &self,
        subject: &SubjectId,
        roles: &BTreeSet<RoleId>,
        _reason: &str,
    ) -> Result<(), MembershipError> {
        self.mutate(subject, roles, true)
    }

    async fn remove_roles(
        &self,
        subject: &SubjectId,
        roles: &BTreeSet<RoleId>,
        _reason: &str,
    ) -> Result<(), MembershipError> {
        self.mutate(subject, roles, false)
    }

    async fn guild_roles(&self) -> Result<BTreeSet<RoleId>, MembershipError> {
        self.guild_roles
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| MembershipError::Transient("guild roles not scripted".into()))
    }
}
