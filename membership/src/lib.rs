//! Membership directory for tokengate.
//!
//! The reconciliation engine reads and mutates member roles only through
//! [`MembershipDirectory`]. [`DiscordDirectory`] talks to the Discord REST
//! API as a bot.

pub mod discord;
pub mod error;

pub use discord::{DiscordConfig, DiscordDirectory};
pub use error::MembershipError;

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokengate_types::{RoleId, SubjectId};

/// Audit-log reason attached to every role mutation.
pub const SYNC_REASON: &str = "tokengate: wallet asset sync";

/// A community's member roster and role assignments.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Current roles of `subject`, or `None` if they are not a member.
    async fn member_roles(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<BTreeSet<RoleId>>, MembershipError>;

    async fn add_roles(
        &self,
        subject: &SubjectId,
        roles: &BTreeSet<RoleId>,
        reason: &str,
    ) -> Result<(), MembershipError>;

    async fn remove_roles(
        &self,
        subject: &SubjectId,
        roles: &BTreeSet<RoleId>,
        reason: &str,
    ) -> Result<(), MembershipError>;

    /// Every role that currently exists in the community.
    async fn guild_roles(&self) -> Result<BTreeSet<RoleId>, MembershipError>;
}
