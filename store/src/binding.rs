//! Verified binding storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use tokengate_types::{SubjectId, Timestamp, WalletAddress};

/// The confirmed association between a subject and one wallet.
///
/// Only written by [`crate::SessionStore::consume_and_bind`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedBinding {
    pub subject_id: SubjectId,
    pub wallet_address: WalletAddress,
    pub last_sync_at: Option<Timestamp>,
}

impl VerifiedBinding {
    pub fn new(subject_id: SubjectId, wallet_address: WalletAddress) -> Self {
        Self {
            subject_id,
            wallet_address,
            last_sync_at: None,
        }
    }

    /// Merge a re-verification into an existing binding. The sync timestamp
    /// survives only if the wallet did not change.
    pub fn superseding(self, previous: Option<&VerifiedBinding>) -> Self {
        let last_sync_at = previous
            .filter(|p| p.wallet_address == self.wallet_address)
            .and_then(|p| p.last_sync_at);
        Self {
            last_sync_at,
            ..self
        }
    }
}

/// Trait for verified binding storage.
pub trait BindingStore: Send + Sync {
    fn get_binding(&self, subject_id: &SubjectId) -> Result<Option<VerifiedBinding>, StoreError>;

    fn list_bindings(&self) -> Result<Vec<VerifiedBinding>, StoreError>;

    /// Stamp the binding with the time of its last reconciliation.
    fn record_sync(&self, subject_id: &SubjectId, at: Timestamp) -> Result<(), StoreError>;
}
