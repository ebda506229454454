//! Entitlement rule storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokengate_types::RoleId;

/// What kind of asset a rule inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    /// A fungible token, identified by its mint address.
    Token,
    /// An NFT collection, identified by its collection address.
    NftCollection,
    #[serde(other)]
    Unknown,
}

/// The comparison a rule applies to the holding it inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    #[serde(alias = "GREATER_THAN_OR_EQUAL")]
    GreaterOrEqualBalance,
    #[serde(alias = "HAS_ANY")]
    HasAtLeastN,
    #[serde(other)]
    Unknown,
}

/// A declarative rule: holders meeting the condition qualify for `role_id`.
///
/// Rules are externally managed; the sync engine only reads them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitlementRule {
    /// Store-assigned identifier, used only for administration.
    #[serde(default)]
    pub id: u64,
    pub role_id: RoleId,
    /// Human-readable role name for logs.
    #[serde(default)]
    pub role_name: Option<String>,
    pub asset_address: String,
    pub asset_kind: AssetKind,
    pub condition: Condition,
    /// Whole tokens for balances, item count for collections.
    pub required_value: f64,
}

impl EntitlementRule {
    /// Label used in logs: the role name if known, otherwise the id.
    pub fn role_label(&self) -> String {
        self.role_name
            .clone()
            .unwrap_or_else(|| self.role_id.to_string())
    }
}

/// Trait for entitlement rule storage.
pub trait RuleStore: Send + Sync {
    fn list_rules(&self) -> Result<Vec<EntitlementRule>, StoreError>;

    /// Insert a rule, assigning and returning a fresh id (the incoming `id` is ignored).
    fn add_rule(&self, rule: EntitlementRule) -> Result<u64, StoreError>;

    /// Remove a rule. Returns `false` if no rule had that id.
    fn remove_rule(&self, id: u64) -> Result<bool, StoreError>;
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Token => "TOKEN",
            AssetKind::NftCollection => "NFT_COLLECTION",
            AssetKind::Unknown => "UNKNOWN",
        }
    }
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::GreaterOrEqualBalance => "GREATER_OR_EQUAL_BALANCE",
            Condition::HasAtLeastN => "HAS_AT_LEAST_N",
            Condition::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TOKEN" => Ok(AssetKind::Token),
            "NFT_COLLECTION" => Ok(AssetKind::NftCollection),
            other => Err(format!("unknown asset kind: {other}")),
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GREATER_OR_EQUAL_BALANCE" | "GREATER_THAN_OR_EQUAL" => {
                Ok(Condition::GreaterOrEqualBalance)
            }
            "HAS_AT_LEAST_N" | "HAS_ANY" => Ok(Condition::HasAtLeastN),
            other => Err(format!("unknown condition: {other}")),
        }
    }
}
