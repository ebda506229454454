//! Rule evaluation: holdings × rules → target role set.

use std::collections::BTreeSet;

use tokengate_store::{AssetKind, Condition, EntitlementRule};
use tokengate_types::RoleId;

use crate::WalletHoldings;

/// Full result of evaluating a rule set, including rules that were skipped
/// because their shape is not recognised.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub roles: BTreeSet<RoleId>,
    pub skipped: Vec<EntitlementRule>,
}

/// Roles `holdings` qualify for under `rules`.
pub fn evaluate(holdings: &WalletHoldings, rules: &[EntitlementRule]) -> BTreeSet<RoleId> {
    evaluate_detailed(holdings, rules).roles
}

/// Like [`evaluate`], but also reports the rules that were skipped so the
/// caller can log them as data-quality issues.
pub fn evaluate_detailed(holdings: &WalletHoldings, rules: &[EntitlementRule]) -> Evaluation {
    let mut evaluation = Evaluation::default();
    for rule in rules {
        match qualifies(holdings, rule) {
            Some(true) => {
                evaluation.roles.insert(rule.role_id);
            }
            Some(false) => {}
            None => evaluation.skipped.push(rule.clone()),
        }
    }
    evaluation
}

/// The managed role set: every role some rule can grant.
pub fn managed_roles(rules: &[EntitlementRule]) -> BTreeSet<RoleId> {
    rules.iter().map(|r| r.role_id).collect()
}

/// `None` when the rule's shape is not one the evaluator understands.
fn qualifies(holdings: &WalletHoldings, rule: &EntitlementRule) -> Option<bool> {
    if !rule.required_value.is_finite() {
        return None;
    }
    match (rule.asset_kind, rule.condition) {
        (AssetKind::Token, Condition::GreaterOrEqualBalance) => {
            Some(holdings.token_balance(&rule.asset_address) >= rule.required_value)
        }
        (AssetKind::NftCollection, Condition::HasAtLeastN) => {
            Some(holdings.collection_count(&rule.asset_address) as f64 >= rule.required_value)
        }
        _ => None,
    }
}
