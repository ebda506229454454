//! A wallet's current holdings, derived fresh on every sync pass.

use std::collections::HashMap;

use tokengate_types::TokenAmount;

use crate::AssetItem;

/// Normalized token balances and NFT collection counts of one wallet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WalletHoldings {
    token_balances: HashMap<String, f64>,
    nft_collection_counts: HashMap<String, u64>,
}

impl WalletHoldings {
    /// Holdings of a wallet that owns nothing (or whose assets could not be fetched).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build holdings from the oracle's item list.
    ///
    /// Token balances are normalized by the mint's decimals before they are
    /// stored. Tokens without `decimals` are dropped and count as a zero
    /// balance.
    pub fn from_items(items: &[AssetItem]) -> Self {
        let mut holdings = Self::default();
        for item in items {
            if let Some(info) = &item.token_info {
                match (info.balance, info.decimals) {
                    (Some(raw), Some(decimals)) => {
                        let amount = TokenAmount::new(raw, decimals);
                        holdings.add_token(&item.id, amount);
                    }
                    (Some(_), None) => {
                        tracing::warn!(mint = %item.id, "token has no decimals metadata; ignoring balance");
                    }
                    (None, _) => {}
                }
            }
            if let Some(collection) = item.collection() {
                *holdings
                    .nft_collection_counts
                    .entry(collection.to_string())
                    .or_insert(0) += 1;
            }
        }
        holdings
    }

    /// Add a token balance (normalized) to the holdings.
    pub fn add_token(&mut self, mint: &str, amount: TokenAmount) {
        *self.token_balances.entry(mint.to_string()).or_insert(0.0) += amount.normalized();
    }

    /// Set the item count for a collection.
    pub fn set_collection_count(&mut self, collection: &str, count: u64) {
        self.nft_collection_counts
            .insert(collection.to_string(), count);
    }

    /// Normalized balance of `mint`, zero if not held.
    pub fn token_balance(&self, mint: &str) -> f64 {
        self.token_balances.get(mint).copied().unwrap_or(0.0)
    }

    /// Number of owned items in `collection`, zero if none.
    pub fn collection_count(&self, collection: &str) -> u64 {
        self.nft_collection_counts
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.token_balances.is_empty() && self.nft_collection_counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetGroup, TokenInfo};

    fn nft(id: &str, collection: &str) -> AssetItem {
        AssetItem {
            id: id.into(),
            token_info: None,
            grouping: vec![AssetGroup {
                group_key: "collection".into(),
                group_value: Some(collection.into()),
            }],
        }
    }

    fn token(mint: &str, balance: Option<u128>, decimals: Option<u8>) -> AssetItem {
        AssetItem {
            id: mint.into(),
            token_info: Some(TokenInfo { balance, decimals }),
            grouping: Vec::new(),
        }
    }

    #[test]
    fn counts_items_per_collection() {
        let h = WalletHoldings::from_items(&[nft("a", "COLLX"), nft("b", "COLLX"), nft("c", "COLLY")]);
        assert_eq!(h.collection_count("COLLX"), 2);
        assert_eq!(h.collection_count("COLLY"), 1);
        assert_eq!(h.collection_count("COLLZ"), 0);
    }

    #[test]
    fn normalizes_token_balances() {
        let h = WalletHoldings::from_items(&[token("MINT", Some(2_500_000_000), Some(9))]);
        assert_eq!(h.token_balance("MINT"), 2.5);
        assert_eq!(h.token_balance("OTHER"), 0.0);
    }

    #[test]
    fn missing_decimals_counts_as_zero() {
        let h = WalletHoldings::from_items(&[token("MINT", Some(1_000_000), None)]);
        assert_eq!(h.token_balance("MINT"), 0.0);
        assert!(h.is_empty());
    }

    #[test]
    fn empty_items_give_empty_holdings() {
        assert_eq!(WalletHoldings::from_items(&[]), WalletHoldings::empty());
    }
}
