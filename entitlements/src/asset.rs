//! Raw asset items as returned by a DAS `getAssetsByOwner` call.
//!
//! Only the fields the evaluator needs are modelled; everything else in the
//! payload is ignored.

use serde::{Deserialize, Serialize};

/// One asset owned by a wallet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetItem {
    /// Mint address of the asset.
    pub id: String,
    /// Present on fungible tokens.
    #[serde(default)]
    pub token_info: Option<TokenInfo>,
    /// Collection membership, present on NFTs.
    #[serde(default)]
    pub grouping: Vec<AssetGroup>,
}

/// Balance metadata of a fungible token.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Raw integer units.
    #[serde(default)]
    pub balance: Option<u128>,
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// A `(group_key, group_value)` pair, e.g. `("collection", <address>)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetGroup {
    #[serde(default)]
    pub group_key: String,
    #[serde(default)]
    pub group_value: Option<String>,
}

impl AssetItem {
    /// The collection this item belongs to. The `"collection"` group wins;
    /// otherwise the first group with a value is used.
    pub fn collection(&self) -> Option<&str> {
        self.grouping
            .iter()
            .find(|g| g.group_key == "collection" && g.group_value.is_some())
            .or_else(|| self.grouping.iter().find(|g| g.group_value.is_some()))
            .and_then(|g| g.group_value.as_deref())
    }
}
