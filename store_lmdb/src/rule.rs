//! LMDB implementation of RuleStore.
//!
//! Rules are keyed by their id as big-endian `u64` so iteration returns them
//! in insertion order. The next id lives in the meta database.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use tokengate_store::{EntitlementRule, RuleStore, StoreError};

use crate::LmdbError;

const NEXT_RULE_ID_KEY: &[u8] = b"next_rule_id";

pub struct LmdbRuleStore {
    pub(crate) env: Arc<Env>,
    pub(crate) rules_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl RuleStore for LmdbRuleStore {
    fn list_rules(&self) -> Result<Vec<EntitlementRule>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.rules_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut result = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            result.push(bincode::deserialize(val).map_err(LmdbError::from)?);
        }
        Ok(result)
    }

    fn add_rule(&self, mut rule: EntitlementRule) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let id = match self
            .meta_db
            .get(&wtxn, NEXT_RULE_ID_KEY)
            .map_err(LmdbError::from)?
        {
            Some(bytes) if bytes.len() == 8 => {
                let arr: [u8; 8] = bytes.try_into().expect("checked length");
                u64::from_be_bytes(arr)
            }
            Some(_) => {
                return Err(LmdbError::Serialization(
                    "next_rule_id has unexpected byte length".to_string(),
                )
                .into())
            }
            None => 1,
        };
        rule.id = id;
        let bytes = bincode::serialize(&rule).map_err(LmdbError::from)?;
        self.rules_db
            .put(&mut wtxn, &id.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, NEXT_RULE_ID_KEY, &(id + 1).to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(id)
    }

    fn remove_rule(&self, id: u64) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let removed = self
            .rules_db
            .delete(&mut wtxn, &id.to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(removed)
    }
}
