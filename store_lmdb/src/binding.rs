//! LMDB implementation of BindingStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use tokengate_store::{BindingStore, StoreError, VerifiedBinding};
use tokengate_types::{SubjectId, Timestamp};

use crate::LmdbError;

pub struct LmdbBindingStore {
    pub(crate) env: Arc<Env>,
    pub(crate) bindings_db: Database<Bytes, Bytes>,
}

impl BindingStore for LmdbBindingStore {
    fn get_binding(&self, subject_id: &SubjectId) -> Result<Option<VerifiedBinding>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .bindings_db
            .get(&rtxn, subject_id.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn list_bindings(&self) -> Result<Vec<VerifiedBinding>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.bindings_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut result = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            result.push(bincode::deserialize(val).map_err(LmdbError::from)?);
        }
        Ok(result)
    }

    fn record_sync(&self, subject_id: &SubjectId, at: Timestamp) -> Result<(), StoreError> {
        let key = subject_id.as_str().as_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut binding: VerifiedBinding = match self
            .bindings_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => bincode::deserialize(bytes).map_err(LmdbError::from)?,
            None => return Err(StoreError::NotFound(subject_id.to_string())),
        };
        binding.last_sync_at = Some(at);
        let bytes = bincode::serialize(&binding).map_err(LmdbError::from)?;
        self.bindings_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
