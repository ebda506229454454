//! LMDB implementation of SessionStore.
//!
//! Sessions are keyed by their id string. Consumption and the binding upsert
//! share one write transaction; LMDB serialises writers, so the existence
//! check inside that transaction is the single-use linearization point.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use tokengate_store::{
    ConsumeOutcome, SessionStore, StoreError, VerificationSession, VerifiedBinding,
};
use tokengate_types::{SessionId, SubjectId, Timestamp};

use crate::LmdbError;

pub struct LmdbSessionStore {
    pub(crate) env: Arc<Env>,
    pub(crate) sessions_db: Database<Bytes, Bytes>,
    pub(crate) bindings_db: Database<Bytes, Bytes>,
}

impl SessionStore for LmdbSessionStore {
    fn create_session(
        &self,
        subject_id: &SubjectId,
        created_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<VerificationSession, StoreError> {
        let session = VerificationSession {
            session_id: SessionId::generate(),
            subject_id: subject_id.clone(),
            created_at,
            expires_at,
        };
        let bytes = bincode::serialize(&session).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.sessions_db
            .put(&mut wtxn, session.session_id.as_str().as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(session)
    }

    fn get_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<VerificationSession>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .sessions_db
            .get(&rtxn, session_id.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn consume_and_bind(
        &self,
        session_id: &SessionId,
        binding: &VerifiedBinding,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existed = self
            .sessions_db
            .delete(&mut wtxn, session_id.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        if !existed {
            // Dropping the transaction aborts it.
            return Ok(ConsumeOutcome::Missing);
        }

        let key = binding.subject_id.as_str().as_bytes();
        let previous: Option<VerifiedBinding> = match self
            .bindings_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Some(bincode::deserialize(bytes).map_err(LmdbError::from)?),
            None => None,
        };
        let merged = binding.clone().superseding(previous.as_ref());
        let bytes = bincode::serialize(&merged).map_err(LmdbError::from)?;
        self.bindings_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(ConsumeOutcome::Consumed)
    }

    fn purge_expired(&self, now: Timestamp) -> Result<usize, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut expired = Vec::new();
        {
            let iter = self.sessions_db.iter(&wtxn).map_err(LmdbError::from)?;
            for entry in iter {
                let (key, val) = entry.map_err(LmdbError::from)?;
                match bincode::deserialize::<VerificationSession>(val) {
                    Ok(session) if session.is_expired(now) => expired.push(key.to_vec()),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("dropping undecodable session record: {e}");
                        expired.push(key.to_vec());
                    }
                }
            }
        }
        for key in &expired {
            self.sessions_db
                .delete(&mut wtxn, key.as_slice())
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(expired.len())
    }
}
