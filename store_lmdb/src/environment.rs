//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbBindingStore, LmdbError, LmdbRuleStore, LmdbSessionStore};

/// Number of named databases the environment holds.
const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    sessions_db: Database<Bytes, Bytes>,
    bindings_db: Database<Bytes, Bytes>,
    rules_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process and per path;
        // every handle shares the same `Arc<Env>`.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let sessions_db = env.create_database(&mut wtxn, Some("sessions"))?;
        let bindings_db = env.create_database(&mut wtxn, Some("bindings"))?;
        let rules_db = env.create_database(&mut wtxn, Some("rules"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            sessions_db,
            bindings_db,
            rules_db,
            meta_db,
        })
    }

    pub fn session_store(&self) -> LmdbSessionStore {
        LmdbSessionStore {
            env: Arc::clone(&self.env),
            sessions_db: self.sessions_db,
            bindings_db: self.bindings_db,
        }
    }

    pub fn binding_store(&self) -> LmdbBindingStore {
        LmdbBindingStore {
            env: Arc::clone(&self.env),
            bindings_db: self.bindings_db,
        }
    }

    pub fn rule_store(&self) -> LmdbRuleStore {
        LmdbRuleStore {
            env: Arc::clone(&self.env),
            rules_db: self.rules_db,
            meta_db: self.meta_db,
        }
    }
}
