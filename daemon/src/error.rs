use thiserror::Error;
use tokengate_store::StoreError;
use tokengate_store_lmdb::LmdbError;
use tokengate_sync::SyncError;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("storage error: {0}")]
    Lmdb(#[from] LmdbError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
