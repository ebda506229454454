use thiserror::Error;
use tokengate_store::StoreError;

/// Failures that abort a whole pass. Per-subject failures never do.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot load {what}: {source}")]
    Fatal {
        what: &'static str,
        #[source]
        source: StoreError,
    },
}
