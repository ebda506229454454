use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unreachable: {0}")]
    Unreachable(String),

    #[error("oracle request failed: {0}")]
    RequestFailed(String),

    #[error("oracle returned an error: {0}")]
    Rpc(String),

    #[error("invalid response from oracle: {0}")]
    InvalidResponse(String),
}
