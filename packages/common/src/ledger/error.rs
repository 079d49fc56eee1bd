use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger file {path} is not a valid record array: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode ledger: {0}")]
    Encode(#[source] serde_json::Error),
}
