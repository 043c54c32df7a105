use mutasi_core::ReconError;
use mutasi_import::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Recon(#[from] ReconError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
