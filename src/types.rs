//! Crate-wide error and result types

use thiserror::Error;

use crate::bridge::BridgeError;

/// Errors surfaced by the control panel's own layers.
///
/// Bridge errors keep their own taxonomy (`BridgeError`) because the HTTP
/// layer maps them to distinct status codes; everything else collapses into
/// the categories below.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VaultError>;
