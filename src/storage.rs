use std::path::PathBuf;

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::models::store::Store;

pub mod json;
pub mod migrations;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to load store from '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save store to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize store to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create backup at '{path}': {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to cleanup old backups in '{dir}': {source}")]
    CleanupFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Store file was created by a newer version of tempo (version {0}). Please upgrade tempo to open this file."
    )]
    FutureVersion(u32),

    #[error("Store file has unsupported version {0}. This version of tempo cannot read this file.")]
    UnsupportedVersion(u32),

    #[error(
        "Store is encrypted but no passphrase was provided. Pass --passphrase or set TEMPO_PASSPHRASE."
    )]
    VaultLocked,

    #[error("Passphrase does not match this store")]
    WrongPassphrase,

    #[error("Vault configuration in '{path}' is corrupted")]
    VaultCorrupt { path: PathBuf },

    #[error("Encryption error: {0}")]
    Crypto(#[from] CryptoError),
}

pub trait Storage {
    fn load(&self) -> Result<Store, StorageError>;
    fn save(&self, store: &Store) -> Result<(), StorageError>;
}
