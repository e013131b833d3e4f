//! Key-value storage port and the persisted store record
//!
//! Features:
//! - `Storage` trait shaped like the browser's LocalStorage (get/set/remove by key)
//! - In-memory backend (tests, headless use)
//! - LocalStorage backend (wasm32)
//! - JSON file backend with tmp → rename writes (native)
//! - Legacy/structured record decoding

pub mod memory;
pub mod record;

#[cfg(target_arch = "wasm32")]
pub mod local;

#[cfg(not(target_arch = "wasm32"))]
pub mod file;

pub use memory::MemoryStorage;
pub use record::{PersistedRecord, RecordError, decode_record, encode_record};

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

use thiserror::Error;

/// Failure reported by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached at all (no window, no LocalStorage)
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the write (quota exceeded, private mode, ...)
    #[error("write rejected for key '{key}': {message}")]
    WriteRejected { key: String, message: String },

    /// The stored record could not be read, so writes are held back to keep it
    #[error("record '{key}' could not be read ({message}); not overwriting it")]
    NotLoaded { key: String, message: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous string storage keyed by name.
///
/// Mirrors the browser's `Storage` interface. Reads take `&self`, writes take
/// `&mut self` so a store can own its backend exclusively.
pub trait Storage {
    /// Read the value stored under `key`, `None` if there is none
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`; removing a missing key is not an error
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}
