#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Durable key-value storage for client session state.
//!
//! Session tokens and the tenant override live in a small string map that
//! survives process restarts. Callers that must keep working when storage is
//! unavailable (read-only home, corrupted file) treat every error as "value
//! absent"; the store itself reports errors faithfully.

mod error;
mod file;
mod home;
mod memory;

pub use error::StorageError;
pub use file::JsonFileStore;
pub use home::{DEFAULT_STORAGE_FILE, default_home_dir, expand_tilde};
pub use memory::{MemoryStore, UnavailableStore};

/// String key-value store.
///
/// Implementations are shared across tasks behind an `Arc` and must be safe
/// to call concurrently.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Write several values in one step: either all of them are stored or,
    /// on error, none are.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the backing storage cannot be written.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove several values in one step.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the backing storage cannot be written.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError>;
}
