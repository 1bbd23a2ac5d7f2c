use std::sync::Arc;

use academy_storage::KeyValueStore;

use crate::error::TenantError;
use crate::resolver::is_valid_tenant_code;

/// Storage key holding the operator's tenant override.
pub const TENANT_STORAGE_KEY: &str = "tenant_code";

/// Persistent tenant override (operator- or UI-driven tenant switch).
///
/// Storage failures never propagate: a failed read behaves like "no
/// override", a failed write is logged and dropped.
#[derive(Clone)]
pub struct TenantOverrideStore {
    store: Arc<dyn KeyValueStore>,
}

impl TenantOverrideStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored override, trimmed; `None` when absent, blank or unreadable.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        match self.store.get(TENANT_STORAGE_KEY) {
            Ok(value) => value
                .map(|v| v.trim().to_ascii_lowercase())
                .filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "tenant override unreadable; ignoring");
                None
            }
        }
    }

    /// Save an override. Blank input is ignored.
    ///
    /// # Errors
    /// Returns [`TenantError::InvalidCode`] when the code has characters a
    /// tenant code cannot contain.
    pub fn set(&self, code: &str) -> Result<(), TenantError> {
        let code = code.trim().to_ascii_lowercase();
        if code.is_empty() {
            return Ok(());
        }
        if !is_valid_tenant_code(&code) {
            return Err(TenantError::InvalidCode(code));
        }
        if let Err(e) = self.store.set(TENANT_STORAGE_KEY, &code) {
            tracing::warn!(error = %e, "failed to persist tenant override");
        } else {
            tracing::info!(tenant = %code, "tenant override saved");
        }
        Ok(())
    }

    /// Remove the override, falling back to hostname resolution.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(TENANT_STORAGE_KEY) {
            tracing::warn!(error = %e, "failed to clear tenant override");
        }
    }
}

impl std::fmt::Debug for TenantOverrideStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantOverrideStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use academy_storage::{MemoryStore, UnavailableStore};

    #[test]
    fn set_get_clear() {
        let overrides = TenantOverrideStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(overrides.get(), None);

        overrides.set("  TChul ").unwrap();
        assert_eq!(overrides.get().as_deref(), Some("tchul"));

        overrides.clear();
        assert_eq!(overrides.get(), None);
    }

    #[test]
    fn blank_set_is_ignored() {
        let store = Arc::new(MemoryStore::with_entries([(TENANT_STORAGE_KEY, "ymath")]));
        let overrides = TenantOverrideStore::new(store);
        overrides.set("   ").unwrap();
        assert_eq!(overrides.get().as_deref(), Some("ymath"));
    }

    #[test]
    fn invalid_code_rejected() {
        let overrides = TenantOverrideStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(
            overrides.set("acme corp"),
            Err(TenantError::InvalidCode("acme corp".to_owned()))
        );
        assert_eq!(overrides.get(), None);
    }

    #[test]
    fn blank_stored_value_reads_as_absent() {
        let store = Arc::new(MemoryStore::with_entries([(TENANT_STORAGE_KEY, "  ")]));
        assert_eq!(TenantOverrideStore::new(store).get(), None);
    }

    #[test]
    #[tracing_test::traced_test]
    fn storage_failures_are_swallowed() {
        let overrides = TenantOverrideStore::new(Arc::new(UnavailableStore));
        assert_eq!(overrides.get(), None);
        assert!(overrides.set("tchul").is_ok());
        overrides.clear();
        assert!(logs_contain("failed to persist tenant override"));
    }
}
