use log::{info, warn};

use crate::core::catalog::MethodCatalog;

/// Methods that can create, modify or delete server state.
pub const DANGEROUS_METHODS: &[&str] = &["COPY", "DELETE", "PATCH", "PUT", "UNCHECKOUT"];

pub fn is_dangerous(method: &str) -> bool {
    DANGEROUS_METHODS
        .iter()
        .any(|d| d.eq_ignore_ascii_case(method.trim()))
}

impl MethodCatalog {
    pub fn without_dangerous(&self) -> MethodCatalog {
        self.filter(|m| !is_dangerous(m))
    }
}

/// Drops dangerous methods when `safe_only` is set, otherwise warns that
/// they will be sent.
pub fn apply_safe_mode(catalog: MethodCatalog, safe_only: bool) -> MethodCatalog {
    if safe_only {
        info!("Safe mode enabled, testing only non-dangerous methods");
        catalog.without_dangerous()
    } else {
        warn!("Testing includes potentially dangerous HTTP methods (PUT, DELETE, etc.)");
        warn!("Use --safe-only to exclude them");
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dangerous() {
        assert!(is_dangerous("PUT"));
        assert!(is_dangerous("delete"));
        assert!(!is_dangerous("GET"));
        assert!(!is_dangerous("OPTIONS"));
    }

    #[test]
    fn test_filter_removes_exactly_dangerous_methods() {
        let catalog = MethodCatalog::defaults();
        let filtered = apply_safe_mode(catalog.clone(), true);

        assert_eq!(filtered.len(), catalog.len() - DANGEROUS_METHODS.len());
        assert!(filtered.iter().all(|m| catalog.contains(m)));
        assert!(filtered.iter().all(|m| !is_dangerous(m)));
        for method in catalog.iter().filter(|m| !is_dangerous(m)) {
            assert!(filtered.contains(method));
        }
    }

    #[test]
    fn test_filter_is_idempotent() {
        let once = MethodCatalog::defaults().without_dangerous();
        let twice = once.without_dangerous();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_preserves_order() {
        let filtered = MethodCatalog::from_candidates(["PUT", "GET", "DELETE", "HEAD", "TRACE"]).without_dangerous();
        assert_eq!(filtered.methods(), &["GET".to_string(), "HEAD".to_string(), "TRACE".to_string()]);
    }

    #[test]
    fn test_disabled_filter_passes_through() {
        let catalog = MethodCatalog::defaults();
        assert_eq!(apply_safe_mode(catalog.clone(), false), catalog);
    }
}
