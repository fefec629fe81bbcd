//! Shared identity registry.
//!
//! The only state sessions share is this table: active names and their
//! single-letter slots. A single mutex guards both, so claiming a name and
//! allocating its letter is one atomic step: there is no window where a
//! name is reserved without a letter or vice versa.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Name → letter table for connected identities.
#[derive(Debug, Default)]
pub struct Registry {
    table: Mutex<HashMap<String, char>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` and allocate the first free letter in `'A'..='Z'`.
    ///
    /// Returns `None` when the name is invalid (empty or not alphanumeric),
    /// already active, or the 26-slot letter pool is exhausted; all of
    /// which the handshake answers with the same empty reply.
    pub fn claim(&self, name: &str) -> Option<char> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        let mut table = self.table.lock();
        if table.contains_key(name) {
            return None;
        }
        let letter = ('A'..='Z').find(|l| !table.values().any(|v| v == l))?;
        table.insert(name.to_string(), letter);
        Some(letter)
    }

    /// Release a previously claimed name, freeing its letter.
    pub fn release(&self, name: &str) -> Option<char> {
        self.table.lock().remove(name)
    }

    /// Names currently connected, sorted (for status logging).
    pub fn active(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_free_letter() {
        let registry = Registry::new();
        assert_eq!(registry.claim("amy"), Some('A'));
        assert_eq!(registry.claim("bob"), Some('B'));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = Registry::new();
        assert_eq!(registry.claim("amy"), Some('A'));
        assert_eq!(registry.claim("amy"), None);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let registry = Registry::new();
        assert_eq!(registry.claim(""), None);
        assert_eq!(registry.claim("a b"), None);
        assert_eq!(registry.claim("a/b"), None);
        assert_eq!(registry.claim(".."), None);
    }

    #[test]
    fn test_release_frees_letter() {
        let registry = Registry::new();
        registry.claim("amy");
        registry.claim("bob");
        assert_eq!(registry.release("amy"), Some('A'));
        // The freed slot is the first free letter again.
        assert_eq!(registry.claim("cleo"), Some('A'));
    }

    #[test]
    fn test_pool_exhaustion_rejects() {
        let registry = Registry::new();
        for i in 0..26 {
            assert!(registry.claim(&format!("user{i}")).is_some());
        }
        assert_eq!(registry.claim("user26"), None);
        registry.release("user3");
        assert_eq!(registry.claim("user26"), Some('D'));
    }

    #[test]
    fn test_active_listing() {
        let registry = Registry::new();
        registry.claim("bob");
        registry.claim("amy");
        assert_eq!(registry.active(), vec!["amy", "bob"]);
    }
}
