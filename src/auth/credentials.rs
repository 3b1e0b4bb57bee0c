//! Credential storage
//!
//! Read-only username -> password mapping loaded before the listener
//! starts. Source format is one "username password" pair per line with
//! exactly one separating space; malformed lines are logged and skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

use log::{info, warn};

use crate::error::CredentialError;

/// Immutable snapshot of user credentials, shared by reference with every
/// session handler.
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    /// Loads credentials from a file. Errors here are fatal at startup.
    pub fn load(path: &str) -> Result<Self, CredentialError> {
        let file = File::open(path).map_err(|e| CredentialError::Open(path.to_string(), e))?;
        let store = Self::from_reader(BufReader::new(file))?;
        info!("{} user credentials read from {}", store.len(), path);
        Ok(store)
    }

    /// Parses credentials from any buffered reader.
    ///
    /// Lines that do not contain exactly two space-separated tokens are
    /// skipped with a warning; the token count is checked before any
    /// indexing.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, CredentialError> {
        let mut users = HashMap::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(CredentialError::Read)?;
            let fields: Vec<&str> = line.split(' ').collect();
            if fields.len() != 2 || fields[0].is_empty() || fields[1].is_empty() {
                warn!("Bad user credential line ({}); skipped", lineno);
                continue;
            }
            users.insert(fields[0].to_string(), fields[1].to_string());
        }
        Ok(Self { users })
    }

    /// Builds a store from in-memory pairs. Used by tests and embedders.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let users = pairs
            .iter()
            .map(|(user, pass)| (user.to_string(), pass.to_string()))
            .collect();
        Self { users }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn get(&self, username: &str) -> Option<&str> {
        self.users.get(username).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parses_well_formed_lines() {
        let input = Cursor::new("alice secret\nbob hunter2\n");
        let store = CredentialStore::from_reader(input).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("alice"), Some("secret"));
        assert_eq!(store.get("bob"), Some("hunter2"));
    }

    #[test]
    fn test_skips_malformed_lines() {
        let input = Cursor::new("alice secret\nnospace\ntoo many tokens\n\ncarol pw\n");
        let store = CredentialStore::from_reader(input).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains("alice"));
        assert!(store.contains("carol"));
        assert!(!store.contains("nospace"));
        assert!(!store.contains("too"));
    }

    #[test]
    fn test_unknown_user_lookup() {
        let store = CredentialStore::from_pairs(&[("alice", "secret")]);
        assert_eq!(store.get("mallory"), None);
        assert!(!store.contains("mallory"));
    }
}
