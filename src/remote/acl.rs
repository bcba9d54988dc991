use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key granting access to everyone, including anonymous callers.
pub const PUBLIC_KEY: &str = "*";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
}

/// Per-record access list, keyed by user object id.
///
/// An empty list is treated as public, which is how the backend stores
/// records created without an explicit ACL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl(BTreeMap<String, Permission>);

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read+write for `user_id` and nobody else.
    pub fn owner_only(user_id: &str) -> Self {
        let mut acl = Self::new();
        acl.put(user_id, true, true);
        acl
    }

    pub fn put(&mut self, key: &str, read: bool, write: bool) {
        self.0.insert(key.to_string(), Permission { read, write });
    }

    pub fn get(&self, key: &str) -> Option<Permission> {
        self.0.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn can_read(&self, user_id: Option<&str>) -> bool {
        self.allows(user_id, |p| p.read)
    }

    pub fn can_write(&self, user_id: Option<&str>) -> bool {
        self.allows(user_id, |p| p.write)
    }

    fn allows(&self, user_id: Option<&str>, check: impl Fn(&Permission) -> bool) -> bool {
        if self.is_empty() {
            return true;
        }
        if self.0.get(PUBLIC_KEY).is_some_and(&check) {
            return true;
        }
        user_id
            .and_then(|id| self.0.get(id))
            .is_some_and(check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_only_grants_exactly_one_user() {
        let acl = Acl::owner_only("u1");
        assert_eq!(acl.len(), 1);
        assert_eq!(acl.get("u1"), Some(Permission { read: true, write: true }));
        assert!(acl.can_read(Some("u1")));
        assert!(acl.can_write(Some("u1")));
        assert!(!acl.can_read(Some("u2")));
        assert!(!acl.can_read(None));
    }

    #[test]
    fn empty_and_public_lists_allow_anyone() {
        assert!(Acl::new().can_write(None));

        let mut acl = Acl::owner_only("u1");
        acl.put(PUBLIC_KEY, true, false);
        assert!(acl.can_read(Some("u2")));
        assert!(!acl.can_write(Some("u2")));
    }

    #[test]
    fn serializes_as_plain_map() {
        let json = serde_json::to_value(Acl::owner_only("abc")).unwrap();
        assert_eq!(json, serde_json::json!({"abc": {"read": true, "write": true}}));
    }
}
