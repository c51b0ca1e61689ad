//! Owner scopes for cache partitioning.

use serde::{Deserialize, Serialize};

/// The cache key half that partitions entities by visibility.
///
/// An entity is either shared (visible to every caller, never evicted by a
/// single caller's reconciliation pass) or owned by one (user, project)
/// pair. The shared sentinel is distinct from any real pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "scope")]
pub enum OwnerScope {
    Shared,
    Owned { user: String, project: String },
}

impl OwnerScope {
    /// Creates an owned scope for a (user, project) pair.
    pub fn owned(user: impl Into<String>, project: impl Into<String>) -> Self {
        OwnerScope::Owned {
            user: user.into(),
            project: project.into(),
        }
    }

    /// Returns true for the shared sentinel.
    pub fn is_shared(&self) -> bool {
        matches!(self, OwnerScope::Shared)
    }
}

impl std::fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnerScope::Shared => f.write_str("shared"),
            OwnerScope::Owned { user, project } => write!(f, "{user}:{project}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_is_distinct_from_any_pair() {
        let shared = OwnerScope::Shared;
        let owned = OwnerScope::owned("shared", "shared");
        assert_ne!(shared, owned);
        assert!(shared.is_shared());
        assert!(!owned.is_shared());
    }

    #[test]
    fn test_display() {
        assert_eq!(OwnerScope::Shared.to_string(), "shared");
        assert_eq!(OwnerScope::owned("alice", "p1").to_string(), "alice:p1");
    }

    #[test]
    fn test_json_roundtrip() {
        let owned = OwnerScope::owned("alice", "p1");
        let json = serde_json::to_string(&owned).unwrap();
        let parsed: OwnerScope = serde_json::from_str(&json).unwrap();
        assert_eq!(owned, parsed);
    }
}
