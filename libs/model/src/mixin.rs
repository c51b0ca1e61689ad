//! Kind extensions applied to entities.

use serde::{Deserialize, Serialize};
use strato_id::EntityKey;

/// A kind extension attached to an entity.
///
/// Mixins carry the platform-specific capabilities the plain kind does not
/// express: which flavor and image a compute was built from, whether a
/// network can hand out addresses, which rules a security group contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mixin")]
pub enum Mixin {
    /// OS template: the image the compute was provisioned from.
    OsTemplate { image_id: String, term: String },

    /// Resource template: the flavor sizing the compute.
    ResourceTemplate { flavor_id: String, term: String },

    /// The network has at least one subnet and can hand out addresses.
    IpNetwork,

    /// Reference to a security rule contained in a security group.
    Rule { key: EntityKey },
}

impl Mixin {
    /// Returns true for the two template mixins resolved from the catalog.
    pub fn is_template(&self) -> bool {
        matches!(
            self,
            Mixin::OsTemplate { .. } | Mixin::ResourceTemplate { .. }
        )
    }
}
