//! The closed set of resource kinds mirrored from the external platform.

use serde::{Deserialize, Serialize};

use crate::KeyError;

/// Kind of a cached entity.
///
/// Kinds are discriminated, not subclassed: every place that cares about
/// kind matches this enum exhaustively. Two of the kinds (network interface
/// and storage link) are edge kinds; the rest are node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Compute,
    Storage,
    Network,
    NetworkInterface,
    StorageLink,
    SecurityGroup,
    SecurityRule,
}

impl Kind {
    /// All kinds, in the order bulk reconciliation enumerates them.
    ///
    /// Networks precede computes so that compute construction finds its
    /// networks already cached; groups precede rules for the same reason.
    /// Network interfaces come last because compute construction usually
    /// materializes them first.
    pub const ALL: [Kind; 7] = [
        Kind::Network,
        Kind::SecurityGroup,
        Kind::SecurityRule,
        Kind::Compute,
        Kind::Storage,
        Kind::NetworkInterface,
        Kind::StorageLink,
    ];

    /// The path prefix that identifies this kind.
    pub const fn prefix(&self) -> &'static str {
        match self {
            Kind::Compute => "compute",
            Kind::Storage => "storage",
            Kind::Network => "network",
            Kind::NetworkInterface => "networkinterface",
            Kind::StorageLink => "storagelink",
            Kind::SecurityGroup => "securitygroup",
            Kind::SecurityRule => "securityrule",
        }
    }

    /// Parses a kind from its path prefix.
    pub fn from_prefix(prefix: &str) -> Result<Self, KeyError> {
        match prefix {
            "compute" => Ok(Kind::Compute),
            "storage" => Ok(Kind::Storage),
            "network" => Ok(Kind::Network),
            "networkinterface" => Ok(Kind::NetworkInterface),
            "storagelink" => Ok(Kind::StorageLink),
            "securitygroup" => Ok(Kind::SecurityGroup),
            "securityrule" => Ok(Kind::SecurityRule),
            other => Err(KeyError::UnknownKind(other.to_string())),
        }
    }

    /// Returns true for edge kinds (entities that connect two resources).
    pub const fn is_link(&self) -> bool {
        matches!(self, Kind::NetworkInterface | Kind::StorageLink)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

impl std::str::FromStr for Kind {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_prefix(s)
    }
}
