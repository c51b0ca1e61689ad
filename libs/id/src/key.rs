//! Path-style entity keys.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{KeyError, Kind};

/// The cache key half that identifies an entity: kind plus raw external id.
///
/// Formats as `/{kind-prefix}/{raw-id}` and parses strictly. The raw id is
/// the substring after the last path separator, so the key decomposes to
/// exactly one raw id for the key's kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    kind: Kind,
    raw: String,
}

impl EntityKey {
    /// Creates a key from a kind and a raw external id.
    pub fn new(kind: Kind, raw: impl Into<String>) -> Result<Self, KeyError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(KeyError::EmptyRawId);
        }
        if raw.contains('/') {
            return Err(KeyError::RawIdWithSeparator(raw));
        }
        Ok(Self { kind, raw })
    }

    /// The kind this key addresses.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The raw external id (last path segment).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parses a key from its path form.
    ///
    /// The leading separator is optional; everything else is strict.
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        if s.is_empty() {
            return Err(KeyError::Empty);
        }

        let trimmed = s.strip_prefix('/').unwrap_or(s);
        let Some((prefix, rest)) = trimmed.split_once('/') else {
            return Err(KeyError::MissingSeparator);
        };

        let kind = Kind::from_prefix(prefix)?;
        // Raw id is the segment after the last separator.
        let raw = rest.rsplit('/').next().unwrap_or(rest);
        if raw.is_empty() {
            return Err(KeyError::EmptyRawId);
        }

        Ok(Self {
            kind,
            raw: raw.to_string(),
        })
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.kind.prefix(), self.raw)
    }
}

impl std::str::FromStr for EntityKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for EntityKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}
