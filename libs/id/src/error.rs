//! Error types for key parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating entity keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key string is empty.
    #[error("key cannot be empty")]
    Empty,

    /// The key is missing the path separator between prefix and raw id.
    #[error("key missing path separator")]
    MissingSeparator,

    /// The kind prefix is not one of the known kinds.
    #[error("unknown kind prefix: '{0}'")]
    UnknownKind(String),

    /// The raw id portion of the key is empty.
    #[error("key has an empty raw id")]
    EmptyRawId,

    /// The raw id contains a path separator.
    #[error("raw id must not contain '/': '{0}'")]
    RawIdWithSeparator(String),
}

impl KeyError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, KeyError::Empty)
    }

    /// Returns true if this error indicates a bad or missing kind prefix.
    pub fn is_prefix_error(&self) -> bool {
        matches!(
            self,
            KeyError::UnknownKind(_) | KeyError::MissingSeparator
        )
    }
}
