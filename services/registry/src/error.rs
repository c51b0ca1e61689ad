//! Error taxonomy for reconciliation passes.

use strato_id::EntityKey;
use thiserror::Error;

use crate::providers::ProviderError;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by the reconciliation engine.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The identifier is absent from every authoritative listing.
    /// Propagated to the caller, never retried here.
    #[error("not found: {0}")]
    NotFound(EntityKey),

    /// An external provider call failed. Aborts the current pass; entries
    /// already refreshed earlier in the pass keep their refreshed state.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] ProviderError),

    /// A construction produced an entity whose key does not match the
    /// requested one. Indicates a broken kind-disambiguation assumption;
    /// never silently corrected.
    #[error("identity conflict: requested {requested}, got {got}")]
    IdentityConflict {
        requested: EntityKey,
        got: EntityKey,
    },
}

impl RegistryError {
    /// Returns true for the not-found case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}
