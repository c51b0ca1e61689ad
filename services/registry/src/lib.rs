//! strato registry library.
//!
//! This crate primarily ships a `strato-registry` binary, but the whole
//! reconciliation surface is a library so the protocol layer and the
//! integration tests can drive it directly.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod providers;
pub mod reconciler;
pub mod worker;

mod construct;

pub use cache::EntityCache;
pub use catalog::{StaticCatalog, TemplateCatalog};
pub use error::{RegistryError, RegistryResult};
pub use reconciler::Registry;
