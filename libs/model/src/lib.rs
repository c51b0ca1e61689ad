//! # strato-model
//!
//! In-memory entity model for the strato resource graph.
//!
//! An [`Entity`] mirrors exactly one external object: either a node
//! (resource) with an ordered list of attached link keys, or an edge (link)
//! between two resources. Entities never hold owning references to each
//! other; all cross-references are [`strato_id::EntityKey`]s resolved
//! against the registry cache, so evicting one entity can never leave a
//! dangling pointer, only a key that fails to resolve.

mod action;
mod entity;
mod mixin;

pub use action::Action;
pub use entity::{attr, Attributes, Entity, EntityBody};
pub use mixin::Mixin;
