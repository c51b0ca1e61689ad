//! # strato-id
//!
//! Entity keys, kind prefixes, and owner scopes for the strato resource graph.
//!
//! ## Design Principles
//!
//! - Raw ids are allocated by the external platform; we never mint them
//!   (the one exception, storage links, is handled by the registry itself)
//! - Every externally addressable path has the form `/{kind-prefix}/{raw-id}`
//! - Keys are typed by kind so a raw id is only ever checked against its own
//!   kind's authoritative listing
//! - Keys support roundtrip serialization (parse → format → parse)
//!
//! ## Key Format
//!
//! Examples:
//! - `/compute/7f3a9c12-8a44-4f0e-9ad1-0b1f6e2c5d77`
//! - `/network/a1b2c3d4`
//! - `/securityrule/rule-22-ingress`
//!
//! The raw id is always the substring after the last path separator, so the
//! externally visible path decomposes deterministically.

mod error;
mod key;
mod kind;
mod owner;

pub use error::KeyError;
pub use key::EntityKey;
pub use kind::Kind;
pub use owner::OwnerScope;
