//! Entities: cached nodes and edges of the resource graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strato_id::{EntityKey, OwnerScope};

use crate::{Action, Mixin};

/// Attribute map of an entity. Keys are namespaced by kind
/// (`compute.cores`, `storage.state`, ...) plus the `core.*` namespace.
pub type Attributes = BTreeMap<String, String>;

/// Well-known attribute keys.
pub mod attr {
    /// Raw external id, always present.
    pub const CORE_ID: &str = "core.id";
    /// User-supplied title. Locally owned; survives refresh.
    pub const CORE_TITLE: &str = "core.title";
    /// User-supplied summary. Locally owned; survives refresh.
    pub const CORE_SUMMARY: &str = "core.summary";

    /// Attributes the local representation owns. Everything else is fully
    /// repopulated from the external object on every reconciliation pass.
    pub const LOCALLY_OWNED: [&str; 2] = [CORE_TITLE, CORE_SUMMARY];
}

/// The variant half of an entity: node or edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "body")]
pub enum EntityBody {
    /// A node. `links` holds the keys of links attached to this resource,
    /// in construction order. Both endpoints of a link record it, so a
    /// cascade from either side finds it.
    Resource { links: Vec<EntityKey> },

    /// An edge between two resources. Endpoints are back-references into
    /// the cache; the link does not own them.
    Link { source: EntityKey, target: EntityKey },
}

/// One cached entity, mirroring one external object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub key: EntityKey,
    pub owner: OwnerScope,
    pub attributes: Attributes,
    pub mixins: Vec<Mixin>,
    pub actions: BTreeSet<Action>,
    pub body: EntityBody,
}

impl Entity {
    /// Creates a resource entity with no attributes, mixins, or links yet.
    pub fn new_resource(key: EntityKey, owner: OwnerScope) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(attr::CORE_ID.to_string(), key.raw().to_string());
        Self {
            key,
            owner,
            attributes,
            mixins: Vec::new(),
            actions: BTreeSet::new(),
            body: EntityBody::Resource { links: Vec::new() },
        }
    }

    /// Creates a link entity between two resources.
    pub fn new_link(key: EntityKey, owner: OwnerScope, source: EntityKey, target: EntityKey) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(attr::CORE_ID.to_string(), key.raw().to_string());
        Self {
            key,
            owner,
            attributes,
            mixins: Vec::new(),
            actions: BTreeSet::new(),
            body: EntityBody::Link { source, target },
        }
    }

    /// The kind this entity mirrors.
    pub fn kind(&self) -> strato_id::Kind {
        self.key.kind()
    }

    /// Returns true if this entity is an edge.
    pub fn is_link(&self) -> bool {
        matches!(self.body, EntityBody::Link { .. })
    }

    /// The attached link keys of a resource; empty for links.
    pub fn links(&self) -> &[EntityKey] {
        match &self.body {
            EntityBody::Resource { links } => links,
            EntityBody::Link { .. } => &[],
        }
    }

    /// The endpoints of a link; `None` for resources.
    pub fn endpoints(&self) -> Option<(&EntityKey, &EntityKey)> {
        match &self.body {
            EntityBody::Link { source, target } => Some((source, target)),
            EntityBody::Resource { .. } => None,
        }
    }

    /// Records a link on a resource. No-op for links and for duplicates.
    pub fn add_link(&mut self, link: EntityKey) {
        if let EntityBody::Resource { links } = &mut self.body {
            if !links.contains(&link) {
                links.push(link);
            }
        }
    }

    /// Drops a link key from a resource's attached list, if present.
    pub fn remove_link(&mut self, link: &EntityKey) {
        if let EntityBody::Resource { links } = &mut self.body {
            links.retain(|l| l != link);
        }
    }

    /// Fully repopulates attributes from a freshly fetched external object.
    ///
    /// Locally owned attributes (`core.title`, `core.summary`) survive; a
    /// partially updated external object can therefore never leave stale
    /// externally sourced attributes behind, field-by-field merging is
    /// never done.
    pub fn refresh_attributes(&mut self, mut fresh: Attributes) {
        for key in attr::LOCALLY_OWNED {
            if let Some(value) = self.attributes.get(key) {
                fresh.entry(key.to_string()).or_insert_with(|| value.clone());
            }
        }
        fresh.insert(attr::CORE_ID.to_string(), self.key.raw().to_string());
        self.attributes = fresh;
    }
}
