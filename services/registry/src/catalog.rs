//! Flavor and image template lookup.
//!
//! Compute construction resolves the flavor and image of an instance into
//! template mixins through this collaborator. The real platform serves
//! these from its image and flavor catalogs; the registry only needs the
//! id → term mapping.

use std::collections::BTreeMap;

use strato_model::Mixin;

/// Category lookup for template mixins.
pub trait TemplateCatalog: Send + Sync {
    /// Resource template for a flavor id, if the catalog knows it.
    fn flavor(&self, flavor_id: &str) -> Option<Mixin>;

    /// OS template for an image id, if the catalog knows it.
    fn image(&self, image_id: &str) -> Option<Mixin>;
}

/// In-memory catalog from configured id → term tables.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
    flavors: BTreeMap<String, String>,
    images: BTreeMap<String, String>,
}

impl StaticCatalog {
    /// Builds a catalog from flavor and image tables.
    pub fn new(flavors: BTreeMap<String, String>, images: BTreeMap<String, String>) -> Self {
        Self { flavors, images }
    }
}

impl TemplateCatalog for StaticCatalog {
    fn flavor(&self, flavor_id: &str) -> Option<Mixin> {
        self.flavors.get(flavor_id).map(|term| Mixin::ResourceTemplate {
            flavor_id: flavor_id.to_string(),
            term: term.clone(),
        })
    }

    fn image(&self, image_id: &str) -> Option<Mixin> {
        self.images.get(image_id).map(|term| Mixin::OsTemplate {
            image_id: image_id.to_string(),
            term: term.clone(),
        })
    }
}
