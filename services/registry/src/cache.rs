//! Resource graph cache.
//!
//! Process-wide mapping from `(key, owner)` to entity. This is the only
//! mutable shared state in the core: no I/O happens here, no operation
//! fails, absence is a normal result. Consistency across an entire
//! reconciliation pass is the engine's job (passes for one owner are
//! serialized there); this module only guarantees that each individual
//! operation is atomic.

use std::collections::HashMap;
use std::sync::RwLock;

use strato_id::{EntityKey, OwnerScope};
use strato_model::Entity;

type CacheKey = (EntityKey, OwnerScope);

/// Drops `link` from the attached list of the resource at `endpoint`,
/// wherever that resource lives (the pass owner's scope or shared).
fn prune_link(
    map: &mut HashMap<CacheKey, Entity>,
    endpoint: &EntityKey,
    owner: &OwnerScope,
    link: &EntityKey,
) {
    for scope in [owner, &OwnerScope::Shared] {
        if let Some(resource) = map.get_mut(&(endpoint.clone(), scope.clone())) {
            resource.remove_link(link);
            return;
        }
    }
}

/// Keyed store for cached entities.
#[derive(Debug, Default)]
pub struct EntityCache {
    inner: RwLock<HashMap<CacheKey, Entity>>,
}

impl EntityCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up one entry. Returns a clone; the canonical copy stays inside.
    pub fn get(&self, key: &EntityKey, owner: &OwnerScope) -> Option<Entity> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(&(key.clone(), owner.clone())).cloned()
    }

    /// Whether an entry exists.
    pub fn contains(&self, key: &EntityKey, owner: &OwnerScope) -> bool {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.contains_key(&(key.clone(), owner.clone()))
    }

    /// Inserts or replaces an entry, keyed by the entity's own key and owner.
    pub fn put(&self, entity: Entity) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert((entity.key.clone(), entity.owner.clone()), entity);
    }

    /// Records `link` on the resource at `endpoint`, looking under `owner`
    /// first and falling back to shared. The read-modify-write runs under
    /// one lock acquisition: shared endpoints are mutated by every owner's
    /// pass, and a get-then-put from two passes would lose one of the
    /// registrations.
    pub fn attach_link(&self, endpoint: &EntityKey, owner: &OwnerScope, link: &EntityKey) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        for scope in [owner, &OwnerScope::Shared] {
            if let Some(resource) = map.get_mut(&(endpoint.clone(), scope.clone())) {
                resource.add_link(link.clone());
                return;
            }
        }
    }

    /// Removes one entry without cascading. Returns the evicted entity.
    pub fn evict(&self, key: &EntityKey, owner: &OwnerScope) -> Option<Entity> {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.remove(&(key.clone(), owner.clone()))
    }

    /// Removes a resource together with every link that references it.
    ///
    /// Links for which the resource is source or target go first, and each
    /// evicted link is also pruned from its surviving endpoint's attached
    /// list, so no resource ever advertises a link key that no longer
    /// resolves. Returns the keys of everything removed.
    pub fn evict_cascade(&self, key: &EntityKey, owner: &OwnerScope) -> Vec<EntityKey> {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut removed = Vec::new();

        let link_keys: Vec<CacheKey> = map
            .iter()
            .filter(|((_, entry_owner), entity)| {
                entry_owner == owner
                    && entity
                        .endpoints()
                        .is_some_and(|(source, target)| source == key || target == key)
            })
            .map(|(cache_key, _)| cache_key.clone())
            .collect();

        for cache_key in link_keys {
            if let Some(link) = map.remove(&cache_key) {
                if let Some((source, target)) = link.endpoints() {
                    let other = if source == key { target } else { source };
                    prune_link(&mut map, other, owner, &link.key);
                }
                removed.push(link.key);
            }
        }

        if let Some(entity) = map.remove(&(key.clone(), owner.clone())) {
            // Evicting a link directly also detaches it from both endpoints.
            if let Some((source, target)) = entity.endpoints() {
                prune_link(&mut map, source, owner, &entity.key);
                prune_link(&mut map, target, owner, &entity.key);
            }
            removed.push(key.clone());
        }
        removed
    }

    /// Every entity visible to an owner: its own entries plus shared ones.
    pub fn all_for_owner(&self, owner: &OwnerScope) -> Vec<Entity> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut entities: Vec<Entity> = map
            .iter()
            .filter(|((_, entry_owner), _)| entry_owner.is_shared() || entry_owner == owner)
            .map(|(_, entity)| entity.clone())
            .collect();
        // Deterministic iteration order for callers and tests.
        entities.sort_by(|a, b| (&a.key, &a.owner).cmp(&(&b.key, &b.owner)));
        entities
    }

    /// Number of cached entries, across all owners.
    pub fn len(&self) -> usize {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strato_id::Kind;

    fn key(kind: Kind, raw: &str) -> EntityKey {
        EntityKey::new(kind, raw).unwrap()
    }

    fn owner() -> OwnerScope {
        OwnerScope::owned("alice", "p1")
    }

    #[test]
    fn test_put_get_evict() {
        let cache = EntityCache::new();
        let e = Entity::new_resource(key(Kind::Compute, "i1"), owner());
        cache.put(e.clone());

        assert_eq!(cache.get(&e.key, &owner()), Some(e.clone()));
        assert!(cache.get(&e.key, &OwnerScope::owned("bob", "p2")).is_none());

        assert!(cache.evict(&e.key, &owner()).is_some());
        assert!(cache.get(&e.key, &owner()).is_none());
        assert!(cache.evict(&e.key, &owner()).is_none());
    }

    #[test]
    fn test_unique_per_owner() {
        let cache = EntityCache::new();
        let k = key(Kind::Network, "n1");
        cache.put(Entity::new_resource(k.clone(), owner()));
        cache.put(Entity::new_resource(k.clone(), owner()));
        assert_eq!(cache.len(), 1);
        cache.put(Entity::new_resource(k.clone(), OwnerScope::Shared));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_all_for_owner_includes_shared() {
        let cache = EntityCache::new();
        cache.put(Entity::new_resource(key(Kind::Network, "public"), OwnerScope::Shared));
        cache.put(Entity::new_resource(key(Kind::Compute, "i1"), owner()));
        cache.put(Entity::new_resource(
            key(Kind::Compute, "i2"),
            OwnerScope::owned("bob", "p2"),
        ));

        let visible = cache.all_for_owner(&owner());
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().any(|e| e.key.raw() == "public"));
        assert!(visible.iter().any(|e| e.key.raw() == "i1"));
    }

    #[test]
    fn test_cascade_removes_links_from_both_sides() {
        let cache = EntityCache::new();
        let compute_key = key(Kind::Compute, "i1");
        let net_key = key(Kind::Network, "n1");
        let link_key = key(Kind::NetworkInterface, "p1");

        let mut compute = Entity::new_resource(compute_key.clone(), owner());
        compute.add_link(link_key.clone());
        let mut network = Entity::new_resource(net_key.clone(), owner());
        network.add_link(link_key.clone());
        let link = Entity::new_link(
            link_key.clone(),
            owner(),
            compute_key.clone(),
            net_key.clone(),
        );

        cache.put(compute);
        cache.put(network);
        cache.put(link);

        let removed = cache.evict_cascade(&compute_key, &owner());
        assert!(removed.contains(&link_key));
        assert!(removed.contains(&compute_key));
        assert!(cache.get(&link_key, &owner()).is_none());

        // The surviving endpoint no longer advertises the evicted link.
        let network = cache.get(&net_key, &owner()).unwrap();
        assert!(network.links().is_empty());
    }

    #[test]
    fn test_cascade_from_target_side() {
        let cache = EntityCache::new();
        let compute_key = key(Kind::Compute, "i1");
        let net_key = key(Kind::Network, "n1");
        let link_key = key(Kind::NetworkInterface, "p1");

        cache.put(Entity::new_resource(compute_key.clone(), owner()));
        cache.put(Entity::new_resource(net_key.clone(), owner()));
        cache.put(Entity::new_link(
            link_key.clone(),
            owner(),
            compute_key.clone(),
            net_key.clone(),
        ));

        let removed = cache.evict_cascade(&net_key, &owner());
        assert!(removed.contains(&link_key));
        assert!(removed.contains(&net_key));
        assert!(cache.get(&compute_key, &owner()).is_some());
    }

    #[test]
    fn test_attach_link_falls_back_to_shared_and_dedups() {
        let cache = EntityCache::new();
        let compute_key = key(Kind::Compute, "i1");
        let net_key = key(Kind::Network, "public");
        let link_key = key(Kind::NetworkInterface, "p1");

        cache.put(Entity::new_resource(compute_key.clone(), owner()));
        cache.put(Entity::new_resource(net_key.clone(), OwnerScope::Shared));

        cache.attach_link(&compute_key, &owner(), &link_key);
        cache.attach_link(&net_key, &owner(), &link_key);
        cache.attach_link(&net_key, &owner(), &link_key);

        assert_eq!(cache.get(&compute_key, &owner()).unwrap().links(), &[link_key.clone()]);
        assert_eq!(
            cache.get(&net_key, &OwnerScope::Shared).unwrap().links(),
            &[link_key]
        );
    }

    #[test]
    fn test_evicting_a_link_detaches_it_from_both_endpoints() {
        let cache = EntityCache::new();
        let compute_key = key(Kind::Compute, "i1");
        let net_key = key(Kind::Network, "public");
        let link_key = key(Kind::NetworkInterface, "p1");

        let mut compute = Entity::new_resource(compute_key.clone(), owner());
        compute.add_link(link_key.clone());
        // Shared endpoint: the link is still pruned from its list.
        let mut network = Entity::new_resource(net_key.clone(), OwnerScope::Shared);
        network.add_link(link_key.clone());

        cache.put(compute);
        cache.put(network);
        cache.put(Entity::new_link(
            link_key.clone(),
            owner(),
            compute_key.clone(),
            net_key.clone(),
        ));

        let removed = cache.evict_cascade(&link_key, &owner());
        assert_eq!(removed, vec![link_key.clone()]);
        assert!(cache.get(&compute_key, &owner()).unwrap().links().is_empty());
        assert!(cache
            .get(&net_key, &OwnerScope::Shared)
            .unwrap()
            .links()
            .is_empty());
    }

    #[test]
    fn test_cascade_does_not_touch_other_owners() {
        let cache = EntityCache::new();
        let bob = OwnerScope::owned("bob", "p2");
        let k = key(Kind::Compute, "i1");
        cache.put(Entity::new_resource(k.clone(), owner()));
        cache.put(Entity::new_resource(k.clone(), bob.clone()));

        cache.evict_cascade(&k, &owner());
        assert!(cache.get(&k, &owner()).is_none());
        assert!(cache.get(&k, &bob).is_some());
    }
}
