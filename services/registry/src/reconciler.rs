//! Reconciliation engine.
//!
//! Orchestrates, for a single-entity read and for a bulk listing read, the
//! diff between cache contents and the live authoritative id sets, driving
//! eviction, in-place refresh, or construction. Authoritative listings are
//! fetched once per pass and used consistently for every diff decision in
//! that pass.
//!
//! Passes for the same owner are serialized on a per-owner async mutex, so
//! a construct-after-evict race can never resurrect a stale entity and a
//! read can never observe a half-evicted link.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use strato_id::{EntityKey, Kind, OwnerScope};
use strato_model::Entity;
use tracing::{debug, error, instrument, warn};

use crate::cache::EntityCache;
use crate::catalog::TemplateCatalog;
use crate::construct::{self, BuildContext};
use crate::error::{RegistryError, RegistryResult};
use crate::providers::{Listings, ProviderSet};

/// The reconciliation engine and its cache.
pub struct Registry {
    cache: EntityCache,
    providers: ProviderSet,
    catalog: Arc<dyn TemplateCatalog>,
    pass_locks: Mutex<HashMap<OwnerScope, Arc<tokio::sync::Mutex<()>>>>,
}

impl Registry {
    /// Creates a registry with an empty cache.
    pub fn new(providers: ProviderSet, catalog: Arc<dyn TemplateCatalog>) -> Self {
        Self {
            cache: EntityCache::new(),
            providers,
            catalog,
            pass_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying cache. Exposed for the write handlers and tests.
    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    fn pass_lock(&self, scope: &OwnerScope) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.pass_locks.lock().unwrap_or_else(|e| e.into_inner());
        // Drop locks no in-flight pass holds, so the map does not grow by
        // one entry per owner ever seen over the process lifetime.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(scope.clone()).or_default().clone()
    }

    fn context<'a>(&'a self, listings: &'a Listings, scope: &'a OwnerScope) -> BuildContext<'a> {
        BuildContext {
            cache: &self.cache,
            providers: &self.providers,
            catalog: self.catalog.as_ref(),
            listings,
            scope,
        }
    }

    /// Single-entity read.
    ///
    /// Fails with [`RegistryError::NotFound`] when the identifier is absent
    /// from every authoritative listing; evicts a previously cached entry
    /// as a side effect when its listing no longer contains it.
    #[instrument(skip(self), fields(key = %key, scope = %scope))]
    pub async fn resolve(&self, key: &EntityKey, scope: &OwnerScope) -> RegistryResult<Entity> {
        let lock = self.pass_lock(scope);
        let _pass = lock.lock().await;

        let listings = Listings::fetch(&self.providers, scope).await?;
        let ctx = self.context(&listings, scope);

        if let Some(mut cached) = self.cache.get(key, scope) {
            // Storage links have no authoritative listing of their own;
            // their lifetime is governed by cascade from their endpoints.
            if cached.kind() == Kind::StorageLink {
                return Ok(cached);
            }
            if !listings.contains(cached.kind(), key.raw()) {
                debug!("Cached entity vanished from its listing, evicting");
                self.cache.evict_cascade(key, scope);
                return Err(RegistryError::NotFound(key.clone()));
            }
            construct::refresh_in_place(&ctx, &mut cached).await?;
            return Ok(cached);
        }

        if let Some(shared) = self.cache.get(key, &OwnerScope::Shared) {
            // Shared entities are not owner-reconciled on every read.
            return Ok(shared);
        }

        let matching = listings.kinds_containing(key.raw());
        if matching.len() > 1 {
            // Cross-kind id collision: the per-kind namespacing assumption
            // is broken. Refuse to guess.
            warn!(kinds = ?matching, "Raw id present in more than one authoritative listing");
            return Err(RegistryError::NotFound(key.clone()));
        }
        if !listings.contains(key.kind(), key.raw()) {
            return Err(RegistryError::NotFound(key.clone()));
        }

        let built = construct::construct(&ctx, key.kind(), key.raw(), 0).await?;
        let primary = built
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::NotFound(key.clone()))?;
        self.check_identity(key, primary)
    }

    /// Bulk read: every entity visible to this owner, reconciled against
    /// the authoritative listings fetched at the start of the pass.
    ///
    /// Ordering is not significant beyond a primary entity preceding its
    /// own derived links.
    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn resolve_all(&self, scope: &OwnerScope) -> RegistryResult<Vec<Entity>> {
        let lock = self.pass_lock(scope);
        let _pass = lock.lock().await;

        let listings = Listings::fetch(&self.providers, scope).await?;
        let ctx = self.context(&listings, scope);
        let mut result = Vec::new();

        // Phase 1: evict every owned entity that vanished from its
        // listing, ports included, so a detached interface does not
        // outlive its external object just because both endpoints are
        // still alive. Storage links have no listing and live and die
        // with their endpoints. Runs before any refresh so a refreshed
        // resource cannot re-advertise a link whose other endpoint is
        // evicted later in the same pass.
        let mut evicted = 0usize;
        for entity in self.cache.all_for_owner(scope) {
            if entity.owner.is_shared() || listings.for_kind(entity.kind()).is_none() {
                continue;
            }
            if !listings.contains(entity.kind(), entity.key.raw()) {
                self.cache.evict_cascade(&entity.key, scope);
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(evicted, "Evicted entities no longer present externally");
        }

        // Phase 2: refresh the survivors in place and include them. The
        // snapshot is taken after the evict sweep so attached-link lists
        // are already pruned.
        for mut entity in self.cache.all_for_owner(scope) {
            if entity.owner.is_shared() {
                // Never evicted by a single owner's pass, returned as-is.
                result.push(entity);
                continue;
            }
            if entity.is_link() {
                // Links ride along with their source resource below.
                continue;
            }
            construct::refresh_in_place(&ctx, &mut entity).await?;
            let links: Vec<EntityKey> = entity.links().to_vec();
            let is_compute = entity.kind() == Kind::Compute;
            result.push(entity);
            if is_compute {
                for link_key in links {
                    if let Some(link) = self.cache.get(&link_key, scope) {
                        result.push(link);
                    }
                }
            }
        }

        // Phase 3: construct everything listed that we have not seen yet.
        for kind in Kind::ALL {
            let Some(ids) = listings.for_kind(kind) else {
                continue;
            };
            for raw_id in ids {
                let key = match EntityKey::new(kind, raw_id.clone()) {
                    Ok(key) => key,
                    Err(err) => {
                        warn!(kind = %kind, %raw_id, error = %err, "Skipping unusable raw id from listing");
                        continue;
                    }
                };
                if self.cache.contains(&key, scope)
                    || self.cache.contains(&key, &OwnerScope::Shared)
                {
                    continue;
                }
                let built = construct::construct(&ctx, kind, raw_id, 0).await?;
                result.extend(built);
            }
        }

        // An entity pushed early in the pass may have gained links since
        // (a network constructed before the compute that attaches to it);
        // return the final cached state of everything.
        Ok(result
            .into_iter()
            .map(|entity| {
                self.cache
                    .get(&entity.key, &entity.owner)
                    .unwrap_or(entity)
            })
            .collect())
    }

    /// Drops one entry (cascading over its links), so a read after an
    /// external delete cannot serve the stale entity. Invoked by the
    /// per-kind write handlers after a successful external delete.
    pub fn invalidate(&self, key: &EntityKey, scope: &OwnerScope) {
        let removed = self.cache.evict_cascade(key, scope);
        debug!(key = %key, scope = %scope, removed = removed.len(), "Invalidated cache entry");
    }

    /// Inserts an entity after a successful external create, so the cache
    /// never needs to distinguish "never seen" from "just created".
    pub fn insert(&self, entity: Entity) {
        self.cache.put(entity);
    }

    fn check_identity(&self, requested: &EntityKey, got: Entity) -> RegistryResult<Entity> {
        if got.key != *requested {
            // Broken kind-disambiguation assumption; never silently corrected.
            error!(requested = %requested, got = %got.key, "Identity conflict after construction");
            return Err(RegistryError::IdentityConflict {
                requested: requested.clone(),
                got: got.key,
            });
        }
        Ok(got)
    }
}
