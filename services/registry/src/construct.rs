//! Construction strategies, one per resource kind.
//!
//! Each strategy turns one raw external object into a cached entity, plus
//! any derived entities (links between resources, rules inside a security
//! group). Strategies insert everything they build into the cache and
//! return the built entities with the primary one first.
//!
//! Link endpoints are resolved against the cache first and constructed on
//! demand otherwise. That recursion is explicitly bounded: links only ever
//! connect compute↔network and compute↔storage, so one level is enough,
//! and anything deeper is treated as an unresolvable endpoint rather than
//! trusted to the call stack.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use strato_id::{EntityKey, Kind, OwnerScope};
use strato_model::{attr, Action, Attributes, Entity, Mixin};
use tracing::{debug, warn};

use crate::cache::EntityCache;
use crate::catalog::TemplateCatalog;
use crate::error::{RegistryError, RegistryResult};
use crate::providers::{
    Listings, ProviderSet, RawCompute, RawNetwork, RawPort, RawSecurityGroup, RawSecurityRule,
    RawVolume, ResourceProvider,
};

/// How deep resolve-or-construct may recurse when materializing link
/// endpoints. Links only exist between designated kind pairs, so one
/// level always suffices.
const MAX_LINK_DEPTH: u8 = 1;

/// Everything a strategy needs for one reconciliation pass.
pub(crate) struct BuildContext<'a> {
    pub cache: &'a EntityCache,
    pub providers: &'a ProviderSet,
    pub catalog: &'a dyn TemplateCatalog,
    pub listings: &'a Listings,
    pub scope: &'a OwnerScope,
}

impl BuildContext<'_> {
    fn provider(&self, kind: Kind) -> RegistryResult<&dyn ResourceProvider> {
        match self.providers.for_kind(kind) {
            Some(provider) => Ok(provider.as_ref()),
            // Storage links are minted locally; nothing lists or serves them.
            None => Err(RegistryError::NotFound(placeholder_key(kind))),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, kind: Kind, raw_id: &str) -> RegistryResult<T> {
        let value = self.provider(kind)?.get(self.scope, raw_id).await?;
        let object = serde_json::from_value(value).map_err(crate::providers::ProviderError::from)?;
        Ok(object)
    }
}

fn placeholder_key(kind: Kind) -> EntityKey {
    // Only used for error reporting on kinds without a provider.
    EntityKey::new(kind, "-").expect("static raw id is valid")
}

fn entity_key(kind: Kind, raw_id: &str) -> RegistryResult<EntityKey> {
    EntityKey::new(kind, raw_id).map_err(|err| {
        warn!(kind = %kind, raw_id, error = %err, "Provider returned an unusable raw id");
        RegistryError::NotFound(placeholder_key(kind))
    })
}

/// Dispatches to the strategy for `kind`.
///
/// Boxed because compute and storage strategies recurse back through here
/// for their link endpoints.
pub(crate) fn construct<'a>(
    ctx: &'a BuildContext<'a>,
    kind: Kind,
    raw_id: &'a str,
    depth: u8,
) -> Pin<Box<dyn Future<Output = RegistryResult<Vec<Entity>>> + Send + 'a>> {
    Box::pin(async move {
        match kind {
            Kind::Compute => construct_compute(ctx, raw_id, depth).await,
            Kind::Storage => construct_storage(ctx, raw_id, depth).await,
            Kind::Network => construct_network(ctx, raw_id).await,
            Kind::NetworkInterface => construct_network_interface(ctx, raw_id, depth).await,
            Kind::SecurityGroup => construct_security_group(ctx, raw_id).await,
            Kind::SecurityRule => construct_security_rule(ctx, raw_id).await,
            // Storage links are derived from volumes, never constructed
            // from their own identifier.
            Kind::StorageLink => Err(RegistryError::NotFound(entity_key(kind, raw_id)?)),
        }
    })
}

/// Returns the cached entity for `key`, constructing it when the
/// authoritative listing says it exists. Owned entries shadow shared ones.
async fn resolve_or_construct(
    ctx: &BuildContext<'_>,
    key: &EntityKey,
    depth: u8,
) -> RegistryResult<Entity> {
    if let Some(entity) = ctx.cache.get(key, ctx.scope) {
        return Ok(entity);
    }
    if let Some(entity) = ctx.cache.get(key, &OwnerScope::Shared) {
        return Ok(entity);
    }
    if depth > MAX_LINK_DEPTH {
        warn!(key = %key, depth, "Link endpoint chain exceeded the bounded depth");
        return Err(RegistryError::NotFound(key.clone()));
    }
    if !ctx.listings.contains(key.kind(), key.raw()) {
        return Err(RegistryError::NotFound(key.clone()));
    }
    let built = construct(ctx, key.kind(), key.raw(), depth).await?;
    built
        .into_iter()
        .next()
        .ok_or_else(|| RegistryError::NotFound(key.clone()))
}

/// Registers `link` on both endpoint resources in the cache.
fn attach_link(ctx: &BuildContext<'_>, link: &Entity) {
    let Some((source, target)) = link.endpoints() else {
        return;
    };
    for endpoint_key in [source, target] {
        ctx.cache.attach_link(endpoint_key, ctx.scope, &link.key);
    }
}

// =============================================================================
// Compute
// =============================================================================

async fn construct_compute(
    ctx: &BuildContext<'_>,
    raw_id: &str,
    depth: u8,
) -> RegistryResult<Vec<Entity>> {
    let raw: RawCompute = ctx.fetch(Kind::Compute, raw_id).await?;
    let key = entity_key(Kind::Compute, raw_id)?;

    let mut entity = Entity::new_resource(key.clone(), ctx.scope.clone());
    entity.refresh_attributes(compute_attributes(&raw));
    entity.actions = compute_actions(&raw.state);

    if let Some(mixin) = ctx.catalog.flavor(&raw.flavor_id) {
        entity.mixins.push(mixin);
    } else {
        debug!(flavor_id = %raw.flavor_id, "Flavor not in catalog, skipping template mixin");
    }
    if let Some(mixin) = ctx.catalog.image(&raw.image_id) {
        entity.mixins.push(mixin);
    } else {
        debug!(image_id = %raw.image_id, "Image not in catalog, skipping template mixin");
    }

    // Cache the resource before materializing links so the interface
    // strategy can resolve us as an endpoint.
    ctx.cache.put(entity.clone());

    let mut links = Vec::new();
    for attachment in &raw.ports {
        let network_key = entity_key(Kind::Network, &attachment.network_id)?;
        match resolve_or_construct(ctx, &network_key, depth + 1).await {
            Ok(network) => {
                let link_key = entity_key(Kind::NetworkInterface, &attachment.port_id)?;
                let mut link = Entity::new_link(
                    link_key,
                    ctx.scope.clone(),
                    key.clone(),
                    network.key.clone(),
                );
                if let Some(mac) = &attachment.mac {
                    link.attributes.insert("interface.mac".into(), mac.clone());
                }
                if let Some(address) = &attachment.address {
                    link.attributes.insert("interface.address".into(), address.clone());
                }
                ctx.cache.put(link.clone());
                attach_link(ctx, &link);
                links.push(link);
            }
            Err(RegistryError::NotFound(missing)) => {
                // The port references a network the listing no longer has;
                // the link is not cached.
                warn!(compute = %key, network = %missing, "Skipping interface to unresolvable network");
            }
            Err(err) => return Err(err),
        }
    }

    // Re-read our own entry: attach_link updated the cached copy.
    let entity = ctx.cache.get(&key, ctx.scope).unwrap_or(entity);
    let mut result = vec![entity];
    result.extend(links);
    Ok(result)
}

pub(crate) fn compute_attributes(raw: &RawCompute) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("compute.hostname".into(), raw.hostname.clone());
    attrs.insert(
        "compute.architecture".into(),
        raw.architecture.clone().unwrap_or_else(|| "x86".into()),
    );
    attrs.insert("compute.cores".into(), raw.vcpus.to_string());
    // The platform does not report clock speed per instance.
    attrs.insert("compute.speed".into(), "0.0".into());
    attrs.insert("compute.memory".into(), raw.memory_mb.to_string());
    attrs.insert("compute.state".into(), raw.state.clone());
    attrs
}

pub(crate) fn compute_actions(state: &str) -> BTreeSet<Action> {
    match state {
        "active" => BTreeSet::from([Action::Stop, Action::Suspend, Action::Restart]),
        "inactive" | "suspended" => BTreeSet::from([Action::Start]),
        // Transitional states accept nothing.
        _ => BTreeSet::new(),
    }
}

// =============================================================================
// Storage
// =============================================================================

async fn construct_storage(
    ctx: &BuildContext<'_>,
    raw_id: &str,
    depth: u8,
) -> RegistryResult<Vec<Entity>> {
    let raw: RawVolume = ctx.fetch(Kind::Storage, raw_id).await?;
    let key = entity_key(Kind::Storage, raw_id)?;

    let mut entity = Entity::new_resource(key.clone(), ctx.scope.clone());
    entity.refresh_attributes(storage_attributes(&raw));
    entity.actions = storage_actions(&raw.status);
    if let Some(name) = &raw.name {
        entity
            .attributes
            .entry(attr::CORE_TITLE.to_string())
            .or_insert_with(|| name.clone());
    }
    ctx.cache.put(entity.clone());

    let mut result = vec![entity];
    if raw.in_use() {
        if let Some(instance_id) = &raw.attached_to {
            let compute_key = entity_key(Kind::Compute, instance_id)?;
            match resolve_or_construct(ctx, &compute_key, depth + 1).await {
                Ok(compute) => {
                    let link_key =
                        entity_key(Kind::StorageLink, &uuid::Uuid::new_v4().to_string())?;
                    let link = Entity::new_link(
                        link_key,
                        ctx.scope.clone(),
                        compute.key.clone(),
                        key.clone(),
                    );
                    ctx.cache.put(link.clone());
                    attach_link(ctx, &link);
                    result.push(link);
                }
                Err(RegistryError::NotFound(missing)) => {
                    warn!(volume = %key, compute = %missing, "Volume in use by unresolvable instance, link not cached");
                }
                Err(err) => return Err(err),
            }
            // Pick up the attached-list update.
            if let Some(updated) = ctx.cache.get(&key, ctx.scope) {
                result[0] = updated;
            }
        }
    }
    Ok(result)
}

pub(crate) fn storage_attributes(raw: &RawVolume) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("storage.size".into(), raw.size_gb.to_string());
    attrs.insert("storage.state".into(), raw.status.clone());
    attrs
}

pub(crate) fn storage_actions(status: &str) -> BTreeSet<Action> {
    match status {
        "available" | "in-use" => BTreeSet::from([
            Action::Offline,
            Action::Backup,
            Action::Snapshot,
            Action::Resize,
        ]),
        _ => BTreeSet::from([Action::Online]),
    }
}

// =============================================================================
// Network
// =============================================================================

async fn construct_network(ctx: &BuildContext<'_>, raw_id: &str) -> RegistryResult<Vec<Entity>> {
    let raw: RawNetwork = ctx.fetch(Kind::Network, raw_id).await?;
    let key = entity_key(Kind::Network, raw_id)?;

    let mut entity = Entity::new_resource(key, ctx.scope.clone());
    entity.refresh_attributes(network_attributes(&raw));
    entity.actions = network_actions(&raw.state);
    if !raw.subnets.is_empty() {
        entity.mixins.push(Mixin::IpNetwork);
    }
    ctx.cache.put(entity.clone());
    Ok(vec![entity])
}

pub(crate) fn network_attributes(raw: &RawNetwork) -> Attributes {
    let mut attrs = Attributes::new();
    if let Some(label) = &raw.label {
        attrs.insert("network.label".into(), label.clone());
    }
    attrs.insert("network.state".into(), raw.state.clone());
    if let Some(subnet) = raw.subnets.first() {
        attrs.insert("network.address".into(), subnet.cidr.clone());
    }
    attrs
}

pub(crate) fn network_actions(state: &str) -> BTreeSet<Action> {
    match state {
        "active" | "up" => BTreeSet::from([Action::Down]),
        _ => BTreeSet::from([Action::Up]),
    }
}

// =============================================================================
// Network interface
// =============================================================================

async fn construct_network_interface(
    ctx: &BuildContext<'_>,
    raw_id: &str,
    depth: u8,
) -> RegistryResult<Vec<Entity>> {
    let raw: RawPort = ctx.fetch(Kind::NetworkInterface, raw_id).await?;
    let key = entity_key(Kind::NetworkInterface, raw_id)?;

    // A link without both endpoints cannot exist; failure to resolve
    // either one aborts the construction and nothing is cached.
    let compute_key = entity_key(Kind::Compute, &raw.device_id)?;
    let network_key = entity_key(Kind::Network, &raw.network_id)?;
    let compute = resolve_or_construct(ctx, &compute_key, depth + 1)
        .await
        .map_err(|_| RegistryError::NotFound(key.clone()))?;
    let network = resolve_or_construct(ctx, &network_key, depth + 1)
        .await
        .map_err(|_| RegistryError::NotFound(key.clone()))?;

    let mut link = Entity::new_link(key, ctx.scope.clone(), compute.key, network.key);
    if let Some(mac) = &raw.mac {
        link.attributes.insert("interface.mac".into(), mac.clone());
    }
    if let Some(address) = &raw.address {
        link.attributes.insert("interface.address".into(), address.clone());
    }
    ctx.cache.put(link.clone());
    attach_link(ctx, &link);
    Ok(vec![link])
}

// =============================================================================
// Security groups and rules
// =============================================================================

async fn construct_security_group(
    ctx: &BuildContext<'_>,
    raw_id: &str,
) -> RegistryResult<Vec<Entity>> {
    let raw: RawSecurityGroup = ctx.fetch(Kind::SecurityGroup, raw_id).await?;
    let key = entity_key(Kind::SecurityGroup, raw_id)?;

    let mut entity = Entity::new_resource(key, ctx.scope.clone());
    let mut attrs = Attributes::new();
    attrs.insert("group.name".into(), raw.name.clone());
    entity.refresh_attributes(attrs);

    let mut rules = Vec::new();
    for rule_id in &raw.rules {
        let rule_key = entity_key(Kind::SecurityRule, rule_id)?;
        let rule = match ctx.cache.get(&rule_key, ctx.scope) {
            Some(rule) => rule,
            None => {
                let built = construct_security_rule(ctx, rule_id).await?;
                let rule = built
                    .into_iter()
                    .next()
                    .ok_or_else(|| RegistryError::NotFound(rule_key.clone()))?;
                rules.push(rule.clone());
                rule
            }
        };
        entity.mixins.push(Mixin::Rule { key: rule.key });
    }

    ctx.cache.put(entity.clone());
    let mut result = vec![entity];
    result.extend(rules);
    Ok(result)
}

async fn construct_security_rule(
    ctx: &BuildContext<'_>,
    raw_id: &str,
) -> RegistryResult<Vec<Entity>> {
    let raw: RawSecurityRule = ctx.fetch(Kind::SecurityRule, raw_id).await?;
    let key = entity_key(Kind::SecurityRule, raw_id)?;

    let mut entity = Entity::new_resource(key, ctx.scope.clone());
    entity.refresh_attributes(rule_attributes(&raw));
    ctx.cache.put(entity.clone());
    Ok(vec![entity])
}

pub(crate) fn rule_attributes(raw: &RawSecurityRule) -> Attributes {
    let mut attrs = Attributes::new();
    if let Some(protocol) = &raw.protocol {
        attrs.insert("rule.protocol".into(), protocol.clone());
    }
    if let (Some(min), Some(max)) = (raw.port_min, raw.port_max) {
        attrs.insert("rule.port_range".into(), format!("{min}-{max}"));
    }
    if let Some(prefix) = &raw.remote_prefix {
        attrs.insert("rule.remote_prefix".into(), prefix.clone());
    }
    if let Some(direction) = &raw.direction {
        attrs.insert("rule.direction".into(), direction.clone());
    }
    attrs
}

// =============================================================================
// Refresh
// =============================================================================

/// Repopulates a cached resource in place from its external object.
///
/// Attributes are fully replaced (locally owned ones excepted) and actions
/// recomputed; identity, links, and mixins are preserved. Links are never
/// refreshed here, their lifetime is governed by their endpoints.
pub(crate) async fn refresh_in_place(
    ctx: &BuildContext<'_>,
    entity: &mut Entity,
) -> RegistryResult<()> {
    match entity.kind() {
        Kind::Compute => {
            let raw: RawCompute = ctx.fetch(Kind::Compute, entity.key.raw()).await?;
            entity.refresh_attributes(compute_attributes(&raw));
            entity.actions = compute_actions(&raw.state);
        }
        Kind::Storage => {
            let raw: RawVolume = ctx.fetch(Kind::Storage, entity.key.raw()).await?;
            entity.refresh_attributes(storage_attributes(&raw));
            entity.actions = storage_actions(&raw.status);
        }
        Kind::Network => {
            let raw: RawNetwork = ctx.fetch(Kind::Network, entity.key.raw()).await?;
            entity.refresh_attributes(network_attributes(&raw));
            entity.actions = network_actions(&raw.state);
        }
        Kind::SecurityGroup => {
            let raw: RawSecurityGroup = ctx.fetch(Kind::SecurityGroup, entity.key.raw()).await?;
            let mut attrs = Attributes::new();
            attrs.insert("group.name".into(), raw.name.clone());
            entity.refresh_attributes(attrs);
        }
        Kind::SecurityRule => {
            let raw: RawSecurityRule = ctx.fetch(Kind::SecurityRule, entity.key.raw()).await?;
            entity.refresh_attributes(rule_attributes(&raw));
        }
        Kind::NetworkInterface | Kind::StorageLink => {}
    }
    ctx.cache.put(entity.clone());
    Ok(())
}
