//! Single-entity reads: lookup, refresh, eviction, and shared entries.


use harness::{compute_json, key, network_json, owner, port_json, volume_json, world};
use strato_id::{Kind, OwnerScope};
use strato_model::{attr, Action, Entity, Mixin};
use strato_registry::RegistryError;

#[tokio::test]
async fn resolved_entity_matches_requested_key() {
    let w = world();
    w.compute.put("i1", compute_json("web-1", "active", &[]));

    let requested = key(Kind::Compute, "i1");
    let entity = w.registry.resolve(&requested, &owner()).await.unwrap();

    assert_eq!(entity.key, requested);
    assert_eq!(entity.attributes.get(attr::CORE_ID).map(String::as_str), Some("i1"));
    assert_eq!(
        entity.attributes.get("compute.hostname").map(String::as_str),
        Some("web-1")
    );
    assert!(entity.actions.contains(&Action::Stop));
    assert!(entity.actions.contains(&Action::Restart));
    assert!(!entity.actions.contains(&Action::Start));
    assert!(entity.mixins.iter().any(|m| matches!(m, Mixin::ResourceTemplate { term, .. } if term == "m1.small")));
    assert!(entity.mixins.iter().any(|m| matches!(m, Mixin::OsTemplate { term, .. } if term == "ubuntu-24.04")));
}

#[tokio::test]
async fn unknown_identifier_is_not_found() {
    let w = world();
    let err = w
        .registry
        .resolve(&key(Kind::Compute, "ghost"), &owner())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

#[tokio::test]
async fn vanished_entity_is_evicted_with_its_links() {
    let w = world();
    w.network.put("n1", network_json("net", &["10.0.0.0/24"]));
    w.compute.put("i1", compute_json("web-1", "active", &[("p1", "n1")]));
    w.port.put("p1", port_json("i1", "n1"));

    let compute_key = key(Kind::Compute, "i1");
    w.registry.resolve(&compute_key, &owner()).await.unwrap();
    let link_key = key(Kind::NetworkInterface, "p1");
    assert!(w.registry.cache().contains(&link_key, &owner()));

    // The instance disappears externally.
    w.compute.remove("i1");
    w.port.remove("p1");

    let err = w.registry.resolve(&compute_key, &owner()).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!w.registry.cache().contains(&compute_key, &owner()));
    assert!(
        !w.registry.cache().contains(&link_key, &owner()),
        "cascade left the interface link behind"
    );
}

#[tokio::test]
async fn resolve_twice_is_idempotent() {
    let w = world();
    w.storage.put("v1", volume_json("data", "available", None));

    let storage_key = key(Kind::Storage, "v1");
    let first = w.registry.resolve(&storage_key, &owner()).await.unwrap();
    let second = w.registry.resolve(&storage_key, &owner()).await.unwrap();

    assert_eq!(first.attributes, second.attributes);
    assert_eq!(first.actions, second.actions);
}

#[tokio::test]
async fn refresh_repopulates_state_but_keeps_title() {
    let w = world();
    w.storage.put("v1", volume_json("data", "available", None));

    let storage_key = key(Kind::Storage, "v1");
    let first = w.registry.resolve(&storage_key, &owner()).await.unwrap();
    assert_eq!(
        first.attributes.get(attr::CORE_TITLE).map(String::as_str),
        Some("data")
    );
    assert!(first.actions.contains(&Action::Snapshot));

    // External rename and state change; the title is locally owned and
    // must survive, the state must not.
    w.storage.put("v1", volume_json("renamed", "error", None));
    let second = w.registry.resolve(&storage_key, &owner()).await.unwrap();

    assert_eq!(
        second.attributes.get(attr::CORE_TITLE).map(String::as_str),
        Some("data")
    );
    assert_eq!(
        second.attributes.get("storage.state").map(String::as_str),
        Some("error")
    );
    assert_eq!(second.actions, std::collections::BTreeSet::from([Action::Online]));
}

#[tokio::test]
async fn shared_entity_is_returned_unchanged() {
    let w = world();
    let shared_key = key(Kind::Network, "public");
    let mut shared = Entity::new_resource(shared_key.clone(), OwnerScope::Shared);
    shared.attributes.insert("network.label".into(), "public".into());
    w.registry.insert(shared.clone());

    let resolved = w.registry.resolve(&shared_key, &owner()).await.unwrap();
    assert_eq!(resolved, shared);
}

#[tokio::test]
async fn storage_link_resolves_from_cache_only() {
    let w = world();
    w.compute.put("i1", compute_json("db-1", "active", &[]));
    w.storage.put("v1", volume_json("data", "in-use", Some("i1")));

    let storage = w
        .registry
        .resolve(&key(Kind::Storage, "v1"), &owner())
        .await
        .unwrap();
    let link_key = storage.links().first().cloned().expect("volume link");
    assert_eq!(link_key.kind(), Kind::StorageLink);

    let link = w.registry.resolve(&link_key, &owner()).await.unwrap();
    let (source, target) = link.endpoints().unwrap();
    assert_eq!(source, &key(Kind::Compute, "i1"));
    assert_eq!(target, &key(Kind::Storage, "v1"));
}

#[tokio::test]
async fn uncached_port_materializes_its_link_and_endpoints() {
    let w = world();
    // No inline attachment on the compute, so nothing pre-caches the link.
    w.compute.put("i1", compute_json("web-1", "active", &[]));
    w.network.put("n1", network_json("net", &["10.0.0.0/24"]));
    w.port.put("p1", port_json("i1", "n1"));

    let link_key = key(Kind::NetworkInterface, "p1");
    let link = w.registry.resolve(&link_key, &owner()).await.unwrap();

    let compute_key = key(Kind::Compute, "i1");
    let net_key = key(Kind::Network, "n1");
    assert_eq!(link.endpoints(), Some((&compute_key, &net_key)));
    assert_eq!(
        link.attributes.get("interface.mac").map(String::as_str),
        Some("fa:16:3e:00:00:01")
    );

    // Both endpoints were constructed on demand and register the link.
    for endpoint in [&compute_key, &net_key] {
        let resource = w.registry.cache().get(endpoint, &owner()).unwrap();
        assert_eq!(resource.links(), &[link_key.clone()]);
    }
}

#[tokio::test]
async fn port_with_unresolvable_endpoint_is_not_cached() {
    let w = world();
    w.network.put("n1", network_json("net", &[]));
    // The port names an instance no listing contains.
    w.port.put("p1", port_json("ghost", "n1"));

    let link_key = key(Kind::NetworkInterface, "p1");
    let err = w.registry.resolve(&link_key, &owner()).await.unwrap_err();

    assert!(err.is_not_found(), "got {err:?}");
    assert!(!w.registry.cache().contains(&link_key, &owner()));
    assert!(!w
        .registry
        .cache()
        .contains(&key(Kind::Compute, "ghost"), &owner()));
}

#[tokio::test]
async fn cross_kind_collision_is_rejected() {
    let w = world();
    // The same raw id shows up in two kinds' listings: the per-kind
    // namespacing assumption is broken and we refuse to guess.
    w.compute.put("dup", compute_json("web-1", "active", &[]));
    w.network.put("dup", network_json("net", &[]));

    let err = w
        .registry
        .resolve(&key(Kind::Compute, "dup"), &owner())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn invalidate_drops_entry_before_next_read() {
    let w = world();
    w.network.put("n1", network_json("net", &[]));

    let net_key = key(Kind::Network, "n1");
    w.registry.resolve(&net_key, &owner()).await.unwrap();
    assert!(w.registry.cache().contains(&net_key, &owner()));

    w.registry.invalidate(&net_key, &owner());
    assert!(!w.registry.cache().contains(&net_key, &owner()));

    // Still listed externally, so the next read reconstructs it.
    let again = w.registry.resolve(&net_key, &owner()).await.unwrap();
    assert_eq!(again.key, net_key);
}

#[tokio::test]
async fn provider_outage_surfaces_as_retrieval_failure() {
    let w = world();
    w.compute.put("i1", compute_json("web-1", "active", &[]));
    w.storage.set_failing(true);

    let err = w
        .registry
        .resolve(&key(Kind::Compute, "i1"), &owner())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Retrieval(_)), "got {err:?}");
}
