use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Result};
use strato_id::OwnerScope;

/// Base URLs for the six provider endpoints.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub compute: String,
    pub storage: String,
    pub network: String,
    pub port: String,
    pub security_group: String,
    pub security_rule: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub endpoints: ProviderEndpoints,
    /// Bound on every provider call; expiry counts as a retrieval failure.
    pub provider_timeout: Duration,
    /// Owners the warmup worker reconciles periodically.
    pub warm_owners: Vec<OwnerScope>,
    pub warm_interval: Duration,
    /// Flavor id → term table for resource template mixins.
    pub flavors: BTreeMap<String, String>,
    /// Image id → term table for OS template mixins.
    pub images: BTreeMap<String, String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let log_level = std::env::var("STRATO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let endpoints = ProviderEndpoints {
            compute: require("STRATO_COMPUTE_URL")?,
            storage: require("STRATO_STORAGE_URL")?,
            network: require("STRATO_NETWORK_URL")?,
            port: require("STRATO_PORT_URL")?,
            security_group: require("STRATO_SECURITY_GROUP_URL")?,
            security_rule: require("STRATO_SECURITY_RULE_URL")?,
        };

        let provider_timeout = Duration::from_secs(
            std::env::var("STRATO_PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
        );

        let warm_owners = std::env::var("STRATO_WARM_OWNERS")
            .map(|v| parse_owners(&v))
            .unwrap_or_else(|_| Ok(Vec::new()))?;

        let warm_interval = Duration::from_secs(
            std::env::var("STRATO_WARM_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        );

        let flavors = std::env::var("STRATO_FLAVORS")
            .map(|v| parse_table(&v))
            .unwrap_or_else(|_| Ok(BTreeMap::new()))?;
        let images = std::env::var("STRATO_IMAGES")
            .map(|v| parse_table(&v))
            .unwrap_or_else(|_| Ok(BTreeMap::new()))?;

        Ok(Self {
            log_level,
            endpoints,
            provider_timeout,
            warm_owners,
            warm_interval,
            flavors,
            images,
        })
    }
}

fn require(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!("{name} must be set"),
    }
}

/// Parses `user:project,user:project` into owner scopes.
fn parse_owners(value: &str) -> Result<Vec<OwnerScope>> {
    let mut owners = Vec::new();
    for item in value.split(',').filter(|s| !s.trim().is_empty()) {
        let Some((user, project)) = item.trim().split_once(':') else {
            bail!("invalid owner '{item}', expected user:project");
        };
        owners.push(OwnerScope::owned(user, project));
    }
    Ok(owners)
}

/// Parses `id=term,id=term` into a lookup table.
fn parse_table(value: &str) -> Result<BTreeMap<String, String>> {
    let mut table = BTreeMap::new();
    for item in value.split(',').filter(|s| !s.trim().is_empty()) {
        let Some((id, term)) = item.trim().split_once('=') else {
            bail!("invalid table entry '{item}', expected id=term");
        };
        table.insert(id.to_string(), term.to_string());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owners() {
        let owners = parse_owners("alice:p1, bob:p2").unwrap();
        assert_eq!(
            owners,
            vec![OwnerScope::owned("alice", "p1"), OwnerScope::owned("bob", "p2")]
        );
        assert!(parse_owners("alice").is_err());
        assert!(parse_owners("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_table() {
        let table = parse_table("1=m1.small,2=m1.large").unwrap();
        assert_eq!(table.get("1").map(String::as_str), Some("m1.small"));
        assert_eq!(table.len(), 2);
        assert!(parse_table("nonsense").is_err());
    }
}
