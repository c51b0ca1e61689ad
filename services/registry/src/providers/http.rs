//! Thin HTTP client for one external provider endpoint.
//!
//! Expects a JSON API shaped as:
//!
//! - `GET {base}/ids?user=&project=` → `["raw-id", ...]`
//! - `GET {base}/{raw-id}` → raw attribute object
//!
//! Every call carries a bounded timeout; expiry surfaces as
//! [`ProviderError::Timeout`], which the engine treats as a retrieval
//! failure. Retry policy, if any, lives behind the provider's own surface.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use strato_id::OwnerScope;

use super::{ProviderError, ResourceProvider};

/// HTTP-backed provider for one resource kind.
#[derive(Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

impl HttpProvider {
    /// Creates a provider rooted at `base` (no trailing slash needed).
    pub fn new(client: reqwest::Client, base: impl Into<String>, timeout: Duration) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self {
            client,
            base,
            timeout,
        }
    }

    fn scope_query(scope: &OwnerScope) -> Vec<(&'static str, String)> {
        match scope {
            OwnerScope::Shared => vec![],
            OwnerScope::Owned { user, project } => vec![
                ("user", user.clone()),
                ("project", project.clone()),
            ],
        }
    }

    fn map_error(err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }

    fn check_status(status: StatusCode, raw_id: Option<&str>) -> Result<(), ProviderError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Denied(status.to_string()));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(match raw_id {
                Some(id) => ProviderError::NotFound(id.to_string()),
                // A listing endpoint has no single object to miss.
                None => ProviderError::Unavailable("listing endpoint returned 404".to_string()),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "unexpected status {status}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceProvider for HttpProvider {
    async fn list_ids(&self, scope: &OwnerScope) -> Result<BTreeSet<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/ids", self.base))
            .query(&Self::scope_query(scope))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::map_error)?;

        Self::check_status(response.status(), None)?;

        let ids: Vec<String> = response.json().await.map_err(Self::map_error)?;
        Ok(ids.into_iter().collect())
    }

    async fn get(
        &self,
        scope: &OwnerScope,
        raw_id: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base, raw_id))
            .query(&Self::scope_query(scope))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Self::map_error)?;

        Self::check_status(response.status(), Some(raw_id))?;

        response.json().await.map_err(Self::map_error)
    }
}
