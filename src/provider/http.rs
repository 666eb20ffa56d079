//! HTTP provider adapter.
//!
//! This module adapts the [`Provider`] capability set to a REST provisioning
//! API with bearer-token authentication. Each trait method performs exactly
//! one request; the executor owns retries.

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{ProviderError, Result, SitestackError};
use crate::graph::ResourceKind;

use super::api::{Provider, ProvisionedResource, ResolvedParams};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP-backed provider adapter.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    /// HTTP client.
    client: Client,
    /// API base URL.
    base_url: String,
    /// API key.
    api_key: String,
}

impl HttpProvider {
    /// Creates a new HTTP provider adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates an adapter with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Maps a non-success response to the error taxonomy.
    async fn check_status(response: Response, resource_id: Option<&str>) -> Result<Response> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 60 } else { retry_after };

            return Err(SitestackError::Provider(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SitestackError::Provider(ProviderError::AuthenticationFailed {
                message: String::from("Invalid API key"),
            }));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(SitestackError::Provider(ProviderError::NotFound {
                resource_id: resource_id.unwrap_or("unknown").to_string(),
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SitestackError::Provider(ProviderError::api_error(
                status.as_u16(),
                body,
            )));
        }

        Ok(response)
    }

    /// Parses an identity payload from a successful response.
    async fn parse_identity(response: Response) -> Result<ProvisionedResource> {
        response.json::<ProvisionedResource>().await.map_err(|e| {
            SitestackError::Provider(ProviderError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            })
        })
    }

    fn map_send_error(e: &reqwest::Error, operation: &str) -> SitestackError {
        if e.is_timeout() {
            SitestackError::Provider(ProviderError::Timeout {
                operation: operation.to_string(),
            })
        } else {
            SitestackError::Provider(ProviderError::network(format!("Request failed: {e}")))
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn create_resource(
        &self,
        kind: ResourceKind,
        params: &ResolvedParams,
    ) -> Result<ProvisionedResource> {
        let operation = format!("create {kind}");
        trace!("POST /v1/resources/{kind}");

        let response = self
            .client
            .post(self.url(&format!("/v1/resources/{kind}")))
            .bearer_auth(&self.api_key)
            .json(params)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&e, &operation))?;

        let response = Self::check_status(response, None).await?;
        let identity = Self::parse_identity(response).await?;
        debug!("Created {kind}: {}", identity.id);
        Ok(identity)
    }

    async fn update_resource(
        &self,
        provider_id: &str,
        kind: ResourceKind,
        params: &ResolvedParams,
    ) -> Result<()> {
        let operation = format!("update {kind}");
        trace!("PATCH /v1/resources/{kind}/{provider_id}");

        let response = self
            .client
            .patch(self.url(&format!("/v1/resources/{kind}/{provider_id}")))
            .bearer_auth(&self.api_key)
            .json(params)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&e, &operation))?;

        Self::check_status(response, Some(provider_id)).await?;
        debug!("Updated {kind}: {provider_id}");
        Ok(())
    }

    async fn delete_resource(&self, provider_id: &str, kind: ResourceKind) -> Result<()> {
        let operation = format!("delete {kind}");
        trace!("DELETE /v1/resources/{kind}/{provider_id}");

        let response = self
            .client
            .delete(self.url(&format!("/v1/resources/{kind}/{provider_id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&e, &operation))?;

        Self::check_status(response, Some(provider_id)).await?;
        debug!("Deleted {kind}: {provider_id}");
        Ok(())
    }

    async fn lookup(&self, kind: ResourceKind, query: &str) -> Result<ProvisionedResource> {
        let operation = format!("lookup {kind}");
        trace!("GET /v1/lookup/{kind}?q={query}");

        let response = self
            .client
            .get(self.url(&format!("/v1/lookup/{kind}")))
            .query(&[("q", query)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&e, &operation))?;

        // A lookup miss is transient: a freshly delegated zone may not be
        // visible to the provider yet.
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SitestackError::Provider(ProviderError::LookupMiss {
                kind: kind.to_string(),
                query: query.to_string(),
            }));
        }

        let response = Self::check_status(response, None).await?;
        Self::parse_identity(response).await
    }
}
