//! Remote catalog collaborator.
//!
//! The engine needs exactly four operations from the authoritative store:
//! list, create (which assigns the id), update and delete. [`HttpCatalogClient`]
//! speaks them over HTTP; [`OfflineCatalog`] stands in when no remote is
//! configured.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Remote catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote catalog returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Record '{0}' not found on remote catalog")]
    NotFound(String),

    #[error("Invalid remote catalog response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Worth retrying for idempotent calls.
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[async_trait]
pub trait RemoteCatalog<T>: Send + Sync {
    async fn list(&self) -> Result<Vec<T>, RemoteError>;

    /// Create a record; the returned copy carries the id the remote assigned.
    async fn create(&self, record: &T) -> Result<T, RemoteError>;

    async fn update(&self, id: &str, record: &T) -> Result<T, RemoteError>;

    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}

/// Error response from the remote catalog.
#[derive(Debug, Deserialize)]
struct RemoteErrorResponse {
    #[allow(dead_code)]
    code: Option<String>,
    message: String,
}

/// HTTP client for one resource collection on the remote catalog.
pub struct HttpCatalogClient<T> {
    client: Client,
    base_url: String,
    resource: String,
    token: String,
    max_list_retry: Duration,
    _records: PhantomData<fn() -> T>,
}

impl<T> HttpCatalogClient<T> {
    /// Create a client for `{base_url}/{resource}`.
    pub fn new(
        base_url: &str,
        resource: &str,
        token: &str,
        timeout_seconds: u64,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        tracing::info!(base_url = base_url, resource = resource, "Remote catalog client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            resource: resource.trim_matches('/').to_string(),
            token: token.to_string(),
            max_list_retry: Duration::from_secs(10),
            _records: PhantomData,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.resource)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.resource, id)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            req
        } else {
            req.header("X-Internal-Token", &self.token)
        }
    }

    /// Send a request and turn non-success statuses into [`RemoteError`].
    async fn execute(&self, req: RequestBuilder, id: Option<&str>) -> Result<reqwest::Response, RemoteError> {
        let response = self.authorize(req).send().await.map_err(|e| {
            error!(error = %e, "Remote catalog request failed");
            RemoteError::Transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<RemoteErrorResponse>()
            .await
            .ok()
            .map(|e| e.message)
            .unwrap_or_else(|| format!("Remote catalog error: {}", status));

        match status {
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(id.unwrap_or_default().to_string())),
            _ => {
                warn!(status = %status, message = %message, "Remote catalog error");
                Err(RemoteError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn parse<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, RemoteError> {
        response.json::<R>().await.map_err(|e| {
            error!(error = %e, "Failed to parse remote catalog response");
            RemoteError::InvalidResponse(e.to_string())
        })
    }
}

#[async_trait]
impl<T> RemoteCatalog<T> for HttpCatalogClient<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Listing is idempotent, so transport errors and 5xx answers are retried
    /// with exponential backoff before giving up.
    #[instrument(skip(self), fields(resource = %self.resource))]
    async fn list(&self) -> Result<Vec<T>, RemoteError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(self.max_list_retry))
            .build();

        backoff::future::retry(policy, || async {
            debug!(url = %self.collection_url(), "Listing remote records");
            let result = match self.execute(self.client.get(self.collection_url()), None).await {
                Ok(response) => Self::parse::<Vec<T>>(response).await,
                Err(e) => Err(e),
            };
            result.map_err(|e| {
                if e.is_transient() {
                    warn!(error = %e, "Remote list failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }

    #[instrument(skip(self, record), fields(resource = %self.resource))]
    async fn create(&self, record: &T) -> Result<T, RemoteError> {
        let response = self
            .execute(self.client.post(self.collection_url()).json(record), None)
            .await?;
        Self::parse(response).await
    }

    #[instrument(skip(self, record), fields(resource = %self.resource))]
    async fn update(&self, id: &str, record: &T) -> Result<T, RemoteError> {
        let response = self
            .execute(self.client.put(self.record_url(id)).json(record), Some(id))
            .await?;
        Self::parse(response).await
    }

    #[instrument(skip(self), fields(resource = %self.resource))]
    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.execute(self.client.delete(self.record_url(id)), Some(id))
            .await?;
        Ok(())
    }
}

/// Catalog used when no remote is configured; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineCatalog;

const OFFLINE: &str = "no remote catalog configured";

#[async_trait]
impl<T: Send + Sync + 'static> RemoteCatalog<T> for OfflineCatalog {
    async fn list(&self) -> Result<Vec<T>, RemoteError> {
        Err(RemoteError::Unavailable(OFFLINE.to_string()))
    }

    async fn create(&self, _record: &T) -> Result<T, RemoteError> {
        Err(RemoteError::Unavailable(OFFLINE.to_string()))
    }

    async fn update(&self, _id: &str, _record: &T) -> Result<T, RemoteError> {
        Err(RemoteError::Unavailable(OFFLINE.to_string()))
    }

    async fn delete(&self, _id: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Unavailable(OFFLINE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceItem;

    #[test]
    fn builds_resource_urls() {
        let client: HttpCatalogClient<PriceItem> =
            HttpCatalogClient::new("https://catalog.example.com/api/", "/price-items/", "", 5).unwrap();
        assert_eq!(client.collection_url(), "https://catalog.example.com/api/price-items");
        assert_eq!(client.record_url("42"), "https://catalog.example.com/api/price-items/42");
    }

    #[test]
    fn only_transport_and_server_errors_are_transient() {
        assert!(RemoteError::Status { status: 503, message: String::new() }.is_transient());
        assert!(!RemoteError::Status { status: 400, message: String::new() }.is_transient());
        assert!(!RemoteError::NotFound("x".into()).is_transient());
        assert!(!RemoteError::Unavailable("x".into()).is_transient());
    }

    #[tokio::test]
    async fn offline_catalog_rejects_everything() {
        let remote = OfflineCatalog;
        let listed = RemoteCatalog::<PriceItem>::list(&remote).await;
        assert!(matches!(listed, Err(RemoteError::Unavailable(_))));
        let deleted = RemoteCatalog::<PriceItem>::delete(&remote, "1").await;
        assert!(matches!(deleted, Err(RemoteError::Unavailable(_))));
    }
}
