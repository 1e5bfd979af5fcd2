//! HTTP transport abstraction for testability
//!
//! A [`Connector`] opens one [`HttpTransport`] per fetch batch. The transport
//! owns the connection pool for the lifetime of the batch and is dropped
//! once every request has completed; there is no process-wide client.

use std::future::Future;
use std::sync::Arc;

use reqwest::Url;
use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

use super::types::ProviderError;
use crate::config::FetchSettings;
use crate::registry::Credentials;

/// User-Agent sent with every request.
const USER_AGENT: &str = concat!("geocontext/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Checks the status and decodes the body as JSON.
    ///
    /// The `Content-Type` header is never consulted: several map servers
    /// label JSON bodies as `text/plain` or `text/html`.
    pub fn into_json(self, url: &str) -> Result<serde_json::Value, ProviderError> {
        if !self.is_success() {
            return Err(ProviderError::Status {
                status: self.status,
                url: url.to_string(),
            });
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| ProviderError::InvalidResponse(format!("{} from {}", e, url)))
    }
}

/// Trait for HTTP transport operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock transports in tests.
pub trait HttpTransport: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - Fully encoded request URL
    /// * `credentials` - Basic auth is sent when a username is configured
    ///
    /// # Returns
    ///
    /// The status and body of any response the server sent, or an error if
    /// no response was received.
    fn get(
        &self,
        url: &Url,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<HttpResponse, ProviderError>> + Send;
}

/// Opens a batch-scoped transport.
pub trait Connector: Send + Sync {
    type Transport: HttpTransport + 'static;

    fn connect(&self, settings: &FetchSettings) -> Result<Self::Transport, ProviderError>;
}

/// Connector producing [`ReqwestTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestConnector;

impl Connector for ReqwestConnector {
    type Transport = ReqwestTransport;

    fn connect(&self, settings: &FetchSettings) -> Result<ReqwestTransport, ProviderError> {
        ReqwestTransport::new(settings)
    }
}

/// HTTP transport using reqwest.
///
/// In-flight requests are bounded by a semaphore sized to the configured
/// connection limit.
pub struct ReqwestTransport {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl ReqwestTransport {
    /// Creates a transport with the batch timeouts and connection limit.
    pub fn new(settings: &FetchSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.total_timeout)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(settings.connection_limit)
            .build()
            .map_err(|e| ProviderError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(settings.connection_limit.max(1))),
        })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url, credentials: &Credentials) -> Result<HttpResponse, ProviderError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ProviderError::HttpError("Connection pool closed".to_string()))?;

        trace!(url = %url, "HTTP GET request starting");

        let mut request = self.client.get(url.clone());
        if let Some(username) = &credentials.username {
            request = request.basic_auth(username, credentials.password.as_ref());
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                warn!(url = %url, "HTTP request timed out");
                return Err(ProviderError::Timeout(url.to_string()));
            }
            Err(e) => {
                warn!(
                    url = %url,
                    error = %e,
                    is_connect = e.is_connect(),
                    "HTTP request failed"
                );
                return Err(ProviderError::HttpError(format!("Request failed: {}", e)));
            }
        };

        let status = response.status().as_u16();
        debug!(url = %url, status, "HTTP response received");

        match response.bytes().await {
            Ok(bytes) => Ok(HttpResponse::new(status, bytes.to_vec())),
            Err(e) if e.is_timeout() => Err(ProviderError::Timeout(url.to_string())),
            Err(e) => Err(ProviderError::HttpError(format!(
                "Failed to read response: {}",
                e
            ))),
        }
    }
}
