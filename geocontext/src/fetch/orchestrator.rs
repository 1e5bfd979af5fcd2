//! Concurrent fetch batches.
//!
//! A batch opens one transport, spawns one task per request and waits for
//! all of them. Every request comes back, in input order, either resolved or
//! failed; nothing inside a task can fail the batch.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use super::request::{FetchRequest, TaggedRequest};
use super::resolver::resolve_nearest;
use crate::config::FetchSettings;
use crate::provider::{Candidate, Connector, HttpTransport, ProviderError, RequestDescriptor};

/// Runs fetch batches against external services.
pub struct FetchOrchestrator<C: Connector> {
    connector: C,
    settings: FetchSettings,
}

impl<C: Connector> FetchOrchestrator<C> {
    pub fn new(connector: C, settings: FetchSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Fetches every request concurrently.
    ///
    /// The batch shares one transport and one deadline of `total_timeout`.
    /// A request that errors, panics or misses the deadline is returned
    /// with [`FetchStatus::Failed`](super::FetchStatus::Failed).
    pub async fn run(&self, requests: Vec<FetchRequest>) -> Vec<FetchRequest> {
        if requests.is_empty() {
            return requests;
        }

        let transport = match self.connector.connect(&self.settings) {
            Ok(transport) => Arc::new(transport),
            Err(e) => {
                error!(error = %e, "Failed to open transport for fetch batch");
                return requests
                    .into_iter()
                    .map(|mut request| {
                        request.fail(e.clone());
                        request
                    })
                    .collect();
            }
        };

        let deadline = Instant::now() + self.settings.total_timeout;
        let threshold = self.settings.offload_threshold;
        debug!(requests = requests.len(), "Dispatching fetch batch");

        let mut originals = Vec::with_capacity(requests.len());
        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            originals.push(request.clone());
            let transport = Arc::clone(&transport);
            handles.push(tokio::spawn(async move {
                let mut request = request;
                let outcome = timeout_at(deadline, fetch_one(&*transport, &mut request, threshold))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ProviderError::Timeout(format!(
                            "no response before batch deadline for {}",
                            request.key()
                        )))
                    });
                if let Err(e) = outcome {
                    log_failure(&request, &e);
                    request.fail(e);
                }
                request
            }));
        }

        let results = join_all(handles).await;

        // The transport is released here, once every task has finished
        drop(transport);

        results
            .into_iter()
            .zip(originals)
            .map(|(joined, mut original)| match joined {
                Ok(request) => request,
                Err(e) => {
                    error!(service = %original.key(), error = %e, "Fetch task aborted");
                    original.fail(ProviderError::InvalidResponse(format!("fetch task aborted: {}", e)));
                    original
                }
            })
            .collect()
    }

    /// Fetches tagged requests, keeping each tag with its request.
    pub async fn run_tagged<T>(&self, tagged: Vec<TaggedRequest<T>>) -> Vec<TaggedRequest<T>> {
        let (tags, requests): (Vec<T>, Vec<FetchRequest>) =
            tagged.into_iter().map(|t| (t.tag, t.request)).unzip();
        let results = self.run(requests).await;
        tags.into_iter()
            .zip(results)
            .map(|(tag, request)| TaggedRequest::new(tag, request))
            .collect()
    }
}

/// Sends one request, retrying once through the adapter's fallback when the
/// first response has no features.
async fn fetch_one<T: HttpTransport>(
    transport: &T,
    request: &mut FetchRequest,
    offload_threshold: usize,
) -> Result<(), ProviderError> {
    let adapter = request.adapter;
    let descriptor = adapter.build_request(&request.service, &request.point, &request.bbox)?;
    debug!(service = %request.key(), bbox = %request.bbox, "Fetching");

    let candidates = match execute(transport, request, &descriptor).await {
        Err(ProviderError::NoFeatures) => {
            match adapter.fallback_request(&descriptor, &request.bbox) {
                Some(fallback) => {
                    info!(
                        service = %request.key(),
                        tolerance = request.tolerance,
                        "No intersecting features, retrying with bounding box"
                    );
                    execute(transport, request, &fallback).await
                }
                None => Err(ProviderError::NoFeatures),
            }
        }
        other => other,
    }?;

    let resolution = resolve_nearest(
        candidates,
        request.point,
        adapter.geometry_format(),
        request.service.srid,
        offload_threshold,
    )
    .await;

    match resolution {
        Some(resolution) => {
            request.resolve(resolution.value, resolution.geometry);
            Ok(())
        }
        None => Err(ProviderError::NoFeatures),
    }
}

async fn execute<T: HttpTransport>(
    transport: &T,
    request: &mut FetchRequest,
    descriptor: &RequestDescriptor,
) -> Result<Vec<Candidate>, ProviderError> {
    let url = descriptor.to_url()?;
    request.source_uri = Some(url.to_string());

    let response = transport.get(&url, &request.service.credentials).await?;
    let body = response.into_json(url.as_str())?;
    request.adapter.parse_response(&request.service, &body)
}

fn log_failure(request: &FetchRequest, error: &ProviderError) {
    let url = request.source_uri.as_deref().unwrap_or("-");
    match error {
        ProviderError::NoFeatures | ProviderError::MissingField(_) => {
            warn!(service = %request.key(), url, error = %error, "No features found");
        }
        _ => {
            error!(service = %request.key(), url, error = %error, "Fetch failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{BboxOrder, QueryPoint};
    use crate::fetch::FetchStatus;
    use crate::provider::{HttpResponse, MockConnector, MockTransport};
    use crate::registry::{Credentials, QueryType, ServiceDefinition};
    use reqwest::Url;
    use serde_json::json;
    use std::time::Duration;

    fn service(key: &str, query_type: QueryType, url: &str, version: &str) -> Arc<ServiceDefinition> {
        Arc::new(
            ServiceDefinition::builder(key, query_type, url)
                .layer_typename("layer")
                .layer_name("value")
                .service_version(version)
                .build()
                .unwrap(),
        )
    }

    fn request(service: Arc<ServiceDefinition>) -> FetchRequest {
        FetchRequest::new(service, &QueryPoint::wgs84(27.8, -32.1), 10.0).unwrap()
    }

    fn feature_collection(value: &str) -> serde_json::Value {
        json!({"features": [{"properties": {"value": value}}]})
    }

    fn orchestrator(transport: MockTransport) -> FetchOrchestrator<MockConnector> {
        FetchOrchestrator::new(MockConnector { transport }, FetchSettings::default())
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = orchestrator(MockTransport::new()).run(Vec::new()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let transport = MockTransport::new()
            .delayed("/slow", Duration::from_millis(50), feature_collection("slow"))
            .reply("/fast", 200, feature_collection("fast"));
        let results = orchestrator(transport)
            .run(vec![
                request(service("slow", QueryType::Wms, "http://x/slow", "1.1.1")),
                request(service("fast", QueryType::Wms, "http://x/fast", "1.1.1")),
            ])
            .await;

        assert_eq!(results[0].key(), "slow");
        assert_eq!(results[0].value.as_deref(), Some("slow"));
        assert_eq!(results[1].value.as_deref(), Some("fast"));
        assert!(results.iter().all(|r| r.status == FetchStatus::Resolved));
        assert!(results[0].source_uri.as_deref().unwrap().contains("/slow"));
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let transport = MockTransport::new()
            .reply("/ok", 200, feature_collection("fine"))
            .reply("/down", 503, json!({}))
            .reply_raw("/html", 200, "<html>oops</html>")
            .fail("/dead", ProviderError::HttpError("connection refused".to_string()));
        let results = orchestrator(transport)
            .run(vec![
                request(service("ok", QueryType::Wms, "http://x/ok", "1.1.1")),
                request(service("down", QueryType::Wms, "http://x/down", "1.1.1")),
                request(service("html", QueryType::Wms, "http://x/html", "1.1.1")),
                request(service("dead", QueryType::Wms, "http://x/dead", "1.1.1")),
            ])
            .await;

        assert_eq!(results[0].value.as_deref(), Some("fine"));
        for failed in &results[1..] {
            assert_eq!(failed.status, FetchStatus::Failed);
            assert!(failed.value.is_none());
        }
        assert!(matches!(
            results[1].error,
            Some(ProviderError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_wfs_falls_back_to_bbox() {
        let transport = MockTransport::new()
            .reply("FILTER=", 200, json!({"features": []}))
            .reply(
                "BBOX=",
                200,
                json!({"features": [{
                    "properties": {"value": "Karoo"},
                    "geometry": {"type": "Point", "coordinates": [27.80001, -32.1]}
                }]}),
            );
        let results = orchestrator(transport.clone())
            .run(vec![request(service("geology", QueryType::Wfs, "http://x/wfs", "1.0.0"))])
            .await;

        assert_eq!(results[0].value.as_deref(), Some("Karoo"));
        assert!(results[0].geometry.is_some());
        assert!(results[0].source_uri.as_deref().unwrap().contains("BBOX"));

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("FILTER="));
        assert!(!calls[1].contains("FILTER="));

        // The retry searches the box computed when the request was created
        let expected = format!("BBOX={}&", results[0].bbox.to_param(BboxOrder::XY));
        assert!(calls[1].contains(&expected), "{}", calls[1]);
    }

    #[tokio::test]
    async fn test_wms_without_features_fails_without_retry() {
        let transport = MockTransport::new().reply("/wms", 200, json!({"features": []}));
        let results = orchestrator(transport.clone())
            .run(vec![request(service("rain", QueryType::Wms, "http://x/wms", "1.1.1"))])
            .await;

        assert_eq!(results[0].error, Some(ProviderError::NoFeatures));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_version_fails_request() {
        let results = orchestrator(MockTransport::new())
            .run(vec![request(service("old", QueryType::Wms, "http://x/wms", "0.9"))])
            .await;
        assert!(matches!(
            results[0].error,
            Some(ProviderError::UnsupportedVersion { .. })
        ));
    }

    #[tokio::test]
    async fn test_deadline_fails_slow_requests() {
        let transport = MockTransport::new()
            .delayed("/slow", Duration::from_secs(5), feature_collection("late"))
            .reply("/fast", 200, feature_collection("fast"));
        let settings = FetchSettings {
            total_timeout: Duration::from_millis(100),
            ..FetchSettings::default()
        };
        let orchestrator = FetchOrchestrator::new(MockConnector { transport }, settings);

        let results = orchestrator
            .run(vec![
                request(service("slow", QueryType::Wms, "http://x/slow", "1.1.1")),
                request(service("fast", QueryType::Wms, "http://x/fast", "1.1.1")),
            ])
            .await;

        assert!(matches!(results[0].error, Some(ProviderError::Timeout(_))));
        assert_eq!(results[1].value.as_deref(), Some("fast"));
    }

    /// Transport whose requests to `/panic` panic inside the task.
    #[derive(Clone)]
    struct PanickingTransport {
        inner: MockTransport,
    }

    impl HttpTransport for PanickingTransport {
        async fn get(&self, url: &Url, credentials: &Credentials) -> Result<HttpResponse, ProviderError> {
            if url.path().contains("panic") {
                panic!("adapter blew up");
            }
            self.inner.get(url, credentials).await
        }
    }

    struct PanickingConnector(PanickingTransport);

    impl Connector for PanickingConnector {
        type Transport = PanickingTransport;

        fn connect(&self, _settings: &FetchSettings) -> Result<PanickingTransport, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_panicking_task_isolated() {
        let transport = PanickingTransport {
            inner: MockTransport::new().reply("/ok", 200, feature_collection("fine")),
        };
        let orchestrator =
            FetchOrchestrator::new(PanickingConnector(transport), FetchSettings::default());

        let results = orchestrator
            .run(vec![
                request(service("first", QueryType::Wms, "http://x/ok", "1.1.1")),
                request(service("boom", QueryType::Wms, "http://x/panic", "1.1.1")),
                request(service("last", QueryType::Wms, "http://x/ok", "1.1.1")),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].value.as_deref(), Some("fine"));
        assert_eq!(results[1].key(), "boom");
        assert_eq!(results[1].status, FetchStatus::Failed);
        assert_eq!(results[2].value.as_deref(), Some("fine"));
    }

    #[tokio::test]
    async fn test_run_tagged_keeps_tags() {
        let transport = MockTransport::new()
            .reply("/a", 200, feature_collection("A"))
            .reply("/b", 200, feature_collection("B"));
        let results = orchestrator(transport)
            .run_tagged(vec![
                TaggedRequest::new("soil", request(service("a", QueryType::Wms, "http://x/a", "1.1.1"))),
                TaggedRequest::new("water", request(service("b", QueryType::Wms, "http://x/b", "1.1.1"))),
            ])
            .await;

        assert_eq!(results[0].tag, "soil");
        assert_eq!(results[0].request.value.as_deref(), Some("A"));
        assert_eq!(results[1].tag, "water");
        assert_eq!(results[1].request.value.as_deref(), Some("B"));
    }
}
