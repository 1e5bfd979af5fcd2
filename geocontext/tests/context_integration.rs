//! Integration tests for context retrieval.
//!
//! These tests drive the public API end to end against a scripted transport:
//! - Registry document → fetch → cache → nested output
//! - WFS intersect-then-bbox fallback
//! - ArcREST Esri geometry conversion
//! - Cache hits avoiding the network
//! - Isolation of a panicking request inside a batch
//!
//! Run with: `cargo test --test context_integration`

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Url;
use serde_json::{json, Value};

use geocontext::cache::{CacheStore, MemoryCacheStore, SpatialCache, CACHE_SRID};
use geocontext::config::{CacheSettings, FetchSettings};
use geocontext::context::{render_collection, ContextError, ContextService, OutputFormat};
use geocontext::coord::{parse_coordinate, QueryPoint};
use geocontext::fetch::FetchOrchestrator;
use geocontext::geometry::Shape;
use geocontext::provider::{Connector, HttpResponse, HttpTransport, ProviderError};
use geocontext::registry::{parse_registry_str, Credentials, InMemoryConfigStore};

// ============================================================================
// Scripted Transport
// ============================================================================

#[derive(Clone)]
enum Action {
    Reply(u16, Value),
    Delay(Duration, Value),
    Panic,
}

/// Transport answering by URL substring, first match wins.
#[derive(Clone, Default)]
struct ScriptedTransport {
    routes: Vec<(String, Action)>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    fn route(mut self, pattern: &str, action: Action) -> Self {
        self.routes.push((pattern.to_string(), action));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &Url, _credentials: &Credentials) -> Result<HttpResponse, ProviderError> {
        let query: String = url
            .query_pairs()
            .map(|(k, v)| format!("{}={}&", k, v))
            .collect();
        let text = format!("{}?{}", url.path(), query);
        self.calls.lock().unwrap().push(text.clone());

        let action = self
            .routes
            .iter()
            .find(|(pattern, _)| text.contains(pattern.as_str()))
            .map(|(_, action)| action.clone());

        match action {
            Some(Action::Reply(status, body)) => Ok(HttpResponse::new(status, body.to_string())),
            Some(Action::Delay(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(HttpResponse::new(200, body.to_string()))
            }
            Some(Action::Panic) => panic!("provider adapter crashed"),
            None => Ok(HttpResponse::new(404, "not found")),
        }
    }
}

struct ScriptedConnector(ScriptedTransport);

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&self, _settings: &FetchSettings) -> Result<ScriptedTransport, ProviderError> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const REGISTRY: &str = r#"
[service.altitude]
name = Altitude
query_type = WMS
url = http://maps.test/geoserver/wms
layer_typename = south_africa
layer_name = GRAY_INDEX
service_version = 1.1.1
cache_duration = 3600

[service.geology]
name = Geology
query_type = WFS
url = http://maps.test/geoserver/wfs
layer_typename = geology
layer_name = formation
service_version = 1.0.0

[service.parcels]
name = Parcels
query_type = ArcREST
url = http://arcgis.test/rest/services/parcels/MapServer/
layer_typename = all:0
layer_name = PARCEL_ID

[service.town]
name = Nearest town
query_type = PlaceName
url = http://names.test/findNearbyPlaceNameJSON
layer_name = name

[group.terrain]
name = Terrain
graphable = true
services = altitude, geology

[group.land]
name = Land
services = parcels, town

[collection.site]
name = Site report
groups = terrain, land
"#;

type Context = ContextService<InMemoryConfigStore, ScriptedConnector>;

fn registry() -> InMemoryConfigStore {
    parse_registry_str(REGISTRY).expect("registry document is valid")
}

fn context(transport: ScriptedTransport) -> Context {
    ContextService::new(
        registry(),
        SpatialCache::new(MemoryCacheStore::new(), &CacheSettings::default()),
        FetchOrchestrator::new(ScriptedConnector(transport), FetchSettings::default()),
    )
}

/// Query point near Queenstown, Eastern Cape.
fn point() -> QueryPoint {
    parse_coordinate("27.8", "-32.1", "4326").unwrap()
}

fn gray_index() -> Value {
    json!({"type": "FeatureCollection", "features": [{"properties": {"GRAY_INDEX": 746.0}}]})
}

fn formation() -> Value {
    json!({"features": [
        {"properties": {"formation": "Beaufort"}, "geometry": {"type": "Point", "coordinates": [27.9, -32.1]}},
        {"properties": {"formation": "Karoo"}, "geometry": {"type": "Point", "coordinates": [27.8001, -32.1]}}
    ]})
}

fn parcel() -> Value {
    json!({"results": [{
        "layerId": 0,
        "attributes": {"PARCEL_ID": "C0130000000001200000"},
        "geometry": {
            "rings": [[[27.7, -32.2], [27.7, -32.0], [27.9, -32.0], [27.9, -32.2], [27.7, -32.2]]],
            "spatialReference": {"wkid": 4326}
        }
    }]})
}

fn town() -> Value {
    json!({"geonames": [{"name": "Queenstown  ", "distance": "1.2"}]})
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_wms_value_fetched_and_cached() {
    let transport = ScriptedTransport::default().route("south_africa", Action::Reply(200, gray_index()));
    let context = context(transport.clone());
    let before = Utc::now();

    let entry = context
        .retrieve_service_value("altitude", &point(), None)
        .await
        .unwrap();

    assert_eq!(entry.value.as_deref(), Some("746.0"));
    assert!(entry.id.is_some());
    assert_eq!(entry.geometry.srid, CACHE_SRID);
    assert!(entry.expires_at >= before + chrono::Duration::seconds(3600));
    assert!(entry.expires_at <= Utc::now() + chrono::Duration::seconds(3600));

    let call = &transport.calls()[0];
    assert!(call.contains("REQUEST=feature_info"));
    assert!(call.contains("SRS=EPSG:4326"));
    assert_eq!(context.cache().store().len(), 1);
}

#[tokio::test]
async fn test_wfs_intersect_then_bbox_fallback() {
    let transport = ScriptedTransport::default()
        .route("FILTER=", Action::Reply(200, json!({"features": []})))
        .route("BBOX=", Action::Reply(200, formation()));
    let context = context(transport.clone());

    let entry = context
        .retrieve_service_value("geology", &point(), Some(50.0))
        .await
        .unwrap();

    // The nearer of the two bbox candidates wins
    assert_eq!(entry.value.as_deref(), Some("Karoo"));
    assert!(entry.source_uri.as_deref().unwrap().contains("BBOX"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].contains("Intersects"));
    assert!(calls[1].contains("SRSNAME=EPSG:4326"));
}

#[tokio::test]
async fn test_arcrest_geometry_converted_to_geojson() {
    let transport = ScriptedTransport::default().route("/identify", Action::Reply(200, parcel()));
    let context = context(transport);

    let entry = context
        .retrieve_service_value("parcels", &point(), None)
        .await
        .unwrap();

    assert_eq!(entry.value.as_deref(), Some("C0130000000001200000"));
    assert!(matches!(entry.geometry.shape, Shape::Polygon { .. }));
    assert_eq!(entry.geometry.srid, CACHE_SRID);
    assert!(!entry.geometry.has_z());
}

#[tokio::test]
async fn test_cached_lookup_faster_than_fetch() {
    let transport = ScriptedTransport::default().route(
        "south_africa",
        Action::Delay(Duration::from_millis(200), gray_index()),
    );
    let context = context(transport.clone());

    let start = Instant::now();
    let fetched = context
        .retrieve_service_value("altitude", &point(), None)
        .await
        .unwrap();
    let direct = start.elapsed();

    let start = Instant::now();
    let cached = context
        .retrieve_service_value("altitude", &point(), None)
        .await
        .unwrap();
    let from_cache = start.elapsed();

    assert_eq!(cached.id, fetched.id);
    assert_eq!(transport.calls().len(), 1);
    assert!(direct > from_cache, "direct {:?} cached {:?}", direct, from_cache);
}

#[tokio::test]
async fn test_panicking_request_does_not_sink_batch() {
    let transport = ScriptedTransport::default()
        .route("south_africa", Action::Reply(200, gray_index()))
        .route("geology", Action::Panic);
    let context = context(transport);

    let group = context
        .retrieve_group_values("terrain", &point(), None)
        .await
        .unwrap();

    assert_eq!(group.values.len(), 2);
    assert_eq!(group.values[0].value.as_deref(), Some("746.0"));
    assert_eq!(group.values[1].service_key, "geology");
    assert!(group.values[1].value.is_none());
}

#[tokio::test]
async fn test_collection_reassembled_in_declared_order() {
    let transport = ScriptedTransport::default()
        .route("south_africa", Action::Delay(Duration::from_millis(50), gray_index()))
        .route("FILTER=", Action::Reply(200, formation()))
        .route("/identify", Action::Reply(200, parcel()))
        .route("findNearbyPlaceNameJSON", Action::Reply(200, town()));
    let context = context(transport.clone());

    // Cache one service of the second group beforehand
    context
        .retrieve_service_value("town", &point(), None)
        .await
        .unwrap();

    let collection = context
        .retrieve_collection_values("site", &point(), None)
        .await
        .unwrap();

    let layout: Vec<(&str, Vec<&str>)> = collection
        .groups
        .iter()
        .map(|g| {
            (
                g.key.as_str(),
                g.values.iter().map(|e| e.service_key.as_str()).collect(),
            )
        })
        .collect();
    assert_eq!(
        layout,
        [
            ("terrain", vec!["altitude", "geology"]),
            ("land", vec!["parcels", "town"]),
        ]
    );
    assert_eq!(collection.groups[1].values[1].value.as_deref(), Some("Queenstown"));
    assert_eq!(transport.calls().len(), 4);

    let rendered = render_collection(
        context.registry(),
        &collection,
        &point(),
        OutputFormat::GeoJson,
    )
    .unwrap();
    assert_eq!(rendered["type"], "Feature");
    assert_eq!(rendered["properties"]["groups"][0]["values"][0]["value"], "746.0");
    assert_eq!(rendered["properties"]["groups"][0]["graphable"], true);
}

#[tokio::test]
async fn test_unreachable_collection_reports_no_data() {
    let context = context(ScriptedTransport::default());

    let err = context
        .retrieve_collection_values("site", &point(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ContextError::NoData(_)));

    let err = context
        .retrieve_collection_values("missing", &point(), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_expired_entries_refetched() {
    let transport = ScriptedTransport::default().route("south_africa", Action::Reply(200, gray_index()));
    let context = context(transport.clone());

    context
        .retrieve_service_value("altitude", &point(), None)
        .await
        .unwrap();
    assert_eq!(context.cache().store().purge_expired().await.unwrap(), 0);

    // A different point well outside the tolerance misses the cache
    let elsewhere = QueryPoint::wgs84(28.5, -31.0);
    context
        .retrieve_service_value("altitude", &elsewhere, None)
        .await
        .unwrap();
    assert_eq!(transport.calls().len(), 2);
}
