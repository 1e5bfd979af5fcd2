//! Lookup-or-fetch over services, groups and collections.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use super::output::{CollectionValues, GroupValues};
use super::ContextError;
use crate::cache::{CacheEntry, CacheStore, MemoryCacheStore, SpatialCache, CACHE_SRID};
use crate::coord::QueryPoint;
use crate::fetch::{FetchOrchestrator, FetchRequest, TaggedRequest};
use crate::provider::Connector;
use crate::registry::{ConfigStore, ServiceDefinition};

/// Result of probing a service at its configured test point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub key: String,
    /// True when the fetched value equals the expected one
    pub online: bool,
    pub expected: String,
    pub actual: Option<String>,
    pub error: Option<String>,
}

/// Context retrieval over a registry, a spatial cache and a fetch
/// orchestrator.
///
/// Registry and cache are only touched before and after a fetch batch; a
/// lookup over many services runs every cache miss in one batch.
pub struct ContextService<S, C, K = MemoryCacheStore>
where
    S: ConfigStore,
    C: Connector,
    K: CacheStore,
{
    registry: S,
    cache: SpatialCache<K>,
    orchestrator: FetchOrchestrator<C>,
}

impl<S, C, K> ContextService<S, C, K>
where
    S: ConfigStore,
    C: Connector,
    K: CacheStore,
{
    pub fn new(registry: S, cache: SpatialCache<K>, orchestrator: FetchOrchestrator<C>) -> Self {
        Self {
            registry,
            cache,
            orchestrator,
        }
    }

    pub fn registry(&self) -> &S {
        &self.registry
    }

    pub fn cache(&self) -> &SpatialCache<K> {
        &self.cache
    }

    /// Value of one service at `point`.
    ///
    /// # Arguments
    ///
    /// * `key` - Service key
    /// * `point` - Query point in any supported SRID
    /// * `tolerance` - Search distance in meters, the service default when `None`
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown key, `NoData` when the service has no value
    /// at this point.
    pub async fn retrieve_service_value(
        &self,
        key: &str,
        point: &QueryPoint,
        tolerance: Option<f64>,
    ) -> Result<CacheEntry, ContextError> {
        let service = self.registry.service(key)?;
        let mut entries = self.lookup(vec![((), service)], point, tolerance).await?;

        match entries.pop() {
            Some(((), entry)) if entry.value.is_some() => Ok(entry),
            _ => Err(ContextError::NoData(key.to_string())),
        }
    }

    /// Values of every service in a group, in declared order.
    ///
    /// Services without a value are kept with a null value. Fails with
    /// `NoData` only when no service has a value.
    pub async fn retrieve_group_values(
        &self,
        key: &str,
        point: &QueryPoint,
        tolerance: Option<f64>,
    ) -> Result<GroupValues, ContextError> {
        let group = self.registry.group(key)?;
        let wanted = group
            .services
            .iter()
            .map(|service| Ok(((), self.registry.service(service)?)))
            .collect::<Result<Vec<_>, ContextError>>()?;

        let values = self
            .lookup(wanted, point, tolerance)
            .await?
            .into_iter()
            .map(|((), entry)| entry)
            .collect();

        let result = GroupValues {
            key: group.key.clone(),
            name: group.name.clone(),
            graphable: group.graphable,
            values,
        };
        if !result.has_values() {
            return Err(ContextError::NoData(key.to_string()));
        }
        Ok(result)
    }

    /// Values of every group in a collection, in declared order.
    ///
    /// The misses of all groups are fetched in one batch and sorted back
    /// into their groups by tag.
    pub async fn retrieve_collection_values(
        &self,
        key: &str,
        point: &QueryPoint,
        tolerance: Option<f64>,
    ) -> Result<CollectionValues, ContextError> {
        let collection = self.registry.collection(key)?;
        let groups = collection
            .groups
            .iter()
            .map(|group| self.registry.group(group))
            .collect::<Result<Vec<_>, _>>()?;

        let mut wanted = Vec::new();
        for (index, group) in groups.iter().enumerate() {
            for service in &group.services {
                wanted.push((index, self.registry.service(service)?));
            }
        }

        let mut buckets: Vec<Vec<CacheEntry>> = vec![Vec::new(); groups.len()];
        for (index, entry) in self.lookup(wanted, point, tolerance).await? {
            buckets[index].push(entry);
        }

        let result = CollectionValues {
            key: collection.key.clone(),
            name: collection.name.clone(),
            groups: groups
                .iter()
                .zip(buckets)
                .map(|(group, values)| GroupValues {
                    key: group.key.clone(),
                    name: group.name.clone(),
                    graphable: group.graphable,
                    values,
                })
                .collect(),
        };
        if !result.has_values() {
            return Err(ContextError::NoData(key.to_string()));
        }
        Ok(result)
    }

    /// Probes one service at its test point, bypassing the cache.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the service has no test point configured.
    pub async fn check_service(&self, key: &str) -> Result<ServiceStatus, ContextError> {
        let service = self.registry.service(key)?;
        if service.status_probe.is_none() {
            return Err(ContextError::InvalidInput(format!(
                "service '{}' has no test point configured",
                key
            )));
        }
        let mut statuses = self.check_services(vec![service]).await?;
        statuses
            .pop()
            .ok_or_else(|| ContextError::NoData(key.to_string()))
    }

    /// Probes every service that has a test point, in one batch.
    pub async fn check_all(&self) -> Result<Vec<ServiceStatus>, ContextError> {
        let services = self
            .registry
            .service_keys()
            .iter()
            .map(|key| self.registry.service(key))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_services(services).await
    }

    async fn check_services(
        &self,
        services: Vec<Arc<ServiceDefinition>>,
    ) -> Result<Vec<ServiceStatus>, ContextError> {
        let mut slots: Vec<Option<ServiceStatus>> = Vec::new();
        let mut requests = Vec::new();
        for service in services {
            let Some(probe) = service.status_probe.clone() else {
                continue;
            };
            let index = slots.len();
            slots.push(None);
            let tolerance = service.tolerance;
            match FetchRequest::new(service.clone(), &probe.point, tolerance) {
                Ok(request) => requests.push(TaggedRequest::new((index, probe.expected), request)),
                Err(e) => {
                    error!(service = %service.key, error = %e, "Cannot build status request");
                    slots[index] = Some(ServiceStatus {
                        key: service.key.clone(),
                        online: false,
                        expected: probe.expected,
                        actual: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        for TaggedRequest {
            tag: (index, expected),
            request,
        } in self.orchestrator.run_tagged(requests).await
        {
            slots[index] = Some(ServiceStatus {
                key: request.key().to_string(),
                online: request.value.as_deref() == Some(expected.as_str()),
                expected,
                actual: request.value,
                error: request.error.map(|e| e.to_string()),
            });
        }

        let statuses: Vec<ServiceStatus> = slots.into_iter().flatten().collect();
        let offline = statuses.iter().filter(|s| !s.online).count();
        info!(checked = statuses.len(), offline, "Service check complete");
        Ok(statuses)
    }

    /// Resolves each wanted service from the cache or, failing that, from
    /// one fetch batch. Results come back in input order with their tags.
    async fn lookup<T>(
        &self,
        wanted: Vec<(T, Arc<ServiceDefinition>)>,
        point: &QueryPoint,
        tolerance: Option<f64>,
    ) -> Result<Vec<(T, CacheEntry)>, ContextError> {
        if let Some(distance) = tolerance {
            if !distance.is_finite() || distance < 0.0 {
                return Err(ContextError::InvalidInput(format!(
                    "tolerance must be a non-negative distance in meters, got {}",
                    distance
                )));
            }
        }

        // Only the caller's point can fail here; per-service failures below
        // become null entries.
        let cache_point = point.transform(CACHE_SRID)?;

        let total = wanted.len();
        let mut slots: Vec<Option<(T, CacheEntry)>> = (0..total).map(|_| None).collect();
        let mut misses = Vec::new();

        for (index, (tag, service)) in wanted.into_iter().enumerate() {
            let tolerance = tolerance.unwrap_or(service.tolerance);
            if let Some(entry) = self.cache.retrieve(&service.key, point, tolerance).await? {
                slots[index] = Some((tag, entry));
                continue;
            }
            match FetchRequest::new(service.clone(), point, tolerance) {
                Ok(request) => misses.push(TaggedRequest::new((index, tag), request)),
                Err(e) => {
                    error!(
                        service = %service.key,
                        srid = %service.srid,
                        error = %e,
                        "Cannot build fetch request"
                    );
                    slots[index] = Some((tag, CacheEntry::unavailable(&service, &cache_point)));
                }
            }
        }

        debug!(
            services = total,
            hits = total - misses.len(),
            misses = misses.len(),
            "Cache lookup complete"
        );

        for TaggedRequest {
            tag: (index, tag),
            request,
        } in self.orchestrator.run_tagged(misses).await
        {
            let entry = match self.cache.create(&request).await {
                Ok(entry) => entry,
                Err(e) => {
                    error!(service = %request.key(), error = %e, "Cache write failed");
                    CacheEntry::unresolved(&request)
                }
            };
            slots[index] = Some((tag, entry));
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
