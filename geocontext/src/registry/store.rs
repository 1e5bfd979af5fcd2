//! Read-only configuration store for services, groups and collections.

use std::collections::HashMap;
use std::sync::Arc;

use super::{validate_key, RegistryError, ServiceDefinition};

/// Ordered set of services reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: String,
    pub name: String,
    pub description: String,
    /// Whether the group's values can be plotted as a series
    pub graphable: bool,
    /// Service keys in display order
    pub services: Vec<String>,
}

/// Ordered set of groups reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub key: String,
    pub name: String,
    pub description: String,
    /// Group keys in display order
    pub groups: Vec<String>,
}

/// Lookup interface over the service registry.
///
/// Implementations are only read before and after a fetch batch, never from
/// inside concurrent fetch tasks.
pub trait ConfigStore: Send + Sync {
    fn service(&self, key: &str) -> Result<Arc<ServiceDefinition>, RegistryError>;

    fn group(&self, key: &str) -> Result<Arc<Group>, RegistryError>;

    fn collection(&self, key: &str) -> Result<Arc<Collection>, RegistryError>;

    /// All service keys, sorted.
    fn service_keys(&self) -> Vec<String>;

    /// Ordered service keys of a group.
    fn group_services(&self, key: &str) -> Result<Vec<String>, RegistryError> {
        Ok(self.group(key)?.services.clone())
    }

    /// Ordered group keys of a collection.
    fn collection_groups(&self, key: &str) -> Result<Vec<String>, RegistryError> {
        Ok(self.collection(key)?.groups.clone())
    }
}

/// Registry held entirely in memory.
///
/// Groups may only reference services already inserted, and collections only
/// groups already inserted.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    services: HashMap<String, Arc<ServiceDefinition>>,
    groups: HashMap<String, Arc<Group>>,
    collections: HashMap<String, Arc<Collection>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_service(&mut self, service: ServiceDefinition) -> Result<(), RegistryError> {
        validate_key(&service.key)?;
        if self.services.contains_key(&service.key) {
            return Err(RegistryError::DuplicateKey {
                kind: "service",
                key: service.key,
            });
        }
        self.services.insert(service.key.clone(), Arc::new(service));
        Ok(())
    }

    pub fn insert_group(&mut self, group: Group) -> Result<(), RegistryError> {
        validate_key(&group.key)?;
        if self.groups.contains_key(&group.key) {
            return Err(RegistryError::DuplicateKey {
                kind: "group",
                key: group.key,
            });
        }
        if let Some(missing) = group
            .services
            .iter()
            .find(|key| !self.services.contains_key(*key))
        {
            return Err(RegistryError::UnknownMember {
                owner: group.key.clone(),
                member: missing.clone(),
            });
        }
        self.groups.insert(group.key.clone(), Arc::new(group));
        Ok(())
    }

    pub fn insert_collection(&mut self, collection: Collection) -> Result<(), RegistryError> {
        validate_key(&collection.key)?;
        if self.collections.contains_key(&collection.key) {
            return Err(RegistryError::DuplicateKey {
                kind: "collection",
                key: collection.key,
            });
        }
        if let Some(missing) = collection
            .groups
            .iter()
            .find(|key| !self.groups.contains_key(*key))
        {
            return Err(RegistryError::UnknownMember {
                owner: collection.key.clone(),
                member: missing.clone(),
            });
        }
        self.collections
            .insert(collection.key.clone(), Arc::new(collection));
        Ok(())
    }

    pub fn group_keys(&self) -> Vec<String> {
        sorted_keys(&self.groups)
    }

    pub fn collection_keys(&self) -> Vec<String> {
        sorted_keys(&self.collections)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

impl ConfigStore for InMemoryConfigStore {
    fn service(&self, key: &str) -> Result<Arc<ServiceDefinition>, RegistryError> {
        self.services
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::ServiceNotFound(key.to_string()))
    }

    fn group(&self, key: &str) -> Result<Arc<Group>, RegistryError> {
        self.groups
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::GroupNotFound(key.to_string()))
    }

    fn collection(&self, key: &str) -> Result<Arc<Collection>, RegistryError> {
        self.collections
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::CollectionNotFound(key.to_string()))
    }

    fn service_keys(&self) -> Vec<String> {
        sorted_keys(&self.services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::QueryType;

    fn service(key: &str) -> ServiceDefinition {
        ServiceDefinition::builder(key, QueryType::Wms, "http://example.com/wms")
            .build()
            .unwrap()
    }

    fn group(key: &str, services: &[&str]) -> Group {
        Group {
            key: key.to_string(),
            name: key.to_string(),
            description: String::new(),
            graphable: false,
            services: services.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_service_lookup() {
        let mut store = InMemoryConfigStore::new();
        store.insert_service(service("altitude")).unwrap();

        assert_eq!(store.service("altitude").unwrap().key, "altitude");
        assert!(matches!(
            store.service("rainfall"),
            Err(RegistryError::ServiceNotFound(key)) if key == "rainfall"
        ));
    }

    #[test]
    fn test_duplicate_service_rejected() {
        let mut store = InMemoryConfigStore::new();
        store.insert_service(service("altitude")).unwrap();
        assert!(matches!(
            store.insert_service(service("altitude")),
            Err(RegistryError::DuplicateKey { kind: "service", .. })
        ));
    }

    #[test]
    fn test_group_preserves_order() {
        let mut store = InMemoryConfigStore::new();
        for key in ["b_service", "a_service", "c_service"] {
            store.insert_service(service(key)).unwrap();
        }
        store
            .insert_group(group("mixed", &["c_service", "a_service", "b_service"]))
            .unwrap();

        assert_eq!(
            store.group_services("mixed").unwrap(),
            vec!["c_service", "a_service", "b_service"]
        );
        assert_eq!(
            store.service_keys(),
            vec!["a_service", "b_service", "c_service"]
        );
    }

    #[test]
    fn test_group_with_unknown_service_rejected() {
        let mut store = InMemoryConfigStore::new();
        store.insert_service(service("altitude")).unwrap();
        let result = store.insert_group(group("terrain", &["altitude", "slope"]));
        assert!(matches!(
            result,
            Err(RegistryError::UnknownMember { member, .. }) if member == "slope"
        ));
    }

    #[test]
    fn test_collection_lookup() {
        let mut store = InMemoryConfigStore::new();
        store.insert_service(service("altitude")).unwrap();
        store.insert_group(group("terrain", &["altitude"])).unwrap();
        store
            .insert_collection(Collection {
                key: "physical".to_string(),
                name: "Physical".to_string(),
                description: String::new(),
                groups: vec!["terrain".to_string()],
            })
            .unwrap();

        assert_eq!(store.collection_groups("physical").unwrap(), vec!["terrain"]);
        assert!(matches!(
            store.collection("social"),
            Err(RegistryError::CollectionNotFound(_))
        ));
        assert!(matches!(
            store.group("hydrology"),
            Err(RegistryError::GroupNotFound(_))
        ));
    }
}
