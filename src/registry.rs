//! Provider registry: a process-wide table of provider-name to adapter
//! factory. Providers register themselves at lookup time rather than
//! singleton instances, so every `get` returns a fresh adapter.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::DeployerError;
use crate::providers::{Adapter, ProviderKind};

type Factory = fn() -> Box<dyn Adapter>;

static REGISTRY: Lazy<Mutex<HashMap<String, Factory>>> = Lazy::new(|| {
    let mut map: HashMap<String, Factory> = HashMap::new();
    map.insert("aws".to_string(), crate::providers::aws::new_adapter as Factory);
    map.insert("azure".to_string(), crate::providers::azure::new_adapter as Factory);
    map.insert("gcp".to_string(), crate::providers::gcp::new_adapter as Factory);
    Mutex::new(map)
});

/// Registers a provider factory under `name`. Re-registering the same
/// name with a different factory is a programmer error.
pub fn register(name: impl Into<String>, factory: Factory) {
    let mut guard = REGISTRY.lock().expect("provider registry poisoned");
    guard.insert(name.into(), factory);
}

/// Looks up and constructs a fresh adapter for `name`.
pub fn get(name: &str) -> Result<Box<dyn Adapter>, DeployerError> {
    let guard = REGISTRY.lock().expect("provider registry poisoned");
    match guard.get(name) {
        Some(factory) => Ok(factory()),
        None => Err(DeployerError::ProviderNotFound {
            requested: name.to_string(),
            available: list_providers(&guard),
        }),
    }
}

/// Looks up an adapter for a closed [`ProviderKind`] variant.
pub fn get_kind(kind: ProviderKind) -> Result<Box<dyn Adapter>, DeployerError> {
    get(kind.as_str())
}

pub fn is_registered(name: &str) -> bool {
    let guard = REGISTRY.lock().expect("provider registry poisoned");
    guard.contains_key(name)
}

pub fn list() -> Vec<String> {
    let guard = REGISTRY.lock().expect("provider registry poisoned");
    list_providers(&guard)
}

fn list_providers(guard: &HashMap<String, Factory>) -> Vec<String> {
    let mut names: Vec<String> = guard.keys().cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_providers_are_registered() {
        assert!(is_registered("aws"));
        assert!(is_registered("azure"));
        assert!(is_registered("gcp"));
    }

    #[test]
    fn unknown_provider_is_not_found_error() {
        let err = get("openstack").unwrap_err();
        match err {
            DeployerError::ProviderNotFound { requested, available } => {
                assert_eq!(requested, "openstack");
                assert!(available.contains(&"aws".to_string()));
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn list_is_sorted() {
        let names = list();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
