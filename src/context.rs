//! Per-deployment dependency-injection container. Created at request
//! start, dropped at request end; never shared globally, and multiple
//! contexts may exist concurrently for different twins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::{InterCloudConnections, LayerSlot, TwinConfig};
use crate::error::{DeployerError, Result};
use crate::path_safety::normalize_under_root;
use crate::providers::Adapter;
use crate::settings::RetryPolicy;
use crate::strategy::LayerState;

/// Where per-layer provisioning state survives across process runs, so
/// `info` can report real state instead of re-deriving it from nothing.
const LAYER_STATE_FILE: &str = "deploy_state.json";

fn layer_state_key(provider: &str, layer: &str) -> String {
    format!("{provider}/{layer}")
}

fn load_layer_states(project_path: &Path) -> BTreeMap<String, LayerState> {
    let path = project_path.join(LAYER_STATE_FILE);
    match fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(_) => BTreeMap::new(),
    }
}

/// Logging/diagnostic marker for which layer is currently being acted
/// on. Not used for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveLayer {
    Setup,
    L0,
    L1,
    L2,
    L3Hot,
    L3Cold,
    L3Archive,
    L4,
    L5,
}

impl ActiveLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveLayer::Setup => "setup",
            ActiveLayer::L0 => "L0",
            ActiveLayer::L1 => "L1",
            ActiveLayer::L2 => "L2",
            ActiveLayer::L3Hot => "L3_hot",
            ActiveLayer::L3Cold => "L3_cold",
            ActiveLayer::L3Archive => "L3_archive",
            ActiveLayer::L4 => "L4",
            ActiveLayer::L5 => "L5",
        }
    }
}

pub struct DeploymentContext {
    pub project_name: String,
    pub project_path: PathBuf,
    pub config: TwinConfig,
    providers: BTreeMap<String, Box<dyn Adapter>>,
    pub credentials: BTreeMap<String, Value>,
    active_layer: Option<ActiveLayer>,
    layer_states: BTreeMap<String, LayerState>,
    retry_policy: RetryPolicy,
}

impl DeploymentContext {
    pub fn new(
        project_name: impl Into<String>,
        project_path: PathBuf,
        config: TwinConfig,
        providers: BTreeMap<String, Box<dyn Adapter>>,
        credentials: BTreeMap<String, Value>,
    ) -> Self {
        let layer_states = load_layer_states(&project_path);
        Self {
            project_name: project_name.into(),
            project_path,
            config,
            providers,
            credentials,
            active_layer: None,
            layer_states,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.retry_policy = policy;
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Real provisioning state for `provider`/`layer`, persisted across
    /// runs. `NotDeployed` if nothing has ever recorded a transition.
    pub fn layer_state(&self, provider: &str, layer: &str) -> LayerState {
        self.layer_states
            .get(&layer_state_key(provider, layer))
            .copied()
            .unwrap_or(LayerState::NotDeployed)
    }

    pub fn set_layer_state(&mut self, provider: &str, layer: &str, state: LayerState) -> Result<()> {
        self.layer_states.insert(layer_state_key(provider, layer), state);
        let path = self.project_path.join(LAYER_STATE_FILE);
        let payload = serde_json::to_string_pretty(&self.layer_states)?;
        fs::write(path, payload)?;
        Ok(())
    }

    /// Resolves the configured provider name for `slot`, then looks up
    /// its initialized adapter. Errors if configured but not present
    /// among `providers` (a bug in context construction, not user input).
    pub fn get_provider_for_layer(&self, slot: LayerSlot) -> Result<&dyn Adapter> {
        let name = self.config.provider_for(slot).ok_or_else(|| {
            DeployerError::deployment(
                slot.as_key(),
                "none",
                "layer has no provider configured",
            )
        })?;
        self.providers
            .get(name)
            .map(|boxed| boxed.as_ref())
            .ok_or_else(|| DeployerError::ProviderNotFound {
                requested: name.to_string(),
                available: self.providers.keys().cloned().collect(),
            })
    }

    /// Looks up an initialized adapter directly by provider name, for
    /// callers iterating over every provider a twin uses rather than one
    /// specific layer (fallback cleanup, `check_twin_exists`).
    pub fn provider_named(&self, name: &str) -> Option<&dyn Adapter> {
        self.providers.get(name).map(|boxed| boxed.as_ref())
    }

    pub fn get_upload_path(&self, parts: &[&str]) -> Result<PathBuf> {
        let relative: PathBuf = parts.iter().collect();
        normalize_under_root(&self.project_path, &relative)
            .map_err(|err| DeployerError::Other(err.to_string()))
    }

    pub fn get_inter_cloud_connection(
        &self,
        source_layer: &str,
        target_layer: &str,
    ) -> Result<&crate::config::InterCloudConnection> {
        let conn_id = InterCloudConnections::connection_id(source_layer, target_layer);
        self.config
            .inter_cloud
            .connections
            .get(&conn_id)
            .ok_or_else(|| {
                DeployerError::deployment(
                    format!("{source_layer}->{target_layer}"),
                    "glue",
                    format!("no inter-cloud connection registered for '{conn_id}'"),
                )
            })
    }

    pub fn set_active_layer(&mut self, layer: ActiveLayer) {
        self.active_layer = Some(layer);
    }

    pub fn active_layer(&self) -> Option<ActiveLayer> {
        self.active_layer
    }

    pub fn save_inter_cloud(&self) -> Result<()> {
        self.config.save_inter_cloud(&self.project_path)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, OptimizationFlags};

    fn empty_config() -> TwinConfig {
        TwinConfig {
            digital_twin_name: "demo".to_string(),
            mode: Mode::Debug,
            hot_storage_days: 30,
            cold_storage_days: 90,
            archive_storage_days: 365,
            iot_devices: Vec::new(),
            events: Vec::new(),
            hierarchy: crate::config::Hierarchy::None,
            providers: BTreeMap::new(),
            optimization: OptimizationFlags::default(),
            inter_cloud: InterCloudConnections::default(),
        }
    }

    #[test]
    fn unknown_route_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DeploymentContext::new(
            "demo",
            dir.path().to_path_buf(),
            empty_config(),
            BTreeMap::new(),
            BTreeMap::new(),
        );
        let err = ctx.get_inter_cloud_connection("L1", "L2").unwrap_err();
        assert!(matches!(err, DeployerError::Deployment { .. }));
    }

    #[test]
    fn layer_without_provider_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DeploymentContext::new(
            "demo",
            dir.path().to_path_buf(),
            empty_config(),
            BTreeMap::new(),
            BTreeMap::new(),
        );
        let err = ctx.get_provider_for_layer(LayerSlot::L1).unwrap_err();
        assert!(matches!(err, DeployerError::Deployment { .. }));
    }
}
