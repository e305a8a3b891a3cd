//! Twin configuration: the on-disk, read-only description of a single
//! digital twin, loaded once per operation and treated as immutable for
//! its duration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DeployerError, Result};

pub const CONFIG_FILE: &str = "config.json";
pub const CONFIG_IOT_DEVICES_FILE: &str = "config_iot_devices.json";
pub const CONFIG_EVENTS_FILE: &str = "config_events.json";
pub const CONFIG_PROVIDERS_FILE: &str = "config_providers.json";
pub const CONFIG_OPTIMIZATION_FILE: &str = "config_optimization.json";
pub const CONFIG_INTER_CLOUD_FILE: &str = "config_inter_cloud.json";
pub const CONFIG_CREDENTIALS_FILE: &str = "config_credentials.json";
pub const TWIN_HIERARCHY_DIR: &str = "twin_hierarchy";
pub const AWS_HIERARCHY_FILE: &str = "aws_hierarchy.json";
pub const AZURE_HIERARCHY_FILE: &str = "azure_hierarchy.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Debug,
    Production,
}

/// The seven layer slots a provider can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LayerSlot {
    L1,
    L2,
    L3Hot,
    L3Cold,
    L3Archive,
    L4,
    L5,
}

impl LayerSlot {
    pub fn as_key(&self) -> &'static str {
        match self {
            LayerSlot::L1 => "layer_1_provider",
            LayerSlot::L2 => "layer_2_provider",
            LayerSlot::L3Hot => "layer_3_hot_provider",
            LayerSlot::L3Cold => "layer_3_cold_provider",
            LayerSlot::L3Archive => "layer_3_archive_provider",
            LayerSlot::L4 => "layer_4_provider",
            LayerSlot::L5 => "layer_5_provider",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IotDevice {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRule {
    pub name: String,
    pub condition: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationFlags {
    #[serde(default)]
    pub use_event_checking: bool,
    #[serde(default)]
    pub trigger_notification_workflow: bool,
    #[serde(default)]
    pub return_feedback_to_device: bool,
    #[serde(default)]
    pub integrate_error_handling: bool,
    #[serde(default)]
    pub needs_3d_model: bool,
}

/// `{url, token}` pair persisted under a `"<src>_to_<dst>"` key in
/// `config_inter_cloud.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterCloudConnection {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterCloudConnections {
    #[serde(default)]
    pub connections: BTreeMap<String, InterCloudConnection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inter_cloud_token: Option<String>,
}

impl InterCloudConnections {
    pub fn connection_id(source_layer: &str, target_layer: &str) -> String {
        format!("{source_layer}_to_{target_layer}")
    }
}

/// Eagerly-parsed, provider-specific twin hierarchy. AWS gets a tree,
/// Azure a models/twins/relationships bundle, GCP nothing — the loader
/// is the only place that needs to know both shapes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hierarchy {
    Tree(Vec<Value>),
    Dtdl(AzureHierarchy),
    #[default]
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureHierarchy {
    #[serde(default)]
    pub header: Value,
    #[serde(default)]
    pub models: Vec<Value>,
    #[serde(default)]
    pub twins: Vec<Value>,
    #[serde(default)]
    pub relationships: Vec<Value>,
}

/// Full parsed configuration for one twin. Immutable for the duration
/// of a deployment operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinConfig {
    pub digital_twin_name: String,
    pub mode: Mode,
    pub hot_storage_days: u32,
    pub cold_storage_days: u32,
    pub archive_storage_days: u32,
    #[serde(default)]
    pub iot_devices: Vec<IotDevice>,
    #[serde(default)]
    pub events: Vec<EventRule>,
    #[serde(default)]
    pub hierarchy: Hierarchy,
    pub providers: BTreeMap<LayerSlot, String>,
    #[serde(default)]
    pub optimization: OptimizationFlags,
    #[serde(default)]
    pub inter_cloud: InterCloudConnections,
}

const VALID_PROVIDER_NAMES: [&str; 4] = ["aws", "azure", "google", "none"];
const TWIN_NAME_MAX_LEN: usize = 24;

impl TwinConfig {
    /// Loads and validates every config file under `project_path`,
    /// following the file-by-file load order and required/optional
    /// semantics of the reference config loader.
    pub fn load(project_path: &Path) -> Result<Self> {
        let base = load_required_json(project_path, CONFIG_FILE)?;

        let digital_twin_name = require_string(&base, "digital_twin_name", CONFIG_FILE)?;
        validate_twin_name(&digital_twin_name)?;

        let hot_storage_days = require_u32(&base, "hot_storage_size_in_days", CONFIG_FILE)?;
        let cold_storage_days = require_u32(&base, "cold_storage_size_in_days", CONFIG_FILE)?;
        let archive_storage_days = require_u32(&base, "archive_storage_size_in_days", CONFIG_FILE)?;
        let mode_str = require_string(&base, "mode", CONFIG_FILE)?;
        let mode = match mode_str.to_ascii_uppercase().as_str() {
            "DEBUG" => Mode::Debug,
            "PRODUCTION" => Mode::Production,
            other => {
                return Err(DeployerError::configuration(
                    format!("field 'mode' must be DEBUG or PRODUCTION, got '{other}'"),
                    CONFIG_FILE,
                ));
            }
        };

        let iot_devices = load_iot_devices(project_path)?;
        let events = load_events(project_path)?;
        let providers = load_providers(project_path)?;
        let optimization = load_optimization(project_path)?;
        let inter_cloud = load_inter_cloud(project_path)?;

        let l4_provider = providers.get(&LayerSlot::L4).map(String::as_str).unwrap_or("none");
        let hierarchy = load_hierarchy(project_path, l4_provider)?;

        for (slot, name) in &providers {
            if name != "none" && !VALID_PROVIDER_NAMES.contains(&name.as_str()) {
                return Err(DeployerError::configuration(
                    format!(
                        "layer slot {:?} has unsupported provider '{name}'",
                        slot
                    ),
                    CONFIG_PROVIDERS_FILE,
                ));
            }
        }

        Ok(Self {
            digital_twin_name,
            mode,
            hot_storage_days,
            cold_storage_days,
            archive_storage_days,
            iot_devices,
            events,
            hierarchy,
            providers,
            optimization,
            inter_cloud,
        })
    }

    pub fn provider_for(&self, slot: LayerSlot) -> Option<&str> {
        self.providers.get(&slot).map(String::as_str).filter(|p| *p != "none")
    }

    pub fn save_inter_cloud(&self, project_path: &Path) -> Result<()> {
        let path = project_path.join(CONFIG_INTER_CLOUD_FILE);
        let payload = serde_json::to_string_pretty(&self.inter_cloud)?;
        fs::write(path, payload)?;
        Ok(())
    }
}

fn load_required_json(project_path: &Path, file_name: &str) -> Result<Value> {
    let path = project_path.join(file_name);
    let raw = fs::read_to_string(&path).map_err(|_| {
        DeployerError::configuration(format!("missing required file {file_name}"), file_name)
    })?;
    serde_json::from_str(&raw)
        .map_err(|err| DeployerError::configuration(format!("invalid JSON: {err}"), file_name))
}

fn load_optional_json(project_path: &Path, file_name: &str) -> Result<Option<Value>> {
    let path = project_path.join(file_name);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path)?;
    let value = serde_json::from_str(&raw)
        .map_err(|err| DeployerError::configuration(format!("invalid JSON: {err}"), file_name))?;
    Ok(Some(value))
}

fn require_string(value: &Value, key: &str, file_name: &str) -> Result<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            DeployerError::configuration(format!("missing required field '{key}'"), file_name)
        })
}

fn require_u32(value: &Value, key: &str, file_name: &str) -> Result<u32> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .ok_or_else(|| {
            DeployerError::configuration(format!("missing required field '{key}'"), file_name)
        })
}

fn validate_twin_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name.len() <= TWIN_NAME_MAX_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && name.chars().next().is_some_and(|c| c.is_ascii_lowercase());
    if ok {
        Ok(())
    } else {
        Err(DeployerError::configuration(
            format!(
                "digital_twin_name '{name}' must be lowercase alphanumeric/hyphen, start with a letter, and be at most {TWIN_NAME_MAX_LEN} characters"
            ),
            CONFIG_FILE,
        ))
    }
}

fn load_iot_devices(project_path: &Path) -> Result<Vec<IotDevice>> {
    let Some(value) = load_optional_json(project_path, CONFIG_IOT_DEVICES_FILE)? else {
        return Ok(Vec::new());
    };
    let list = match value {
        Value::Array(items) => items,
        Value::Object(ref map) => map
            .get("devices")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    list.into_iter()
        .map(|item| serde_json::from_value(item).map_err(DeployerError::from))
        .collect()
}

fn load_events(project_path: &Path) -> Result<Vec<EventRule>> {
    let Some(value) = load_optional_json(project_path, CONFIG_EVENTS_FILE)? else {
        return Ok(Vec::new());
    };
    let list = match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    list.into_iter()
        .map(|item| serde_json::from_value(item).map_err(DeployerError::from))
        .collect()
}

fn load_providers(project_path: &Path) -> Result<BTreeMap<LayerSlot, String>> {
    let value = load_required_json(project_path, CONFIG_PROVIDERS_FILE)?;
    let object = value.as_object().ok_or_else(|| {
        DeployerError::configuration("must be a JSON object", CONFIG_PROVIDERS_FILE)
    })?;

    let slots = [
        LayerSlot::L1,
        LayerSlot::L2,
        LayerSlot::L3Hot,
        LayerSlot::L3Cold,
        LayerSlot::L3Archive,
        LayerSlot::L4,
        LayerSlot::L5,
    ];
    let mut providers = BTreeMap::new();
    for slot in slots {
        let name = object
            .get(slot.as_key())
            .and_then(Value::as_str)
            .unwrap_or("none")
            .to_string();
        providers.insert(slot, name);
    }
    Ok(providers)
}

fn load_optimization(project_path: &Path) -> Result<OptimizationFlags> {
    match load_optional_json(project_path, CONFIG_OPTIMIZATION_FILE)? {
        Some(value) => serde_json::from_value(value).map_err(DeployerError::from),
        None => {
            tracing::warn!(
                "{} not found; defaulting every optimization flag to false",
                CONFIG_OPTIMIZATION_FILE
            );
            Ok(OptimizationFlags::default())
        }
    }
}

fn load_inter_cloud(project_path: &Path) -> Result<InterCloudConnections> {
    match load_optional_json(project_path, CONFIG_INTER_CLOUD_FILE)? {
        Some(value) => serde_json::from_value(value).map_err(DeployerError::from),
        None => Ok(InterCloudConnections::default()),
    }
}

fn load_hierarchy(project_path: &Path, l4_provider: &str) -> Result<Hierarchy> {
    let dir = project_path.join(TWIN_HIERARCHY_DIR);
    match l4_provider {
        "google" | "none" => Ok(Hierarchy::None),
        "aws" => {
            let path = dir.join(AWS_HIERARCHY_FILE);
            if !path.exists() {
                return Ok(Hierarchy::Tree(Vec::new()));
            }
            let raw = fs::read_to_string(&path)?;
            let items: Vec<Value> = serde_json::from_str(&raw)?;
            Ok(Hierarchy::Tree(items))
        }
        "azure" => {
            let path = dir.join(AZURE_HIERARCHY_FILE);
            if !path.exists() {
                return Ok(Hierarchy::Dtdl(AzureHierarchy::default()));
            }
            let raw = fs::read_to_string(&path)?;
            let parsed: AzureHierarchy = serde_json::from_str(&raw)?;
            Ok(Hierarchy::Dtdl(parsed))
        }
        other => Err(DeployerError::configuration(
            format!("unsupported provider '{other}' for L4 hierarchy"),
            CONFIG_PROVIDERS_FILE,
        )),
    }
}

/// Loads `config_credentials.json` if present; an absent file is not an
/// error since env/role fallback is acceptable.
pub fn load_credentials(project_path: &Path) -> Result<BTreeMap<String, Value>> {
    match load_optional_json(project_path, CONFIG_CREDENTIALS_FILE)? {
        Some(Value::Object(map)) => Ok(map.into_iter().collect()),
        Some(_) => Err(DeployerError::configuration(
            "must be a JSON object keyed by provider name",
            CONFIG_CREDENTIALS_FILE,
        )),
        None => Ok(BTreeMap::new()),
    }
}

/// Project directory layout helper, resolved relative to a registry
/// file such as `~/.twin2mc/projects.json` (see `cli.rs`).
pub fn project_path_for(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn missing_config_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TwinConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, DeployerError::Configuration { .. }));
    }

    #[test]
    fn loads_minimal_valid_twin() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            CONFIG_FILE,
            r#"{"digital_twin_name":"demo-twin","hot_storage_size_in_days":30,"cold_storage_size_in_days":90,"archive_storage_size_in_days":365,"mode":"DEBUG"}"#,
        );
        write(
            dir.path(),
            CONFIG_PROVIDERS_FILE,
            r#"{"layer_1_provider":"aws","layer_2_provider":"aws","layer_3_hot_provider":"aws","layer_3_cold_provider":"aws","layer_3_archive_provider":"aws","layer_4_provider":"aws","layer_5_provider":"aws"}"#,
        );

        let config = TwinConfig::load(dir.path()).unwrap();
        assert_eq!(config.digital_twin_name, "demo-twin");
        assert_eq!(config.provider_for(LayerSlot::L1), Some("aws"));
        assert!(matches!(config.hierarchy, Hierarchy::Tree(_)));
    }

    #[test]
    fn rejects_invalid_twin_name() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            CONFIG_FILE,
            r#"{"digital_twin_name":"Bad_Name!","hot_storage_size_in_days":1,"cold_storage_size_in_days":1,"archive_storage_size_in_days":1,"mode":"DEBUG"}"#,
        );
        write(dir.path(), CONFIG_PROVIDERS_FILE, r#"{}"#);
        let err = TwinConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, DeployerError::Configuration { .. }));
    }

    #[test]
    fn missing_optimization_file_defaults_to_all_false() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            CONFIG_FILE,
            r#"{"digital_twin_name":"demo","hot_storage_size_in_days":1,"cold_storage_size_in_days":1,"archive_storage_size_in_days":1,"mode":"DEBUG"}"#,
        );
        write(dir.path(), CONFIG_PROVIDERS_FILE, r#"{"layer_1_provider":"aws"}"#);
        let config = TwinConfig::load(dir.path()).unwrap();
        assert!(!config.optimization.use_event_checking);
    }

    #[test]
    fn gcp_l4_has_no_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            CONFIG_FILE,
            r#"{"digital_twin_name":"demo","hot_storage_size_in_days":1,"cold_storage_size_in_days":1,"archive_storage_size_in_days":1,"mode":"DEBUG"}"#,
        );
        write(dir.path(), CONFIG_PROVIDERS_FILE, r#"{"layer_4_provider":"google"}"#);
        let config = TwinConfig::load(dir.path()).unwrap();
        assert!(matches!(config.hierarchy, Hierarchy::None));
    }
}
