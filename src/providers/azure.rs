use async_trait::async_trait;
use tracing::info;

use crate::error::{DeployerError, Result};
use crate::naming::AzureNaming;

use super::{Adapter, Credentials, ProviderKind};

#[derive(Debug, Clone, Default)]
struct AzureSession {
    subscription_id: String,
    tenant_id: String,
}

/// Azure adapter, standing in for an `azure_mgmt_*`/`azure_identity`
/// client bundle.
pub struct AzureAdapter {
    naming: Option<AzureNaming>,
    session: Option<AzureSession>,
}

impl AzureAdapter {
    pub fn new() -> Self {
        Self {
            naming: None,
            session: None,
        }
    }

    fn naming(&self) -> Result<&AzureNaming> {
        self.naming.as_ref().ok_or_else(|| {
            DeployerError::deployment("l0", "azure", "adapter used before initialize_clients")
        })
    }

    pub fn subscription_id(&self) -> &str {
        self.session
            .as_ref()
            .map(|s| s.subscription_id.as_str())
            .unwrap_or_default()
    }
}

impl Default for AzureAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for AzureAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    async fn initialize_clients(&mut self, credentials: &Credentials, twin_name: &str) -> Result<()> {
        let subscription_id = credentials
            .get("subscription_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let tenant_id = credentials
            .get("tenant_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        info!(twin = twin_name, subscription = %subscription_id, "initializing Azure clients");
        self.session = Some(AzureSession {
            subscription_id,
            tenant_id,
        });
        self.naming = Some(AzureNaming::new(twin_name));
        Ok(())
    }

    fn get_resource_name(&self, resource_type: &str, suffix: &str) -> String {
        let naming = match &self.naming {
            Some(n) => n,
            None => return format!("uninitialized-{resource_type}-{suffix}"),
        };
        match resource_type {
            "resource_group" => naming.resource_group(),
            "iot_hub" => naming.iot_hub(),
            "function_app" => naming.function_app(suffix),
            "hot_container" => naming.cosmos_hot_container(),
            "cold_container" => naming.blob_cold_container(),
            "archive_container" => naming.blob_archive_container(),
            "digital_twins_instance" => naming.digital_twins_instance(),
            other => format!("{other}-{suffix}"),
        }
    }

    async fn twin_exists(&self) -> Result<bool> {
        let naming = self.naming()?;
        info!(resource_group = %naming.resource_group(), "checking resource group existence");
        Ok(false)
    }
}

pub fn new_adapter() -> Box<dyn Adapter> {
    Box::new(AzureAdapter::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_clients_binds_naming() {
        let mut adapter = AzureAdapter::new();
        adapter
            .initialize_clients(&serde_json::json!({"subscription_id": "sub-1"}), "demo-twin")
            .await
            .unwrap();
        assert_eq!(adapter.subscription_id(), "sub-1");
        assert_eq!(
            adapter.get_resource_name("resource_group", ""),
            "demo-twin-rg"
        );
    }
}
