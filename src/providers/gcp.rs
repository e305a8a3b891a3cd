use async_trait::async_trait;
use tracing::info;

use crate::error::{DeployerError, Result};
use crate::naming::GcpNaming;

use super::{Adapter, Credentials, ProviderKind};

#[derive(Debug, Clone, Default)]
struct GcpSession {
    project_id: String,
}

/// GCP adapter, standing in for a `google-cloud-*` client bundle. GCP
/// has no managed digital-twin service (see `strategy::gcp`), so L4 is
/// always absent here; this adapter still exists for L1-L3 and L5.
pub struct GcpAdapter {
    naming: Option<GcpNaming>,
    session: Option<GcpSession>,
}

impl GcpAdapter {
    pub fn new() -> Self {
        Self {
            naming: None,
            session: None,
        }
    }

    fn naming(&self) -> Result<&GcpNaming> {
        self.naming.as_ref().ok_or_else(|| {
            DeployerError::deployment("l0", "gcp", "adapter used before initialize_clients")
        })
    }

    pub fn project_id(&self) -> &str {
        self.session
            .as_ref()
            .map(|s| s.project_id.as_str())
            .unwrap_or_default()
    }
}

impl Default for GcpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for GcpAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gcp
    }

    async fn initialize_clients(&mut self, credentials: &Credentials, twin_name: &str) -> Result<()> {
        let project_id = credentials
            .get("project_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        info!(twin = twin_name, project = %project_id, "initializing GCP clients");
        self.session = Some(GcpSession { project_id });
        self.naming = Some(GcpNaming::new(twin_name));
        Ok(())
    }

    fn get_resource_name(&self, resource_type: &str, suffix: &str) -> String {
        let naming = match &self.naming {
            Some(n) => n,
            None => return format!("uninitialized-{resource_type}-{suffix}"),
        };
        match resource_type {
            "pubsub_topic" => naming.pubsub_topic(suffix),
            "cloud_function" => naming.cloud_function(suffix),
            "hot_collection" => naming.firestore_hot_collection(),
            "cold_bucket" => naming.gcs_cold_bucket(),
            "archive_bucket" => naming.gcs_archive_bucket(),
            other => format!("{other}-{suffix}"),
        }
    }

    async fn twin_exists(&self) -> Result<bool> {
        let naming = self.naming()?;
        info!(project = %self.project_id(), collection = %naming.firestore_hot_collection(), "checking project resource existence");
        Ok(false)
    }
}

pub fn new_adapter() -> Box<dyn Adapter> {
    Box::new(GcpAdapter::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_clients_binds_naming() {
        let mut adapter = GcpAdapter::new();
        adapter
            .initialize_clients(&serde_json::json!({"project_id": "proj-1"}), "demo-twin")
            .await
            .unwrap();
        assert_eq!(adapter.project_id(), "proj-1");
        assert_eq!(
            adapter.get_resource_name("pubsub_topic", "ingest"),
            "demo-twin-ingest"
        );
    }
}
