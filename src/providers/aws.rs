use async_trait::async_trait;
use tracing::info;

use crate::error::{DeployerError, Result};
use crate::naming::AwsNaming;

use super::{Adapter, Credentials, ProviderKind};

/// AWS account/session details pulled out of the credentials payload
/// during `initialize_clients`.
#[derive(Debug, Clone, Default)]
struct AwsSession {
    region: String,
    access_key_id: String,
}

/// AWS adapter. No AWS SDK crate is vendored here; `AwsSession` stands
/// in for the client bundle a real build would hold
/// (`aws_sdk_dynamodb::Client`, `aws_sdk_iot::Client`, etc.), matching
/// the shape the layer strategies and post-deploy operations depend on.
pub struct AwsAdapter {
    naming: Option<AwsNaming>,
    session: Option<AwsSession>,
}

impl AwsAdapter {
    pub fn new() -> Self {
        Self {
            naming: None,
            session: None,
        }
    }

    fn naming(&self) -> Result<&AwsNaming> {
        self.naming.as_ref().ok_or_else(|| {
            DeployerError::deployment("l0", "aws", "adapter used before initialize_clients")
        })
    }

    pub fn region(&self) -> &str {
        self.session
            .as_ref()
            .map(|s| s.region.as_str())
            .unwrap_or("us-east-1")
    }
}

impl Default for AwsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for AwsAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    async fn initialize_clients(&mut self, credentials: &Credentials, twin_name: &str) -> Result<()> {
        let region = credentials
            .get("region")
            .and_then(|v| v.as_str())
            .unwrap_or("us-east-1")
            .to_string();
        let access_key_id = credentials
            .get("access_key_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        info!(twin = twin_name, region = %region, "initializing AWS clients");
        self.session = Some(AwsSession {
            region,
            access_key_id,
        });
        self.naming = Some(AwsNaming::new(twin_name));
        Ok(())
    }

    fn get_resource_name(&self, resource_type: &str, suffix: &str) -> String {
        let naming = match &self.naming {
            Some(n) => n,
            None => return format!("uninitialized-{resource_type}-{suffix}"),
        };
        match resource_type {
            "dispatcher_iam_role" => naming.dispatcher_iam_role(),
            "dispatcher_iot_rule" => naming.dispatcher_iot_rule(),
            "connector_lambda" => naming.connector_lambda_function(suffix),
            "ingestion_lambda" => naming.ingestion_lambda_function(),
            "ingestion_iam_role" => naming.ingestion_iam_role(),
            "persister_iam_role" => naming.persister_iam_role(),
            "persister_lambda" => naming.persister_lambda_function(),
            "event_checker_iam_role" => naming.event_checker_iam_role(),
            "event_checker_lambda" => naming.event_checker_lambda_function(),
            "lambda_chain_iam_role" => naming.lambda_chain_iam_role(),
            "lambda_chain_step_function" => naming.lambda_chain_step_function(),
            "event_feedback_iam_role" => naming.event_feedback_iam_role(),
            "event_feedback_lambda" => naming.event_feedback_lambda_function(),
            "hot_table" => naming.hot_dynamodb_table(),
            "hot_cold_mover_iam_role" => naming.hot_cold_mover_iam_role(),
            "hot_cold_mover_lambda" => naming.hot_cold_mover_lambda_function(),
            "hot_cold_mover_event_rule" => naming.hot_cold_mover_event_rule(),
            "cold_bucket" => naming.cold_s3_bucket(),
            "archive_bucket" => naming.archive_s3_bucket(),
            "twinmaker_workspace" => naming.twinmaker_workspace(),
            "grafana_workspace" => naming.grafana_workspace(),
            other => format!("{other}-{suffix}"),
        }
    }

    async fn twin_exists(&self) -> Result<bool> {
        let naming = self.naming()?;
        info!(workspace = %naming.twinmaker_workspace(), "checking TwinMaker workspace existence");
        Ok(false)
    }
}

pub fn new_adapter() -> Box<dyn Adapter> {
    Box::new(AwsAdapter::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_clients_binds_naming() {
        let mut adapter = AwsAdapter::new();
        adapter
            .initialize_clients(&serde_json::json!({"region": "eu-west-1"}), "demo-twin")
            .await
            .unwrap();
        assert_eq!(adapter.region(), "eu-west-1");
        assert_eq!(
            adapter.get_resource_name("ingestion_lambda", ""),
            "demo-twin-ingestion"
        );
    }

    #[tokio::test]
    async fn uninitialized_adapter_reports_deployment_error() {
        let adapter = AwsAdapter::new();
        let err = adapter.twin_exists().await.unwrap_err();
        assert!(matches!(err, DeployerError::Deployment { .. }));
    }
}
