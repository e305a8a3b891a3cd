//! Per-provider resource naming. Each provider has its own constraints
//! (IoT rule names can't contain hyphens, S3 bucket names must be
//! lowercase, Azure resource names have their own character limits) so
//! naming is a small value type per provider rather than one shared
//! function with provider branches.

/// Naming for AWS resources.
pub struct AwsNaming {
    twin_name: String,
}

impl AwsNaming {
    pub fn new(twin_name: impl Into<String>) -> Self {
        Self {
            twin_name: twin_name.into(),
        }
    }

    pub fn dispatcher_iam_role(&self) -> String {
        format!("{}-dispatcher", self.twin_name)
    }

    /// IoT topic rule names may only contain alphanumerics and underscores.
    pub fn dispatcher_iot_rule(&self) -> String {
        self.dispatcher_iam_role().replace('-', "_")
    }

    pub fn connector_lambda_function(&self, device_id: &str) -> String {
        format!("{}-connector-{}", self.twin_name, device_id)
    }

    pub fn ingestion_lambda_function(&self) -> String {
        format!("{}-ingestion", self.twin_name)
    }

    pub fn ingestion_iam_role(&self) -> String {
        format!("{}-ingestion-role", self.twin_name)
    }

    pub fn persister_iam_role(&self) -> String {
        format!("{}-persister-role", self.twin_name)
    }

    pub fn persister_lambda_function(&self) -> String {
        format!("{}-persister", self.twin_name)
    }

    pub fn event_checker_iam_role(&self) -> String {
        format!("{}-event-checker-role", self.twin_name)
    }

    pub fn event_checker_lambda_function(&self) -> String {
        format!("{}-event-checker", self.twin_name)
    }

    pub fn lambda_chain_iam_role(&self) -> String {
        format!("{}-chain-role", self.twin_name)
    }

    pub fn lambda_chain_step_function(&self) -> String {
        format!("{}-chain", self.twin_name)
    }

    pub fn event_feedback_iam_role(&self) -> String {
        format!("{}-feedback-role", self.twin_name)
    }

    pub fn event_feedback_lambda_function(&self) -> String {
        format!("{}-feedback", self.twin_name)
    }

    pub fn hot_dynamodb_table(&self) -> String {
        format!("{}-hot", self.twin_name)
    }

    pub fn hot_cold_mover_iam_role(&self) -> String {
        format!("{}-hot-cold-mover-role", self.twin_name)
    }

    pub fn hot_cold_mover_lambda_function(&self) -> String {
        format!("{}-hot-cold-mover", self.twin_name)
    }

    pub fn hot_cold_mover_event_rule(&self) -> String {
        format!("{}-hot-cold-mover-schedule", self.twin_name)
    }

    /// S3 bucket names must be lowercase.
    pub fn cold_s3_bucket(&self) -> String {
        format!("{}-cold", self.twin_name).to_lowercase()
    }

    pub fn archive_s3_bucket(&self) -> String {
        format!("{}-archive", self.twin_name).to_lowercase()
    }

    pub fn twinmaker_workspace(&self) -> String {
        format!("{}-workspace", self.twin_name)
    }

    pub fn grafana_workspace(&self) -> String {
        format!("{}-dashboard", self.twin_name)
    }
}

/// Naming for Azure resources.
pub struct AzureNaming {
    twin_name: String,
}

impl AzureNaming {
    pub fn new(twin_name: impl Into<String>) -> Self {
        Self {
            twin_name: twin_name.into(),
        }
    }

    pub fn resource_group(&self) -> String {
        format!("{}-rg", self.twin_name)
    }

    pub fn iot_hub(&self) -> String {
        format!("{}-hub", self.twin_name)
    }

    pub fn function_app(&self, suffix: &str) -> String {
        format!("{}-{}", self.twin_name, suffix)
    }

    pub fn cosmos_hot_container(&self) -> String {
        format!("{}-hot", self.twin_name)
    }

    pub fn blob_cold_container(&self) -> String {
        format!("{}-cold", self.twin_name).to_lowercase()
    }

    pub fn blob_archive_container(&self) -> String {
        format!("{}-archive", self.twin_name).to_lowercase()
    }

    pub fn digital_twins_instance(&self) -> String {
        format!("{}-adt", self.twin_name)
    }
}

/// Naming for GCP resources.
pub struct GcpNaming {
    twin_name: String,
}

impl GcpNaming {
    pub fn new(twin_name: impl Into<String>) -> Self {
        Self {
            twin_name: twin_name.into(),
        }
    }

    pub fn pubsub_topic(&self, suffix: &str) -> String {
        format!("{}-{}", self.twin_name, suffix).to_lowercase()
    }

    pub fn cloud_function(&self, suffix: &str) -> String {
        format!("{}-{}", self.twin_name, suffix).to_lowercase()
    }

    pub fn firestore_hot_collection(&self) -> String {
        format!("{}_hot", self.twin_name)
    }

    pub fn gcs_cold_bucket(&self) -> String {
        format!("{}-cold", self.twin_name).to_lowercase()
    }

    pub fn gcs_archive_bucket(&self) -> String {
        format!("{}-archive", self.twin_name).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aws_iot_rule_has_no_hyphens() {
        let n = AwsNaming::new("my-twin");
        assert_eq!(n.dispatcher_iam_role(), "my-twin-dispatcher");
        assert_eq!(n.dispatcher_iot_rule(), "my_twin_dispatcher");
        assert!(!n.dispatcher_iot_rule().contains('-'));
    }

    #[test]
    fn aws_bucket_names_are_lowercase() {
        let n = AwsNaming::new("MyTwin");
        assert_eq!(n.cold_s3_bucket(), n.cold_s3_bucket().to_lowercase());
    }

    #[test]
    fn names_are_stable_across_calls() {
        let n = AwsNaming::new("twin-a");
        assert_eq!(n.ingestion_lambda_function(), n.ingestion_lambda_function());
    }

    #[test]
    fn gcp_names_are_lowercase() {
        let n = GcpNaming::new("MyTwin");
        assert_eq!(n.pubsub_topic("ingest"), n.pubsub_topic("ingest").to_lowercase());
    }
}
