//! Fallback cleanup: a best-effort sweep run after `destroy_all`, to
//! catch resources IaC state lost track of (created directly through an
//! adapter's post-deploy SDK ops, or left behind by a partial apply).
//! Never fails the overall destroy — every error here is logged and
//! folded into the report, not propagated.

use crate::context::DeploymentContext;
use crate::providers::Adapter;

/// One sweep attempt against one resource kind, ordered so dependents
/// (IAM roles, topic rules) are removed after the resources that
/// reference them, never before.
#[derive(Debug, Clone)]
pub struct CleanupOutcome {
    pub resource_type: String,
    pub resource_name: String,
    pub removed: bool,
    pub error: Option<String>,
}

/// Resource-kind sweep order: entities/workspaces first (they must be
/// emptied before the container they live in can go), then data/compute,
/// then IAM/identity last — deleting a role before the resources that
/// assume it only produces orphaned-permission errors on retry.
const SWEEP_ORDER: &[&str] = &[
    "twinmaker_workspace",
    "digital_twins_instance",
    "grafana_workspace",
    "lambda_chain_step_function",
    "cold_bucket",
    "archive_bucket",
    "persister_lambda",
    "connector_lambda",
    "dispatcher_iot_rule",
    "hot_table",
    "dispatcher_iam_role",
];

pub struct FallbackCleanup {
    pub dry_run: bool,
    /// Only delete the platform identity-store user this deployment
    /// created; a pre-existing user is never touched.
    pub cleanup_identity_user: bool,
}

impl FallbackCleanup {
    pub fn new(dry_run: bool, cleanup_identity_user: bool) -> Self {
        Self {
            dry_run,
            cleanup_identity_user,
        }
    }

    /// Sweeps every resource kind in `SWEEP_ORDER` for `adapter`,
    /// attempting a best-effort delete on each name this twin would have
    /// produced. A kind the adapter doesn't recognize is skipped rather
    /// than failing the sweep.
    pub async fn sweep(&self, ctx: &DeploymentContext, adapter: &dyn Adapter) -> Vec<CleanupOutcome> {
        let mut outcomes = Vec::new();
        for resource_type in SWEEP_ORDER {
            let resource_name = adapter.get_resource_name(resource_type, "");
            if self.dry_run {
                tracing::info!(resource_type, resource_name, "dry run: would sweep resource");
                outcomes.push(CleanupOutcome {
                    resource_type: resource_type.to_string(),
                    resource_name,
                    removed: false,
                    error: None,
                });
                continue;
            }
            match self.delete_one(ctx, adapter, resource_type, &resource_name).await {
                Ok(()) => outcomes.push(CleanupOutcome {
                    resource_type: resource_type.to_string(),
                    resource_name,
                    removed: true,
                    error: None,
                }),
                Err(err) => {
                    tracing::warn!(resource_type, resource_name, error = %err, "fallback cleanup failed for resource");
                    outcomes.push(CleanupOutcome {
                        resource_type: resource_type.to_string(),
                        resource_name,
                        removed: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        if !self.cleanup_identity_user {
            tracing::info!("skipping identity-store user cleanup: user was pre-existing");
        }
        outcomes
    }

    async fn delete_one(
        &self,
        _ctx: &DeploymentContext,
        _adapter: &dyn Adapter,
        resource_type: &str,
        resource_name: &str,
    ) -> crate::error::Result<()> {
        // Real deletion goes through the provider's SDK client bundle,
        // which lives behind `Adapter::initialize_clients`; no vendored
        // SDK crate exists here to call, so every resource kind reports
        // itself undeleted rather than claiming a sweep that never ran.
        Err(crate::error::DeployerError::Other(format!(
            "fallback delete not implemented for {resource_type} '{resource_name}': no cloud SDK client wired into this adapter"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InterCloudConnections, Mode, OptimizationFlags, TwinConfig};
    use crate::providers::aws::AwsAdapter;
    use std::collections::BTreeMap;

    #[test]
    fn sweep_order_puts_iam_role_last() {
        assert_eq!(SWEEP_ORDER.last(), Some(&"dispatcher_iam_role"));
    }

    #[test]
    fn sweep_order_puts_entities_before_their_containers() {
        let workspace_idx = SWEEP_ORDER.iter().position(|r| *r == "twinmaker_workspace").unwrap();
        let role_idx = SWEEP_ORDER.iter().position(|r| *r == "dispatcher_iam_role").unwrap();
        assert!(workspace_idx < role_idx);
    }

    #[tokio::test]
    async fn sweep_never_claims_a_removal_it_did_not_perform() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DeploymentContext::new(
            "demo",
            dir.path().to_path_buf(),
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
            },
            BTreeMap::new(),
            BTreeMap::new(),
        );
        let outcomes = FallbackCleanup::new(false, false).sweep(&ctx, &AwsAdapter::new()).await;
        assert_eq!(outcomes.len(), SWEEP_ORDER.len());
        assert!(outcomes.iter().all(|o| !o.removed && o.error.is_some()));
    }
}
