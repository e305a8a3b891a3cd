use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::context::{ActiveLayer, DeploymentContext};
use crate::error::{DeployerError, Result};
use crate::postdeploy::{DeviceRegistration, EntityUpload, GrafanaDatasource};
use crate::providers::ProviderKind;

use super::{destroy_layer, mark_ready, provision_layer, run_post_deploy, LayerInfo, LayerState, LayerStrategy};

const PROVIDER: &str = "aws";

/// AWS layer ordering: IoT Core dispatcher (L1) -> processor/persister
/// Lambdas (L2) -> DynamoDB hot table + reader Lambdas (L3 hot) ->
/// S3 cold/archive movers (L3 cold/archive) -> TwinMaker workspace (L4)
/// -> Managed Grafana (L5).
pub struct AwsStrategy;

impl AwsStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AwsStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LayerStrategy for AwsStrategy {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    async fn deploy_setup(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::Setup);
        info!(twin = %ctx.config.digital_twin_name, "AWS setup: verifying account access, no resource group needed");
        Ok(())
    }

    async fn destroy_setup(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }

    async fn deploy_l1(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L1);
        let device_ids: Vec<String> = {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L1)?;
            let role = adapter.get_resource_name("dispatcher_iam_role", "");
            let rule = adapter.get_resource_name("dispatcher_iot_rule", "");
            info!(role, rule, "creating IoT Core dispatcher IAM role then topic rule");
            ctx.config
                .iot_devices
                .iter()
                .map(|device| {
                    let function = adapter.get_resource_name("connector_lambda", &device.id);
                    info!(function, device = %device.id, "provisioning per-device connector function");
                    device.id.clone()
                })
                .collect()
        };
        provision_layer(ctx, PROVIDER, "l1").await?;
        for device_id in device_ids {
            run_post_deploy(ctx, PROVIDER, "l1", &DeviceRegistration { device_id }).await?;
        }
        Ok(())
    }

    async fn destroy_l1(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L1)?;
            info!(role = adapter.get_resource_name("dispatcher_iam_role", ""), "removing dispatcher and connector functions");
        }
        destroy_layer(ctx, PROVIDER, "l1").await
    }

    async fn info_l1(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L1)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "dispatcher_iam_role".to_string(),
            json!(adapter.get_resource_name("dispatcher_iam_role", "")),
        );
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l1")),
            resources,
        })
    }

    async fn deploy_l2(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L2);
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L2)?;
            info!(
                persister = adapter.get_resource_name("persister_lambda", ""),
                "creating persister function"
            );
            if ctx.config.optimization.use_event_checking {
                info!(
                    checker = adapter.get_resource_name("event_checker_lambda", ""),
                    "optimization flag use_event_checking set: creating event-checker function"
                );
            }
            if ctx.config.optimization.trigger_notification_workflow {
                info!(
                    chain = adapter.get_resource_name("lambda_chain_step_function", ""),
                    "optimization flag trigger_notification_workflow set: creating notification workflow"
                );
            }
            if ctx.config.optimization.return_feedback_to_device {
                info!(
                    feedback = adapter.get_resource_name("event_feedback_lambda", ""),
                    "optimization flag return_feedback_to_device set: creating feedback function"
                );
            }
        }
        provision_layer(ctx, PROVIDER, "l2").await?;
        mark_ready(ctx, PROVIDER, "l2")
    }

    async fn destroy_l2(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L2)?;
            info!(persister = adapter.get_resource_name("persister_lambda", ""), "removing L2 functions");
        }
        destroy_layer(ctx, PROVIDER, "l2").await
    }

    async fn info_l2(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L2)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "persister_lambda".to_string(),
            json!(adapter.get_resource_name("persister_lambda", "")),
        );
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l2")),
            resources,
        })
    }

    async fn deploy_l3_hot(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L3Hot);
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Hot)?;
            info!(
                table = adapter.get_resource_name("hot_table", ""),
                ttl_days = ctx.config.hot_storage_days,
                "creating DynamoDB hot table and range/last-entry reader functions"
            );
        }
        provision_layer(ctx, PROVIDER, "l3_hot").await?;
        mark_ready(ctx, PROVIDER, "l3_hot")
    }

    async fn destroy_l3_hot(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Hot)?;
            info!(table = adapter.get_resource_name("hot_table", ""), "removing hot table and reader functions");
        }
        destroy_layer(ctx, PROVIDER, "l3_hot").await
    }

    async fn info_l3_hot(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Hot)?;
        let mut resources = BTreeMap::new();
        resources.insert("hot_table".to_string(), json!(adapter.get_resource_name("hot_table", "")));
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l3_hot")),
            resources,
        })
    }

    async fn deploy_l3_cold(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L3Cold);
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Cold)?;
            info!(
                bucket = adapter.get_resource_name("cold_bucket", ""),
                mover = adapter.get_resource_name("hot_cold_mover_lambda", ""),
                "creating cold S3 bucket and daily hot->cold mover"
            );
        }
        provision_layer(ctx, PROVIDER, "l3_cold").await?;
        mark_ready(ctx, PROVIDER, "l3_cold")
    }

    async fn destroy_l3_cold(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Cold)?;
            info!(bucket = adapter.get_resource_name("cold_bucket", ""), "removing cold bucket and mover");
        }
        destroy_layer(ctx, PROVIDER, "l3_cold").await
    }

    async fn info_l3_cold(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Cold)?;
        let mut resources = BTreeMap::new();
        resources.insert("cold_bucket".to_string(), json!(adapter.get_resource_name("cold_bucket", "")));
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l3_cold")),
            resources,
        })
    }

    async fn deploy_l3_archive(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L3Archive);
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Archive)?;
            info!(
                bucket = adapter.get_resource_name("archive_bucket", ""),
                "creating archive S3 bucket and weekly cold->archive mover"
            );
        }
        provision_layer(ctx, PROVIDER, "l3_archive").await?;
        mark_ready(ctx, PROVIDER, "l3_archive")
    }

    async fn destroy_l3_archive(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Archive)?;
            info!(bucket = adapter.get_resource_name("archive_bucket", ""), "removing archive bucket and mover");
        }
        destroy_layer(ctx, PROVIDER, "l3_archive").await
    }

    async fn info_l3_archive(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Archive)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "archive_bucket".to_string(),
            json!(adapter.get_resource_name("archive_bucket", "")),
        );
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l3_archive")),
            resources,
        })
    }

    async fn deploy_l4(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L4);
        let entity_ids: Vec<String> = {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L4)?;
            let workspace = adapter.get_resource_name("twinmaker_workspace", "");
            info!(workspace, "creating TwinMaker workspace, component types, and entities from hierarchy");
            match &ctx.config.hierarchy {
                crate::config::Hierarchy::Tree(entities) => entities
                    .iter()
                    .enumerate()
                    .map(|(i, entity)| {
                        entity
                            .get("entityId")
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("entity-{i}"))
                    })
                    .collect(),
                other => {
                    return Err(DeployerError::deployment(
                        "L4",
                        "aws",
                        format!("expected a tree hierarchy for AWS L4, got {other:?}"),
                    ));
                }
            }
        };
        provision_layer(ctx, PROVIDER, "l4").await?;
        ctx.set_layer_state(PROVIDER, "l4", LayerState::PostDeploying)?;
        for entity_id in entity_ids {
            crate::postdeploy::ensure(&ctx.retry_policy().clone(), &EntityUpload { entity_id }).await?;
        }
        mark_ready(ctx, PROVIDER, "l4")
    }

    async fn destroy_l4(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L4)?;
            info!(workspace = adapter.get_resource_name("twinmaker_workspace", ""), "deleting entities then workspace");
        }
        destroy_layer(ctx, PROVIDER, "l4").await
    }

    async fn info_l4(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L4)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "twinmaker_workspace".to_string(),
            json!(adapter.get_resource_name("twinmaker_workspace", "")),
        );
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l4")),
            resources,
        })
    }

    async fn deploy_l5(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L5);
        let dashboard = {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L5)?;
            let dashboard = adapter.get_resource_name("grafana_workspace", "");
            info!(dashboard, "creating Grafana workspace; IAM role scoped to CloudWatch+TwinMaker read access");
            dashboard
        };
        provision_layer(ctx, PROVIDER, "l5").await?;
        let reader_url = {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Hot)?;
            format!("https://{}/read", adapter.get_resource_name("hot_table", ""))
        };
        let l3_hot_provider = ctx.config.provider_for(crate::config::LayerSlot::L3Hot).unwrap_or("none");
        let inter_cloud_token = if l3_hot_provider != PROVIDER {
            ctx.get_inter_cloud_connection("L3_hot", "L5")
                .ok()
                .and_then(|conn| conn.inter_cloud_token.clone())
        } else {
            None
        };
        run_post_deploy(
            ctx,
            PROVIDER,
            "l5",
            &GrafanaDatasource {
                dashboard,
                reader_url,
                inter_cloud_token,
            },
        )
        .await
    }

    async fn destroy_l5(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L5)?;
            info!(dashboard = adapter.get_resource_name("grafana_workspace", ""), "removing Grafana workspace");
        }
        destroy_layer(ctx, PROVIDER, "l5").await
    }

    async fn info_l5(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L5)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "grafana_workspace".to_string(),
            json!(adapter.get_resource_name("grafana_workspace", "")),
        );
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l5")),
            resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_reports_aws_kind() {
        assert_eq!(AwsStrategy::new().provider_kind(), ProviderKind::Aws);
    }
}
