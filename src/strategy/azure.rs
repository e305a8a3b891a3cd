use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::context::{ActiveLayer, DeploymentContext};
use crate::error::{DeployerError, Result};
use crate::postdeploy::{DtdlBulkImport, GrafanaDatasource};
use crate::providers::ProviderKind;

use super::{destroy_layer, mark_ready, provision_layer, run_post_deploy, LayerInfo, LayerState, LayerStrategy};

const PROVIDER: &str = "azure";

/// Azure layer ordering: IoT Hub (L1) -> Function App processors (L2,
/// function-level trigger per device type) -> Cosmos DB hot container
/// (L3 hot) -> Blob cold/archive containers (L3 cold/archive) ->
/// Azure Digital Twins instance with DTDL models (L4) -> Azure Managed
/// Grafana (L5).
pub struct AzureStrategy;

impl AzureStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AzureStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LayerStrategy for AzureStrategy {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    async fn deploy_setup(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::Setup);
        let adapter = ctx
            .get_provider_for_layer(crate::config::LayerSlot::L1)
            .or_else(|_| ctx.get_provider_for_layer(crate::config::LayerSlot::L2))?;
        info!(resource_group = adapter.get_resource_name("resource_group", ""), "creating resource group");
        Ok(())
    }

    async fn destroy_setup(&self, ctx: &mut DeploymentContext) -> Result<()> {
        let adapter = ctx
            .get_provider_for_layer(crate::config::LayerSlot::L1)
            .or_else(|_| ctx.get_provider_for_layer(crate::config::LayerSlot::L2))?;
        info!(resource_group = adapter.get_resource_name("resource_group", ""), "deleting resource group");
        Ok(())
    }

    async fn deploy_l1(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L1);
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L1)?;
            info!(hub = adapter.get_resource_name("iot_hub", ""), "creating IoT Hub and device-to-cloud routing");
        }
        provision_layer(ctx, PROVIDER, "l1").await?;
        mark_ready(ctx, PROVIDER, "l1")
    }

    async fn destroy_l1(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L1)?;
            info!(hub = adapter.get_resource_name("iot_hub", ""), "removing IoT Hub");
        }
        destroy_layer(ctx, PROVIDER, "l1").await
    }

    async fn info_l1(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L1)?;
        let mut resources = BTreeMap::new();
        resources.insert("iot_hub".to_string(), json!(adapter.get_resource_name("iot_hub", "")));
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
                function_app = adapter.get_resource_name("function_app", "persister"),
                "creating persister function app on the shared consumption plan"
            );
            if ctx.config.optimization.use_event_checking {
                info!(
                    function_app = adapter.get_resource_name("function_app", "event-checker"),
                    "optimization flag use_event_checking set: event-checker gets a dedicated plan (ambiguous in the source; not merged with the shared plan here)"
                );
            }
        }
        provision_layer(ctx, PROVIDER, "l2").await?;
        mark_ready(ctx, PROVIDER, "l2")
    }

    async fn destroy_l2(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L2)?;
            info!(function_app = adapter.get_resource_name("function_app", "persister"), "removing L2 function apps");
        }
        destroy_layer(ctx, PROVIDER, "l2").await
    }

    async fn info_l2(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L2)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "persister_function_app".to_string(),
            json!(adapter.get_resource_name("function_app", "persister")),
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
                container = adapter.get_resource_name("hot_container", ""),
                ttl_days = ctx.config.hot_storage_days,
                "creating Cosmos DB hot container with TTL and reader functions"
            );
        }
        provision_layer(ctx, PROVIDER, "l3_hot").await?;
        mark_ready(ctx, PROVIDER, "l3_hot")
    }

    async fn destroy_l3_hot(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Hot)?;
            info!(container = adapter.get_resource_name("hot_container", ""), "removing hot container");
        }
        destroy_layer(ctx, PROVIDER, "l3_hot").await
    }

    async fn info_l3_hot(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Hot)?;
        let mut resources = BTreeMap::new();
        resources.insert("hot_container".to_string(), json!(adapter.get_resource_name("hot_container", "")));
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l3_hot")),
            resources,
        })
    }

    async fn deploy_l3_cold(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L3Cold);
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Cold)?;
            info!(container = adapter.get_resource_name("cold_container", ""), "creating cold blob container and mover");
        }
        provision_layer(ctx, PROVIDER, "l3_cold").await?;
        mark_ready(ctx, PROVIDER, "l3_cold")
    }

    async fn destroy_l3_cold(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Cold)?;
            info!(container = adapter.get_resource_name("cold_container", ""), "removing cold container");
        }
        destroy_layer(ctx, PROVIDER, "l3_cold").await
    }

    async fn info_l3_cold(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Cold)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "cold_container".to_string(),
            json!(adapter.get_resource_name("cold_container", "")),
        );
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l3_cold")),
            resources,
        })
    }

    async fn deploy_l3_archive(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L3Archive);
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Archive)?;
            info!(container = adapter.get_resource_name("archive_container", ""), "creating archive container and mover");
        }
        provision_layer(ctx, PROVIDER, "l3_archive").await?;
        mark_ready(ctx, PROVIDER, "l3_archive")
    }

    async fn destroy_l3_archive(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Archive)?;
            info!(container = adapter.get_resource_name("archive_container", ""), "removing archive container");
        }
        destroy_layer(ctx, PROVIDER, "l3_archive").await
    }

    async fn info_l3_archive(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Archive)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "archive_container".to_string(),
            json!(adapter.get_resource_name("archive_container", "")),
        );
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l3_archive")),
            resources,
        })
    }

    async fn deploy_l4(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L4);
        let (instance, ndjson) = {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L4)?;
            let instance = adapter.get_resource_name("digital_twins_instance", "");
            info!(instance, "creating Azure Digital Twins instance");
            match &ctx.config.hierarchy {
                crate::config::Hierarchy::Dtdl(bundle) => {
                    info!(
                        models = bundle.models.len(),
                        twins = bundle.twins.len(),
                        relationships = bundle.relationships.len(),
                        "converting hierarchy to NDJSON for bulk import"
                    );
                    (instance, crate::postdeploy::hierarchy_to_ndjson(bundle)?)
                }
                other => {
                    return Err(DeployerError::deployment(
                        "L4",
                        "azure",
                        format!("expected a DTDL hierarchy for Azure L4, got {other:?}"),
                    ));
                }
            }
        };
        provision_layer(ctx, PROVIDER, "l4").await?;
        run_post_deploy(ctx, PROVIDER, "l4", &DtdlBulkImport { instance, ndjson }).await
    }

    async fn destroy_l4(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L4)?;
            info!(
                instance = adapter.get_resource_name("digital_twins_instance", ""),
                "deleting relationships, twins, models, then the instance"
            );
        }
        destroy_layer(ctx, PROVIDER, "l4").await
    }

    async fn info_l4(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L4)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "digital_twins_instance".to_string(),
            json!(adapter.get_resource_name("digital_twins_instance", "")),
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
            let dashboard = adapter.get_resource_name("function_app", "grafana");
            info!(workspace = dashboard, "creating Azure Managed Grafana workspace");
            dashboard
        };
        provision_layer(ctx, PROVIDER, "l5").await?;
        let reader_url = {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Hot)?;
            format!("https://{}/read", adapter.get_resource_name("hot_container", ""))
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
            info!(workspace = adapter.get_resource_name("function_app", "grafana"), "removing Grafana workspace");
        }
        destroy_layer(ctx, PROVIDER, "l5").await
    }

    async fn info_l5(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L5)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "grafana_workspace".to_string(),
            json!(adapter.get_resource_name("function_app", "grafana")),
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
    fn strategy_reports_azure_kind() {
        assert_eq!(AzureStrategy::new().provider_kind(), ProviderKind::Azure);
    }
}
