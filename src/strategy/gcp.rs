use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::context::{ActiveLayer, DeploymentContext};
use crate::error::Result;
use crate::providers::ProviderKind;

use super::{destroy_layer, mark_ready, provision_layer, LayerInfo, LayerState, LayerStrategy};

const PROVIDER: &str = "gcp";

/// GCP layer ordering: Pub/Sub (L1) -> Cloud Functions processors (L2)
/// -> Firestore hot collection (L3 hot) -> GCS cold/archive buckets
/// (L3 cold/archive). GCP has no managed digital-twin or dashboard
/// service, so L4 and L5 are explicit future work, never a silent zero.
pub struct GcpStrategy;

impl GcpStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GcpStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LayerStrategy for GcpStrategy {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Gcp
    }

    async fn deploy_setup(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::Setup);
        info!(twin = %ctx.config.digital_twin_name, "GCP setup: verifying project access");
        Ok(())
    }

    async fn destroy_setup(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }

    async fn deploy_l1(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L1);
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L1)?;
            info!(topic = adapter.get_resource_name("pubsub_topic", "ingest"), "creating Pub/Sub ingestion topic");
        }
        provision_layer(ctx, PROVIDER, "l1").await?;
        mark_ready(ctx, PROVIDER, "l1")
    }

    async fn destroy_l1(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L1)?;
            info!(topic = adapter.get_resource_name("pubsub_topic", "ingest"), "removing Pub/Sub topic");
        }
        destroy_layer(ctx, PROVIDER, "l1").await
    }

    async fn info_l1(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L1)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "pubsub_topic".to_string(),
            json!(adapter.get_resource_name("pubsub_topic", "ingest")),
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
                function = adapter.get_resource_name("cloud_function", "persister"),
                "creating persister Cloud Function"
            );
        }
        provision_layer(ctx, PROVIDER, "l2").await?;
        mark_ready(ctx, PROVIDER, "l2")
    }

    async fn destroy_l2(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L2)?;
            info!(
                function = adapter.get_resource_name("cloud_function", "persister"),
                "removing L2 Cloud Functions"
            );
        }
        destroy_layer(ctx, PROVIDER, "l2").await
    }

    async fn info_l2(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L2)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "persister_function".to_string(),
            json!(adapter.get_resource_name("cloud_function", "persister")),
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
                collection = adapter.get_resource_name("hot_collection", ""),
                ttl_days = ctx.config.hot_storage_days,
                "creating Firestore hot collection with TTL policy"
            );
        }
        provision_layer(ctx, PROVIDER, "l3_hot").await?;
        mark_ready(ctx, PROVIDER, "l3_hot")
    }

    async fn destroy_l3_hot(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Hot)?;
            info!(collection = adapter.get_resource_name("hot_collection", ""), "removing hot collection");
        }
        destroy_layer(ctx, PROVIDER, "l3_hot").await
    }

    async fn info_l3_hot(&self, ctx: &DeploymentContext) -> Result<LayerInfo> {
        let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Hot)?;
        let mut resources = BTreeMap::new();
        resources.insert(
            "hot_collection".to_string(),
            json!(adapter.get_resource_name("hot_collection", "")),
        );
        Ok(LayerInfo {
            state: Some(ctx.layer_state(PROVIDER, "l3_hot")),
            resources,
        })
    }

    async fn deploy_l3_cold(&self, ctx: &mut DeploymentContext) -> Result<()> {
        ctx.set_active_layer(ActiveLayer::L3Cold);
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Cold)?;
            info!(bucket = adapter.get_resource_name("cold_bucket", ""), "creating cold GCS bucket and mover");
        }
        provision_layer(ctx, PROVIDER, "l3_cold").await?;
        mark_ready(ctx, PROVIDER, "l3_cold")
    }

    async fn destroy_l3_cold(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Cold)?;
            info!(bucket = adapter.get_resource_name("cold_bucket", ""), "removing cold bucket");
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
            info!(bucket = adapter.get_resource_name("archive_bucket", ""), "creating archive GCS bucket and mover");
        }
        provision_layer(ctx, PROVIDER, "l3_archive").await?;
        mark_ready(ctx, PROVIDER, "l3_archive")
    }

    async fn destroy_l3_archive(&self, ctx: &mut DeploymentContext) -> Result<()> {
        {
            let adapter = ctx.get_provider_for_layer(crate::config::LayerSlot::L3Archive)?;
            info!(bucket = adapter.get_resource_name("archive_bucket", ""), "removing archive bucket");
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

    async fn deploy_l4(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        warn!("GCP has no managed digital-twin service; L4 deploy is a no-op (future work)");
        Ok(())
    }

    async fn destroy_l4(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }

    async fn info_l4(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo {
            state: Some(LayerState::NotDeployed),
            resources: BTreeMap::from([("note".to_string(), json!("GCP L4 is future work"))]),
        })
    }

    async fn deploy_l5(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        warn!("GCP has no managed dashboard service; L5 deploy is a no-op (future work)");
        Ok(())
    }

    async fn destroy_l5(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }

    async fn info_l5(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo {
            state: Some(LayerState::NotDeployed),
            resources: BTreeMap::from([("note".to_string(), json!("GCP L5 is future work"))]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_reports_gcp_kind() {
        assert_eq!(GcpStrategy::new().provider_kind(), ProviderKind::Gcp);
    }
}
