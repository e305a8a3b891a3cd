//! `deploy_all`/`destroy_all` drive every layer in strict order and stop
//! (deploy) or keep going (destroy) around a failing layer, exercised
//! here against the public `LayerStrategy` trait rather than a
//! provider-specific implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;

use twin2multicloud::config::{Hierarchy, InterCloudConnections, Mode, OptimizationFlags, TwinConfig};
use twin2multicloud::context::DeploymentContext;
use twin2multicloud::error::{DeployerError, Result};
use twin2multicloud::providers::ProviderKind;
use twin2multicloud::strategy::{LayerInfo, LayerStrategy};

/// Fails only `deploy_l3_cold`, so `deploy_all` has one deterministic
/// stopping point partway through the sequence.
struct FlakyStrategy;

#[async_trait]
impl LayerStrategy for FlakyStrategy {
    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }
    async fn deploy_setup(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn destroy_setup(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn deploy_l1(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn destroy_l1(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn info_l1(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo::not_deployed())
    }
    async fn deploy_l2(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn destroy_l2(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn info_l2(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo::not_deployed())
    }
    async fn deploy_l3_hot(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn destroy_l3_hot(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn info_l3_hot(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo::not_deployed())
    }
    async fn deploy_l3_cold(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Err(DeployerError::deployment("l3_cold", "azure", "forced failure for ordering test"))
    }
    async fn destroy_l3_cold(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Err(DeployerError::deployment("l3_cold", "azure", "forced failure for ordering test"))
    }
    async fn info_l3_cold(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo::not_deployed())
    }
    async fn deploy_l3_archive(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn destroy_l3_archive(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn info_l3_archive(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo::not_deployed())
    }
    async fn deploy_l4(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn destroy_l4(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn info_l4(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo::not_deployed())
    }
    async fn deploy_l5(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn destroy_l5(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn info_l5(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo::not_deployed())
    }
}

fn context_in(dir: &std::path::Path) -> DeploymentContext {
    let config = TwinConfig {
        digital_twin_name: "ordering-twin".to_string(),
        mode: Mode::Debug,
        hot_storage_days: 7,
        cold_storage_days: 30,
        archive_storage_days: 365,
        iot_devices: Vec::new(),
        events: Vec::new(),
        hierarchy: Hierarchy::None,
        providers: BTreeMap::new(),
        optimization: OptimizationFlags::default(),
        inter_cloud: InterCloudConnections::default(),
    };
    DeploymentContext::new("ordering-twin", dir.to_path_buf(), config, BTreeMap::new(), BTreeMap::new())
}

#[tokio::test]
async fn deploy_all_stops_before_the_failing_layer() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_in(dir.path());

    let outcome = FlakyStrategy.deploy_all(&mut ctx).await;

    assert_eq!(outcome.completed_layers, vec!["setup", "l0", "l1", "l2", "l3_hot"]);
    assert_eq!(outcome.failed_layer, Some("l3_cold"));
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn destroy_all_keeps_going_past_a_failing_layer() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_in(dir.path());

    let outcome = FlakyStrategy.destroy_all(&mut ctx).await;

    // l3_cold fails but every other layer, including ones ordered after
    // it in the teardown sequence, still gets a destroy attempt.
    assert_eq!(outcome.failed_layer, Some("l3_cold"));
    assert_eq!(
        outcome.completed_layers,
        vec!["l5", "l4", "l3_archive", "l3_hot", "l2", "l1", "l0", "setup"]
    );
    assert!(!outcome.is_success());
}
