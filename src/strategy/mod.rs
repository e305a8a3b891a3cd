//! Per-provider ordered layer strategy. Each provider adapter has a
//! matching strategy implementing the same sequence of operations, so
//! the orchestrator can drive a mixed multi-cloud deployment by
//! dispatching each layer to whichever provider currently owns it.

use std::collections::BTreeMap;
use std::fs;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::DeploymentContext;
use crate::error::Result;
use crate::iac::{self, DefaultIaCCommandRunner};
use crate::providers::ProviderKind;

pub mod aws;
pub mod azure;
pub mod gcp;

/// NotDeployed -> Provisioning -> Provisioned -> PostDeploying -> Ready,
/// with failure transitions to FailedPartial. `destroy_all` completion
/// is terminal back to NotDeployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerState {
    NotDeployed,
    Provisioning,
    Provisioned,
    PostDeploying,
    Ready,
    FailedPartial,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LayerInfo {
    pub state: Option<LayerState>,
    pub resources: BTreeMap<String, Value>,
}

impl LayerInfo {
    pub fn ready(resources: BTreeMap<String, Value>) -> Self {
        Self {
            state: Some(LayerState::Ready),
            resources,
        }
    }

    pub fn not_deployed() -> Self {
        Self {
            state: Some(LayerState::NotDeployed),
            resources: BTreeMap::new(),
        }
    }
}

/// Outcome of a `deploy_all`/`destroy_all` run against a single
/// provider's layer sequence.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub completed_layers: Vec<&'static str>,
    pub failed_layer: Option<&'static str>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.failed_layer.is_none()
    }
}

/// Resolves the IaC tool the same way the CLI does when no explicit
/// flag is passed: `TWIN2MC_IAC_TOOL` env override, else whichever of
/// `tofu`/`terraform` is on PATH.
fn iac_tool() -> Result<iac::IaCTool> {
    iac::resolve_iac_tool(None, std::env::var("TWIN2MC_IAC_TOOL").ok())
}

/// Runs `init`/`plan`/`apply` for `provider`/`layer`'s generated IaC,
/// the same way `apply.rs`'s deploy path drives `run_iac_plan_apply`,
/// and persists the resulting `LayerState` so `info` can report it
/// honestly afterward.
pub async fn provision_layer(ctx: &mut DeploymentContext, provider: &str, layer: &str) -> Result<()> {
    ctx.set_layer_state(provider, layer, LayerState::Provisioning)?;
    let dir = iac::layer_dir(ctx.project_root(), provider, layer);
    fs::create_dir_all(&dir)?;
    let tool = iac_tool()?;
    match iac::run_iac_plan_apply(&DefaultIaCCommandRunner, tool, &dir) {
        Ok(()) => {
            ctx.set_layer_state(provider, layer, LayerState::Provisioned)?;
            Ok(())
        }
        Err(err) => {
            ctx.set_layer_state(provider, layer, LayerState::FailedPartial)?;
            Err(err)
        }
    }
}

/// Runs `init`/`destroy` for `provider`/`layer`'s generated IaC and
/// records the resulting state, mirroring `provision_layer`'s pairing
/// with `run_iac_destroy` in the teardown path.
pub async fn destroy_layer(ctx: &mut DeploymentContext, provider: &str, layer: &str) -> Result<()> {
    let dir = iac::layer_dir(ctx.project_root(), provider, layer);
    let tool = iac_tool()?;
    match iac::run_iac_destroy(&DefaultIaCCommandRunner, tool, &dir) {
        Ok(()) => {
            ctx.set_layer_state(provider, layer, LayerState::NotDeployed)?;
            Ok(())
        }
        Err(err) => {
            ctx.set_layer_state(provider, layer, LayerState::FailedPartial)?;
            Err(err)
        }
    }
}

/// Runs a post-deploy SDK op and records the layer's final state:
/// `Ready` on success, `FailedPartial` if the op never satisfies after
/// retrying. Call after `provision_layer` succeeds.
pub async fn run_post_deploy(
    ctx: &mut DeploymentContext,
    provider: &str,
    layer: &str,
    op: &dyn crate::postdeploy::PostDeployOp,
) -> Result<()> {
    ctx.set_layer_state(provider, layer, LayerState::PostDeploying)?;
    let policy = ctx.retry_policy().clone();
    match crate::postdeploy::ensure(&policy, op).await {
        Ok(()) => {
            ctx.set_layer_state(provider, layer, LayerState::Ready)?;
            Ok(())
        }
        Err(err) => {
            ctx.set_layer_state(provider, layer, LayerState::FailedPartial)?;
            Err(err)
        }
    }
}

/// Marks a layer `Ready` directly, for layers with IaC provisioning but
/// no post-deploy SDK op to run afterward.
pub fn mark_ready(ctx: &mut DeploymentContext, provider: &str, layer: &str) -> Result<()> {
    ctx.set_layer_state(provider, layer, LayerState::Ready)
}

/// Per-provider ordered deploy/destroy/info surface. `deploy_setup`
/// through `destroy_l0` follow the dependency order in `deploy_all`'s
/// default implementation; individual layers perform their own
/// pre-flight checks (reads only, never mutating) before provisioning.
#[async_trait]
pub trait LayerStrategy: Send + Sync {
    fn provider_kind(&self) -> ProviderKind;

    async fn deploy_setup(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn destroy_setup(&self, ctx: &mut DeploymentContext) -> Result<()>;

    /// L0 (glue receivers) is normally deployed centrally by
    /// `glue::deploy_l0` across every provider pair at once; this
    /// per-provider hook exists for symmetry and is a no-op by default.
    async fn deploy_l0(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn destroy_l0(&self, _ctx: &mut DeploymentContext) -> Result<()> {
        Ok(())
    }
    async fn info_l0(&self, _ctx: &DeploymentContext) -> Result<LayerInfo> {
        Ok(LayerInfo::not_deployed())
    }

    async fn deploy_l1(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn destroy_l1(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn info_l1(&self, ctx: &DeploymentContext) -> Result<LayerInfo>;

    async fn deploy_l2(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn destroy_l2(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn info_l2(&self, ctx: &DeploymentContext) -> Result<LayerInfo>;

    async fn deploy_l3_hot(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn destroy_l3_hot(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn info_l3_hot(&self, ctx: &DeploymentContext) -> Result<LayerInfo>;

    async fn deploy_l3_cold(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn destroy_l3_cold(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn info_l3_cold(&self, ctx: &DeploymentContext) -> Result<LayerInfo>;

    async fn deploy_l3_archive(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn destroy_l3_archive(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn info_l3_archive(&self, ctx: &DeploymentContext) -> Result<LayerInfo>;

    async fn deploy_l4(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn destroy_l4(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn info_l4(&self, ctx: &DeploymentContext) -> Result<LayerInfo>;

    async fn deploy_l5(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn destroy_l5(&self, ctx: &mut DeploymentContext) -> Result<()>;
    async fn info_l5(&self, ctx: &DeploymentContext) -> Result<LayerInfo>;

    /// Setup -> L0 -> L1 -> L2 -> L3-Hot -> L3-Cold -> L3-Archive -> L4 -> L5.
    /// Stops at the first failing layer and reports it; the caller is
    /// responsible for following up with `destroy_all`.
    async fn deploy_all(&self, ctx: &mut DeploymentContext) -> RunOutcome {
        let mut completed = Vec::new();
        macro_rules! step {
            ($name:expr, $call:expr) => {
                match $call {
                    Ok(()) => completed.push($name),
                    Err(_) => {
                        return RunOutcome {
                            completed_layers: completed,
                            failed_layer: Some($name),
                        };
                    }
                }
            };
        }
        step!("setup", self.deploy_setup(ctx).await);
        step!("l0", self.deploy_l0(ctx).await);
        step!("l1", self.deploy_l1(ctx).await);
        step!("l2", self.deploy_l2(ctx).await);
        step!("l3_hot", self.deploy_l3_hot(ctx).await);
        step!("l3_cold", self.deploy_l3_cold(ctx).await);
        step!("l3_archive", self.deploy_l3_archive(ctx).await);
        step!("l4", self.deploy_l4(ctx).await);
        step!("l5", self.deploy_l5(ctx).await);
        RunOutcome {
            completed_layers: completed,
            failed_layer: None,
        }
    }

    /// Exact reverse of `deploy_all`, so dependents die before
    /// dependencies. Destruction continues past individual failures so
    /// the fallback cleanup pass (`cleanup::FallbackCleanup`) still gets
    /// a chance at whatever is left.
    async fn destroy_all(&self, ctx: &mut DeploymentContext) -> RunOutcome {
        let mut completed = Vec::new();
        let steps: Vec<(&'static str, _)> = vec![
            ("l5", self.destroy_l5(ctx).await),
            ("l4", self.destroy_l4(ctx).await),
            ("l3_archive", self.destroy_l3_archive(ctx).await),
            ("l3_cold", self.destroy_l3_cold(ctx).await),
            ("l3_hot", self.destroy_l3_hot(ctx).await),
            ("l2", self.destroy_l2(ctx).await),
            ("l1", self.destroy_l1(ctx).await),
            ("l0", self.destroy_l0(ctx).await),
            ("setup", self.destroy_setup(ctx).await),
        ];
        let mut failed_layer = None;
        for (name, result) in steps {
            match result {
                Ok(()) => completed.push(name),
                Err(_) => {
                    failed_layer.get_or_insert(name);
                }
            }
        }
        RunOutcome {
            completed_layers: completed,
            failed_layer,
        }
    }
}

pub fn for_kind(kind: ProviderKind) -> Box<dyn LayerStrategy> {
    match kind {
        ProviderKind::Aws => Box::new(aws::AwsStrategy::new()),
        ProviderKind::Azure => Box::new(azure::AzureStrategy::new()),
        ProviderKind::Gcp => Box::new(gcp::GcpStrategy::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Hierarchy, InterCloudConnections, Mode, OptimizationFlags, TwinConfig};
    use crate::error::DeployerError;

    /// Succeeds through every layer up to (not including) L4, so
    /// `deploy_all` has a deterministic failure point to assert against.
    struct MockStrategy;

    #[async_trait]
    impl LayerStrategy for MockStrategy {
        fn provider_kind(&self) -> ProviderKind {
            ProviderKind::Aws
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
            Ok(())
        }
        async fn destroy_l3_cold(&self, _ctx: &mut DeploymentContext) -> Result<()> {
            Ok(())
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
            Err(DeployerError::deployment("l4", "aws", "forced failure for ordering test"))
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

    fn empty_context() -> (tempfile::TempDir, DeploymentContext) {
        let dir = tempfile::tempdir().unwrap();
        let config = TwinConfig {
            digital_twin_name: "demo".to_string(),
            mode: Mode::Debug,
            hot_storage_days: 30,
            cold_storage_days: 90,
            archive_storage_days: 365,
            iot_devices: Vec::new(),
            events: Vec::new(),
            hierarchy: Hierarchy::None,
            providers: BTreeMap::new(),
            optimization: OptimizationFlags::default(),
            inter_cloud: InterCloudConnections::default(),
        };
        let ctx = DeploymentContext::new("demo", dir.path().to_path_buf(), config, BTreeMap::new(), BTreeMap::new());
        (dir, ctx)
    }

    #[tokio::test]
    async fn deploy_all_stops_at_the_first_failing_layer() {
        let (_dir, mut ctx) = empty_context();
        let outcome = MockStrategy.deploy_all(&mut ctx).await;
        assert_eq!(
            outcome.completed_layers,
            vec!["setup", "l0", "l1", "l2", "l3_hot", "l3_cold", "l3_archive"]
        );
        assert_eq!(outcome.failed_layer, Some("l4"));
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn destroy_all_runs_every_step_in_reverse_even_without_failures() {
        let (_dir, mut ctx) = empty_context();
        let outcome = MockStrategy.destroy_all(&mut ctx).await;
        assert_eq!(
            outcome.completed_layers,
            vec!["l5", "l4", "l3_archive", "l3_cold", "l3_hot", "l2", "l1", "l0", "setup"]
        );
        assert!(outcome.is_success());
    }
}
