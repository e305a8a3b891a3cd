//! Composition root: loads a twin's configuration, builds its
//! [`DeploymentContext`], and drives `deploy`/`destroy`/`info` across
//! whichever providers its layers are assigned to. Where layer `N` and
//! layer `N+1` sit on different clouds, the glue layer is deployed
//! between them before the downstream layer is provisioned.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::cleanup::FallbackCleanup;
use crate::config::{LayerSlot, TwinConfig};
use crate::context::DeploymentContext;
use crate::error::{DeployerError, Result};
use crate::glue;
use crate::providers::{Adapter, ProviderKind};
use crate::registry;
use crate::settings::DeployerSettings;
use crate::strategy::{self, LayerInfo, LayerStrategy, RunOutcome};

const LOCK_FILE: &str = ".twin2mc.lock";

/// The ordered layer sequence, paired with the `LayerSlot` used to look
/// up its provider (Setup and L0 have no slot of their own: Setup rides
/// on L1's provider, L0 is glue and has none).
const LAYER_SEQUENCE: &[(&str, Option<LayerSlot>)] = &[
    ("setup", None),
    ("l0", None),
    ("l1", Some(LayerSlot::L1)),
    ("l2", Some(LayerSlot::L2)),
    ("l3_hot", Some(LayerSlot::L3Hot)),
    ("l3_cold", Some(LayerSlot::L3Cold)),
    ("l3_archive", Some(LayerSlot::L3Archive)),
    ("l4", Some(LayerSlot::L4)),
    ("l5", Some(LayerSlot::L5)),
];

/// Advisory per-project exclusive lock, held for the duration of
/// `deploy`/`destroy`. Released automatically on drop; a stale lock from
/// a crashed previous run is reported, never silently stolen.
struct ProjectLock {
    path: PathBuf,
}

impl ProjectLock {
    fn acquire(project_path: &Path) -> Result<Self> {
        let path = project_path.join(LOCK_FILE);
        File::options()
            .create_new(true)
            .write(true)
            .open(&path)
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::AlreadyExists {
                    DeployerError::deployment(
                        "setup",
                        "none",
                        format!("project is locked by another run (remove {} if that run crashed)", path.display()),
                    )
                } else {
                    DeployerError::Io(err)
                }
            })?;
        Ok(Self { path })
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

pub struct Orchestrator {
    pub project_path: PathBuf,
    pub settings: DeployerSettings,
}

impl Orchestrator {
    pub fn new(project_path: PathBuf) -> Result<Self> {
        let settings = DeployerSettings::load(&project_path)?;
        Ok(Self { project_path, settings })
    }

    async fn build_context(&self, project_name: &str) -> Result<(TwinConfig, DeploymentContext)> {
        let config = TwinConfig::load(&self.project_path)?;
        let credentials = crate::config::load_credentials(&self.project_path)?;

        let mut providers: BTreeMap<String, Box<dyn Adapter>> = BTreeMap::new();
        for name in config.providers.values() {
            if name == "none" || providers.contains_key(name) {
                continue;
            }
            let kind = ProviderKind::parse(name)?;
            let mut adapter = registry::get(kind.as_str())?;
            let creds = credentials.get(name).cloned().unwrap_or(Value::Null);
            adapter.initialize_clients(&creds, &config.digital_twin_name).await?;
            providers.insert(name.clone(), adapter);
        }

        let mut ctx = DeploymentContext::new(
            project_name,
            self.project_path.clone(),
            config.clone(),
            providers,
            credentials,
        );
        ctx.set_retry_policy(self.settings.retry);
        Ok((config, ctx))
    }

    /// Runs `deploy_all` across the twin's layer sequence, dispatching
    /// each layer to whichever provider it is assigned to and bridging
    /// provider changes with the glue layer. Stops at the first failure.
    pub async fn deploy(&self, project_name: &str) -> Result<RunOutcome> {
        let _lock = ProjectLock::acquire(&self.project_path)?;
        let (config, mut ctx) = self.build_context(project_name).await?;

        let mut completed = Vec::new();
        let mut previous_provider: Option<String> = None;
        for (layer_name, slot) in LAYER_SEQUENCE {
            let Some(slot) = slot else { continue };
            let Some(provider_name) = config.provider_for(*slot) else {
                continue;
            };

            if let Some(prev) = &previous_provider {
                if prev != provider_name {
                    glue::deploy_l0(&mut ctx, prev, provider_name)?;
                    completed.push("l0");
                }
            }
            previous_provider = Some(provider_name.to_string());

            let kind = ProviderKind::parse(provider_name)?;
            let strategy = strategy::for_kind(kind);
            if let Err(err) = deploy_one(strategy.as_ref(), &mut ctx, layer_name).await {
                tracing::error!(layer = layer_name, error = %err, "deploy failed");
                return Ok(RunOutcome {
                    completed_layers: completed,
                    failed_layer: Some(layer_name),
                });
            }
            completed.push(layer_name);
        }

        Ok(RunOutcome {
            completed_layers: completed,
            failed_layer: None,
        })
    }

    /// Reverse of `deploy`: destroys L5 down to Setup, continuing past
    /// per-layer failures, then runs a fallback cleanup sweep per
    /// provider so orphaned resources don't survive a partial destroy.
    pub async fn destroy(&self, project_name: &str, dry_run: bool) -> Result<RunOutcome> {
        let _lock = ProjectLock::acquire(&self.project_path)?;
        let (config, mut ctx) = self.build_context(project_name).await?;

        let mut completed = Vec::new();
        let mut failed_layer = None;
        let providers_in_use: Vec<String> = config
            .providers
            .values()
            .filter(|p| *p != "none")
            .cloned()
            .collect();

        for (layer_name, slot) in LAYER_SEQUENCE.iter().rev() {
            let Some(slot) = slot else { continue };
            let Some(provider_name) = config.provider_for(*slot) else {
                continue;
            };
            let kind = ProviderKind::parse(provider_name)?;
            let strategy = strategy::for_kind(kind);
            match destroy_one(strategy.as_ref(), &mut ctx, layer_name).await {
                Ok(()) => completed.push(*layer_name),
                Err(err) => {
                    tracing::warn!(layer = layer_name, error = %err, "destroy step failed, continuing");
                    failed_layer.get_or_insert(*layer_name);
                }
            }
        }

        let cleanup = FallbackCleanup::new(dry_run, false);
        for name in &providers_in_use {
            let kind = ProviderKind::parse(name)?;
            if let Some(adapter) = ctx.provider_named(name) {
                let outcomes = cleanup.sweep(&ctx, adapter).await;
                for outcome in outcomes {
                    if outcome.removed {
                        tracing::info!(provider = %kind, resource = outcome.resource_name, "fallback cleanup removed resource");
                    }
                }
            }
        }

        Ok(RunOutcome {
            completed_layers: completed,
            failed_layer,
        })
    }

    /// Reports per-layer state without mutating anything.
    pub async fn info(&self, project_name: &str) -> Result<BTreeMap<String, LayerInfo>> {
        let (config, ctx) = self.build_context(project_name).await?;
        let mut report = BTreeMap::new();
        for (layer_name, slot) in LAYER_SEQUENCE {
            let Some(slot) = slot else { continue };
            let Some(provider_name) = config.provider_for(*slot) else {
                continue;
            };
            let kind = ProviderKind::parse(provider_name)?;
            let strategy = strategy::for_kind(kind);
            let info = info_one(strategy.as_ref(), &ctx, layer_name).await?;
            report.insert((*layer_name).to_string(), info);
        }
        Ok(report)
    }

    pub async fn check_twin_exists(&self, project_name: &str) -> Result<bool> {
        let (_config, ctx) = self.build_context(project_name).await?;
        for name in ctx.config.providers.values() {
            if name == "none" {
                continue;
            }
            if let Some(adapter) = ctx.provider_named(name) {
                if adapter.twin_exists().await? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

async fn deploy_one(strategy: &dyn LayerStrategy, ctx: &mut DeploymentContext, layer: &str) -> Result<()> {
    match layer {
        "setup" => strategy.deploy_setup(ctx).await,
        "l1" => strategy.deploy_l1(ctx).await,
        "l2" => strategy.deploy_l2(ctx).await,
        "l3_hot" => strategy.deploy_l3_hot(ctx).await,
        "l3_cold" => strategy.deploy_l3_cold(ctx).await,
        "l3_archive" => strategy.deploy_l3_archive(ctx).await,
        "l4" => strategy.deploy_l4(ctx).await,
        "l5" => strategy.deploy_l5(ctx).await,
        other => Err(DeployerError::Other(format!("unknown layer '{other}'"))),
    }
}

async fn destroy_one(strategy: &dyn LayerStrategy, ctx: &mut DeploymentContext, layer: &str) -> Result<()> {
    match layer {
        "setup" => strategy.destroy_setup(ctx).await,
        "l1" => strategy.destroy_l1(ctx).await,
        "l2" => strategy.destroy_l2(ctx).await,
        "l3_hot" => strategy.destroy_l3_hot(ctx).await,
        "l3_cold" => strategy.destroy_l3_cold(ctx).await,
        "l3_archive" => strategy.destroy_l3_archive(ctx).await,
        "l4" => strategy.destroy_l4(ctx).await,
        "l5" => strategy.destroy_l5(ctx).await,
        other => Err(DeployerError::Other(format!("unknown layer '{other}'"))),
    }
}

async fn info_one(strategy: &dyn LayerStrategy, ctx: &DeploymentContext, layer: &str) -> Result<LayerInfo> {
    match layer {
        "setup" => Ok(LayerInfo::not_deployed()),
        "l1" => strategy.info_l1(ctx).await,
        "l2" => strategy.info_l2(ctx).await,
        "l3_hot" => strategy.info_l3_hot(ctx).await,
        "l3_cold" => strategy.info_l3_cold(ctx).await,
        "l3_archive" => strategy.info_l3_archive(ctx).await,
        "l4" => strategy.info_l4(ctx).await,
        "l5" => strategy.info_l5(ctx).await,
        other => Err(DeployerError::Other(format!("unknown layer '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_prevents_concurrent_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let first = ProjectLock::acquire(dir.path()).unwrap();
        let second = ProjectLock::acquire(dir.path());
        assert!(second.is_err());
        drop(first);
        assert!(ProjectLock::acquire(dir.path()).is_ok());
    }
}
