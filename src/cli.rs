//! Command-line surface: `deploy`/`destroy`/`check`/`optimize` act on
//! one twin project; `list-projects`/`create-project`/`set-project`
//! are a thin convenience layer over `~/.twin2mc/projects.json` so a
//! user juggling several twins doesn't have to pass `--project-path`
//! on every invocation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::error::{DeployerError, Result};

#[derive(Parser, Debug)]
#[command(name = "twin2mc", about = "Multi-cloud IoT digital twin deployer and cost optimizer")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Twin project directory. Defaults to the registry's active project.
    #[arg(long, global = true)]
    pub project_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy every layer the twin's config assigns a provider to.
    Deploy,
    /// Destroy every deployed layer, then sweep for orphaned resources.
    Destroy {
        #[arg(long)]
        dry_run: bool,
    },
    /// Report per-layer deployment state without mutating anything.
    Check,
    /// Run the cheapest-path cost optimizer against a pricing snapshot.
    Optimize {
        /// Path to a JSON pricing snapshot (see `optimizer::PricingSnapshot`).
        #[arg(long)]
        pricing_file: PathBuf,
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// List every project in the registry.
    ListProjects,
    /// Register a new project and make it the active one.
    CreateProject {
        name: String,
        path: PathBuf,
    },
    /// Switch the active project.
    SetProject {
        name: String,
    },
}

/// One registered twin project: a name and the directory holding its
/// `config.json` and friends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProjectRegistryFile {
    active: Option<String>,
    #[serde(default)]
    projects: BTreeMap<String, PathBuf>,
}

pub struct ProjectRegistry {
    file_path: PathBuf,
    data: ProjectRegistryFile,
}

impl ProjectRegistry {
    /// Loads `~/.twin2mc/projects.json`, or an empty registry if it
    /// doesn't exist yet — the file is created on first write, not on load.
    pub fn load() -> Result<Self> {
        let file_path = registry_path()?;
        let data = if file_path.exists() {
            let raw = fs::read_to_string(&file_path)?;
            serde_json::from_str(&raw)?
        } else {
            ProjectRegistryFile::default()
        };
        Ok(Self { file_path, data })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.file_path, raw)?;
        Ok(())
    }

    pub fn create(&mut self, name: &str, path: &Path) -> Result<()> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.data.projects.insert(name.to_string(), canonical);
        self.data.active = Some(name.to_string());
        self.save()
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if !self.data.projects.contains_key(name) {
            return Err(DeployerError::configuration(
                format!("no project named '{name}' (use create-project first)"),
                self.file_path.display().to_string(),
            ));
        }
        self.data.active = Some(name.to_string());
        self.save()
    }

    pub fn list(&self) -> Vec<ProjectEntry> {
        self.data
            .projects
            .iter()
            .map(|(name, path)| ProjectEntry {
                name: name.clone(),
                path: path.clone(),
            })
            .collect()
    }

    pub fn active_path(&self) -> Result<PathBuf> {
        let name = self.data.active.as_ref().ok_or_else(|| {
            DeployerError::configuration("no active project set (use create-project or set-project)", self.file_path.display().to_string())
        })?;
        self.data
            .projects
            .get(name)
            .cloned()
            .ok_or_else(|| DeployerError::configuration(format!("active project '{name}' is not registered"), self.file_path.display().to_string()))
    }

    pub fn active_name(&self) -> Option<&str> {
        self.data.active.as_deref()
    }
}

fn registry_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| DeployerError::Other("HOME is not set".into()))?;
    Ok(PathBuf::from(home).join(".twin2mc").join("projects.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_project_becomes_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ProjectRegistry {
            file_path: dir.path().join("projects.json"),
            data: ProjectRegistryFile::default(),
        };
        registry.create("demo", dir.path()).unwrap();
        assert_eq!(registry.active_name(), Some("demo"));
        assert!(registry.active_path().is_ok());
    }

    #[test]
    fn set_project_rejects_unknown_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ProjectRegistry {
            file_path: dir.path().join("projects.json"),
            data: ProjectRegistryFile::default(),
        };
        assert!(registry.set_active("ghost").is_err());
    }

    #[test]
    fn list_reflects_created_projects() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ProjectRegistry {
            file_path: dir.path().join("projects.json"),
            data: ProjectRegistryFile::default(),
        };
        registry.create("a", dir.path()).unwrap();
        assert_eq!(registry.list().len(), 1);
    }
}
