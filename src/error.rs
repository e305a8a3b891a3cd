use std::io;

use thiserror::Error;

/// Error taxonomy for the deployer core.
#[derive(Debug, Error)]
pub enum DeployerError {
    #[error("configuration error: {message} (file: {file})")]
    Configuration { message: String, file: String },

    #[error("provider '{requested}' not found (available: {available:?})")]
    ProviderNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error(
        "failed to create {resource_type} '{resource_name}' [provider={provider}, layer={layer}]: {cause}"
    )]
    ResourceCreation {
        resource_type: String,
        resource_name: String,
        provider: String,
        layer: String,
        cause: String,
    },

    #[error(
        "failed to delete {resource_type} '{resource_name}' [provider={provider}, layer={layer}]: {cause}"
    )]
    ResourceDeletion {
        resource_type: String,
        resource_name: String,
        provider: String,
        layer: String,
        cause: String,
    },

    #[error("deployment error on layer {layer} [provider={provider}]: {reason}")]
    Deployment {
        layer: String,
        provider: String,
        reason: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("IaC tool '{tool}' missing on PATH (binary '{binary}')")]
    IaCToolMissing { tool: String, binary: &'static str },

    #[error("IaC tool '{tool}' command '{step}' failed (exit {status:?}): {stderr}")]
    IaCTool {
        tool: String,
        step: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DeployerError>;

impl DeployerError {
    pub fn configuration(message: impl Into<String>, file: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            file: file.into(),
        }
    }

    pub fn deployment(
        layer: impl Into<String>,
        provider: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Deployment {
            layer: layer.into(),
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Maps this error onto a CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration { .. } | Self::ProviderNotFound { .. } => 2,
            Self::Deployment { .. }
            | Self::ResourceCreation { .. }
            | Self::ResourceDeletion { .. }
            | Self::IaCTool { .. }
            | Self::IaCToolMissing { .. } => 3,
            Self::Validation(_) => 5,
            _ => 1,
        }
    }
}

/// Error taxonomy for the cost-optimizer core. Kept separate from
/// [`DeployerError`] because the optimizer has its own, much smaller,
/// failure surface (no SDK/IaC calls).
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("pricing schema invalid for provider '{provider}': missing keys {missing_keys:?}")]
    PricingSchema {
        provider: String,
        missing_keys: Vec<String>,
    },

    #[error("invalid optimizer parameters: {0}")]
    InvalidParams(String),
}

pub type OptimizerResult<T> = std::result::Result<T, OptimizerError>;
