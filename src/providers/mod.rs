//! Provider adapters: one [`Adapter`] implementation per cloud, wrapping
//! that cloud's SDK client bundle and resource-naming convention behind
//! a common interface so the orchestrator and layer strategies never
//! branch on provider identity directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DeployerError, Result};

pub mod aws;
pub mod azure;
pub mod gcp;

/// The closed set of supported clouds. Adding a fourth provider means
/// adding a variant here, a registry factory, and an adapter module —
/// callers match exhaustively rather than treating provider identity as
/// an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Aws,
    Azure,
    Gcp,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Aws => "aws",
            ProviderKind::Azure => "azure",
            ProviderKind::Gcp => "gcp",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "aws" => Ok(ProviderKind::Aws),
            "azure" => Ok(ProviderKind::Azure),
            "gcp" | "google" => Ok(ProviderKind::Gcp),
            other => Err(DeployerError::ProviderNotFound {
                requested: other.to_string(),
                available: vec!["aws".into(), "azure".into(), "gcp".into()],
            }),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw per-provider credential payload, as loaded from
/// `config_credentials.json`. Shape is provider-specific (access keys
/// for AWS, a service principal for Azure, a service-account JSON key
/// for GCP) so it stays an untyped JSON value until an adapter parses
/// the fields it needs.
pub type Credentials = Value;

/// Common interface every cloud adapter implements: client
/// initialization, resource naming, and existence checks. Layer-level
/// deploy/destroy operations live in `strategy::LayerStrategy`, not
/// here — the adapter is the thin SDK/naming layer underneath it.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Initializes SDK clients from credentials and binds the twin name
    /// used for resource naming. Must be called before any other method.
    async fn initialize_clients(&mut self, credentials: &Credentials, twin_name: &str) -> Result<()>;

    /// Builds the resource name for `resource_type` (e.g. "ingestion_lambda",
    /// "hot_table") following this provider's naming convention.
    fn get_resource_name(&self, resource_type: &str, suffix: &str) -> String;

    /// Returns true if the twin's top-level resource (workspace,
    /// resource group, or project marker) already exists.
    async fn twin_exists(&self) -> Result<bool>;
}

/// Constructs a fresh, uninitialized adapter for `kind`. `initialize_clients`
/// must be called before use.
pub fn new_adapter(kind: ProviderKind) -> Box<dyn Adapter> {
    match kind {
        ProviderKind::Aws => Box::new(aws::AwsAdapter::new()),
        ProviderKind::Azure => Box::new(azure::AzureAdapter::new()),
        ProviderKind::Gcp => Box::new(gcp::GcpAdapter::new()),
    }
}
