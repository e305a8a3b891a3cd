//! Credential validation, split across the Optimizer's and the
//! Deployer's permission sets. The optimizer only ever reads pricing
//! metadata, so its required-field set is a strict subset of the
//! deployer's; a credential payload can satisfy one while failing the
//! other.

use serde_json::Value;

use crate::providers::ProviderKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
    pub missing_permissions: Vec<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            valid: true,
            message: "credentials valid".to_string(),
            missing_permissions: Vec::new(),
        }
    }

    fn missing(missing: Vec<String>) -> Self {
        let message = format!("missing required fields: {}", missing.join(", "));
        Self {
            valid: false,
            message,
            missing_permissions: missing,
        }
    }
}

fn required_fields(kind: ProviderKind, for_deployer: bool) -> Vec<&'static str> {
    match (kind, for_deployer) {
        (ProviderKind::Aws, false) => vec!["access_key_id", "secret_access_key"],
        (ProviderKind::Aws, true) => vec!["access_key_id", "secret_access_key", "region"],
        (ProviderKind::Azure, false) => vec!["subscription_id", "tenant_id"],
        (ProviderKind::Azure, true) => vec![
            "subscription_id",
            "tenant_id",
            "client_id",
            "client_secret",
            "iot_hub_region",
        ],
        (ProviderKind::Gcp, false) => vec!["project_id"],
        (ProviderKind::Gcp, true) => vec!["project_id", "service_account_key"],
    }
}

fn missing_fields(credentials: &Value, fields: &[&'static str]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| {
            credentials
                .get(**field)
                .and_then(Value::as_str)
                .is_none_or(str::is_empty)
        })
        .map(|field| field.to_string())
        .collect()
}

pub fn validate_for_optimizer(kind: ProviderKind, credentials: &Value) -> ValidationResult {
    let missing = missing_fields(credentials, &required_fields(kind, false));
    if missing.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::missing(missing)
    }
}

pub fn validate_for_deployer(kind: ProviderKind, credentials: &Value) -> ValidationResult {
    let missing = missing_fields(credentials, &required_fields(kind, true));
    if missing.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::missing(missing)
    }
}

/// Combined result of validating against both permission sets: valid
/// only if both are valid.
#[derive(Debug, Clone)]
pub struct CombinedValidation {
    pub optimizer: ValidationResult,
    pub deployer: ValidationResult,
    pub valid: bool,
}

pub fn validate_credentials(kind: ProviderKind, credentials: &Value) -> CombinedValidation {
    let optimizer = validate_for_optimizer(kind, credentials);
    let deployer = validate_for_deployer(kind, credentials);
    let valid = optimizer.valid && deployer.valid;
    CombinedValidation {
        optimizer,
        deployer,
        valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optimizer_valid_deployer_invalid_yields_invalid_combined() {
        let credentials = json!({"subscription_id": "s", "tenant_id": "t"});
        let combined = validate_credentials(ProviderKind::Azure, &credentials);
        assert!(combined.optimizer.valid);
        assert!(!combined.deployer.valid);
        assert!(!combined.valid);
        assert!(combined.deployer.missing_permissions.contains(&"iot_hub_region".to_string()));
    }

    #[test]
    fn full_credentials_satisfy_both() {
        let credentials = json!({
            "subscription_id": "s",
            "tenant_id": "t",
            "client_id": "c",
            "client_secret": "secret",
            "iot_hub_region": "westeurope",
        });
        let combined = validate_credentials(ProviderKind::Azure, &credentials);
        assert!(combined.valid);
    }
}
