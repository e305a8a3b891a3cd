//! Pricing data: schema validation, the per-provider pricing document
//! shape, and currency conversion (USD is the only currency the
//! pricing collaborator publishes rates in; everything else is
//! converted at read time).

use std::collections::BTreeMap;

use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::OptimizerError;

/// A pricing+parameter identity for one optimizer query: devices,
/// message size, interval, hot/cool/archive retention, optimization
/// flags, currency. Two queries with the same fingerprint against the
/// same pricing snapshot always produce the same cheapest path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFingerprint {
    pub number_of_devices: u32,
    pub average_message_size_kb: f64,
    pub device_sending_interval_minutes: f64,
    pub hot_storage_days: u32,
    pub cool_storage_days: u32,
    pub archive_storage_days: u32,
    pub optimization_flags_hash: u64,
    pub currency: String,
}

fn pricing_schema() -> &'static Value {
    static SCHEMA: Lazy<Value> = Lazy::new(|| {
        serde_json::json!({
            "type": "object",
            "required": ["lambda", "dynamoDB", "s3", "iotCore", "grafana"],
            "properties": {
                "lambda": {"type": "object", "required": ["requestPrice", "durationPrice", "freeRequests", "freeComputeTime"]},
                "dynamoDB": {"type": "object", "required": ["writePrice", "readPrice", "storagePrice"]},
                "s3": {"type": "object"},
                "iotCore": {"type": "object", "required": ["messageTiers"]},
                "grafana": {"type": "object", "required": ["editorPrice", "viewerPrice"]},
            },
        })
    });
    &SCHEMA
}

fn azure_pricing_schema() -> &'static Value {
    static SCHEMA: Lazy<Value> = Lazy::new(|| {
        serde_json::json!({
            "type": "object",
            "required": ["functions", "cosmosDB", "blobStorage", "iotHub", "grafana"],
        })
    });
    &SCHEMA
}

fn gcp_pricing_schema() -> &'static Value {
    static SCHEMA: Lazy<Value> = Lazy::new(|| {
        serde_json::json!({
            "type": "object",
            "required": ["cloudFunctions", "firestore", "cloudStorage", "pubsub"],
        })
    });
    &SCHEMA
}

/// Validates one provider's pricing document against its schema,
/// returning the list of missing/mismatched pointers rather than just
/// pass/fail, so the caller's error can name exactly what to fetch.
pub fn validate_pricing_schema(provider: crate::providers::ProviderKind, pricing: &Value) -> Result<(), OptimizerError> {
    let schema_value = match provider {
        crate::providers::ProviderKind::Aws => pricing_schema(),
        crate::providers::ProviderKind::Azure => azure_pricing_schema(),
        crate::providers::ProviderKind::Gcp => gcp_pricing_schema(),
    };
    let compiled = JSONSchema::compile(schema_value).expect("static pricing schema is valid JSON Schema");
    let result = compiled.validate(pricing);
    if let Err(errors) = result {
        let missing_keys: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(OptimizerError::PricingSchema {
            provider: provider.to_string(),
            missing_keys,
        });
    }
    Ok(())
}

/// Quantizes a value to 12 decimal places using integer-scaled
/// rounding, matching the original's `Decimal(str(x)).quantize(Decimal("0.000000000001"))`
/// without pulling in a decimal crate: scale by 10^12, round to the
/// nearest integer, then scale back down.
pub fn quantize12(value: f64) -> f64 {
    const SCALE: f64 = 1_000_000_000_000.0;
    (value * SCALE).round() / SCALE
}

/// Recursively multiplies every numeric leaf in a JSON cost report by
/// `rate`, quantizing to 12 decimal places. Structure (keys, array
/// order) is preserved exactly.
fn convert_recursive(value: &Value, rate: f64) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), convert_recursive(v, rate))).collect()),
        Value::Array(items) => Value::Array(items.iter().map(|v| convert_recursive(v, rate)).collect()),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                serde_json::json!(quantize12(f * rate))
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}

/// Converts a cost report from USD into `currency`. On any failure to
/// obtain a rate, falls back to leaving the report in USD and returns
/// `Ok` with the unconverted value plus a `currency` field of `"USD"` —
/// never an error — failure to convert falls back to USD with a
/// warning, never an exception.
pub fn convert_currency(report: &Value, currency: &str, rates: &BTreeMap<String, f64>) -> (Value, String) {
    if currency.eq_ignore_ascii_case("USD") {
        return (report.clone(), "USD".to_string());
    }
    match rates.get(&currency.to_uppercase()) {
        Some(rate) => (convert_recursive(report, *rate), currency.to_uppercase()),
        None => {
            tracing::warn!(currency, "no exchange rate available, reporting cost in USD");
            (report.clone(), "USD".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quantize12_rounds_to_twelve_places() {
        let value = 1.0 / 3.0;
        let rounded = quantize12(value);
        let as_str = format!("{rounded:.13}");
        assert!(as_str.starts_with("0.3333333333333") || as_str.starts_with("0.333333333333"));
    }

    #[test]
    fn currency_round_trip_preserves_structure() {
        let report = json!({"l1": {"totalMonthlyCost": 100.0, "breakdown": {"iot": 40.0, "lambda": 60.0}}});
        let mut rates = BTreeMap::new();
        rates.insert("EUR".to_string(), 0.92);
        let (converted, currency) = convert_currency(&report, "EUR", &rates);
        assert_eq!(currency, "EUR");
        assert_eq!(converted["l1"]["totalMonthlyCost"], json!(quantize12(92.0)));
    }

    #[test]
    fn unknown_currency_falls_back_to_usd_without_erroring() {
        let report = json!({"totalMonthlyCost": 10.0});
        let rates = BTreeMap::new();
        let (converted, currency) = convert_currency(&report, "JPY", &rates);
        assert_eq!(currency, "USD");
        assert_eq!(converted, report);
    }

    #[test]
    fn valid_aws_pricing_passes_schema() {
        let pricing = json!({
            "lambda": {"requestPrice": 0.0, "durationPrice": 0.0, "freeRequests": 0, "freeComputeTime": 0},
            "dynamoDB": {"writePrice": 0.0, "readPrice": 0.0, "storagePrice": 0.0},
            "s3": {},
            "iotCore": {"messageTiers": []},
            "grafana": {"editorPrice": 0.0, "viewerPrice": 0.0},
        });
        assert!(validate_pricing_schema(crate::providers::ProviderKind::Aws, &pricing).is_ok());
    }

    #[test]
    fn pricing_missing_required_key_is_rejected() {
        let pricing = json!({"lambda": {}});
        assert!(validate_pricing_schema(crate::providers::ProviderKind::Aws, &pricing).is_err());
    }
}
