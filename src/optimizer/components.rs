//! Per-service cost calculators. Each one wraps one or two formulas
//! from [`crate::optimizer::formulas`] with the pricing keys and fixed
//! assumptions (Lambda memory size, tier tables, free-tier defaults)
//! a given managed service actually bills under.

use serde_json::Value;

use super::formulas::{
    action_based_cost, execution_based_cost, storage_based_cost, tiered_message_cost,
    transfer_cost, user_based_cost, PricingTier,
};

/// Which of the six core formulas a calculator is primarily built on.
/// Informational only — several calculators combine more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaType {
    Message,
    Execution,
    Action,
    Storage,
    User,
    Transfer,
}

/// Reads a dotted path out of the pricing document, defaulting to 0.0
/// if any segment is missing or not a number.
pub fn pricing_value(pricing: &Value, path: &[&str]) -> f64 {
    let mut current = pricing;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return 0.0,
        }
    }
    current.as_f64().unwrap_or(0.0)
}

fn pricing_tiers(pricing: &Value, path: &[&str]) -> Vec<PricingTier> {
    let mut current = pricing;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    serde_json::from_value(current.clone()).unwrap_or_default()
}

/// Matches the deployer's own Lambda/Functions/Cloud Functions config:
/// 128 MB memory, a conservative 100 ms average duration. Kept uniform
/// across providers so a cross-cloud cost comparison is apples-to-apples.
const DEFAULT_DURATION_MS: f64 = 100.0;
const DEFAULT_MEMORY_MB: f64 = 128.0;

/// Serverless-function cost calculator shared by AWS Lambda, Azure
/// Functions and GCP Cloud Functions — all three bill per-invocation
/// plus per-GB-second, so one calculator serves all three pricing keys.
pub struct FunctionCalculator {
    pub formula_type: FormulaType,
    request_price_path: Vec<&'static str>,
    duration_price_path: Vec<&'static str>,
    free_requests_path: Vec<&'static str>,
    free_compute_path: Vec<&'static str>,
}

impl FunctionCalculator {
    pub fn aws_lambda() -> Self {
        Self::new(&["aws", "lambda", "requestPrice"], &["aws", "lambda", "durationPrice"], &["aws", "lambda", "freeRequests"], &["aws", "lambda", "freeComputeTime"])
    }

    pub fn azure_functions() -> Self {
        Self::new(&["azure", "functions", "requestPrice"], &["azure", "functions", "durationPrice"], &["azure", "functions", "freeRequests"], &["azure", "functions", "freeComputeTime"])
    }

    pub fn gcp_cloud_functions() -> Self {
        Self::new(&["gcp", "cloudFunctions", "requestPrice"], &["gcp", "cloudFunctions", "durationPrice"], &["gcp", "cloudFunctions", "freeRequests"], &["gcp", "cloudFunctions", "freeComputeTime"])
    }

    fn new(
        request_price_path: &[&'static str],
        duration_price_path: &[&'static str],
        free_requests_path: &[&'static str],
        free_compute_path: &[&'static str],
    ) -> Self {
        Self {
            formula_type: FormulaType::Execution,
            request_price_path: request_price_path.to_vec(),
            duration_price_path: duration_price_path.to_vec(),
            free_requests_path: free_requests_path.to_vec(),
            free_compute_path: free_compute_path.to_vec(),
        }
    }

    pub fn calculate_cost(&self, pricing: &Value, executions: f64, duration_ms: Option<f64>, memory_mb: Option<f64>) -> f64 {
        let duration_ms = duration_ms.unwrap_or(DEFAULT_DURATION_MS);
        let memory_mb = memory_mb.unwrap_or(DEFAULT_MEMORY_MB);

        let memory_gb = memory_mb / 1024.0;
        let compute_seconds = executions * duration_ms * 0.001;
        let compute_gb_seconds = compute_seconds * memory_gb;

        execution_based_cost(
            pricing_value(pricing, &self.request_price_path),
            executions,
            pricing_value(pricing, &self.free_requests_path),
            pricing_value(pricing, &self.duration_price_path),
            compute_gb_seconds,
            pricing_value(pricing, &self.free_compute_path),
        )
    }

    /// Convenience wrapper matching the old cross-cloud glue API: a
    /// glue function (connector/ingestion/writer/reader) is just an
    /// invocation of this same calculator at default duration/memory.
    pub fn calculate_glue_function_cost(&self, pricing: &Value, messages: f64) -> f64 {
        self.calculate_cost(pricing, messages, None, None)
    }
}

/// Message-ingestion gateway: AWS IoT Core, Azure IoT Hub, GCP Pub/Sub.
/// All three use tiered per-message pricing.
pub struct MessageGatewayCalculator {
    pub formula_type: FormulaType,
    tiers_path: Vec<&'static str>,
    connectivity_price_path: Vec<&'static str>,
}

impl MessageGatewayCalculator {
    pub fn aws_iot_core() -> Self {
        Self {
            formula_type: FormulaType::Message,
            tiers_path: vec!["aws", "iotCore", "messageTiers"],
            connectivity_price_path: vec!["aws", "iotCore", "connectivityPricePerDevice"],
        }
    }

    pub fn azure_iot_hub() -> Self {
        Self {
            formula_type: FormulaType::Message,
            tiers_path: vec!["azure", "iotHub", "messageTiers"],
            connectivity_price_path: vec!["azure", "iotHub", "connectivityPricePerDevice"],
        }
    }

    pub fn gcp_pubsub() -> Self {
        Self {
            formula_type: FormulaType::Message,
            tiers_path: vec!["gcp", "pubsub", "messageTiers"],
            connectivity_price_path: vec!["gcp", "pubsub", "connectivityPricePerDevice"],
        }
    }

    pub fn calculate_cost(&self, pricing: &Value, number_of_devices: f64, messages_per_month: f64) -> f64 {
        let tiers = pricing_tiers(pricing, &self.tiers_path);
        let message_cost = if tiers.is_empty() {
            0.0
        } else {
            tiered_message_cost(messages_per_month, &tiers)
        };
        let connectivity_cost = pricing_value(pricing, &self.connectivity_price_path) * number_of_devices;
        message_cost + connectivity_cost
    }
}

/// NoSQL hot-storage calculator: DynamoDB, Cosmos DB, Firestore — all
/// three bill per read/write action plus per-GB-month storage above a
/// free allowance.
pub struct NoSqlStoreCalculator {
    pub formula_type: FormulaType,
    write_price_path: Vec<&'static str>,
    read_price_path: Vec<&'static str>,
    storage_price_path: Vec<&'static str>,
    free_storage_path: Vec<&'static str>,
}

impl NoSqlStoreCalculator {
    pub fn aws_dynamodb() -> Self {
        Self::new(&["aws", "dynamoDB", "writePrice"], &["aws", "dynamoDB", "readPrice"], &["aws", "dynamoDB", "storagePrice"], &["aws", "dynamoDB", "freeStorage"])
    }

    pub fn azure_cosmos_db() -> Self {
        Self::new(&["azure", "cosmosDB", "writePrice"], &["azure", "cosmosDB", "readPrice"], &["azure", "cosmosDB", "storagePrice"], &["azure", "cosmosDB", "freeStorage"])
    }

    pub fn gcp_firestore() -> Self {
        Self::new(&["gcp", "firestore", "writePrice"], &["gcp", "firestore", "readPrice"], &["gcp", "firestore", "storagePrice"], &["gcp", "firestore", "freeStorage"])
    }

    fn new(write: &[&'static str], read: &[&'static str], storage: &[&'static str], free_storage: &[&'static str]) -> Self {
        Self {
            formula_type: FormulaType::Action,
            write_price_path: write.to_vec(),
            read_price_path: read.to_vec(),
            storage_price_path: storage.to_vec(),
            free_storage_path: free_storage.to_vec(),
        }
    }

    pub fn calculate_cost(&self, pricing: &Value, writes_per_month: f64, reads_per_month: f64, storage_gb: f64) -> f64 {
        let write_cost = action_based_cost(pricing_value(pricing, &self.write_price_path), writes_per_month);
        let read_cost = action_based_cost(pricing_value(pricing, &self.read_price_path), reads_per_month);

        let free_storage = {
            let v = pricing_value(pricing, &self.free_storage_path);
            if v == 0.0 { 25.0 } else { v }
        };
        let billable_storage = (storage_gb - free_storage).max(0.0);
        let storage_cost = storage_based_cost(pricing_value(pricing, &self.storage_price_path), billable_storage, 1.0);

        write_cost + read_cost + storage_cost
    }
}

/// Cool/archive object-storage tier calculator: S3 Infrequent Access,
/// S3 Glacier Deep Archive, Azure Blob cool/archive, GCP Storage
/// nearline/archive — storage plus put-per-GB writes and optional
/// retrieval egress.
pub struct ObjectStoreTierCalculator {
    pub formula_type: FormulaType,
    storage_price_path: Vec<&'static str>,
    write_price_per_gb_path: Vec<&'static str>,
    retrieval_price_path: Vec<&'static str>,
}

impl ObjectStoreTierCalculator {
    pub fn new(storage: &[&'static str], write_per_gb: &[&'static str], retrieval: &[&'static str]) -> Self {
        Self {
            formula_type: FormulaType::Storage,
            storage_price_path: storage.to_vec(),
            write_price_per_gb_path: write_per_gb.to_vec(),
            retrieval_price_path: retrieval.to_vec(),
        }
    }

    pub fn calculate_cost(&self, pricing: &Value, storage_gb: f64, writes_gb: f64, retrievals_gb: f64, duration_months: f64) -> f64 {
        let storage = storage_based_cost(pricing_value(pricing, &self.storage_price_path), storage_gb, duration_months);
        let writes = storage_based_cost(pricing_value(pricing, &self.write_price_per_gb_path), writes_gb, 1.0);
        let retrieval = transfer_cost(pricing_value(pricing, &self.retrieval_price_path), retrievals_gb);
        storage + writes + retrieval
    }
}

/// Digital-twin graph service: AWS IoT TwinMaker, Azure Digital Twins,
/// GCP's equivalent twin-graph deployment. Billed per entity stored and
/// per query/API call served.
pub struct TwinGraphCalculator {
    pub formula_type: FormulaType,
    entity_price_path: Vec<&'static str>,
    query_price_path: Vec<&'static str>,
    api_call_price_path: Vec<&'static str>,
}

impl TwinGraphCalculator {
    pub fn aws_twinmaker() -> Self {
        Self::new(&["aws", "twinMaker", "entityPrice"], &["aws", "twinMaker", "queryPrice"], &["aws", "twinMaker", "apiCallPrice"])
    }

    pub fn azure_digital_twins() -> Self {
        Self::new(&["azure", "digitalTwins", "entityPrice"], &["azure", "digitalTwins", "queryPrice"], &["azure", "digitalTwins", "apiCallPrice"])
    }

    pub fn gcp_twin_graph() -> Self {
        Self::new(&["gcp", "twinGraph", "entityPrice"], &["gcp", "twinGraph", "queryPrice"], &["gcp", "twinGraph", "apiCallPrice"])
    }

    fn new(entity: &[&'static str], query: &[&'static str], api_call: &[&'static str]) -> Self {
        Self {
            formula_type: FormulaType::Action,
            entity_price_path: entity.to_vec(),
            query_price_path: query.to_vec(),
            api_call_price_path: api_call.to_vec(),
        }
    }

    pub fn calculate_cost(&self, pricing: &Value, entity_count: f64, queries_per_month: f64, api_calls_per_month: f64) -> f64 {
        let entity_cost = action_based_cost(pricing_value(pricing, &self.entity_price_path), entity_count);
        let query_cost = action_based_cost(pricing_value(pricing, &self.query_price_path), queries_per_month);
        let api_cost = action_based_cost(pricing_value(pricing, &self.api_call_price_path), api_calls_per_month);
        entity_cost + query_cost + api_cost
    }
}

/// Managed dashboarding, identical seat-based pricing model across all
/// three clouds' Managed Grafana offerings.
pub struct GrafanaCalculator {
    pub formula_type: FormulaType,
    editor_price_path: Vec<&'static str>,
    viewer_price_path: Vec<&'static str>,
}

impl GrafanaCalculator {
    pub fn aws() -> Self {
        Self::new(&["aws", "grafana", "editorPrice"], &["aws", "grafana", "viewerPrice"])
    }

    pub fn azure() -> Self {
        Self::new(&["azure", "grafana", "editorPrice"], &["azure", "grafana", "viewerPrice"])
    }

    pub fn gcp() -> Self {
        Self::new(&["gcp", "grafana", "editorPrice"], &["gcp", "grafana", "viewerPrice"])
    }

    fn new(editor: &[&'static str], viewer: &[&'static str]) -> Self {
        Self {
            formula_type: FormulaType::User,
            editor_price_path: editor.to_vec(),
            viewer_price_path: viewer.to_vec(),
        }
    }

    pub fn calculate_cost(&self, pricing: &Value, num_editors: u32, num_viewers: u32) -> f64 {
        user_based_cost(
            pricing_value(pricing, &self.editor_price_path),
            num_editors,
            pricing_value(pricing, &self.viewer_price_path),
            num_viewers,
            0.0,
            0.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_pricing() -> Value {
        json!({
            "aws": {
                "lambda": {"requestPrice": 0.0000002, "durationPrice": 0.0000166667, "freeRequests": 1_000_000, "freeComputeTime": 400_000},
                "dynamoDB": {"writePrice": 0.00000125, "readPrice": 0.00000025, "storagePrice": 0.25, "freeStorage": 25},
                "grafana": {"editorPrice": 9.0, "viewerPrice": 5.0},
            }
        })
    }

    #[test]
    fn function_calculator_reads_aws_lambda_keys() {
        let pricing = sample_pricing();
        let calc = FunctionCalculator::aws_lambda();
        let cost = calc.calculate_cost(&pricing, 2_000_000.0, None, None);
        assert!(cost > 0.0);
    }

    #[test]
    fn dynamodb_calculator_waives_free_storage() {
        let pricing = sample_pricing();
        let calc = NoSqlStoreCalculator::aws_dynamodb();
        let cost = calc.calculate_cost(&pricing, 0.0, 0.0, 10.0);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn grafana_calculator_sums_seats() {
        let pricing = sample_pricing();
        let calc = GrafanaCalculator::aws();
        assert_eq!(calc.calculate_cost(&pricing, 2, 5), 9.0 * 2.0 + 5.0 * 5.0);
    }

    #[test]
    fn missing_pricing_key_defaults_to_zero() {
        let pricing = json!({});
        assert_eq!(pricing_value(&pricing, &["aws", "lambda", "requestPrice"]), 0.0);
    }
}
