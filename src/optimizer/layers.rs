//! Per-provider L1-L5 cost aggregators. Each layer method sums a set of
//! component costs — some always present, some gated by
//! [`crate::config::OptimizationFlags`] — into one [`CostRecord`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::components::{FunctionCalculator, GrafanaCalculator, MessageGatewayCalculator, NoSqlStoreCalculator, ObjectStoreTierCalculator, TwinGraphCalculator};

/// One layer's monthly cost breakdown, matching the wire shape callers
/// (the CLI `optimize` report) render as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct CostRecord {
    pub provider: &'static str,
    pub layer: &'static str,
    pub data_size_gb: f64,
    pub messages_per_month: f64,
    pub component_breakdown: BTreeMap<String, f64>,
    pub total_monthly_cost: f64,
}

impl CostRecord {
    fn new(provider: &'static str, layer: &'static str) -> Self {
        Self {
            provider,
            layer,
            data_size_gb: 0.0,
            messages_per_month: 0.0,
            component_breakdown: BTreeMap::new(),
            total_monthly_cost: 0.0,
        }
    }

    fn push(&mut self, name: &str, cost: f64) {
        self.component_breakdown.insert(name.to_string(), cost);
        self.total_monthly_cost += cost;
    }
}

/// Parameters shared across every L2 (data processing) aggregator,
/// mirroring the optional components a twin's `OptimizationFlags` can
/// switch on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessingOptions {
    pub use_event_checking: bool,
    pub trigger_notification_workflow: bool,
    pub return_feedback_to_device: bool,
    pub integrate_error_handling: bool,
    pub events_per_message: f64,
    pub orchestration_actions: f64,
    pub event_trigger_rate: f64,
}

fn data_size_gb(messages_per_month: f64, average_message_size_kb: f64) -> f64 {
    (messages_per_month * average_message_size_kb) / (1024.0 * 1024.0)
}

/// AWS layer aggregator: IoT Core (L1), Lambda chain (L2), DynamoDB
/// (L3 hot), S3 IA/Glacier (L3 cool/archive), TwinMaker (L4), Managed
/// Grafana (L5).
pub struct AwsLayers {
    iot_core: MessageGatewayCalculator,
    lambda: FunctionCalculator,
    dynamodb: NoSqlStoreCalculator,
    s3_ia: ObjectStoreTierCalculator,
    s3_glacier: ObjectStoreTierCalculator,
    twinmaker: TwinGraphCalculator,
    grafana: GrafanaCalculator,
}

impl Default for AwsLayers {
    fn default() -> Self {
        Self {
            iot_core: MessageGatewayCalculator::aws_iot_core(),
            lambda: FunctionCalculator::aws_lambda(),
            dynamodb: NoSqlStoreCalculator::aws_dynamodb(),
            s3_ia: ObjectStoreTierCalculator::new(&["aws", "s3", "iaStoragePrice"], &["aws", "s3", "iaWritePrice"], &["aws", "s3", "iaRetrievalPrice"]),
            s3_glacier: ObjectStoreTierCalculator::new(&["aws", "s3", "glacierStoragePrice"], &["aws", "s3", "glacierWritePrice"], &["aws", "s3", "glacierRetrievalPrice"]),
            twinmaker: TwinGraphCalculator::aws_twinmaker(),
            grafana: GrafanaCalculator::aws(),
        }
    }
}

impl AwsLayers {
    pub fn l1(&self, pricing: &Value, number_of_devices: u32, messages_per_month: f64, average_message_size_kb: f64) -> CostRecord {
        let mut record = CostRecord::new("AWS", "L1");
        record.data_size_gb = data_size_gb(messages_per_month, average_message_size_kb);
        record.messages_per_month = messages_per_month;
        record.push("iot_core", self.iot_core.calculate_cost(pricing, number_of_devices as f64, messages_per_month));
        record.push("dispatcher_lambda", self.lambda.calculate_cost(pricing, messages_per_month, None, None));
        record
    }

    pub fn l2(&self, pricing: &Value, executions_per_month: f64, opts: ProcessingOptions) -> CostRecord {
        let mut record = CostRecord::new("AWS", "L2");
        record.messages_per_month = executions_per_month;
        record.push("persister_lambda", self.lambda.calculate_cost(pricing, executions_per_month, None, None));
        record.push("processor_lambdas", self.lambda.calculate_cost(pricing, executions_per_month, None, None));
        if opts.use_event_checking {
            record.push("event_checker", self.lambda.calculate_cost(pricing, executions_per_month, None, None));
            if opts.return_feedback_to_device {
                record.push("event_feedback", self.lambda.calculate_cost(pricing, executions_per_month * opts.event_trigger_rate, None, None));
            }
            if opts.trigger_notification_workflow {
                record.push("step_functions", crate::optimizer::formulas::action_based_cost(
                    crate::optimizer::components::pricing_value(pricing, &["aws", "stepFunctions", "transitionPrice"]),
                    executions_per_month * opts.orchestration_actions,
                ));
            }
        }
        if opts.integrate_error_handling {
            record.push("eventbridge", crate::optimizer::formulas::action_based_cost(
                crate::optimizer::components::pricing_value(pricing, &["aws", "eventBridge", "eventPrice"]),
                executions_per_month * opts.events_per_message,
            ));
            record.push("error_handler", self.lambda.calculate_cost(pricing, executions_per_month * opts.events_per_message, None, None));
        }
        record
    }

    pub fn l3_hot(&self, pricing: &Value, writes_per_month: f64, reads_per_month: f64, storage_gb: f64) -> CostRecord {
        let mut record = CostRecord::new("AWS", "L3_hot");
        record.data_size_gb = storage_gb;
        record.push("dynamodb", self.dynamodb.calculate_cost(pricing, writes_per_month, reads_per_month, storage_gb));
        record
    }

    pub fn l3_cool(&self, pricing: &Value, storage_gb: f64, duration_months: f64) -> CostRecord {
        let mut record = CostRecord::new("AWS", "L3_cool");
        record.data_size_gb = storage_gb;
        record.push("s3_ia", self.s3_ia.calculate_cost(pricing, storage_gb, 0.0, 0.0, duration_months));
        record
    }

    pub fn l3_archive(&self, pricing: &Value, storage_gb: f64, duration_months: f64) -> CostRecord {
        let mut record = CostRecord::new("AWS", "L3_archive");
        record.data_size_gb = storage_gb;
        record.push("s3_glacier", self.s3_glacier.calculate_cost(pricing, storage_gb, 0.0, 0.0, duration_months));
        record
    }

    pub fn l4(&self, pricing: &Value, entity_count: u32, queries_per_month: f64, api_calls_per_month: f64) -> CostRecord {
        let mut record = CostRecord::new("AWS", "L4");
        record.push("twinmaker", self.twinmaker.calculate_cost(pricing, entity_count as f64, queries_per_month, api_calls_per_month));
        record
    }

    pub fn l5(&self, pricing: &Value, num_editors: u32, num_viewers: u32) -> CostRecord {
        let mut record = CostRecord::new("AWS", "L5");
        record.push("grafana", self.grafana.calculate_cost(pricing, num_editors, num_viewers));
        record
    }
}

/// Azure layer aggregator: IoT Hub (L1), Functions chain (L2), Cosmos
/// DB (L3 hot), Blob Storage cool/archive (L3 cool/archive), Digital
/// Twins (L4, skipped when the twin needs a full 3D model Azure can't
/// host), Managed Grafana (L5).
pub struct AzureLayers {
    iot_hub: MessageGatewayCalculator,
    functions: FunctionCalculator,
    cosmos_db: NoSqlStoreCalculator,
    blob_cool: ObjectStoreTierCalculator,
    blob_archive: ObjectStoreTierCalculator,
    digital_twins: TwinGraphCalculator,
    grafana: GrafanaCalculator,
}

impl Default for AzureLayers {
    fn default() -> Self {
        Self {
            iot_hub: MessageGatewayCalculator::azure_iot_hub(),
            functions: FunctionCalculator::azure_functions(),
            cosmos_db: NoSqlStoreCalculator::azure_cosmos_db(),
            blob_cool: ObjectStoreTierCalculator::new(&["azure", "blobStorage", "coolStoragePrice"], &["azure", "blobStorage", "coolWritePrice"], &["azure", "blobStorage", "coolRetrievalPrice"]),
            blob_archive: ObjectStoreTierCalculator::new(&["azure", "blobStorage", "archiveStoragePrice"], &["azure", "blobStorage", "archiveWritePrice"], &["azure", "blobStorage", "archiveRetrievalPrice"]),
            digital_twins: TwinGraphCalculator::azure_digital_twins(),
            grafana: GrafanaCalculator::azure(),
        }
    }
}

impl AzureLayers {
    pub fn l1(&self, pricing: &Value, number_of_devices: u32, messages_per_month: f64, average_message_size_kb: f64) -> CostRecord {
        let mut record = CostRecord::new("Azure", "L1");
        record.data_size_gb = data_size_gb(messages_per_month, average_message_size_kb);
        record.messages_per_month = messages_per_month;
        record.push("iot_hub", self.iot_hub.calculate_cost(pricing, number_of_devices as f64, messages_per_month));
        record.push("dispatcher_function", self.functions.calculate_cost(pricing, messages_per_month, None, None));
        record
    }

    pub fn l2(&self, pricing: &Value, executions_per_month: f64, opts: ProcessingOptions) -> CostRecord {
        let mut record = CostRecord::new("Azure", "L2");
        record.messages_per_month = executions_per_month;
        record.push("persister_function", self.functions.calculate_cost(pricing, executions_per_month, None, None));
        record.push("processor_functions", self.functions.calculate_cost(pricing, executions_per_month, None, None));
        if opts.use_event_checking {
            record.push("event_checker", self.functions.calculate_cost(pricing, executions_per_month, None, None));
            if opts.return_feedback_to_device {
                record.push("event_feedback", self.functions.calculate_cost(pricing, executions_per_month * opts.event_trigger_rate, None, None));
            }
            if opts.trigger_notification_workflow {
                record.push("logic_apps", crate::optimizer::formulas::action_based_cost(
                    crate::optimizer::components::pricing_value(pricing, &["azure", "logicApps", "actionPrice"]),
                    executions_per_month * opts.orchestration_actions,
                ));
            }
        }
        if opts.integrate_error_handling {
            record.push("event_grid", crate::optimizer::formulas::action_based_cost(
                crate::optimizer::components::pricing_value(pricing, &["azure", "eventGrid", "operationPrice"]),
                executions_per_month * opts.events_per_message,
            ));
            record.push("error_handler", self.functions.calculate_cost(pricing, executions_per_month * opts.events_per_message, None, None));
        }
        record
    }

    pub fn l3_hot(&self, pricing: &Value, writes_per_month: f64, reads_per_month: f64, storage_gb: f64) -> CostRecord {
        let mut record = CostRecord::new("Azure", "L3_hot");
        record.data_size_gb = storage_gb;
        record.push("cosmos_db", self.cosmos_db.calculate_cost(pricing, writes_per_month, reads_per_month, storage_gb));
        record
    }

    pub fn l3_cool(&self, pricing: &Value, storage_gb: f64, duration_months: f64) -> CostRecord {
        let mut record = CostRecord::new("Azure", "L3_cool");
        record.data_size_gb = storage_gb;
        record.push("blob_storage_cool", self.blob_cool.calculate_cost(pricing, storage_gb, 0.0, 0.0, duration_months));
        record
    }

    pub fn l3_archive(&self, pricing: &Value, storage_gb: f64, duration_months: f64) -> CostRecord {
        let mut record = CostRecord::new("Azure", "L3_archive");
        record.data_size_gb = storage_gb;
        record.push("blob_storage_archive", self.blob_archive.calculate_cost(pricing, storage_gb, 0.0, 0.0, duration_months));
        record
    }

    /// `None` when `needs_3d_model` is set: Azure Digital Twins has no
    /// managed 3D scene viewer, never guessing when a managed equivalent does not exist.
    pub fn l4(&self, pricing: &Value, needs_3d_model: bool, queries_per_month: f64, api_calls_per_month: f64) -> Option<CostRecord> {
        if needs_3d_model {
            return None;
        }
        let mut record = CostRecord::new("Azure", "L4");
        record.push("digital_twins", self.digital_twins.calculate_cost(pricing, 0.0, queries_per_month, api_calls_per_month));
        Some(record)
    }

    pub fn l5(&self, pricing: &Value, num_editors: u32, num_viewers: u32) -> CostRecord {
        let mut record = CostRecord::new("Azure", "L5");
        record.push("grafana", self.grafana.calculate_cost(pricing, num_editors, num_viewers));
        record
    }
}

/// GCP layer aggregator: Pub/Sub (L1), Cloud Functions chain (L2),
/// Firestore (L3 hot), Cloud Storage nearline/archive (L3 cool/archive).
/// GCP has no managed twin-graph or dashboarding service in this
/// architecture; `l4`/`l5` explicitly return `None` rather than a
/// fabricated zero cost.
pub struct GcpLayers {
    pubsub: MessageGatewayCalculator,
    cloud_functions: FunctionCalculator,
    firestore: NoSqlStoreCalculator,
    storage_nearline: ObjectStoreTierCalculator,
    storage_archive: ObjectStoreTierCalculator,
}

impl Default for GcpLayers {
    fn default() -> Self {
        Self {
            pubsub: MessageGatewayCalculator::gcp_pubsub(),
            cloud_functions: FunctionCalculator::gcp_cloud_functions(),
            firestore: NoSqlStoreCalculator::gcp_firestore(),
            storage_nearline: ObjectStoreTierCalculator::new(&["gcp", "cloudStorage", "nearlineStoragePrice"], &["gcp", "cloudStorage", "nearlineWritePrice"], &["gcp", "cloudStorage", "nearlineRetrievalPrice"]),
            storage_archive: ObjectStoreTierCalculator::new(&["gcp", "cloudStorage", "archiveStoragePrice"], &["gcp", "cloudStorage", "archiveWritePrice"], &["gcp", "cloudStorage", "archiveRetrievalPrice"]),
        }
    }
}

impl GcpLayers {
    pub fn l1(&self, pricing: &Value, number_of_devices: u32, messages_per_month: f64, average_message_size_kb: f64) -> CostRecord {
        let mut record = CostRecord::new("GCP", "L1");
        record.data_size_gb = data_size_gb(messages_per_month, average_message_size_kb);
        record.messages_per_month = messages_per_month;
        record.push("pubsub", self.pubsub.calculate_cost(pricing, number_of_devices as f64, messages_per_month));
        record.push("dispatcher_function", self.cloud_functions.calculate_cost(pricing, messages_per_month, None, None));
        record
    }

    pub fn l2(&self, pricing: &Value, executions_per_month: f64, opts: ProcessingOptions) -> CostRecord {
        let mut record = CostRecord::new("GCP", "L2");
        record.messages_per_month = executions_per_month;
        record.push("persister_function", self.cloud_functions.calculate_cost(pricing, executions_per_month, None, None));
        record.push("processor_functions", self.cloud_functions.calculate_cost(pricing, executions_per_month, None, None));
        if opts.use_event_checking {
            record.push("event_checker", self.cloud_functions.calculate_cost(pricing, executions_per_month, None, None));
            if opts.return_feedback_to_device {
                record.push("event_feedback", self.cloud_functions.calculate_cost(pricing, executions_per_month * opts.event_trigger_rate, None, None));
            }
            if opts.trigger_notification_workflow {
                record.push("cloud_workflows", crate::optimizer::formulas::action_based_cost(
                    crate::optimizer::components::pricing_value(pricing, &["gcp", "cloudWorkflows", "stepPrice"]),
                    executions_per_month * opts.orchestration_actions,
                ));
            }
        }
        if opts.integrate_error_handling {
            record.push("error_handler", self.cloud_functions.calculate_cost(pricing, executions_per_month * opts.events_per_message, None, None));
        }
        record
    }

    pub fn l3_hot(&self, pricing: &Value, writes_per_month: f64, reads_per_month: f64, storage_gb: f64) -> CostRecord {
        let mut record = CostRecord::new("GCP", "L3_hot");
        record.data_size_gb = storage_gb;
        record.push("firestore", self.firestore.calculate_cost(pricing, writes_per_month, reads_per_month, storage_gb));
        record
    }

    pub fn l3_cool(&self, pricing: &Value, storage_gb: f64, duration_months: f64) -> CostRecord {
        let mut record = CostRecord::new("GCP", "L3_cool");
        record.data_size_gb = storage_gb;
        record.push("cloud_storage_nearline", self.storage_nearline.calculate_cost(pricing, storage_gb, 0.0, 0.0, duration_months));
        record
    }

    pub fn l3_archive(&self, pricing: &Value, storage_gb: f64, duration_months: f64) -> CostRecord {
        let mut record = CostRecord::new("GCP", "L3_archive");
        record.data_size_gb = storage_gb;
        record.push("cloud_storage_archive", self.storage_archive.calculate_cost(pricing, storage_gb, 0.0, 0.0, duration_months));
        record
    }

    pub fn l4(&self, _pricing: &Value) -> Option<CostRecord> {
        None
    }

    pub fn l5(&self, _pricing: &Value) -> Option<CostRecord> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pricing() -> Value {
        json!({
            "aws": {
                "iotCore": {"messageTiers": [{"limit": 1_000_000_000, "price": 1.0}], "connectivityPricePerDevice": 0.08},
                "lambda": {"requestPrice": 0.0000002, "durationPrice": 0.0000166667, "freeRequests": 1_000_000, "freeComputeTime": 400_000},
                "dynamoDB": {"writePrice": 0.00000125, "readPrice": 0.00000025, "storagePrice": 0.25, "freeStorage": 25},
                "grafana": {"editorPrice": 9.0, "viewerPrice": 5.0},
            },
            "gcp": {},
        })
    }

    #[test]
    fn aws_l1_includes_iot_core_and_dispatcher() {
        let layers = AwsLayers::default();
        let record = layers.l1(&pricing(), 100, 4_320_000.0, 1.0);
        assert!(record.component_breakdown.contains_key("iot_core"));
        assert!(record.component_breakdown.contains_key("dispatcher_lambda"));
        assert_eq!(record.total_monthly_cost, record.component_breakdown.values().sum::<f64>());
    }

    #[test]
    fn aws_l2_adds_event_components_only_when_flagged() {
        let layers = AwsLayers::default();
        let off = layers.l2(&pricing(), 1_000_000.0, ProcessingOptions::default());
        assert!(!off.component_breakdown.contains_key("event_checker"));

        let on = layers.l2(&pricing(), 1_000_000.0, ProcessingOptions { use_event_checking: true, ..Default::default() });
        assert!(on.component_breakdown.contains_key("event_checker"));
    }

    #[test]
    fn gcp_has_no_l4_or_l5() {
        let layers = GcpLayers::default();
        assert!(layers.l4(&pricing()).is_none());
        assert!(layers.l5(&pricing()).is_none());
    }

    #[test]
    fn azure_l4_is_none_when_3d_model_required() {
        let layers = AzureLayers::default();
        assert!(layers.l4(&pricing(), true, 100.0, 100.0).is_none());
        assert!(layers.l4(&pricing(), false, 100.0, 100.0).is_some());
    }
}
