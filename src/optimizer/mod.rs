//! Cost-optimizer public API: `calculate_cheapest_costs` (the
//! pricing-aware, graph-based cheapest-path solver over the five-layer
//! architecture) and `validate_credentials` (a credentials check that
//! only cares about pricing-fetch permissions, never deployment
//! scopes).

pub mod components;
pub mod formulas;
pub mod graph;
pub mod layers;
pub mod pricing;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::OptimizationFlags;
use crate::error::{OptimizerError, OptimizerResult};
use crate::providers::ProviderKind;

use graph::{find_cheapest_storage_path, pick_hot_provider, StorageGraph};
use layers::{AwsLayers, AzureLayers, CostRecord, GcpLayers, ProcessingOptions};
use pricing::validate_pricing_schema;

/// Query parameters for one `calculate_cheapest_costs` call — the
/// non-pricing half of the [`pricing::ResourceFingerprint`].
#[derive(Debug, Clone)]
pub struct OptimizeParams {
    pub number_of_devices: u32,
    pub device_sending_interval_minutes: f64,
    pub average_message_size_kb: f64,
    pub hot_storage_duration_months: f64,
    pub cool_storage_duration_months: f64,
    pub archive_storage_duration_months: f64,
    pub entity_count: u32,
    pub dashboard_refreshes_per_hour: f64,
    pub dashboard_active_hours_per_day: f64,
    pub amount_of_active_editors: u32,
    pub amount_of_active_viewers: u32,
    pub optimization: OptimizationFlags,
    pub currency: String,
}

impl OptimizeParams {
    fn messages_per_month(&self) -> f64 {
        self.number_of_devices as f64 * (60.0 / self.device_sending_interval_minutes) * 730.0
    }

    fn processing_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            use_event_checking: self.optimization.use_event_checking,
            trigger_notification_workflow: self.optimization.trigger_notification_workflow,
            return_feedback_to_device: self.optimization.return_feedback_to_device,
            integrate_error_handling: self.optimization.integrate_error_handling,
            events_per_message: 1.0,
            orchestration_actions: 3.0,
            event_trigger_rate: 0.1,
        }
    }

    fn queries_per_month(&self) -> f64 {
        self.dashboard_active_hours_per_day * self.dashboard_refreshes_per_hour * 30.0
    }
}

/// One layer where the data-gravity solver diverged from a naive
/// per-layer argmin: the selected provider, the provider that would
/// have been cheapest in isolation, and the cost delta between them.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOverride {
    pub layer: &'static str,
    pub selected_provider: String,
    pub cheapest_in_isolation: String,
    pub savings: f64,
}

/// Winning provider per layer, using the same `"L1"`/`"L2"`/`"L3_hot"`/
/// `"L3_cool"`/`"L3_archive"`/`"L4"`/`"L5"` keys as `aws_costs`/
/// `azure_costs`/`gcp_costs` — a caller can join an override or a cost
/// record to its layer through one shared key set. `"L2"` (processing)
/// and `"L3_hot"` (hot storage) always carry the same provider: the
/// data-gravity pick couples them on purpose.
#[derive(Debug, Clone, Serialize)]
pub struct CheapestCostResult {
    pub selected_providers: BTreeMap<&'static str, String>,
    pub cheapest_path: Vec<String>,
    pub aws_costs: BTreeMap<&'static str, CostRecord>,
    pub azure_costs: BTreeMap<&'static str, CostRecord>,
    pub gcp_costs: BTreeMap<&'static str, CostRecord>,
    pub overrides: Vec<OptimizationOverride>,
    pub currency: String,
}

/// Per-provider pricing documents, keyed by `ProviderKind::as_str()`.
/// A provider absent from the map is skipped entirely rather than
/// priced at zero.
pub type PricingSnapshot = BTreeMap<String, Value>;

fn transfer_price_per_gb(pricing: &PricingSnapshot, from: ProviderKind, to: ProviderKind) -> f64 {
    if from == to {
        return 0.0;
    }
    let Some(doc) = pricing.get(from.as_str()) else { return 0.0 };
    let key = format!("to{}{}", &to.as_str()[..1].to_uppercase(), &to.as_str()[1..]);
    components::pricing_value(doc, &["transfer", &key])
}

/// Runs the full cheapest-path optimization: per-provider L1-L5 costs,
/// a combined L2+L3-Hot data-gravity pick, an exhaustive Cool/Archive
/// search from the chosen Hot node, and L1/L4 selection under
/// cross-cloud glue penalties. L5 is an independent argmin.
pub fn calculate_cheapest_costs(params: &OptimizeParams, pricing: &PricingSnapshot) -> OptimizerResult<CheapestCostResult> {
    for (name, doc) in pricing {
        if name == "_rates" {
            continue;
        }
        let kind = ProviderKind::parse(name).map_err(|_| OptimizerError::InvalidParams(format!("unknown provider '{name}' in pricing snapshot")))?;
        validate_pricing_schema(kind, doc)?;
    }

    let messages = params.messages_per_month();
    let opts = params.processing_options();

    let aws = AwsLayers::default();
    let azure = AzureLayers::default();
    let gcp = GcpLayers::default();

    let empty = Value::Null;
    let aws_pricing = pricing.get("aws").unwrap_or(&empty);
    let azure_pricing = pricing.get("azure").unwrap_or(&empty);
    let gcp_pricing = pricing.get("gcp").unwrap_or(&empty);

    let aws_l1 = aws.l1(aws_pricing, params.number_of_devices, messages, params.average_message_size_kb);
    let azure_l1 = azure.l1(azure_pricing, params.number_of_devices, messages, params.average_message_size_kb);
    let gcp_l1 = gcp.l1(gcp_pricing, params.number_of_devices, messages, params.average_message_size_kb);

    let aws_l2 = aws.l2(aws_pricing, messages, opts);
    let azure_l2 = azure.l2(azure_pricing, messages, opts);
    let gcp_l2 = gcp.l2(gcp_pricing, messages, opts);

    let data_size_gb = aws_l1.data_size_gb.max(azure_l1.data_size_gb).max(gcp_l1.data_size_gb);
    let aws_l3_hot = aws.l3_hot(aws_pricing, messages, messages, data_size_gb);
    let azure_l3_hot = azure.l3_hot(azure_pricing, messages, messages, data_size_gb);
    let gcp_l3_hot = gcp.l3_hot(gcp_pricing, messages, messages, data_size_gb);

    let hot_storage_cost = [aws_l3_hot.total_monthly_cost, azure_l3_hot.total_monthly_cost, gcp_l3_hot.total_monthly_cost];
    let processing_cost = [aws_l2.total_monthly_cost, azure_l2.total_monthly_cost, gcp_l2.total_monthly_cost];
    let hot_pick = pick_hot_provider(hot_storage_cost, processing_cost);

    let aws_l3_cool = aws.l3_cool(aws_pricing, data_size_gb, params.cool_storage_duration_months);
    let azure_l3_cool = azure.l3_cool(azure_pricing, data_size_gb, params.cool_storage_duration_months);
    let gcp_l3_cool = gcp.l3_cool(gcp_pricing, data_size_gb, params.cool_storage_duration_months);

    let aws_l3_archive = aws.l3_archive(aws_pricing, data_size_gb, params.archive_storage_duration_months);
    let azure_l3_archive = azure.l3_archive(azure_pricing, data_size_gb, params.archive_storage_duration_months);
    let gcp_l3_archive = gcp.l3_archive(gcp_pricing, data_size_gb, params.archive_storage_duration_months);

    let cool_cost = [aws_l3_cool.total_monthly_cost, azure_l3_cool.total_monthly_cost, gcp_l3_cool.total_monthly_cost];
    let archive_cost = [aws_l3_archive.total_monthly_cost, azure_l3_archive.total_monthly_cost, gcp_l3_archive.total_monthly_cost];

    let mut hot_to_cool = [[0.0; 3]; 3];
    let mut cool_to_archive = [[0.0; 3]; 3];
    let providers = [ProviderKind::Aws, ProviderKind::Azure, ProviderKind::Gcp];
    for (i, from) in providers.iter().enumerate() {
        for (j, to) in providers.iter().enumerate() {
            hot_to_cool[i][j] = transfer_price_per_gb(pricing, *from, *to) * data_size_gb;
            cool_to_archive[i][j] = transfer_price_per_gb(pricing, *from, *to) * data_size_gb;
        }
    }
    let storage_graph = StorageGraph::new(hot_storage_cost, cool_cost, archive_cost, hot_to_cool, cool_to_archive);
    let cheapest_storage = find_cheapest_storage_path(&storage_graph, hot_pick.chosen);

    let l1_options: [(ProviderKind, f64); 3] = [
        (ProviderKind::Aws, aws_l1.total_monthly_cost + transfer_price_per_gb(pricing, ProviderKind::Aws, hot_pick.chosen) * data_size_gb),
        (ProviderKind::Azure, azure_l1.total_monthly_cost + transfer_price_per_gb(pricing, ProviderKind::Azure, hot_pick.chosen) * data_size_gb),
        (ProviderKind::Gcp, gcp_l1.total_monthly_cost + transfer_price_per_gb(pricing, ProviderKind::Gcp, hot_pick.chosen) * data_size_gb),
    ];
    let l1_provider = l1_options.iter().min_by(|a, b| a.1.total_cmp(&b.1)).unwrap().0;

    let queries = params.queries_per_month();
    let l4_candidates: Vec<(ProviderKind, CostRecord)> = [
        Some((ProviderKind::Aws, aws.l4(aws_pricing, params.entity_count, queries, queries))),
        azure.l4(azure_pricing, params.optimization.needs_3d_model, queries, queries).map(|r| (ProviderKind::Azure, r)),
        gcp.l4(gcp_pricing).map(|r| (ProviderKind::Gcp, r)),
    ]
    .into_iter()
    .flatten()
    .collect();

    let l4_pick = l4_candidates
        .iter()
        .filter(|(provider, _)| *provider == hot_pick.chosen)
        .next()
        .or_else(|| l4_candidates.iter().min_by(|a, b| a.1.total_monthly_cost.total_cmp(&b.1.total_monthly_cost)));

    let cheapest_l4 = l4_candidates.iter().min_by(|a, b| a.1.total_monthly_cost.total_cmp(&b.1.total_monthly_cost));

    let l5_options: Vec<(ProviderKind, f64)> = vec![
        (ProviderKind::Aws, aws.l5(aws_pricing, params.amount_of_active_editors, params.amount_of_active_viewers).total_monthly_cost),
        (ProviderKind::Azure, azure.l5(azure_pricing, params.amount_of_active_editors, params.amount_of_active_viewers).total_monthly_cost),
    ];
    let l5_provider = l5_options.iter().min_by(|a, b| a.1.total_cmp(&b.1)).map(|(p, _)| *p);

    let mut overrides = Vec::new();
    if hot_pick.chosen != hot_pick.cheapest_storage_only {
        let savings = hot_storage_cost[providers.iter().position(|p| *p == hot_pick.cheapest_storage_only).unwrap()]
            - hot_storage_cost[providers.iter().position(|p| *p == hot_pick.chosen).unwrap()];
        overrides.push(OptimizationOverride {
            layer: "L3_hot",
            selected_provider: hot_pick.chosen.to_string(),
            cheapest_in_isolation: hot_pick.cheapest_storage_only.to_string(),
            savings,
        });
    }
    if hot_pick.chosen != hot_pick.cheapest_processing_only {
        overrides.push(OptimizationOverride {
            layer: "L2",
            selected_provider: hot_pick.chosen.to_string(),
            cheapest_in_isolation: hot_pick.cheapest_processing_only.to_string(),
            savings: processing_cost[providers.iter().position(|p| *p == hot_pick.cheapest_processing_only).unwrap()]
                - processing_cost[providers.iter().position(|p| *p == hot_pick.chosen).unwrap()],
        });
    }
    if let (Some((selected, _)), Some((cheapest, cheapest_cost))) = (l4_pick, cheapest_l4) {
        if selected != cheapest {
            let selected_cost = l4_candidates.iter().find(|(p, _)| p == selected).map(|(_, r)| r.total_monthly_cost).unwrap_or(0.0);
            overrides.push(OptimizationOverride {
                layer: "L4",
                selected_provider: selected.to_string(),
                cheapest_in_isolation: cheapest.to_string(),
                savings: cheapest_cost.total_monthly_cost - selected_cost,
            });
        }
    }

    let mut selected_providers = BTreeMap::new();
    selected_providers.insert("L1", l1_provider.to_string());
    selected_providers.insert("L3_hot", cheapest_storage.path[0].provider.to_string());
    selected_providers.insert("L3_cool", cheapest_storage.path[1].provider.to_string());
    selected_providers.insert("L3_archive", cheapest_storage.path[2].provider.to_string());
    selected_providers.insert("L2", hot_pick.chosen.to_string());
    if let Some((selected, _)) = l4_pick {
        selected_providers.insert("L4", selected.to_string());
    }
    if let Some(l5) = l5_provider {
        selected_providers.insert("L5", l5.to_string());
    }

    let cheapest_path: Vec<String> = std::iter::once(format!("L1_{l1_provider}")).chain(cheapest_storage.path.iter().map(|n| n.to_string())).chain(l4_pick.map(|(p, _)| format!("L4_{p}"))).chain(l5_provider.map(|p| format!("L5_{p}"))).collect();

    let mut aws_costs = BTreeMap::new();
    aws_costs.insert("L1", aws_l1);
    aws_costs.insert("L2", aws_l2);
    aws_costs.insert("L3_hot", aws_l3_hot);
    aws_costs.insert("L3_cool", aws_l3_cool);
    aws_costs.insert("L3_archive", aws_l3_archive);

    let mut azure_costs = BTreeMap::new();
    azure_costs.insert("L1", azure_l1);
    azure_costs.insert("L2", azure_l2);
    azure_costs.insert("L3_hot", azure_l3_hot);
    azure_costs.insert("L3_cool", azure_l3_cool);
    azure_costs.insert("L3_archive", azure_l3_archive);

    let mut gcp_costs = BTreeMap::new();
    gcp_costs.insert("L1", gcp_l1);
    gcp_costs.insert("L2", gcp_l2);
    gcp_costs.insert("L3_hot", gcp_l3_hot);
    gcp_costs.insert("L3_cool", gcp_l3_cool);
    gcp_costs.insert("L3_archive", gcp_l3_archive);

    let mut result = CheapestCostResult {
        selected_providers,
        cheapest_path,
        aws_costs,
        azure_costs,
        gcp_costs,
        overrides,
        currency: "USD".to_string(),
    };

    if !params.currency.eq_ignore_ascii_case("USD") {
        let rates = pricing.get("_rates").and_then(|v| serde_json::from_value::<BTreeMap<String, f64>>(v.clone()).ok()).unwrap_or_default();
        let rate = rates.get(&params.currency.to_uppercase()).copied();
        match rate {
            Some(rate) => {
                for costs in [&mut result.aws_costs, &mut result.azure_costs, &mut result.gcp_costs] {
                    for record in costs.values_mut() {
                        convert_cost_record(record, rate);
                    }
                }
                for o in &mut result.overrides {
                    o.savings = pricing::quantize12(o.savings * rate);
                }
                result.currency = params.currency.to_uppercase();
            }
            None => {
                tracing::warn!(currency = %params.currency, "no exchange rate available, reporting cost in USD");
            }
        }
    }

    Ok(result)
}

/// Scales only the monetary fields of a [`CostRecord`] — `total_monthly_cost`
/// and every `component_breakdown` entry — leaving `data_size_gb` and
/// `messages_per_month` untouched, since those aren't denominated in a
/// currency at all.
fn convert_cost_record(record: &mut CostRecord, rate: f64) {
    record.total_monthly_cost = pricing::quantize12(record.total_monthly_cost * rate);
    for value in record.component_breakdown.values_mut() {
        *value = pricing::quantize12(*value * rate);
    }
}

/// Checks only the fields the pricing fetcher needs, never
/// deployment-specific scopes. A deployer-only field missing is not
/// this function's concern.
pub fn validate_credentials(credentials: &BTreeMap<String, Value>) -> OptimizerResult<()> {
    for name in ["aws", "azure", "gcp"] {
        if let Some(creds) = credentials.get(name) {
            if !creds.is_object() {
                return Err(OptimizerError::InvalidParams(format!("credentials for '{name}' must be an object")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_pricing() -> PricingSnapshot {
        let mut p = BTreeMap::new();
        p.insert(
            "aws".to_string(),
            json!({
                "lambda": {"requestPrice": 0.0000002, "durationPrice": 0.0000166667, "freeRequests": 1_000_000, "freeComputeTime": 400_000},
                "dynamoDB": {"writePrice": 0.00000125, "readPrice": 0.00000025, "storagePrice": 0.25, "freeStorage": 25},
                "s3": {"iaStoragePrice": 0.0125, "glacierStoragePrice": 0.00099},
                "iotCore": {"messageTiers": [{"limit": "Infinity", "price": 1.0}], "connectivityPricePerDevice": 0.08},
                "grafana": {"editorPrice": 9.0, "viewerPrice": 5.0},
                "twinMaker": {"entityPrice": 0.001, "queryPrice": 0.0000025, "apiCallPrice": 0.0000025},
                "transfer": {},
            }),
        );
        p.insert(
            "azure".to_string(),
            json!({
                "functions": {"requestPrice": 0.0000002, "durationPrice": 0.000016, "freeRequests": 1_000_000, "freeComputeTime": 400_000},
                "cosmosDB": {"writePrice": 0.000001, "readPrice": 0.00000025, "storagePrice": 0.25, "freeStorage": 25},
                "blobStorage": {"coolStoragePrice": 0.01, "archiveStoragePrice": 0.00099},
                "iotHub": {"messageTiers": [{"limit": "Infinity", "price": 0.0}], "connectivityPricePerDevice": 0.0},
                "grafana": {"editorPrice": 9.0, "viewerPrice": 5.0},
                "digitalTwins": {"entityPrice": 0.002, "queryPrice": 0.000001, "apiCallPrice": 0.000001},
                "transfer": {},
            }),
        );
        p.insert(
            "gcp".to_string(),
            json!({
                "cloudFunctions": {"requestPrice": 0.0000004, "durationPrice": 0.0000025, "freeRequests": 2_000_000, "freeComputeTime": 400_000},
                "firestore": {"writePrice": 0.00000018, "readPrice": 0.00000006, "storagePrice": 0.18, "freeStorage": 1},
                "cloudStorage": {"nearlineStoragePrice": 0.01, "archiveStoragePrice": 0.0012},
                "pubsub": {"messageTiers": [{"limit": "Infinity", "price": 0.04}], "connectivityPricePerDevice": 0.0},
                "transfer": {},
            }),
        );
        p
    }

    fn sample_params() -> OptimizeParams {
        OptimizeParams {
            number_of_devices: 100,
            device_sending_interval_minutes: 5.0,
            average_message_size_kb: 1.0,
            hot_storage_duration_months: 1.0,
            cool_storage_duration_months: 3.0,
            archive_storage_duration_months: 12.0,
            entity_count: 50,
            dashboard_refreshes_per_hour: 4.0,
            dashboard_active_hours_per_day: 8.0,
            amount_of_active_editors: 2,
            amount_of_active_viewers: 5,
            optimization: OptimizationFlags::default(),
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn calculate_cheapest_costs_picks_a_path_for_every_layer() {
        let result = calculate_cheapest_costs(&sample_params(), &sample_pricing()).unwrap();
        assert!(result.selected_providers.contains_key("L1"));
        assert!(result.selected_providers.contains_key("L2"));
        assert!(result.selected_providers.contains_key("L3_hot"));
        assert_eq!(result.currency, "USD");
        assert_eq!(result.cheapest_path.len(), 6); // L1, Hot, Cool, Archive, L4, L5
    }

    #[test]
    fn rejects_pricing_with_unknown_provider_key() {
        let mut pricing = sample_pricing();
        pricing.insert("digitalocean".to_string(), json!({}));
        let err = calculate_cheapest_costs(&sample_params(), &pricing).unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidParams(_)));
    }

    #[test]
    fn validate_credentials_rejects_non_object_payload() {
        let mut creds = BTreeMap::new();
        creds.insert("aws".to_string(), json!("not-an-object"));
        assert!(validate_credentials(&creds).is_err());
    }
}
