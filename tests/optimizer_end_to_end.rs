//! End-to-end cheapest-path optimization against a realistic
//! three-provider pricing snapshot, including a currency conversion.

use std::collections::BTreeMap;

use serde_json::json;

use twin2multicloud::config::OptimizationFlags;
use twin2multicloud::optimizer::{calculate_cheapest_costs, OptimizeParams, PricingSnapshot};

fn pricing() -> PricingSnapshot {
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
            "transfer": {"toAzure": 0.02, "toGcp": 0.02},
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
            "transfer": {"toAws": 0.02, "toGcp": 0.02},
        }),
    );
    p.insert(
        "gcp".to_string(),
        json!({
            "cloudFunctions": {"requestPrice": 0.0000004, "durationPrice": 0.0000025, "freeRequests": 2_000_000, "freeComputeTime": 400_000},
            "firestore": {"writePrice": 0.00000018, "readPrice": 0.00000006, "storagePrice": 0.18, "freeStorage": 1},
            "cloudStorage": {"nearlineStoragePrice": 0.01, "archiveStoragePrice": 0.0012},
            "pubsub": {"messageTiers": [{"limit": "Infinity", "price": 0.04}], "connectivityPricePerDevice": 0.0},
            "transfer": {"toAws": 0.02, "toAzure": 0.02},
        }),
    );
    p
}

fn params(currency: &str) -> OptimizeParams {
    OptimizeParams {
        number_of_devices: 250,
        device_sending_interval_minutes: 10.0,
        average_message_size_kb: 2.0,
        hot_storage_duration_months: 1.0,
        cool_storage_duration_months: 3.0,
        archive_storage_duration_months: 12.0,
        entity_count: 250,
        dashboard_refreshes_per_hour: 6.0,
        dashboard_active_hours_per_day: 10.0,
        amount_of_active_editors: 3,
        amount_of_active_viewers: 10,
        optimization: OptimizationFlags {
            use_event_checking: true,
            trigger_notification_workflow: true,
            return_feedback_to_device: false,
            integrate_error_handling: true,
            needs_3d_model: false,
        },
        currency: currency.to_string(),
    }
}

#[test]
fn picks_a_complete_cross_layer_plan() {
    let result = calculate_cheapest_costs(&params("USD"), &pricing()).unwrap();
    assert!(result.selected_providers.contains_key("L1"));
    assert!(result.selected_providers.contains_key("L2"));
    assert!(result.selected_providers.contains_key("L3_hot"));
    assert!(result.selected_providers.contains_key("L3_cool"));
    assert!(result.selected_providers.contains_key("L3_archive"));
    assert_eq!(result.currency, "USD");
    for layer_costs in [&result.aws_costs, &result.azure_costs, &result.gcp_costs] {
        for record in layer_costs.values() {
            assert!(record.total_monthly_cost >= 0.0);
        }
    }
}

#[test]
fn converts_the_whole_report_to_a_requested_currency() {
    let mut pricing_with_rates = pricing();
    let mut rates = BTreeMap::new();
    rates.insert("EUR".to_string(), 0.9);
    pricing_with_rates.insert("_rates".to_string(), serde_json::to_value(&rates).unwrap());

    let usd = calculate_cheapest_costs(&params("USD"), &pricing_with_rates).unwrap();
    let eur = calculate_cheapest_costs(&params("EUR"), &pricing_with_rates).unwrap();

    assert_eq!(eur.currency, "EUR");
    let usd_total: f64 = usd.aws_costs.values().map(|r| r.total_monthly_cost).sum();
    let eur_total: f64 = eur.aws_costs.values().map(|r| r.total_monthly_cost).sum();
    if usd_total > 0.0 {
        assert!((eur_total - usd_total * 0.9).abs() < 1e-6 * usd_total.max(1.0));
    }
}
