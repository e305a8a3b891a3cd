//! End-to-end twin config loading against a realistic multi-file
//! project directory, plus naming-prefix stability across providers.

use std::fs;

use twin2multicloud::config::{LayerSlot, TwinConfig};
use twin2multicloud::naming::{AwsNaming, AzureNaming, GcpNaming};

fn write_full_project(dir: &std::path::Path) {
    fs::write(
        dir.join("config.json"),
        r#"{"digital_twin_name":"factory-floor","hot_storage_size_in_days":7,"cold_storage_size_in_days":30,"archive_storage_size_in_days":365,"mode":"PRODUCTION"}"#,
    )
    .unwrap();
    fs::write(
        dir.join("config_providers.json"),
        r#"{"layer_1_provider":"aws","layer_2_provider":"aws","layer_3_hot_provider":"aws","layer_3_cold_provider":"azure","layer_3_archive_provider":"gcp","layer_4_provider":"aws","layer_5_provider":"aws"}"#,
    )
    .unwrap();
    fs::write(
        dir.join("config_iot_devices.json"),
        r#"[{"id":"press-1","type":"sensor"},{"id":"press-2","type":"sensor"}]"#,
    )
    .unwrap();
    fs::write(
        dir.join("config_optimization.json"),
        r#"{"use_event_checking":true,"integrate_error_handling":true}"#,
    )
    .unwrap();
}

#[test]
fn loads_a_cross_cloud_twin_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_full_project(dir.path());

    let config = TwinConfig::load(dir.path()).unwrap();
    assert_eq!(config.digital_twin_name, "factory-floor");
    assert_eq!(config.iot_devices.len(), 2);
    assert_eq!(config.provider_for(LayerSlot::L3Hot), Some("aws"));
    assert_eq!(config.provider_for(LayerSlot::L3Cold), Some("azure"));
    assert_eq!(config.provider_for(LayerSlot::L3Archive), Some("gcp"));
    assert!(config.optimization.use_event_checking);
    assert!(config.optimization.integrate_error_handling);
    assert!(!config.optimization.trigger_notification_workflow);
}

#[test]
fn naming_prefixes_stay_stable_across_providers_and_calls() {
    let aws = AwsNaming::new("factory-floor");
    let azure = AzureNaming::new("factory-floor");
    let gcp = GcpNaming::new("factory-floor");

    assert_eq!(aws.ingestion_lambda_function(), aws.ingestion_lambda_function());
    assert!(aws.ingestion_lambda_function().starts_with("factory-floor"));
    assert!(azure.resource_group().starts_with("factory-floor"));
    assert!(gcp.pubsub_topic("ingest").starts_with("factory-floor"));

    assert_ne!(aws.hot_dynamodb_table(), azure.cosmos_hot_container());
}
