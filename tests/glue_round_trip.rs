//! Glue (L0) connections round-trip through `config_inter_cloud.json`:
//! deploying an edge persists it, and a second deploy of the same edge
//! is idempotent rather than rebinding a new receiver.

use std::collections::BTreeMap;

use twin2multicloud::config::{Hierarchy, InterCloudConnections, Mode, OptimizationFlags, TwinConfig};
use twin2multicloud::context::DeploymentContext;
use twin2multicloud::glue;

fn context_in(dir: &std::path::Path) -> DeploymentContext {
    let config = TwinConfig {
        digital_twin_name: "cross-cloud-twin".to_string(),
        mode: Mode::Debug,
        hot_storage_days: 7,
        cold_storage_days: 30,
        archive_storage_days: 365,
        iot_devices: Vec::new(),
        events: Vec::new(),
        hierarchy: Hierarchy::None,
        providers: BTreeMap::new(),
        optimization: OptimizationFlags::default(),
        inter_cloud: InterCloudConnections::default(),
    };
    DeploymentContext::new("cross-cloud-twin", dir.to_path_buf(), config, BTreeMap::new(), BTreeMap::new())
}

#[test]
fn deploy_l0_persists_the_connection_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_in(dir.path());

    let connection = glue::deploy_l0(&mut ctx, "l2", "l3_cold").unwrap();
    assert!(connection.url.starts_with("http://"));
    assert_eq!(connection.token.len(), 32);

    let persisted = std::fs::read_to_string(dir.path().join("config_inter_cloud.json")).unwrap();
    assert!(persisted.contains("l2_to_l3_cold"));
}

#[test]
fn redeploying_the_same_edge_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_in(dir.path());

    let first = glue::deploy_l0(&mut ctx, "l1", "l2").unwrap();
    let second = glue::deploy_l0(&mut ctx, "l1", "l2").unwrap();
    assert_eq!(first.url, second.url);
    assert_eq!(first.token, second.token);
}

#[test]
fn destroy_l0_removes_the_persisted_connection() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context_in(dir.path());

    glue::deploy_l0(&mut ctx, "l1", "l2").unwrap();
    glue::destroy_l0(&mut ctx, "l1", "l2").unwrap();
    assert!(ctx.get_inter_cloud_connection("l1", "l2").is_err());
}
