use std::sync::Arc;

use super::*;
use crate::connector::memory::Op;
use crate::connector::{ConnectorError, InMemoryConnector, InMemoryFactory};
use crate::settings::{ClusterConfig, PrimaryConfig, ScaleConfig};

fn cluster(id: &str) -> ClusterConfig {
    ClusterConfig::new(id, "gui.example", "guisecret").with_credentials("admin", "pw")
}

fn local_only() -> (ScaleConfig, InMemoryFactory, Arc<InMemoryConnector>) {
    let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot"))]);
    let conn = Arc::new(InMemoryConnector::new("100").with_filesystem("fs0", "/ibm/fs0", &["node1", "node2"]));
    let factory = InMemoryFactory::new().with("100", conn.clone());
    (cfg, factory, conn)
}

#[tokio::test]
async fn local_primary_is_effective() {
    let (cfg, factory, _) = local_only();
    let resolved = resolve_topology(&cfg, Arc::new(factory)).await.unwrap();
    assert_eq!(resolved.effective_cluster_id, "100");
    assert_eq!(resolved.effective_filesystem, "fs0");
    assert_eq!(resolved.effective_mount_point, "/ibm/fs0");
    assert_eq!(resolved.local_mount_point, "/ibm/fs0");
    assert_eq!(resolved.fileset, "csiroot");
    assert!(!resolved.is_remote());
    assert_eq!(resolved.connectors.primary_cluster_id(), "100");
    assert_eq!(resolved.connectors.len(), 1);
}

#[tokio::test]
async fn identity_mismatch_is_consistency_error() {
    let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot"))]);
    let wrong = Arc::new(InMemoryConnector::new("999").with_filesystem("fs0", "/ibm/fs0", &["node1"]));
    let factory = InMemoryFactory::new().with("100", wrong);
    let err = resolve_topology(&cfg, Arc::new(factory)).await.unwrap_err();
    assert!(matches!(err, ScaleError::Consistency(ref m) if m.contains("does not match")), "{:?}", err);
}

#[tokio::test]
async fn any_failing_cluster_aborts_resolution() {
    let cfg = ScaleConfig::new(vec![
        cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot")),
        cluster("200"),
    ]);
    let primary = Arc::new(InMemoryConnector::new("100").with_filesystem("fs0", "/ibm/fs0", &["node1"]));
    let other = Arc::new(InMemoryConnector::new("200"));
    other.fail_on(Op::ClusterId, ConnectorError::Transport("connection refused".into()));
    let factory = InMemoryFactory::new().with("100", primary).with("200", other);
    let err = resolve_topology(&cfg, Arc::new(factory)).await.unwrap_err();
    assert!(matches!(err, ScaleError::Connectivity(ref m) if m.contains("200")), "{:?}", err);
}

#[tokio::test]
async fn unreachable_cluster_is_connectivity_error() {
    let cfg = ScaleConfig::new(vec![
        cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot")),
        cluster("200"),
    ]);
    let primary = Arc::new(InMemoryConnector::new("100").with_filesystem("fs0", "/ibm/fs0", &["node1"]));
    let factory = InMemoryFactory::new().with("100", primary);
    let err = resolve_topology(&cfg, Arc::new(factory)).await.unwrap_err();
    assert_eq!(err.code_str(), "connectivity_error");
}

#[tokio::test]
async fn unmounted_filesystem_fails_without_mutation() {
    let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot"))]);
    let conn = Arc::new(InMemoryConnector::new("100").with_filesystem("fs0", "/ibm/fs0", &[]));
    let factory = InMemoryFactory::new().with("100", conn.clone());
    let err = resolve_topology(&cfg, Arc::new(factory)).await.unwrap_err();
    assert!(matches!(err, ScaleError::Consistency(ref m) if m.contains("not mounted")), "{:?}", err);
    assert_eq!(conn.mutations(), 0);
    assert_eq!(conn.calls(Op::ListFileset), 0);
}

#[tokio::test]
async fn remote_cluster_becomes_effective() {
    let cfg = ScaleConfig::new(vec![
        cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot").with_remote("200", Some("gpfs1"))),
        cluster("200"),
    ]);
    let local = Arc::new(InMemoryConnector::new("100").with_filesystem("fs0", "/ibm/fs0", &["node1"]));
    let remote = Arc::new(InMemoryConnector::new("200").with_filesystem("gpfs1", "/gpfs/gpfs1", &["r1"]));
    let factory = InMemoryFactory::new().with("100", local).with("200", remote.clone());
    let resolved = resolve_topology(&cfg, Arc::new(factory)).await.unwrap();
    assert!(resolved.is_remote());
    assert_eq!(resolved.effective_cluster_id, "200");
    assert_eq!(resolved.effective_filesystem, "gpfs1");
    assert_eq!(resolved.effective_mount_point, "/gpfs/gpfs1");
    assert_eq!(resolved.local_filesystem, "fs0");
    assert_eq!(resolved.local_mount_point, "/ibm/fs0");
    assert_eq!(remote.calls(Op::MountDetails), 1);
}

#[tokio::test]
async fn remote_filesystem_must_be_mounted() {
    let cfg = ScaleConfig::new(vec![
        cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot").with_remote("200", None)),
        cluster("200"),
    ]);
    let local = Arc::new(InMemoryConnector::new("100").with_filesystem("fs0", "/ibm/fs0", &["node1"]));
    // remoteFs unset: the remote side is queried for the same filesystem name
    let remote = Arc::new(InMemoryConnector::new("200").with_filesystem("fs0", "/gpfs/fs0", &[]));
    let factory = InMemoryFactory::new().with("100", local).with("200", remote);
    let err = resolve_topology(&cfg, Arc::new(factory)).await.unwrap_err();
    assert!(matches!(err, ScaleError::Consistency(ref m) if m.contains("cluster 200")), "{:?}", err);
}

#[tokio::test]
async fn non_absolute_mount_point_fails_before_any_mutation() {
    for bad in ["", "ibm/fs0"] {
        let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot"))]);
        let conn = Arc::new(InMemoryConnector::new("100").with_filesystem("fs0", bad, &["n1"]));
        let factory = InMemoryFactory::new().with("100", conn.clone());
        let err = resolve_topology(&cfg, Arc::new(factory)).await.unwrap_err();
        assert!(matches!(err, ScaleError::Consistency(ref m) if m.contains("invalid mount point")), "{:?}", err);
        assert_eq!(conn.mutations(), 0);
        assert_eq!(conn.calls(Op::ListFileset), 0);
    }
}

#[tokio::test]
async fn remote_mount_point_must_be_absolute() {
    let cfg = ScaleConfig::new(vec![
        cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot").with_remote("200", Some("gpfs1"))),
        cluster("200"),
    ]);
    let local = Arc::new(InMemoryConnector::new("100").with_filesystem("fs0", "/ibm/fs0", &["node1"]));
    let remote = Arc::new(InMemoryConnector::new("200").with_filesystem("gpfs1", "", &["r1"]));
    let factory = InMemoryFactory::new().with("100", local.clone()).with("200", remote.clone());
    let err = resolve_topology(&cfg, Arc::new(factory)).await.unwrap_err();
    assert!(matches!(err, ScaleError::Consistency(ref m) if m.contains("cluster 200")), "{:?}", err);
    assert_eq!(local.mutations() + remote.mutations(), 0);
}

#[tokio::test]
async fn factory_hands_out_registered_connector() {
    let (cfg, factory, conn) = local_only();
    let registered = factory.connector("100").unwrap();
    assert!(Arc::ptr_eq(&registered, &conn));
    assert!(factory.connector("200").is_none());
    let resolved = resolve_topology(&cfg, Arc::new(factory)).await.unwrap();
    assert_eq!(resolved.effective_mount_point, "/ibm/fs0");
    assert_eq!(conn.calls(Op::ClusterId), 1);
}
