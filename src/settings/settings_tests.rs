use super::*;
use crate::error::ScaleError;

fn cluster(id: &str) -> ClusterConfig {
    ClusterConfig::new(id, &format!("gui-{}.example", id), "guisecret").with_credentials("admin", "passw0rd")
}

fn single_primary() -> ScaleConfig {
    ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot"))])
}

fn expect_config_err(cfg: &ScaleConfig, needle: &str) {
    match validate_scale_config(cfg) {
        Err(ScaleError::Config(msg)) => assert!(msg.contains(needle), "unexpected message: {}", msg),
        other => panic!("expected config error containing '{}', got {:?}", needle, other),
    }
}

#[test]
fn valid_single_cluster() {
    validate_scale_config(&single_primary()).unwrap();
}

#[test]
fn empty_declaration_rejected() {
    expect_config_err(&ScaleConfig::default(), "missing cluster information");
}

#[test]
fn zero_primaries_rejected() {
    let cfg = ScaleConfig::new(vec![cluster("100"), cluster("200")]);
    expect_config_err(&cfg, "no primary cluster");
}

#[test]
fn multiple_primaries_rejected() {
    let cfg = ScaleConfig::new(vec![
        cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot")),
        cluster("200").with_primary(PrimaryConfig::new("fs1", "csiroot")),
    ]);
    expect_config_err(&cfg, "more than one primary");
}

#[test]
fn missing_endpoint_or_host_rejected() {
    let mut c = cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot"));
    c.rest_api.clear();
    expect_config_err(&ScaleConfig::new(vec![c.clone()]), "mandatory parameters not specified for cluster");

    c.rest_api = vec![RestApi::new("  ")];
    expect_config_err(&ScaleConfig::new(vec![c]), "mandatory parameters not specified for cluster");
}

#[test]
fn empty_id_rejected() {
    let c = cluster("").with_primary(PrimaryConfig::new("fs0", "csiroot"));
    expect_config_err(&ScaleConfig::new(vec![c]), "mandatory parameters");
}

#[test]
fn duplicate_ids_rejected() {
    let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot")), cluster("100")]);
    expect_config_err(&cfg, "declared more than once");
}

#[test]
fn primary_requires_fs_and_fileset() {
    let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", ""))]);
    expect_config_err(&cfg, "mandatory parameters not specified for primary cluster");
}

#[test]
fn credentials_required() {
    let c = ClusterConfig::new("100", "gui", "guisecret").with_primary(PrimaryConfig::new("fs0", "csiroot"));
    expect_config_err(&ScaleConfig::new(vec![c]), "invalid secret");

    let c = ClusterConfig::new("100", "gui", "").with_credentials("u", "p").with_primary(PrimaryConfig::new("fs0", "csiroot"));
    expect_config_err(&ScaleConfig::new(vec![c]), "invalid secret");
}

#[test]
fn secure_ssl_requires_cacert() {
    let c = cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot")).with_secure_ssl(None);
    expect_config_err(&ScaleConfig::new(vec![c]), "CA certificate");

    let c = cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot")).with_secure_ssl(Some(b"-----BEGIN CERTIFICATE-----".to_vec()));
    validate_scale_config(&ScaleConfig::new(vec![c])).unwrap();
}

#[test]
fn inode_limit_must_be_positive_integer() {
    let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot").with_inode_limit("lots"))]);
    expect_config_err(&cfg, "invalid inode limit");

    let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot").with_inode_limit("0"))]);
    expect_config_err(&cfg, "invalid inode limit");

    let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot").with_inode_limit("1048576"))]);
    validate_scale_config(&cfg).unwrap();
    assert_eq!(cfg.clusters[0].primary.as_ref().unwrap().inode_limit(), Some(1_048_576));
}

#[test]
fn remote_cluster_must_be_declared() {
    let cfg = ScaleConfig::new(vec![cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot").with_remote("300", Some("rfs")))]);
    expect_config_err(&cfg, "remote cluster '300'");

    let cfg = ScaleConfig::new(vec![
        cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot").with_remote("300", Some("rfs"))),
        cluster("300"),
    ]);
    validate_scale_config(&cfg).unwrap();
}

#[test]
fn remote_cluster_cannot_be_the_primary_itself() {
    let cfg = ScaleConfig::new(vec![
        cluster("100").with_primary(PrimaryConfig::new("fs0", "csiroot").with_remote("100", None)),
        cluster("200"),
    ]);
    expect_config_err(&cfg, "remote cluster '100'");
}

#[test]
fn parse_declaration_json() {
    let text = r#"{
        "clusters": [
            {
                "id": "235",
                "primary": { "primaryFs": "fs0", "primaryFset": "csiroot", "inodeLimit": "50000", "remoteCluster": "466" },
                "secureSslMode": false,
                "secrets": "secret1",
                "restApi": [ { "guiHost": "gui1.example" } ]
            },
            {
                "id": "466",
                "primary": {},
                "secrets": "secret2",
                "restApi": [ { "guiHost": "gui2.example", "guiPort": 8443 } ]
            }
        ]
    }"#;
    let cfg = ScaleConfig::from_json_str(text).unwrap();
    assert_eq!(cfg.clusters.len(), 2);
    let (c, p) = cfg.primary_cluster().unwrap();
    assert_eq!(c.id, "235");
    assert_eq!(p.primary_fs, "fs0");
    assert_eq!(p.remote_cluster(), Some("466"));
    // remoteFs absent: same filesystem name on the remote side
    assert_eq!(p.remote_fs(), "fs0");
    assert_eq!(c.rest_api[0].gui_port, DEFAULT_GUI_PORT);
    assert!(cfg.cluster("466").unwrap().primary.is_none());
    assert_eq!(cfg.cluster("466").unwrap().rest_api[0].gui_port, 8443);
    // credentials never come from the file
    assert!(c.mgmt_username.is_empty());
}

#[test]
fn load_from_file_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spectrum-scale-config.json");
    std::fs::write(&path, r#"{"clusters":[{"id":"1","secrets":"s","restApi":[{"guiHost":"h"}],"primary":{"primaryFs":"fs0","primaryFset":"root"}}]}"#).unwrap();
    let cfg = load_scale_config(&path).unwrap();
    assert_eq!(cfg.clusters[0].id, "1");

    let missing = dir.path().join("nope.json");
    let err = load_scale_config(&missing).unwrap_err();
    assert!(format!("{:#}", err).contains("failed to read scale config"));

    std::fs::write(&path, "{ not json").unwrap();
    let err = load_scale_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("failed to parse scale config"));
}

#[test]
fn config_path_follows_environment() {
    let saved = std::env::var(CONFIG_PATH_ENV).ok();

    std::env::set_var(CONFIG_PATH_ENV, "/etc/scale/clusters.json");
    assert_eq!(config_path_from_env(), PathBuf::from("/etc/scale/clusters.json"));

    std::env::remove_var(CONFIG_PATH_ENV);
    assert_eq!(config_path_from_env(), PathBuf::from(DEFAULT_CONFIG_PATH));

    std::env::set_var(CONFIG_PATH_ENV, "   ");
    assert_eq!(config_path_from_env(), PathBuf::from(DEFAULT_CONFIG_PATH));

    match saved {
        Some(v) => std::env::set_var(CONFIG_PATH_ENV, v),
        None => std::env::remove_var(CONFIG_PATH_ENV),
    }
}
