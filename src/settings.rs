//! Multi-cluster declaration: types, JSON loading and validation.
//! Credentials are not read from the declaration file; the secret loader
//! resolves them and attaches them through the `with_*` builders.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod validate;

pub use validate::validate_scale_config;

/// Env var naming the declaration file.
pub const CONFIG_PATH_ENV: &str = "SCALE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/ibm/config/spectrum-scale-config.json";
pub const DEFAULT_GUI_PORT: u16 = 443;

fn default_gui_port() -> u16 { DEFAULT_GUI_PORT }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RestApi {
    #[serde(default)]
    pub gui_host: String,
    #[serde(default = "default_gui_port")]
    pub gui_port: u16,
}

impl RestApi {
    pub fn new(host: &str) -> Self { Self { gui_host: host.to_string(), gui_port: DEFAULT_GUI_PORT } }
}

/// Primary block: where the allocation root lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryConfig {
    #[serde(default)]
    pub primary_fs: String,
    #[serde(default)]
    pub primary_fset: String,
    /// Decimal inode-count hint for fileset creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inode_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_fs: Option<String>,
}

impl PrimaryConfig {
    pub fn new(fs: &str, fset: &str) -> Self {
        Self { primary_fs: fs.to_string(), primary_fset: fset.to_string(), ..Default::default() }
    }

    pub fn with_remote(mut self, cluster: &str, fs: Option<&str>) -> Self {
        self.remote_cluster = Some(cluster.to_string());
        self.remote_fs = fs.map(|s| s.to_string());
        self
    }

    pub fn with_inode_limit(mut self, limit: &str) -> Self {
        self.inode_limit = Some(limit.to_string());
        self
    }

    /// Remote cluster id, treating an empty string as unset.
    pub fn remote_cluster(&self) -> Option<&str> {
        self.remote_cluster.as_deref().filter(|s| !s.is_empty())
    }

    /// Filesystem name on the remote cluster; defaults to the local name.
    pub fn remote_fs(&self) -> &str {
        self.remote_fs.as_deref().filter(|s| !s.is_empty()).unwrap_or(&self.primary_fs)
    }

    /// Parsed inode limit. Callers run validation first, so a bad value reads as `None`.
    pub fn inode_limit(&self) -> Option<u64> {
        self.inode_limit.as_deref().and_then(|s| s.trim().parse::<u64>().ok())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<PrimaryConfig>,
    #[serde(default)]
    pub secure_ssl_mode: bool,
    /// Name of the secret carrying the CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cacert: Option<String>,
    /// Name of the secret carrying the management credentials.
    #[serde(default)]
    pub secrets: String,
    #[serde(default)]
    pub rest_api: Vec<RestApi>,

    #[serde(skip)]
    pub mgmt_username: String,
    #[serde(skip)]
    pub mgmt_password: String,
    #[serde(skip)]
    pub cacert_value: Option<Vec<u8>>,
}

impl ClusterConfig {
    pub fn new(id: &str, gui_host: &str, secrets: &str) -> Self {
        Self {
            id: id.to_string(),
            secrets: secrets.to_string(),
            rest_api: vec![RestApi::new(gui_host)],
            ..Default::default()
        }
    }

    pub fn with_primary(mut self, primary: PrimaryConfig) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.mgmt_username = username.to_string();
        self.mgmt_password = password.to_string();
        self
    }

    pub fn with_secure_ssl(mut self, cacert_value: Option<Vec<u8>>) -> Self {
        self.secure_ssl_mode = true;
        self.cacert_value = cacert_value;
        self
    }

    pub fn is_primary(&self) -> bool { self.primary.is_some() }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScaleConfig {
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

impl ScaleConfig {
    pub fn new(clusters: Vec<ClusterConfig>) -> Self { Self { clusters } }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut cfg: ScaleConfig = serde_json::from_str(text).context("invalid scale config json")?;
        // An all-empty primary block is the same as no primary block.
        for cluster in &mut cfg.clusters {
            if cluster.primary.as_ref() == Some(&PrimaryConfig::default()) {
                cluster.primary = None;
            }
        }
        Ok(cfg)
    }

    /// First cluster carrying a primary block.
    pub fn primary_cluster(&self) -> Option<(&ClusterConfig, &PrimaryConfig)> {
        self.clusters.iter().find_map(|c| c.primary.as_ref().map(|p| (c, p)))
    }

    pub fn cluster(&self, id: &str) -> Option<&ClusterConfig> {
        self.clusters.iter().find(|c| c.id == id)
    }
}

/// Declaration path from `SCALE_CONFIG_PATH`, or the default mount location.
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_scale_config(path: &Path) -> Result<ScaleConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scale config {}", path.display()))?;
    let cfg = ScaleConfig::from_json_str(&text)
        .with_context(|| format!("failed to parse scale config {}", path.display()))?;
    tracing::debug!(target: "scale_csi::settings", "loaded scale config from {} clusters={}", path.display(), cfg.clusters.len());
    Ok(cfg)
}

#[cfg(test)]
mod settings_tests;
