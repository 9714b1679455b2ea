//! Management-API surface consumed by the bootstrap.
//! Concrete REST clients live with the plugin; this crate only sees the trait.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::ClusterConfig;

pub mod memory;

pub use memory::{InMemoryConnector, InMemoryFactory};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("management api returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ConnectorError {
    pub fn is_not_found(&self) -> bool { matches!(self, ConnectorError::NotFound(_)) }
}

/// Mount state of a filesystem as reported by one cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilesystemMount {
    pub mount_point: String,
    #[serde(default)]
    pub nodes_mounted: Vec<String>,
}

impl FilesystemMount {
    pub fn is_mounted(&self) -> bool { !self.nodes_mounted.is_empty() }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilesetInfo {
    pub name: String,
    /// Empty or `--` while the fileset is unlinked.
    #[serde(default)]
    pub link_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateFilesetOptions {
    pub inode_limit: Option<u64>,
}

/// One authenticated handle per declared cluster. All calls block.
pub trait ClusterConnector: Send + Sync {
    fn cluster_id(&self) -> Result<String, ConnectorError>;
    fn filesystem_mount_details(&self, filesystem: &str) -> Result<FilesystemMount, ConnectorError>;
    fn list_fileset(&self, filesystem: &str, name: &str) -> Result<FilesetInfo, ConnectorError>;
    fn create_fileset(&self, filesystem: &str, name: &str, opts: &CreateFilesetOptions) -> Result<(), ConnectorError>;
    fn link_fileset(&self, filesystem: &str, name: &str, target_path: &str) -> Result<(), ConnectorError>;
    /// Must succeed when the directory already exists.
    fn make_directory(&self, filesystem: &str, path: &str, uid: u32, gid: u32) -> Result<(), ConnectorError>;
}

pub type SharedConnector = Arc<dyn ClusterConnector>;

/// Builds a connector from a cluster declaration.
pub trait ConnectorFactory: Send + Sync {
    fn connect(&self, cluster: &ClusterConfig) -> Result<SharedConnector, ConnectorError>;
}

impl<F> ConnectorFactory for F
where
    F: Fn(&ClusterConfig) -> Result<SharedConnector, ConnectorError> + Send + Sync,
{
    fn connect(&self, cluster: &ClusterConfig) -> Result<SharedConnector, ConnectorError> {
        self(cluster)
    }
}
