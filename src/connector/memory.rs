//! In-memory `ClusterConnector` for tests and dry runs.
//! Models one cluster: its id, mounted filesystems, filesets and directories.
//! Counts mutations and supports failure injection per operation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ClusterConnector, ConnectorError, ConnectorFactory, CreateFilesetOptions, FilesetInfo, FilesystemMount, SharedConnector};
use crate::paths;
use crate::settings::ClusterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ClusterId,
    MountDetails,
    ListFileset,
    CreateFileset,
    LinkFileset,
    MakeDirectory,
}

#[derive(Debug, Default)]
struct State {
    filesystems: HashMap<String, FilesystemMount>,
    filesets: HashMap<(String, String), FilesetInfo>,
    inode_limits: HashMap<(String, String), u64>,
    directories: BTreeSet<(String, String)>,
    failures: HashMap<Op, ConnectorError>,
    calls: HashMap<Op, usize>,
}

#[derive(Debug)]
pub struct InMemoryConnector {
    reported_id: String,
    state: Mutex<State>,
}

impl InMemoryConnector {
    pub fn new(cluster_id: &str) -> Self {
        Self { reported_id: cluster_id.to_string(), state: Mutex::new(State::default()) }
    }

    pub fn with_filesystem(self, name: &str, mount_point: &str, nodes: &[&str]) -> Self {
        self.state.lock().filesystems.insert(
            name.to_string(),
            FilesystemMount { mount_point: mount_point.to_string(), nodes_mounted: nodes.iter().map(|s| s.to_string()).collect() },
        );
        self
    }

    /// Seed a fileset; pass `--` or "" for an unlinked one.
    pub fn with_fileset(self, filesystem: &str, name: &str, link_path: &str) -> Self {
        self.state.lock().filesets.insert(
            (filesystem.to_string(), name.to_string()),
            FilesetInfo { name: name.to_string(), link_path: link_path.to_string() },
        );
        self
    }

    pub fn with_directory(self, filesystem: &str, path: &str) -> Self {
        self.state.lock().directories.insert((filesystem.to_string(), path.to_string()));
        self
    }

    pub fn fail_on(&self, op: Op, err: ConnectorError) {
        self.state.lock().failures.insert(op, err);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub fn calls(&self, op: Op) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Create and link calls seen so far.
    pub fn mutations(&self) -> usize {
        self.calls(Op::CreateFileset) + self.calls(Op::LinkFileset)
    }

    pub fn fileset(&self, filesystem: &str, name: &str) -> Option<FilesetInfo> {
        self.state.lock().filesets.get(&(filesystem.to_string(), name.to_string())).cloned()
    }

    pub fn inode_limit(&self, filesystem: &str, name: &str) -> Option<u64> {
        self.state.lock().inode_limits.get(&(filesystem.to_string(), name.to_string())).copied()
    }

    pub fn has_directory(&self, filesystem: &str, path: &str) -> bool {
        self.state.lock().directories.contains(&(filesystem.to_string(), path.to_string()))
    }

    fn enter(&self, st: &mut State, op: Op) -> Result<(), ConnectorError> {
        *st.calls.entry(op).or_insert(0) += 1;
        match st.failures.get(&op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl ClusterConnector for InMemoryConnector {
    fn cluster_id(&self) -> Result<String, ConnectorError> {
        let mut st = self.state.lock();
        self.enter(&mut st, Op::ClusterId)?;
        Ok(self.reported_id.clone())
    }

    fn filesystem_mount_details(&self, filesystem: &str) -> Result<FilesystemMount, ConnectorError> {
        let mut st = self.state.lock();
        self.enter(&mut st, Op::MountDetails)?;
        st.filesystems
            .get(filesystem)
            .cloned()
            .ok_or_else(|| ConnectorError::NotFound(format!("filesystem {}", filesystem)))
    }

    fn list_fileset(&self, filesystem: &str, name: &str) -> Result<FilesetInfo, ConnectorError> {
        let mut st = self.state.lock();
        self.enter(&mut st, Op::ListFileset)?;
        st.filesets
            .get(&(filesystem.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ConnectorError::NotFound(format!("fileset {} in filesystem {}", name, filesystem)))
    }

    fn create_fileset(&self, filesystem: &str, name: &str, opts: &CreateFilesetOptions) -> Result<(), ConnectorError> {
        let mut st = self.state.lock();
        self.enter(&mut st, Op::CreateFileset)?;
        let mount = match st.filesystems.get(filesystem) {
            Some(m) => m.mount_point.clone(),
            None => return Err(ConnectorError::NotFound(format!("filesystem {}", filesystem))),
        };
        let key = (filesystem.to_string(), name.to_string());
        if st.filesets.contains_key(&key) {
            return Err(ConnectorError::Api { status: 400, message: format!("fileset {} already exists", name) });
        }
        // Created filesets are linked at the default junction under the mount point.
        st.filesets.insert(key.clone(), FilesetInfo { name: name.to_string(), link_path: paths::join(&mount, name) });
        if let Some(limit) = opts.inode_limit {
            st.inode_limits.insert(key, limit);
        }
        Ok(())
    }

    fn link_fileset(&self, filesystem: &str, name: &str, target_path: &str) -> Result<(), ConnectorError> {
        let mut st = self.state.lock();
        self.enter(&mut st, Op::LinkFileset)?;
        match st.filesets.get_mut(&(filesystem.to_string(), name.to_string())) {
            Some(f) => {
                f.link_path = target_path.to_string();
                Ok(())
            }
            None => Err(ConnectorError::NotFound(format!("fileset {} in filesystem {}", name, filesystem))),
        }
    }

    fn make_directory(&self, filesystem: &str, path: &str, _uid: u32, _gid: u32) -> Result<(), ConnectorError> {
        let mut st = self.state.lock();
        self.enter(&mut st, Op::MakeDirectory)?;
        if !st.filesystems.contains_key(filesystem) {
            return Err(ConnectorError::NotFound(format!("filesystem {}", filesystem)));
        }
        st.directories.insert((filesystem.to_string(), path.to_string()));
        Ok(())
    }
}

/// Hands out pre-built in-memory connectors by declared cluster id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFactory {
    connectors: HashMap<String, Arc<InMemoryConnector>>,
}

impl InMemoryFactory {
    pub fn new() -> Self { Self::default() }

    /// Register `conn` for the cluster declared as `declared_id`. The connector
    /// may report a different id, which is how mismatches are simulated.
    pub fn with(mut self, declared_id: &str, conn: Arc<InMemoryConnector>) -> Self {
        self.connectors.insert(declared_id.to_string(), conn);
        self
    }

    pub fn connector(&self, declared_id: &str) -> Option<Arc<InMemoryConnector>> {
        self.connectors.get(declared_id).cloned()
    }
}

impl ConnectorFactory for InMemoryFactory {
    fn connect(&self, cluster: &ClusterConfig) -> Result<SharedConnector, ConnectorError> {
        match self.connectors.get(&cluster.id) {
            Some(c) => Ok(c.clone() as SharedConnector),
            None => Err(ConnectorError::Transport(format!("no endpoint reachable for cluster {}", cluster.id))),
        }
    }
}
