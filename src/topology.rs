//! Cluster topology resolution.
//!
//! Verifies that every declared cluster answers with the identity it was
//! declared under, then picks the connector, filesystem and mount point that
//! host the allocation root. When the primary cluster only re-exports a
//! filesystem owned by a remote cluster, the remote side becomes effective and
//! the locally declared mount point is kept alongside it for path rewriting.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::connector::{ConnectorFactory, FilesystemMount, SharedConnector};
use crate::error::{ScaleError, ScaleResult};
use crate::settings::{ClusterConfig, ScaleConfig};

/// Verified connectors keyed by cluster id, plus the id of the primary one.
#[derive(Clone)]
pub struct ConnectorSet {
    connectors: HashMap<String, SharedConnector>,
    primary_cluster_id: String,
    primary: SharedConnector,
}

impl ConnectorSet {
    pub fn get(&self, cluster_id: &str) -> Option<&SharedConnector> { self.connectors.get(cluster_id) }

    pub fn primary_cluster_id(&self) -> &str { &self.primary_cluster_id }

    pub fn primary(&self) -> &SharedConnector { &self.primary }

    pub fn cluster_ids(&self) -> impl Iterator<Item = &str> { self.connectors.keys().map(|s| s.as_str()) }

    pub fn len(&self) -> usize { self.connectors.len() }

    pub fn is_empty(&self) -> bool { self.connectors.is_empty() }
}

impl std::fmt::Debug for ConnectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.cluster_ids().collect();
        ids.sort_unstable();
        f.debug_struct("ConnectorSet").field("clusters", &ids).field("primary_cluster_id", &self.primary_cluster_id).finish()
    }
}

/// Outcome of topology resolution; input to the fileset stage.
#[derive(Clone)]
pub struct ResolvedPrimary {
    pub connectors: ConnectorSet,
    /// Cluster that actually hosts the primary filesystem.
    pub effective_cluster_id: String,
    pub effective_connector: SharedConnector,
    pub effective_filesystem: String,
    pub effective_mount_point: String,
    /// Filesystem name and mount point as declared on the primary cluster.
    pub local_filesystem: String,
    pub local_mount_point: String,
    pub fileset: String,
    pub inode_limit: Option<u64>,
}

impl ResolvedPrimary {
    pub fn is_remote(&self) -> bool { self.effective_cluster_id != self.connectors.primary_cluster_id }
}

impl std::fmt::Debug for ResolvedPrimary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedPrimary")
            .field("connectors", &self.connectors)
            .field("effective_cluster_id", &self.effective_cluster_id)
            .field("effective_filesystem", &self.effective_filesystem)
            .field("effective_mount_point", &self.effective_mount_point)
            .field("local_filesystem", &self.local_filesystem)
            .field("local_mount_point", &self.local_mount_point)
            .field("fileset", &self.fileset)
            .field("inode_limit", &self.inode_limit)
            .finish()
    }
}

async fn connect_and_verify(
    factory: Arc<dyn ConnectorFactory>,
    cluster: ClusterConfig,
) -> ScaleResult<(String, SharedConnector)> {
    let id = cluster.id.clone();
    tokio::task::spawn_blocking(move || {
        let conn = factory.connect(&cluster).map_err(|e| {
            ScaleError::connectivity(format!("unable to initialize connector for cluster {}: {}", cluster.id, e))
        })?;
        let reported = conn.cluster_id().map_err(|e| {
            ScaleError::connectivity(format!("error getting cluster id for {}: {}", cluster.id, e))
        })?;
        if reported != cluster.id {
            return Err(ScaleError::consistency(format!(
                "cluster id {} from scale config does not match the id {} reported by the cluster",
                cluster.id, reported
            )));
        }
        Ok((reported, conn))
    })
    .await
    .map_err(|e| ScaleError::connectivity(format!("cluster {} query task failed: {}", id, e)))?
}

/// Fan out connector construction and identity checks across all clusters.
/// The first failure returns immediately and aborts the remaining tasks. Blocking
/// queries already running are not interrupted; they finish and their results
/// are dropped.
async fn verify_all(config: &ScaleConfig, factory: Arc<dyn ConnectorFactory>) -> ScaleResult<HashMap<String, SharedConnector>> {
    let mut set = JoinSet::new();
    for cluster in &config.clusters {
        set.spawn(connect_and_verify(factory.clone(), cluster.clone()));
    }
    let mut out = HashMap::with_capacity(config.clusters.len());
    while let Some(joined) = set.join_next().await {
        let res = joined
            .map_err(|e| ScaleError::connectivity(format!("cluster query task failed: {}", e)))
            .and_then(|r| r);
        match res {
            Ok((id, conn)) => {
                debug!(target: "scale_csi::topology", "cluster {} verified", id);
                out.insert(id, conn);
            }
            Err(e) => {
                set.abort_all();
                return Err(e);
            }
        }
    }
    Ok(out)
}

async fn mounted_filesystem(conn: SharedConnector, cluster_id: &str, filesystem: &str) -> ScaleResult<FilesystemMount> {
    let fs = filesystem.to_string();
    let mount = tokio::task::spawn_blocking(move || conn.filesystem_mount_details(&fs))
        .await
        .map_err(|e| ScaleError::connectivity(format!("mount query task failed: {}", e)))?
        .map_err(|e| {
            ScaleError::connectivity(format!("error getting filesystem details for {} from cluster {}: {}", filesystem, cluster_id, e))
        })?;
    if !mount.mount_point.starts_with(crate::paths::SEP) {
        return Err(ScaleError::consistency(format!(
            "filesystem {} on cluster {} reports invalid mount point '{}'",
            filesystem, cluster_id, mount.mount_point
        )));
    }
    if !mount.is_mounted() {
        return Err(ScaleError::consistency(format!(
            "primary filesystem {} not mounted on any node of cluster {}",
            filesystem, cluster_id
        )));
    }
    Ok(mount)
}

/// Build and verify one connector per declared cluster.
/// `config` must already have passed `validate_scale_config`.
pub async fn connect_clusters(config: &ScaleConfig, factory: Arc<dyn ConnectorFactory>) -> ScaleResult<ConnectorSet> {
    let (primary_cluster, _) = config
        .primary_cluster()
        .ok_or_else(|| ScaleError::config("no primary cluster specified"))?;

    let connectors = match verify_all(config, factory).await {
        Ok(c) => c,
        Err(e) => {
            error!(target: "scale_csi::topology", "cluster verification failed: {}", e);
            return Err(e);
        }
    };
    let primary = connectors
        .get(&primary_cluster.id)
        .cloned()
        .ok_or_else(|| ScaleError::consistency(format!("no connector for primary cluster {}", primary_cluster.id)))?;
    Ok(ConnectorSet { connectors, primary_cluster_id: primary_cluster.id.clone(), primary })
}

/// Pick the effective primary connector, filesystem and mount point from verified connectors.
pub async fn resolve_primary(config: &ScaleConfig, connectors: ConnectorSet) -> ScaleResult<ResolvedPrimary> {
    let (primary_cluster, primary) = config
        .primary_cluster()
        .ok_or_else(|| ScaleError::config("no primary cluster specified"))?;
    if primary_cluster.id != connectors.primary_cluster_id {
        return Err(ScaleError::consistency(format!(
            "connector set was built for primary cluster {}, config names {}",
            connectors.primary_cluster_id, primary_cluster.id
        )));
    }
    let primary_conn = connectors.primary.clone();

    let local_mount = mounted_filesystem(primary_conn.clone(), &primary_cluster.id, &primary.primary_fs).await?;
    debug!(target: "scale_csi::topology", "primary filesystem {} mounted at {} on {} node(s)", primary.primary_fs, local_mount.mount_point, local_mount.nodes_mounted.len());

    let (effective_cluster_id, effective_connector, effective_filesystem, effective_mount_point) = match primary.remote_cluster() {
        Some(remote) => {
            let remote_conn = connectors
                .get(remote)
                .cloned()
                .ok_or_else(|| ScaleError::config(format!("remote cluster {} not declared", remote)))?;
            let remote_fs = primary.remote_fs();
            let remote_mount = mounted_filesystem(remote_conn.clone(), remote, remote_fs).await?;
            info!(target: "scale_csi::topology", "primary filesystem {} is served by remote cluster {} as {} at {}", primary.primary_fs, remote, remote_fs, remote_mount.mount_point);
            (remote.to_string(), remote_conn, remote_fs.to_string(), remote_mount.mount_point)
        }
        None => (primary_cluster.id.clone(), primary_conn, primary.primary_fs.clone(), local_mount.mount_point.clone()),
    };

    Ok(ResolvedPrimary {
        connectors,
        effective_cluster_id,
        effective_connector,
        effective_filesystem,
        effective_mount_point,
        local_filesystem: primary.primary_fs.clone(),
        local_mount_point: local_mount.mount_point,
        fileset: primary.primary_fset.clone(),
        inode_limit: primary.inode_limit(),
    })
}

/// `connect_clusters` followed by `resolve_primary`.
pub async fn resolve_topology(config: &ScaleConfig, factory: Arc<dyn ConnectorFactory>) -> ScaleResult<ResolvedPrimary> {
    let connectors = connect_clusters(config, factory).await?;
    resolve_primary(config, connectors).await
}

#[cfg(test)]
mod topology_tests;
