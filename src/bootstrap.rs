//! Startup sequence that turns a cluster declaration into a `ResolvedTopology`.
//!
//! Order: host-path source, declaration validation, connector setup, topology
//! resolution, primary fileset, mount-point rewrite, host-path validation,
//! symlink namespace. The first failure ends the run; nothing partial is
//! published to the volume handlers.

use std::sync::Arc;

use tracing::{error, info};

use crate::connector::{ConnectorFactory, SharedConnector};
use crate::error::{BootstrapError, ScaleError, Stage, StageExt};
use crate::fileset::ensure_primary_fileset;
use crate::host_path::{host_path_from_env, validate_host_path};
use crate::paths;
use crate::settings::{validate_scale_config, ScaleConfig};
use crate::symlink::ensure_symlink_namespace;
use crate::topology::{connect_clusters, resolve_primary, ConnectorSet, ResolvedPrimary};

/// Everything the volume handlers need about the primary root. Immutable once built.
#[derive(Clone)]
pub struct ResolvedTopology {
    connectors: ConnectorSet,
    effective_cluster_id: String,
    effective_filesystem: String,
    effective_mount_point: String,
    local_filesystem: String,
    local_mount_point: String,
    fileset: String,
    /// Fileset link path as seen under the local mount point.
    fileset_link_path: String,
    symlink_absolute_path: String,
    symlink_relative_path: String,
}

impl ResolvedTopology {
    pub fn connectors(&self) -> &ConnectorSet { &self.connectors }

    pub fn effective_cluster_id(&self) -> &str { &self.effective_cluster_id }

    pub fn effective_filesystem(&self) -> &str { &self.effective_filesystem }

    pub fn effective_mount_point(&self) -> &str { &self.effective_mount_point }

    pub fn local_filesystem(&self) -> &str { &self.local_filesystem }

    pub fn local_mount_point(&self) -> &str { &self.local_mount_point }

    pub fn fileset(&self) -> &str { &self.fileset }

    pub fn fileset_link_path(&self) -> &str { &self.fileset_link_path }

    pub fn symlink_absolute_path(&self) -> &str { &self.symlink_absolute_path }

    pub fn symlink_relative_path(&self) -> &str { &self.symlink_relative_path }

    pub fn primary_cluster_id(&self) -> &str { self.connectors.primary_cluster_id() }

    pub fn primary_connector(&self) -> &SharedConnector { self.connectors.primary() }

    pub fn connector(&self, cluster_id: &str) -> Option<&SharedConnector> { self.connectors.get(cluster_id) }

    pub fn effective_connector(&self) -> Option<&SharedConnector> { self.connectors.get(&self.effective_cluster_id) }
}

impl std::fmt::Debug for ResolvedTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTopology")
            .field("connectors", &self.connectors)
            .field("effective_cluster_id", &self.effective_cluster_id)
            .field("effective_filesystem", &self.effective_filesystem)
            .field("effective_mount_point", &self.effective_mount_point)
            .field("local_filesystem", &self.local_filesystem)
            .field("local_mount_point", &self.local_mount_point)
            .field("fileset", &self.fileset)
            .field("fileset_link_path", &self.fileset_link_path)
            .field("symlink_absolute_path", &self.symlink_absolute_path)
            .field("symlink_relative_path", &self.symlink_relative_path)
            .finish()
    }
}

#[derive(Debug, Clone)]
enum HostPathSource {
    Env,
    Fixed(String),
}

pub struct BootstrapOrchestrator {
    config: ScaleConfig,
    factory: Arc<dyn ConnectorFactory>,
    host_path: HostPathSource,
}

impl BootstrapOrchestrator {
    /// Bind root is read from `SCALE_HOSTPATH` unless overridden.
    pub fn new(config: ScaleConfig, factory: Arc<dyn ConnectorFactory>) -> Self {
        Self { config, factory, host_path: HostPathSource::Env }
    }

    pub fn with_host_path(mut self, bind_root: &str) -> Self {
        self.host_path = HostPathSource::Fixed(bind_root.to_string());
        self
    }

    pub fn config(&self) -> &ScaleConfig { &self.config }

    pub async fn run(self) -> Result<ResolvedTopology, BootstrapError> {
        match self.run_stages().await {
            Ok(t) => {
                info!(
                    target: "scale_csi::bootstrap",
                    "plugin initialized: cluster={} filesystem={} fileset={} link={} symlinks={}",
                    t.effective_cluster_id, t.effective_filesystem, t.fileset, t.fileset_link_path, t.symlink_absolute_path
                );
                Ok(t)
            }
            Err(e) => {
                error!(target: "scale_csi::bootstrap", "plugin initialization failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_stages(self) -> Result<ResolvedTopology, BootstrapError> {
        let bind_root = match &self.host_path {
            HostPathSource::Env => host_path_from_env(),
            HostPathSource::Fixed(p) => Ok(p.clone()),
        }
        .at_stage(Stage::HostPathSource)?;

        validate_scale_config(&self.config).at_stage(Stage::ConfigValidation)?;

        let connectors = connect_clusters(&self.config, self.factory.clone()).await.at_stage(Stage::ConnectorSetup)?;
        let resolved = resolve_primary(&self.config, connectors).await.at_stage(Stage::TopologyResolution)?;

        // Remaining stages are blocking management-API calls.
        tokio::task::spawn_blocking(move || materialize(resolved, &bind_root))
            .await
            .map_err(|e| BootstrapError::new(Stage::PrimaryFileset, ScaleError::connectivity(format!("bootstrap task failed: {}", e))))?
    }
}

fn materialize(resolved: ResolvedPrimary, bind_root: &str) -> Result<ResolvedTopology, BootstrapError> {
    let effective_link = ensure_primary_fileset(
        resolved.effective_connector.as_ref(),
        &resolved.effective_filesystem,
        &resolved.effective_mount_point,
        &resolved.fileset,
        resolved.inode_limit,
    )
    .at_stage(Stage::PrimaryFileset)?;

    let link_path = local_link_path(&effective_link, &resolved.effective_mount_point, &resolved.local_mount_point)
        .at_stage(Stage::PrimaryFileset)?;

    validate_host_path(bind_root, &link_path, &resolved.local_mount_point).at_stage(Stage::HostPathValidation)?;

    let symlinks = ensure_symlink_namespace(
        resolved.connectors.primary().as_ref(),
        &resolved.local_filesystem,
        &resolved.local_mount_point,
        &link_path,
    )
    .at_stage(Stage::SymlinkNamespace)?;

    Ok(ResolvedTopology {
        connectors: resolved.connectors,
        effective_cluster_id: resolved.effective_cluster_id,
        effective_filesystem: resolved.effective_filesystem,
        effective_mount_point: resolved.effective_mount_point,
        local_filesystem: resolved.local_filesystem,
        local_mount_point: resolved.local_mount_point,
        fileset: resolved.fileset,
        fileset_link_path: link_path,
        symlink_absolute_path: symlinks.absolute,
        symlink_relative_path: symlinks.relative,
    })
}

/// Re-root a link path reported under the effective mount point onto the local one.
fn local_link_path(link: &str, effective_mount: &str, local_mount: &str) -> Result<String, ScaleError> {
    if paths::trim_trailing_sep(effective_mount) == paths::trim_trailing_sep(local_mount) {
        return Ok(link.to_string());
    }
    let rewritten = paths::rewrite_mount_prefix(link, effective_mount, local_mount).ok_or_else(|| {
        ScaleError::resource_state(format!("fileset link path {} is not under mount point {}", link, effective_mount))
    })?;
    tracing::debug!(target: "scale_csi::bootstrap", "rewrote fileset link path {} -> {}", link, rewritten);
    Ok(rewritten)
}
