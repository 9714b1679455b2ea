//! Symlink namespace under the primary fileset.
//! Volume handlers address the directory two ways: mount-relative for
//! management-API calls, absolute for building per-volume symlink targets.

use tracing::debug;

use crate::connector::ClusterConnector;
use crate::error::{ScaleError, ScaleResult};
use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkPaths {
    /// Host-visible path, e.g. `/ibm/fs0/csiroot/.volumes`.
    pub absolute: String,
    /// Path relative to the filesystem mount point, e.g. `csiroot/.volumes`.
    pub relative: String,
}

/// Derive both forms of the symlink directory for a fileset linked at `link_path`.
pub fn symlink_paths(mount_point: &str, link_path: &str) -> ScaleResult<SymlinkPaths> {
    let rel_fileset = paths::strip_mount_prefix(link_path, mount_point).ok_or_else(|| {
        ScaleError::consistency(format!(
            "fileset link path {} is not under filesystem mount point {}",
            link_path, mount_point
        ))
    })?;
    Ok(SymlinkPaths {
        absolute: paths::join(link_path, paths::SYMLINK_DIR),
        relative: paths::join(&rel_fileset, paths::SYMLINK_DIR),
    })
}

/// Create the symlink directory (idempotent) and return its two forms.
pub fn ensure_symlink_namespace(
    conn: &dyn ClusterConnector,
    filesystem: &str,
    mount_point: &str,
    link_path: &str,
) -> ScaleResult<SymlinkPaths> {
    debug!(target: "scale_csi::symlink", "ensure symlink dir: filesystem={} mount={} link={}", filesystem, mount_point, link_path);
    let sp = symlink_paths(mount_point, link_path)?;
    conn.make_directory(filesystem, &sp.relative, 0, 0).map_err(|e| {
        ScaleError::connectivity(format!("make directory failed on filesystem {}, path {}: {}", filesystem, sp.relative, e))
    })?;
    Ok(sp)
}
