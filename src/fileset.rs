//! Primary fileset bootstrap: make sure the allocation root exists and is linked.
//! Always checks before acting, so re-running after a partial failure converges
//! on the same link path without recreating anything.

use tracing::{debug, info};

use crate::connector::{ClusterConnector, CreateFilesetOptions};
use crate::error::{ScaleError, ScaleResult};
use crate::paths;

/// Observed state of the primary fileset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilesetState {
    NotFound,
    Unlinked,
    Linked { link_path: String },
}

/// Classify the fileset as the management API currently reports it.
pub fn fileset_state(conn: &dyn ClusterConnector, filesystem: &str, fileset: &str) -> ScaleResult<FilesetState> {
    match conn.list_fileset(filesystem, fileset) {
        Ok(info) if paths::is_unlinked(&info.link_path) => Ok(FilesetState::Unlinked),
        Ok(info) => Ok(FilesetState::Linked { link_path: info.link_path }),
        Err(e) if e.is_not_found() => Ok(FilesetState::NotFound),
        Err(e) => Err(ScaleError::connectivity(format!(
            "unable to list fileset {} in filesystem {}: {}",
            fileset, filesystem, e
        ))),
    }
}

/// Ensure `fileset` exists on `filesystem` and is linked; return its link path.
pub fn ensure_primary_fileset(
    conn: &dyn ClusterConnector,
    filesystem: &str,
    mount_point: &str,
    fileset: &str,
    inode_limit: Option<u64>,
) -> ScaleResult<String> {
    debug!(target: "scale_csi::fileset", "ensure primary fileset: filesystem={} mount={} fileset={}", filesystem, mount_point, fileset);
    let default_link = paths::join(mount_point, fileset);

    match fileset_state(conn, filesystem, fileset)? {
        FilesetState::NotFound => {
            info!(target: "scale_csi::fileset", "primary fileset {} not found; creating it", fileset);
            let opts = CreateFilesetOptions { inode_limit };
            conn.create_fileset(filesystem, fileset, &opts).map_err(|e| {
                ScaleError::connectivity(format!("unable to create primary fileset {}: {}", fileset, e))
            })?;
            Ok(default_link)
        }
        FilesetState::Unlinked => {
            info!(target: "scale_csi::fileset", "primary fileset {} not linked; linking it at {}", fileset, default_link);
            conn.link_fileset(filesystem, fileset, &default_link).map_err(|e| {
                ScaleError::connectivity(format!("unable to link primary fileset {}: {}", fileset, e))
            })?;
            Ok(default_link)
        }
        FilesetState::Linked { link_path } => {
            if !link_path.starts_with(paths::SEP) {
                return Err(ScaleError::resource_state(format!(
                    "primary fileset {} reports unrecognized link path '{}'",
                    fileset, link_path
                )));
            }
            if !paths::has_path_prefix(&link_path, mount_point) {
                return Err(ScaleError::resource_state(format!(
                    "primary fileset {} is linked at {}, outside filesystem mount point {}",
                    fileset, link_path, mount_point
                )));
            }
            info!(target: "scale_csi::fileset", "primary fileset {} exists and is linked at {}", fileset, link_path);
            Ok(link_path)
        }
    }
}
