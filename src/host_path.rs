//! Host bind-mount cross-check.
//!
//! The management API cannot tell whether the path the plugin container has
//! bind-mounted from the host actually reaches the filesystem it reports, so
//! this is checked locally: the bind root must be related by prefix to the
//! fileset link path or the mount point, in either direction. Any one of the
//! four relations is accepted; a bind root that is an ancestor of the mount
//! point passes even if it is much broader than the data path.

use crate::error::{ScaleError, ScaleResult};
use crate::paths;

/// Env var carrying the host-visible bind-mount root.
pub const HOST_PATH_ENV: &str = "SCALE_HOSTPATH";

/// Read the bind root from `SCALE_HOSTPATH`; absence is a configuration error.
pub fn host_path_from_env() -> ScaleResult<String> {
    match std::env::var(HOST_PATH_ENV) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ScaleError::config(format!("{} not defined in daemonset", HOST_PATH_ENV))),
    }
}

pub fn validate_host_path(bind_root: &str, link_path: &str, mount_point: &str) -> ScaleResult<()> {
    tracing::debug!(target: "scale_csi::host_path", "validate host path: bind_root={} link={} mount={}", bind_root, link_path, mount_point);
    if bind_root.trim().is_empty() {
        return Err(ScaleError::config(format!("{} is empty", HOST_PATH_ENV)));
    }
    let host = paths::with_trailing_sep(bind_root);
    let link = paths::with_trailing_sep(link_path);
    let mount = paths::with_trailing_sep(mount_point);

    let related = link.starts_with(&host)
        || mount.starts_with(&host)
        || host.starts_with(&link)
        || host.starts_with(&mount);
    if !related {
        return Err(ScaleError::consistency(format!(
            "invalid {} {}: not related to fileset link path {} or mount point {}",
            HOST_PATH_ENV, bind_root, link_path, mount_point
        )));
    }
    Ok(())
}
