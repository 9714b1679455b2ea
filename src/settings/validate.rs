use std::collections::HashSet;

use crate::error::{ScaleError, ScaleResult};

use super::ScaleConfig;

/// Check a declaration for structural and semantic validity.
/// Returns the first violation; never repairs anything.
pub fn validate_scale_config(cfg: &ScaleConfig) -> ScaleResult<()> {
    tracing::debug!(target: "scale_csi::settings", "validating scale config clusters={}", cfg.clusters.len());
    if cfg.clusters.is_empty() {
        return Err(ScaleError::config("missing cluster information in scale configuration"));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut primary_found = false;
    let mut remote_for_primary: Option<&str> = None;
    let mut non_primary: Vec<&str> = Vec::new();

    for cluster in &cfg.clusters {
        let host_missing = cluster.rest_api.first().map(|r| r.gui_host.trim().is_empty()).unwrap_or(true);
        if cluster.id.is_empty() || host_missing {
            return Err(ScaleError::config(format!("mandatory parameters not specified for cluster '{}'", cluster.id)));
        }
        if !seen.insert(cluster.id.as_str()) {
            return Err(ScaleError::config(format!("cluster '{}' declared more than once", cluster.id)));
        }

        if let Some(primary) = &cluster.primary {
            if primary_found {
                return Err(ScaleError::config("more than one primary cluster specified"));
            }
            primary_found = true;
            if primary.primary_fs.is_empty() || primary.primary_fset.is_empty() {
                return Err(ScaleError::config(format!("mandatory parameters not specified for primary cluster '{}'", cluster.id)));
            }
            if let Some(raw) = primary.inode_limit.as_deref() {
                match raw.trim().parse::<u64>() {
                    Ok(n) if n > 0 => {}
                    _ => return Err(ScaleError::config(format!("invalid inode limit '{}' for primary cluster '{}'", raw, cluster.id))),
                }
            }
            remote_for_primary = primary.remote_cluster();
        } else {
            non_primary.push(cluster.id.as_str());
        }

        if cluster.secrets.is_empty() || cluster.mgmt_username.is_empty() || cluster.mgmt_password.is_empty() {
            return Err(ScaleError::config(format!("invalid secret specified for cluster '{}'", cluster.id)));
        }
        if cluster.secure_ssl_mode && cluster.cacert_value.is_none() {
            return Err(ScaleError::config(format!("CA certificate not specified in secure SSL mode for cluster '{}'", cluster.id)));
        }
    }

    if !primary_found {
        return Err(ScaleError::config("no primary cluster specified"));
    }

    if let Some(remote) = remote_for_primary {
        if !non_primary.contains(&remote) {
            return Err(ScaleError::config(format!(
                "remote cluster '{}' specified for primary filesystem, but no definition found for it in config",
                remote
            )));
        }
    }
    Ok(())
}
