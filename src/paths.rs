//! Path algebra for mount points, fileset link paths and host bind roots.
//! All helpers are pure string functions over '/'-separated paths; nothing
//! here touches the filesystem. Prefix tests are component-aware: callers
//! never see `/mnt/fs` treated as a prefix of `/mnt/fs2`.

pub const SEP: char = '/';

/// Directory under the fileset link path that holds one symlink per volume.
pub const SYMLINK_DIR: &str = ".volumes";

/// Link path reported by the management API for an unlinked fileset.
pub const UNLINKED_MARKER: &str = "--";

/// Postcondition: result ends with exactly one '/'. `""` becomes `"/"`.
pub fn with_trailing_sep(p: &str) -> String {
    let mut s = p.trim_end_matches(SEP).to_string();
    s.push(SEP);
    s
}

/// Postcondition: result has no trailing '/', except the root "/" itself.
pub fn trim_trailing_sep(p: &str) -> &str {
    let t = p.trim_end_matches(SEP);
    if t.is_empty() && p.starts_with(SEP) { "/" } else { t }
}

/// Join `segment` onto `base` with a single separator between them.
pub fn join(base: &str, segment: &str) -> String {
    let b = base.trim_end_matches(SEP);
    let s = segment.trim_matches(SEP);
    let rooted = base.starts_with(SEP);
    match (b.is_empty(), s.is_empty()) {
        (_, true) => trim_trailing_sep(base).to_string(),
        (true, false) if rooted => format!("/{}", s),
        (true, false) => s.to_string(),
        (false, false) => format!("{}/{}", b, s),
    }
}

/// True when `prefix` names `path` itself or one of its ancestors.
/// Both sides are compared in trailing-separator form.
pub fn has_path_prefix(path: &str, prefix: &str) -> bool {
    with_trailing_sep(path).starts_with(&with_trailing_sep(prefix))
}

/// True when the management API reports the fileset as unlinked.
pub fn is_unlinked(link_path: &str) -> bool {
    let t = link_path.trim();
    t.is_empty() || t == UNLINKED_MARKER
}

/// Path of `path` relative to `mount`, without leading or trailing separators.
/// `None` when `path` is not under `mount`. `Some("")` when they are equal.
pub fn strip_mount_prefix(path: &str, mount: &str) -> Option<String> {
    let p = with_trailing_sep(path);
    let m = with_trailing_sep(mount);
    p.strip_prefix(m.as_str()).map(|rest| rest.trim_matches(SEP).to_string())
}

/// Re-root `path` from mount point `from` onto mount point `to`.
/// `None` when `path` is not under `from`.
pub fn rewrite_mount_prefix(path: &str, from: &str, to: &str) -> Option<String> {
    strip_mount_prefix(path, from).map(|rel| join(to, &rel))
}
