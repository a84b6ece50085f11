//! Path Containment
//!
//! Turns user-supplied file names into paths that are guaranteed to stay
//! inside the storage root. Two independent steps:
//!
//! 1. [`sanitize`] strips every path separator from the raw name.
//! 2. [`resolve`] joins the result onto the root, normalizes it lexically and
//!    rejects anything that is not strictly below the root.
//!
//! Neither step touches the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Characters removed from user-supplied names
const SEPARATORS: [char; 2] = ['/', '\\'];

/// Remove every forward slash and backslash from `raw`.
///
/// `..` sequences and other characters are left untouched: with no
/// separators left they can only form a single literal name component,
/// and whatever survives is still subject to [`resolve`].
pub fn sanitize(raw: &str) -> String {
    raw.chars().filter(|c| !SEPARATORS.contains(c)).collect()
}

/// Lexically normalize `path`: `.` components are dropped and `..` pops the
/// previous component. Symlinks are not followed.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                normalized.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Join `safe_name` onto `root` and verify the normalized result is a
/// strict descendant of the normalized root.
///
/// The root itself is not a valid target, so an empty name, `.` or a name
/// that climbs back to the root is rejected just like one that escapes it.
pub fn resolve(root: &Path, safe_name: &str) -> Result<PathBuf> {
    let root = normalize(root);
    let candidate = normalize(&root.join(safe_name));

    if candidate == root || !candidate.starts_with(&root) {
        return Err(Error::InvalidPath(safe_name.to_string()));
    }

    Ok(candidate)
}
