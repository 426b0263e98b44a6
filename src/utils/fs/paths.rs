//! Path utilities for normalization and load-path boundary checks.

use std::path::{Component, Path, PathBuf};

/// Normalizes a path lexically, resolving `.` and `..` without touching the
/// filesystem.
///
/// Symlinks are not followed; a `..` removes the preceding component even if
/// that component is a symlink.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {} // Skip .
            Component::ParentDir => {
                // Never pop the root or a prefix
                match components.last() {
                    Some(Component::Normal(_)) => {
                        components.pop();
                    }
                    Some(Component::RootDir | Component::Prefix(_)) => {}
                    _ => components.push(component),
                }
            }
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Returns true when `path` (relative paths are joined to `base`) stays
/// inside `base` after normalization.
#[must_use]
pub fn is_safe_path(base: &Path, path: &Path) -> bool {
    let normalized_base = normalize_path(base);
    let normalized_path = if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    };

    normalized_path.starts_with(normalized_base)
}
