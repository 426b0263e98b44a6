//! Logical path helpers.
//!
//! A logical path is a file's path relative to its load path, always written
//! with `/`, with the extension chain cut after the format extension:
//!
//! | File (relative)            | Logical path          |
//! |----------------------------|-----------------------|
//! | `application.js.coffee`    | `application.js`      |
//! | `unknownexts.min.js`       | `unknownexts.min.js`  |
//! | `coffee/index.js`          | `coffee.js`           |
//! | `images/logo.png`          | `images/logo.png`     |

use std::path::{Component, Path};

use super::render::{mime_type_for, split_extensions};

/// Joins the normal components of `path` with `/`.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Logical path for a file path relative to its load path.
#[must_use]
pub fn logical_path_of(relative: &Path) -> String {
    let parent = relative.parent().map(to_slash).unwrap_or_default();
    let Some(file_name) = relative.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return parent;
    };

    let (base, extensions) = split_extensions(&file_name);
    let format_position = extensions.iter().position(|ext| mime_type_for(ext).is_some());

    let name = match format_position {
        // dir/index.js is addressed as dir.js
        Some(0) if base == "index" && !parent.is_empty() => {
            return format!("{parent}{}", extensions[0]);
        }
        Some(position) => format!("{base}{}", extensions[..=position].concat()),
        None => file_name.clone(),
    };

    if parent.is_empty() {
        name
    } else {
        format!("{parent}/{name}")
    }
}

/// Splits a logical path into the part before its extension and the extension.
///
/// `format_extension` wins when the logical path ends with it; otherwise the
/// last extension of the file name is used.
#[must_use]
pub fn split_logical<'a>(logical_path: &'a str, format_extension: &str) -> (&'a str, &'a str) {
    if !format_extension.is_empty()
        && let Some(stem) = logical_path.strip_suffix(format_extension)
    {
        return (stem, &logical_path[stem.len()..]);
    }

    let name_start = logical_path.rfind('/').map_or(0, |i| i + 1);
    match logical_path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => logical_path.split_at(name_start + dot),
        _ => (logical_path, ""),
    }
}
