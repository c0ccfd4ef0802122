//! Dataset directory layout: image extensions and class directory discovery.
//!
//! A dataset root holds one subdirectory per class. Class ids are assigned
//! in sorted name order starting at zero.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::DatacleanError;

/// Image file extensions kept by cleanup and scanned by the manifest phase,
/// lowercase and without the leading dot. The order is the manifest scan order.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "jpe"];

/// Top-level directory name left out of class enumeration by default.
pub const DEFAULT_EXCLUDED_CLASS: &str = "test";

/// A class directory with its assigned id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassDir {
    pub id: usize,
    pub name: String,
    pub path: PathBuf,
}

/// Lowercased extension of `path` if it is one of [`IMAGE_EXTENSIONS`].
pub fn image_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// True if `path` carries a supported image extension (case-insensitive).
pub fn has_image_extension(path: &Path) -> bool {
    image_extension(path).is_some()
}

pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// List the immediate subdirectories of `root`, sorted by name.
pub fn list_subdirs(root: &Path) -> Result<Vec<PathBuf>, DatacleanError> {
    if !root.is_dir() {
        return Err(DatacleanError::RootNotFound {
            path: root.to_path_buf(),
        });
    }

    let entries = fs::read_dir(root).map_err(|source| DatacleanError::ReadDir {
        path: root.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DatacleanError::ReadDir {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }

    dirs.sort();
    Ok(dirs)
}

/// Enumerate class directories under `root`, skipping hidden directories and
/// the one named `exclude`.
pub fn class_dirs(root: &Path, exclude: &str) -> Result<Vec<ClassDir>, DatacleanError> {
    let mut classes = Vec::new();

    for path in list_subdirs(root)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping class directory with non UTF-8 name: {}", path.display());
            continue;
        };
        if name == exclude || is_hidden(name) {
            continue;
        }

        classes.push(ClassDir {
            id: classes.len(),
            name: name.to_string(),
            path: path.clone(),
        });
    }

    Ok(classes)
}
