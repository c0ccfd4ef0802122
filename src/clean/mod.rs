//! Dataset cleanup: prune non-image files, drop corrupt images, and rename
//! the survivors to `<folder>_<n>.<ext>`.
//!
//! Only files directly inside each top-level subfolder are touched. Nested
//! directories are left as they are.

mod report;

pub use report::{CleanReport, Rename};

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DatacleanError;
use crate::layout::{has_image_extension, image_extension, list_subdirs, IMAGE_EXTENSIONS};
use crate::verify::{check_image, CheckOutcome, FailureLog, FAILURE_LOG_NAME};

/// Options for the cleanup phase.
#[derive(Clone, Debug, Default)]
pub struct CleanOptions {
    /// Where corrupt image paths are appended. Defaults to `False.txt` in the root.
    pub failure_log: Option<PathBuf>,
}

impl CleanOptions {
    /// Resolve the failure log location for a dataset root.
    pub fn failure_log_path(&self, root: &Path) -> PathBuf {
        self.failure_log
            .clone()
            .unwrap_or_else(|| root.join(FAILURE_LOG_NAME))
    }
}

/// Clean every immediate subdirectory of `root`.
///
/// A permission error while processing a subfolder abandons that subfolder
/// and moves on. Other I/O errors end the run.
pub fn clean_tree(root: &Path, opts: &CleanOptions) -> Result<CleanReport, DatacleanError> {
    let failure_log = FailureLog::new(opts.failure_log_path(root));
    let mut report = CleanReport::new();

    log::info!("Cleaning image folders under {}", root.display());

    for subfolder in list_subdirs(root)? {
        let name = subfolder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        report.folders += 1;
        match clean_subfolder(&subfolder, &name, &failure_log, &mut report) {
            Ok(()) => {}
            Err(err) if err.is_permission_denied() => {
                log::error!(
                    "Failed to rename files in subfolder {}: {}",
                    subfolder.display(),
                    err
                );
                report.abandoned.push(subfolder);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(report)
}

/// Prune then rename one subfolder.
pub fn clean_subfolder(
    dir: &Path,
    dir_name: &str,
    failure_log: &FailureLog,
    report: &mut CleanReport,
) -> Result<(), DatacleanError> {
    prune_non_images(dir, report)?;
    rename_images_in_subfolder(dir, dir_name, failure_log, report)
}

/// Delete every regular file in `dir` that lacks a supported image extension.
///
/// Deletion failures are logged and recorded; they never stop the pass.
pub fn prune_non_images(dir: &Path, report: &mut CleanReport) -> Result<(), DatacleanError> {
    for file_name in sorted_entry_names(dir)? {
        let path = dir.join(&file_name);
        if !path.is_file() || has_image_extension(&path) {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed non-image file {}", path.display());
                report.pruned.push(path);
            }
            Err(err) => {
                log::error!("Could not delete file {}: {}", path.display(), err);
                report.prune_failures.push(path);
            }
        }
    }

    Ok(())
}

/// Verify and rename the images directly inside `dir`.
///
/// The number in a new name is the file's 1-based position in the sorted
/// directory listing. When that name is taken, a counter shared by the whole
/// folder is appended until a free name turns up.
pub fn rename_images_in_subfolder(
    dir: &Path,
    dir_name: &str,
    failure_log: &FailureLog,
    report: &mut CleanReport,
) -> Result<(), DatacleanError> {
    let mut dedup = 0usize;

    for (index, file_name) in sorted_entry_names(dir)?.into_iter().enumerate() {
        let path = dir.join(&file_name);
        if !path.is_file() {
            continue;
        }
        let Some(ext) = image_extension(&path) else {
            continue;
        };

        match check_image(&path, failure_log)? {
            CheckOutcome::Valid => {}
            CheckOutcome::Locked => {
                report.corrupt.push(path.clone());
                report.locked.push(path);
                continue;
            }
            CheckOutcome::Removed | CheckOutcome::RemoveFailed => {
                report.corrupt.push(path);
                continue;
            }
        }

        if file_name
            .to_str()
            .is_some_and(|name| is_canonical_name(name, dir_name))
        {
            report.already_canonical += 1;
            continue;
        }

        let target = next_free_path(dir, dir_name, index + 1, &ext, &mut dedup);
        fs::rename(&path, &target).map_err(|source| DatacleanError::Rename {
            from: path.clone(),
            to: target.clone(),
            source,
        })?;

        log::info!(
            "Renamed {} to {}",
            file_name.to_string_lossy(),
            target.file_name().unwrap_or_default().to_string_lossy()
        );
        report.renamed.push(Rename {
            from: path,
            to: target,
        });
    }

    Ok(())
}

/// Build `<dir_name>_<position>[_<dedup>].<ext>`.
pub fn canonical_name(dir_name: &str, position: usize, dedup: Option<usize>, ext: &str) -> String {
    match dedup {
        Some(k) => format!("{dir_name}_{position}_{k}.{ext}"),
        None => format!("{dir_name}_{position}.{ext}"),
    }
}

/// True if `file_name` already follows the naming scheme for `dir_name`.
pub fn is_canonical_name(file_name: &str, dir_name: &str) -> bool {
    let Some((stem, ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    if !IMAGE_EXTENSIONS.contains(&ext) {
        return false;
    }
    let Some(rest) = stem
        .strip_prefix(dir_name)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    let mut parts = rest.split('_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(n), None, None) => is_index(n),
        (Some(n), Some(k), None) => is_index(n) && is_index(k),
        _ => false,
    }
}

fn is_index(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn next_free_path(
    dir: &Path,
    dir_name: &str,
    position: usize,
    ext: &str,
    dedup: &mut usize,
) -> PathBuf {
    let mut target = dir.join(canonical_name(dir_name, position, None, ext));
    while target.exists() {
        *dedup += 1;
        target = dir.join(canonical_name(dir_name, position, Some(*dedup), ext));
    }
    target
}

fn sorted_entry_names(dir: &Path) -> Result<Vec<OsString>, DatacleanError> {
    let map_err = |source| DatacleanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(map_err)? {
        names.push(entry.map_err(map_err)?.file_name());
    }
    names.sort();
    Ok(names)
}
