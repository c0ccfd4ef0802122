//! Image integrity checking.
//!
//! An image passes when its header is identifiable and its pixel data
//! decodes without error. Images that fail are recorded in an append-only
//! failure log and deleted.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use image::{ImageError, ImageReader, Limits};

use crate::error::{DatacleanError, IntegrityError};

/// Default file name of the failure log.
pub const FAILURE_LOG_NAME: &str = "False.txt";

/// Append-only list of images that failed the integrity check, one path per line.
///
/// The file is opened and closed for every entry.
#[derive(Clone, Debug)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one image path to the log.
    pub fn append(&self, image_path: &Path) -> Result<(), DatacleanError> {
        let map_err = |source| DatacleanError::FailureLog {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(map_err)?;
        writeln!(file, "{}", image_path.display()).map_err(map_err)
    }
}

/// What happened to an image during [`check_image`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The image is intact.
    Valid,
    /// The image was corrupt and has been deleted.
    Removed,
    /// The image was corrupt but deletion was refused with a permission error.
    Locked,
    /// The image was corrupt and deletion failed for another reason.
    RemoveFailed,
}

/// Verify that `path` holds a readable, non-truncated image.
///
/// The format is sniffed from the file contents, so a PNG saved with a
/// `.jpg` extension still passes. Decoding runs without the `image` crate's
/// default memory limits, so large images are not mistaken for corrupt ones.
pub fn verify_image(path: &Path) -> Result<(), IntegrityError> {
    verify_image_with_limits(path, Limits::no_limits())
}

/// [`verify_image`] with explicit decoder limits.
///
/// An image whose decode would exceed `limits` has a well-formed header and
/// counts as valid.
pub fn verify_image_with_limits(path: &Path, limits: Limits) -> Result<(), IntegrityError> {
    imagesize::size(path).map_err(|source| IntegrityError::Header {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| IntegrityError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    reader.limits(limits);

    match reader.decode() {
        Ok(_) => Ok(()),
        Err(ImageError::Limits(err)) => {
            log::warn!("Skipping full decode of {}: {}", path.display(), err);
            Ok(())
        }
        Err(source) => Err(IntegrityError::Decode {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Check one image, logging and deleting it when it fails verification.
///
/// Only a failure to write the failure log is returned as an error; deletion
/// failures are reported through the outcome.
pub fn check_image(path: &Path, failure_log: &FailureLog) -> Result<CheckOutcome, DatacleanError> {
    let Err(problem) = verify_image(path) else {
        return Ok(CheckOutcome::Valid);
    };

    log::error!("Problem with image: {}: {}", path.display(), problem);
    failure_log.append(path)?;

    let outcome = match fs::remove_file(path) {
        Ok(()) => CheckOutcome::Removed,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            log::warn!("File in use: {}", path.display());
            CheckOutcome::Locked
        }
        Err(err) => {
            log::error!("Failed to delete file {}: {}", path.display(), err);
            CheckOutcome::RemoveFailed
        }
    };

    Ok(outcome)
}
