//! Train/validation/label manifest generation.
//!
//! For every class directory, images one level below it (`class/*/*.ext`)
//! are split into a validation list and a training list. Each line of the
//! train and val manifests is `<relative-path> <class-id>`; the label
//! manifest lists `<class-id> <class-name>`.
//!
//! By default the first `val_cap` sorted matches of every (class, extension)
//! group go to validation, so a class with both `.jpg` and `.png` files can
//! contribute up to twice the cap. [`CapScope::Class`] applies the cap once
//! per class instead.

mod report;

pub use report::{ClassSummary, ManifestPaths, ManifestSummary};

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use walkdir::WalkDir;

use crate::error::DatacleanError;
use crate::layout::{
    class_dirs, image_extension, is_hidden, ClassDir, DEFAULT_EXCLUDED_CLASS, IMAGE_EXTENSIONS,
};

/// Default number of validation images per group.
pub const DEFAULT_VAL_CAP: usize = 500;

pub const TRAIN_FILE_NAME: &str = "train.txt";
pub const VAL_FILE_NAME: &str = "val.txt";
pub const LABEL_FILE_NAME: &str = "label.txt";

/// What the validation cap counts against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapScope {
    /// Each (class, extension) group has its own cap.
    #[default]
    Extension,
    /// Each class has one cap shared by all its extensions.
    Class,
}

impl CapScope {
    pub fn as_str(self) -> &'static str {
        match self {
            CapScope::Extension => "extension",
            CapScope::Class => "class",
        }
    }
}

impl FromStr for CapScope {
    type Err = DatacleanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extension" | "ext" => Ok(CapScope::Extension),
            "class" => Ok(CapScope::Class),
            other => Err(DatacleanError::InvalidOption(format!(
                "cap scope '{}' (supported: extension, class)",
                other
            ))),
        }
    }
}

/// Options for manifest generation.
#[derive(Clone, Debug)]
pub struct ManifestOptions {
    /// Validation images taken per group before the rest go to training.
    pub val_cap: usize,
    pub cap_scope: CapScope,
    /// Top-level directory name that is not a class.
    pub exclude: String,
    /// Seed for the training shuffle. `None` uses a fresh random order.
    pub seed: Option<u64>,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            val_cap: DEFAULT_VAL_CAP,
            cap_scope: CapScope::default(),
            exclude: DEFAULT_EXCLUDED_CLASS.to_string(),
            seed: None,
        }
    }
}

/// One line of `train.txt` or `val.txt`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageRecord {
    /// Path relative to the dataset root, `/`-separated.
    pub path: String,
    pub class_id: usize,
}

impl fmt::Display for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.class_id)
    }
}

/// One line of `label.txt`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelRecord {
    pub id: usize,
    pub name: String,
}

impl fmt::Display for LabelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.name)
    }
}

/// The three manifests, built in memory.
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    pub classes: Vec<ClassDir>,
    /// Shuffled training records.
    pub train: Vec<ImageRecord>,
    /// Validation records in discovery order.
    pub val: Vec<ImageRecord>,
}

impl Manifest {
    pub fn labels(&self) -> Vec<LabelRecord> {
        self.classes
            .iter()
            .map(|class| LabelRecord {
                id: class.id,
                name: class.name.clone(),
            })
            .collect()
    }

    pub fn summary(&self) -> ManifestSummary {
        let classes = self
            .classes
            .iter()
            .map(|class| ClassSummary {
                id: class.id,
                name: class.name.clone(),
                train: self.train.iter().filter(|r| r.class_id == class.id).count(),
                val: self.val.iter().filter(|r| r.class_id == class.id).count(),
            })
            .collect();

        ManifestSummary {
            classes,
            train_total: self.train.len(),
            val_total: self.val.len(),
            files: None,
        }
    }
}

/// Scan `root` and split every class's images into training and validation.
pub fn build_manifest(root: &Path, opts: &ManifestOptions) -> Result<Manifest, DatacleanError> {
    let classes = class_dirs(root, &opts.exclude)?;
    let mut train = Vec::new();
    let mut val = Vec::new();

    for class in &classes {
        let mut class_budget = opts.val_cap;

        for group in scan_class_images(root, class)? {
            let budget = match opts.cap_scope {
                CapScope::Extension => opts.val_cap,
                CapScope::Class => class_budget,
            };
            let taken = split_group(group, class.id, budget, &mut train, &mut val);
            class_budget -= taken.min(class_budget);
        }
    }

    shuffle_records(&mut train, opts.seed);

    Ok(Manifest {
        classes,
        train,
        val,
    })
}

/// Collect `class/*/*.<ext>` matches for each supported extension, in
/// [`IMAGE_EXTENSIONS`] order, each group sorted.
///
/// Hidden files and directories are skipped, as are entries that cannot be
/// read (dangling links, unreadable batch directories). Returned paths are
/// relative to `root`.
pub fn scan_class_images(
    root: &Path,
    class: &ClassDir,
) -> Result<Vec<Vec<String>>, DatacleanError> {
    let mut groups: Vec<Vec<String>> = vec![Vec::new(); IMAGE_EXTENSIONS.len()];

    let walker = WalkDir::new(&class.path)
        .follow_links(true)
        .min_depth(2)
        .max_depth(2);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                return Err(DatacleanError::Walk {
                    path: class.path.clone(),
                    source,
                });
            }
            Err(err) => {
                log::warn!("Skipping unreadable entry in {}: {}", class.path.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(ext) = image_extension(entry.path()) else {
            continue;
        };
        let Some(rel) = relative_manifest_path(root, entry.path()) else {
            log::warn!("Skipping image with unusable path: {}", entry.path().display());
            continue;
        };
        if rel.split('/').any(is_hidden) {
            continue;
        }

        if let Some(slot) = IMAGE_EXTENSIONS.iter().position(|e| *e == ext) {
            groups[slot].push(rel);
        }
    }

    for group in &mut groups {
        group.sort();
    }

    Ok(groups)
}

/// Send the first `budget` paths of a group to `val` and the rest to `train`.
/// Returns how many went to validation.
pub fn split_group(
    paths: Vec<String>,
    class_id: usize,
    budget: usize,
    train: &mut Vec<ImageRecord>,
    val: &mut Vec<ImageRecord>,
) -> usize {
    let taken = budget.min(paths.len());

    for (i, path) in paths.into_iter().enumerate() {
        let record = ImageRecord { path, class_id };
        if i < taken {
            val.push(record);
        } else {
            train.push(record);
        }
    }

    taken
}

/// Shuffle training records, deterministically when a seed is given.
pub fn shuffle_records(records: &mut [ImageRecord], seed: Option<u64>) {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        records.shuffle(&mut rng);
    } else {
        let mut rng = rand::rng();
        records.shuffle(&mut rng);
    }
}

/// Write `train.txt`, `val.txt` and `label.txt` into `out_dir`.
pub fn write_manifest(
    manifest: &Manifest,
    out_dir: &Path,
) -> Result<ManifestPaths, DatacleanError> {
    let paths = ManifestPaths {
        train: out_dir.join(TRAIN_FILE_NAME),
        val: out_dir.join(VAL_FILE_NAME),
        label: out_dir.join(LABEL_FILE_NAME),
    };

    write_lines(&paths.train, &manifest.train, "Training Set")?;
    write_lines(&paths.val, &manifest.val, "Validation Set")?;
    write_lines(&paths.label, &manifest.labels(), "Label")?;

    Ok(paths)
}

fn write_lines<T: fmt::Display>(
    path: &Path,
    lines: &[T],
    kind: &str,
) -> Result<(), DatacleanError> {
    let map_err = |source| DatacleanError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(map_err)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        log::debug!("[{}] Generating: {}", kind, line);
        writeln!(writer, "{}", line).map_err(map_err)?;
    }
    writer.flush().map_err(map_err)?;

    log::info!("Wrote {} line(s) to {}", lines.len(), path.display());
    Ok(())
}

fn relative_manifest_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts = rel
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<&str>>>()?;
    Some(parts.join("/"))
}

/// Generate and write the manifests in one step.
pub fn generate(
    root: &Path,
    out_dir: Option<&Path>,
    opts: &ManifestOptions,
) -> Result<ManifestSummary, DatacleanError> {
    let manifest = build_manifest(root, opts)?;
    let out_dir: PathBuf = out_dir.map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
    let files = write_manifest(&manifest, &out_dir)?;

    let mut summary = manifest.summary();
    summary.files = Some(files);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn split_group_caps_validation() {
        let mut train = Vec::new();
        let mut val = Vec::new();
        let taken = split_group(paths(&["a", "b", "c"]), 4, 2, &mut train, &mut val);

        assert_eq!(taken, 2);
        assert_eq!(val.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(train, vec![ImageRecord { path: "c".to_string(), class_id: 4 }]);
    }

    #[test]
    fn split_group_with_zero_budget_is_all_training() {
        let mut train = Vec::new();
        let mut val = Vec::new();
        let taken = split_group(paths(&["a", "b"]), 0, 0, &mut train, &mut val);
        assert_eq!(taken, 0);
        assert!(val.is_empty());
        assert_eq!(train.len(), 2);
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let records: Vec<ImageRecord> = (0..50)
            .map(|i| ImageRecord {
                path: format!("c/s/{i}.jpg"),
                class_id: 0,
            })
            .collect();

        let mut a = records.clone();
        let mut b = records.clone();
        shuffle_records(&mut a, Some(7));
        shuffle_records(&mut b, Some(7));
        assert_eq!(a, b);

        a.sort_by(|x, y| x.path.cmp(&y.path));
        let mut sorted = records;
        sorted.sort_by(|x, y| x.path.cmp(&y.path));
        assert_eq!(a, sorted);
    }

    #[test]
    fn record_lines_format() {
        let rec = ImageRecord {
            path: "cat/x/1.jpg".to_string(),
            class_id: 3,
        };
        assert_eq!(rec.to_string(), "cat/x/1.jpg 3");
        let label = LabelRecord {
            id: 0,
            name: "cat".to_string(),
        };
        assert_eq!(label.to_string(), "0 cat");
    }

    #[test]
    fn cap_scope_parses() {
        assert_eq!("class".parse::<CapScope>().expect("parse"), CapScope::Class);
        assert_eq!("extension".parse::<CapScope>().expect("parse"), CapScope::Extension);
        assert!("global".parse::<CapScope>().is_err());
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new(".");
        let path = Path::new(".").join("cat").join("sub").join("1.jpg");
        assert_eq!(
            relative_manifest_path(root, &path).as_deref(),
            Some("cat/sub/1.jpg")
        );
    }

    #[test]
    fn scan_only_looks_two_levels_deep() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let class_path = root.join("cat");
        std::fs::create_dir_all(class_path.join("a/deeper")).expect("mkdir");
        std::fs::create_dir_all(class_path.join(".hidden")).expect("mkdir");
        for rel in [
            "top.jpg",
            "a/2.png",
            "a/1.JPG",
            "a/deeper/3.jpg",
            ".hidden/4.jpg",
            "a/notes.txt",
        ] {
            std::fs::write(class_path.join(rel), b"x").expect("write");
        }

        let class = ClassDir {
            id: 0,
            name: "cat".to_string(),
            path: class_path,
        };
        let groups = scan_class_images(root, &class).expect("scan");

        assert_eq!(groups[0], vec!["cat/a/1.JPG".to_string()]);
        assert!(groups[1].is_empty());
        assert_eq!(groups[2], vec!["cat/a/2.png".to_string()]);
        assert_eq!(groups.iter().map(Vec::len).sum::<usize>(), 2);
    }
}
