//! Locating CiliaQ result files and their crop images in input directories

use crate::ciliaq::document::CiliaQDocument;
use crate::io::error::{CurationError, Result, fs_error, invalid_parameter};
use crate::io::progress::ProgressManager;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Result files: `<root>_CQ.txt` or `<root>_CQ_<a>_<b>.txt`
const ROI_FILE_PATTERN: &str = r"^(?P<root>.*?)_CQ(?:_(?P<a>\d+)_(?P<b>\d+))?\.txt$";

static ROI_FILE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(ROI_FILE_PATTERN));

/// A result file, its parsed content and the image its crops come from
#[derive(Debug, Clone)]
pub struct Bundle {
    id: usize,
    roi_path: PathBuf,
    image_path: Option<PathBuf>,
    document: CiliaQDocument,
}

impl Bundle {
    /// Bundle with the given 1-based id
    pub const fn new(
        id: usize,
        roi_path: PathBuf,
        image_path: Option<PathBuf>,
        document: CiliaQDocument,
    ) -> Self {
        Self {
            id,
            roi_path,
            image_path,
            document,
        }
    }

    /// 1-based id in discovery order
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Path of the `_CQ.txt` file
    pub fn roi_path(&self) -> &Path {
        &self.roi_path
    }

    /// Path of the matching `_RP.tif` image, when one exists
    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    /// Parsed result file
    pub const fn document(&self) -> &CiliaQDocument {
        &self.document
    }

    /// File name of the result file
    pub fn file_name(&self) -> String {
        self.roi_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Indices of the records offered for review
    ///
    /// Commented rows are only offered when `revisit_culled` is set.
    pub fn reviewable(&self, revisit_culled: bool) -> impl Iterator<Item = usize> + '_ {
        self.document
            .records()
            .iter()
            .enumerate()
            .filter(move |(_, record)| revisit_culled || record.active)
            .map(|(index, _)| index)
    }

    /// Number of records offered for review
    pub fn reviewable_count(&self, revisit_culled: bool) -> usize {
        self.reviewable(revisit_culled).count()
    }
}

/// A result file that could not be loaded
#[derive(Debug)]
pub struct LoadFailure {
    /// File that was skipped
    pub path: PathBuf,
    /// Why it was skipped
    pub error: CurationError,
}

/// Everything found in the input directories
#[derive(Debug, Default)]
pub struct Discovery {
    /// Loaded bundles, ids in discovery order
    pub bundles: Vec<Bundle>,
    /// Files skipped because they could not be read or parsed
    pub failures: Vec<LoadFailure>,
}

impl Discovery {
    /// Total records across all bundles
    pub fn record_count(&self) -> usize {
        self.bundles
            .iter()
            .map(|bundle| bundle.document().records().len())
            .sum()
    }
}

struct Candidate {
    roi_path: PathBuf,
    image_path: Option<PathBuf>,
}

fn roi_pattern() -> Result<&'static Regex> {
    ROI_FILE
        .as_ref()
        .map_err(|err| invalid_parameter("pattern", &ROI_FILE_PATTERN, err))
}

/// Name of the crop image belonging to the result file `file_name`
///
/// Returns `None` when `file_name` is not a CiliaQ result file.
pub fn image_name_for(file_name: &str) -> Option<String> {
    let captures = ROI_FILE.as_ref().ok()?.captures(file_name)?;
    let root = captures.name("root")?.as_str();
    Some(match (captures.name("a"), captures.name("b")) {
        (Some(a), Some(b)) => format!("{root}_CQ_{}_{}_RP.tif", a.as_str(), b.as_str()),
        _ => format!("{root}_CQ_RP.tif"),
    })
}

fn scan_directory(dir: &Path, pattern: &Regex) -> Result<Vec<Candidate>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(fs_error(dir, "list directory"))? {
        let entry = entry.map_err(fs_error(dir, "list directory"))?;
        if entry.file_type().is_ok_and(|kind| kind.is_file()) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let present: HashSet<&str> = names.iter().map(String::as_str).collect();
    let candidates = names
        .iter()
        .filter(|name| pattern.is_match(name))
        .map(|name| {
            let image_path = image_name_for(name)
                .filter(|image| present.contains(image.as_str()))
                .map(|image| dir.join(image));
            if image_path.is_none() {
                tracing::debug!(file = %name, "no crop image found");
            }
            Candidate {
                roi_path: dir.join(name),
                image_path,
            }
        })
        .collect();
    Ok(candidates)
}

/// Find and load every result file directly inside `dirs`
///
/// Files are visited directory by directory, sorted by name. Files that
/// cannot be read or parsed are reported in [`Discovery::failures`].
///
/// # Errors
///
/// Returns a file system error if a directory cannot be listed
pub fn discover(dirs: &[PathBuf], progress: Option<&ProgressManager>) -> Result<Discovery> {
    let pattern = roi_pattern()?;
    let mut candidates = Vec::new();
    for dir in dirs {
        candidates.extend(scan_directory(dir, pattern)?);
    }
    tracing::debug!(files = candidates.len(), "result files found");

    let bar = progress.map(|pm| pm.stage("Loading", candidates.len()));
    let mut discovery = Discovery::default();

    for candidate in candidates {
        match CiliaQDocument::load(&candidate.roi_path) {
            Ok(document) => {
                let id = discovery.bundles.len() + 1;
                discovery.bundles.push(Bundle::new(
                    id,
                    candidate.roi_path,
                    candidate.image_path,
                    document,
                ));
            }
            Err(error) if error.is_per_file() => {
                tracing::warn!(path = %candidate.roi_path.display(), %error, "skipping file");
                discovery.failures.push(LoadFailure {
                    path: candidate.roi_path,
                    error,
                });
            }
            Err(error) => return Err(error),
        }
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    Ok(discovery)
}
