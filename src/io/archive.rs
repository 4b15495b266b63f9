//! Group directory archive: pre-review copies, rewritten copies, stripped tables and the README
//!
//! Archive entries are prefixed with the bundle id so files sharing a name
//! in different input directories never overwrite each other.

use crate::ciliaq::document::write_atomically;
use crate::ciliaq::record::Decision;
use crate::io::configuration::{
    AdjustMode, CurationConfig, README_FILE_NAME, README_TIME_FORMAT, STRIPPED_SUFFIX,
    WORKING_SUFFIX,
};
use crate::io::error::{Result, fs_error};
use crate::session::controller::FinalizeReport;
use crate::session::discovery::Bundle;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// `file_name` with `suffix` inserted before its extension
pub fn suffixed_name(file_name: &str, suffix: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) => {
            let (stem, extension) = file_name.split_at(dot);
            format!("{stem}{suffix}{extension}")
        }
        None => format!("{file_name}{suffix}"),
    }
}

/// Archive name of `bundle`'s result file, unique within a group
pub fn archive_name(bundle: &Bundle) -> String {
    format!("{}_{}", bundle.id(), bundle.file_name())
}

/// Outcome of one session, as recorded in the README
pub struct SessionSummary<'a> {
    /// Session number
    pub session: usize,
    /// Sessions in the plan
    pub sessions: usize,
    /// When the session finished
    pub finished: DateTime<Local>,
    /// What was written
    pub report: &'a FinalizeReport,
}

/// Writes results into a `Group_<N>` directory
pub struct GroupArchive {
    dir: PathBuf,
    src_column: usize,
    delimiter: u8,
}

impl GroupArchive {
    /// Archive in `dir` using the stripped table options of `config`
    pub fn new(dir: &Path, config: &CurationConfig) -> Self {
        Self {
            dir: dir.to_path_buf(),
            src_column: config.src_column,
            delimiter: if config.tab_delimited { b'\t' } else { b',' },
        }
    }

    /// Group directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keep the content `bundle` was loaded with, before it gets rewritten
    ///
    /// Returns the path of the working copy.
    ///
    /// # Errors
    ///
    /// Returns a file system error if the copy cannot be written
    pub fn store_original(&self, bundle: &Bundle) -> Result<PathBuf> {
        let path = self
            .dir
            .join(suffixed_name(&archive_name(bundle), WORKING_SUFFIX));
        write_atomically(&path, &bundle.document().original())?;
        Ok(path)
    }

    /// Copy the rewritten file of `bundle` and store its stripped table
    ///
    /// # Errors
    ///
    /// Returns a file system error if either file cannot be written
    pub fn store(&self, bundle: &Bundle, decisions: &[Decision]) -> Result<()> {
        let name = archive_name(bundle);
        let copy = self.dir.join(&name);
        fs::copy(bundle.roi_path(), &copy).map_err(fs_error(&copy, "copy"))?;

        let stripped = bundle.document().stripped(
            decisions,
            &bundle.file_name(),
            self.src_column,
            self.delimiter,
        )?;
        write_atomically(&self.dir.join(suffixed_name(&name, STRIPPED_SUFFIX)), &stripped)?;
        tracing::debug!(file = %name, dir = %self.dir.display(), "archived");
        Ok(())
    }

    fn readme_path(&self) -> PathBuf {
        self.dir.join(README_FILE_NAME)
    }

    fn append(&self, text: &str) -> Result<()> {
        let path = self.readme_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(fs_error(&path, "open"))?;
        file.write_all(text.as_bytes())
            .map_err(fs_error(&path, "append"))
    }

    /// Start the README with the run options
    ///
    /// A README left by an earlier run only gets a line noting when the
    /// review was resumed.
    ///
    /// # Errors
    ///
    /// Returns a file system error if the README cannot be written
    pub fn write_header(
        &self,
        source: &Path,
        config: &CurationConfig,
        started: DateTime<Local>,
    ) -> Result<()> {
        if self.readme_path().exists() {
            return self.append(&format!(
                "Resumed {} with the stored options\n\n",
                started.format(README_TIME_FORMAT)
            ));
        }
        self.append(&readme_header(source, config))
    }

    /// Append the outcome of a session to the README
    ///
    /// # Errors
    ///
    /// Returns a file system error if the README cannot be written
    pub fn append_session(&self, summary: &SessionSummary<'_>) -> Result<()> {
        self.append(&readme_session(summary))
    }
}

fn adjustment_details(config: &CurationConfig) -> String {
    match config.adjust {
        AdjustMode::Auto => format!(" (buffer {})", config.buffer_percent),
        AdjustMode::MinMax => format!(" (channels {:?} to {:?})", config.bc_min, config.bc_max),
        AdjustMode::Saturation => format!(" (saturated {:?}%)", config.saturation),
        AdjustMode::Off => String::new(),
    }
}

/// README preamble listing the options of a run
pub fn readme_header(source: &Path, config: &CurationConfig) -> String {
    let lines = [
        format!("Curation results for {}", source.display()),
        String::new(),
        "Options:".to_owned(),
        format!(
            "  Adjustment: {}{}",
            config.adjust.name(),
            adjustment_details(config)
        ),
        format!("  ROI size: {}, scale: {}", config.roi_size, config.scale),
        format!(
            "  Grid: {} columns x {} rows, {} ROIs per session",
            config.columns, config.max_rows, config.roi_per_session
        ),
        format!("  Column #: {}", config.src_column),
        format!("  Revisit culled: {}", config.revisit_culled),
        format!("  History: {}", config.record_history),
        String::new(),
    ];
    lines.join("\n") + "\n"
}

/// README block describing one finished session
pub fn readme_session(summary: &SessionSummary<'_>) -> String {
    let report = summary.report;
    let mut lines = vec![format!(
        "Session #{} of {} completed {}",
        summary.session,
        summary.sessions,
        summary.finished.format(README_TIME_FORMAT)
    )];

    if !report.written.is_empty() {
        lines.push("  Modified:".to_owned());
        lines.extend(report.written.iter().map(|change| {
            let restored = if change.restored.is_empty() {
                String::new()
            } else {
                format!(", restored=[{}]", change.restored.join(", "))
            };
            format!(
                "    {}: ROI={}, REM={}, IDs=[{}]{restored}",
                change.path.display(),
                change.records,
                change.rejected.len(),
                change.rejected.join(", ")
            )
        }));
    }
    if !report.unchanged.is_empty() {
        lines.push("  Not modified:".to_owned());
        lines.extend(
            report
                .unchanged
                .iter()
                .map(|path| format!("    {}", path.display())),
        );
    }
    if !report.failed.is_empty() {
        lines.push("  Failed:".to_owned());
        lines.extend(
            report
                .failed
                .iter()
                .map(|failure| format!("    {}: {}", failure.path.display(), failure.error)),
        );
    }
    lines.push(String::new());
    lines.join("\n") + "\n"
}
