//! Reading and rewriting CiliaQ `_CQ.txt` result files
//!
//! A document keeps every line of the file as raw bytes together with its
//! original line terminator. Only the columns that are parsed get decoded, so
//! files written in a non-UTF-8 platform charset load too. Rewriting only
//! ever prepends or removes the comment marker on record rows (plus an
//! optional history line), so untouched rows come back byte for byte.

use crate::ciliaq::record::{
    CiliumRecord, Decision, is_commented, split_columns, uncomment,
};
use crate::io::configuration::COMMENT_MARKER;
use crate::io::error::{CurationError, Result, format_error, fs_error, invalid_parameter};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const SETTINGS_MARKER: &str = "Settings:";
const HISTORY_MARKER: &str = "History:";
const RESULTS_MARKER: &str = "Results:";
const CALIBRATION_KEY: &str = "Calibration";

/// Columns before the id column in a results row
const ID_COLUMN: usize = 2;
/// Minimum number of columns of a record row (through the y coordinate)
const RECORD_COLUMNS: usize = 5;

/// Parsed CiliaQ result file
#[derive(Debug, Clone)]
pub struct CiliaQDocument {
    path: PathBuf,
    lines: Vec<Vec<u8>>,
    history: Option<usize>,
    results: usize,
    calibration: f64,
    records: Vec<CiliumRecord>,
}

/// Ids whose state a set of decisions would change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordChanges {
    /// Active rows that would be commented out
    pub rejected: Vec<String>,
    /// Commented rows that would be restored
    pub restored: Vec<String>,
}

impl RecordChanges {
    /// True when nothing would be rewritten
    pub const fn is_empty(&self) -> bool {
        self.rejected.is_empty() && self.restored.is_empty()
    }
}

fn content(line: &[u8]) -> &[u8] {
    let mut rest = line;
    while let Some(stripped) = rest.strip_suffix(b"\n").or_else(|| rest.strip_suffix(b"\r")) {
        rest = stripped;
    }
    rest
}

fn is_marker(line: &[u8], marker: &str) -> bool {
    content(line).trim_ascii_start().starts_with(marker.as_bytes())
}

/// Decoded, trimmed text of a parsed column
fn text_of(column: &[u8]) -> String {
    String::from_utf8_lossy(column.trim_ascii()).into_owned()
}

impl CiliaQDocument {
    /// Read and parse the file at `path`
    ///
    /// # Errors
    ///
    /// Returns a file system error if the file cannot be read, or a format
    /// error if its layout is not a CiliaQ results file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(fs_error(path, "read"))?;
        Self::parse(&bytes, path)
    }

    /// Parse `bytes` as the content of `path`
    ///
    /// # Errors
    ///
    /// Returns a format error when the `Results:` marker or its column header
    /// is missing, when the calibration or a coordinate is not numeric, or
    /// when an id appears twice
    pub fn parse(bytes: &[u8], path: &Path) -> Result<Self> {
        let lines: Vec<Vec<u8>> = bytes
            .split_inclusive(|&byte| byte == b'\n')
            .map(<[u8]>::to_vec)
            .collect();

        let find = |marker: &str, from: usize| {
            lines
                .iter()
                .enumerate()
                .skip(from)
                .find(|(_, line)| is_marker(line, marker))
                .map(|(index, _)| index)
        };

        let settings = find(SETTINGS_MARKER, 0);
        let history = find(HISTORY_MARKER, settings.map_or(0, |index| index + 1));
        let results = find(
            RESULTS_MARKER,
            history.or(settings).map_or(0, |index| index + 1),
        )
        .ok_or_else(|| format_error(path, None, &"no 'Results:' section"))?;

        if lines.len() <= results + 1 {
            return Err(format_error(
                path,
                Some(results + 1),
                &"missing column header after 'Results:'",
            ));
        }

        let calibration = match settings {
            Some(start) => {
                Self::read_calibration(&lines, start + 1, history.unwrap_or(results), path)?
            }
            None => 1.0,
        };

        let records = Self::read_records(&lines, results + 2, path)?;
        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            calibration,
            "parsed CiliaQ file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            lines,
            history,
            results,
            calibration,
            records,
        })
    }

    fn read_calibration(lines: &[Vec<u8>], start: usize, end: usize, path: &Path) -> Result<f64> {
        for (index, line) in lines.iter().enumerate().take(end).skip(start) {
            let columns = split_columns(content(line));
            let is_calibration = columns
                .get(1)
                .is_some_and(|key| key.trim_ascii().starts_with(CALIBRATION_KEY.as_bytes()));
            if !is_calibration {
                continue;
            }

            let raw = columns.get(2).map(|value| text_of(value)).unwrap_or_default();
            return match raw.parse::<f64>() {
                Ok(value) if value > 0.0 && value.is_finite() => Ok(1.0 / value),
                _ => Err(format_error(
                    path,
                    Some(index + 1),
                    &format!("calibration '{raw}' is not a positive number"),
                )),
            };
        }
        Ok(1.0)
    }

    fn read_records(lines: &[Vec<u8>], start: usize, path: &Path) -> Result<Vec<CiliumRecord>> {
        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for (index, line) in lines.iter().enumerate().skip(start) {
            let text = content(line);
            let columns = split_columns(text);
            if columns.len() < RECORD_COLUMNS {
                continue;
            }

            let field = |offset: usize| {
                columns
                    .get(ID_COLUMN + offset)
                    .map(|column| text_of(column))
                    .unwrap_or_default()
            };
            let (id, x, y) = (field(0), field(1), field(2));
            if id.is_empty() || x.is_empty() || y.is_empty() {
                continue;
            }

            let coordinate = |raw: &str, axis: &str| {
                raw.parse::<f64>().map_err(|err| {
                    format_error(
                        path,
                        Some(index + 1),
                        &format!("{axis} coordinate '{raw}' of id {id} is not numeric: {err}"),
                    )
                })
            };
            let x = coordinate(x.as_str(), "x")?;
            let y = coordinate(y.as_str(), "y")?;

            if !seen.insert(id.clone()) {
                return Err(format_error(
                    path,
                    Some(index + 1),
                    &format!("duplicate id {id}"),
                ));
            }

            records.push(CiliumRecord {
                id,
                x,
                y,
                active: !is_commented(text),
                line: index,
            });
        }

        Ok(records)
    }

    /// File this document was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records in file order
    pub fn records(&self) -> &[CiliumRecord] {
        &self.records
    }

    /// Factor converting calibrated units to pixels
    pub const fn calibration(&self) -> f64 {
        self.calibration
    }

    /// Number of records that were commented out on load
    pub fn culled_count(&self) -> usize {
        self.records.iter().filter(|record| !record.active).count()
    }

    /// The exact bytes the document was parsed from
    pub fn original(&self) -> Vec<u8> {
        self.lines.concat()
    }

    fn check_decisions(&self, decisions: &[Decision]) -> Result<()> {
        if decisions.len() == self.records.len() {
            Ok(())
        } else {
            Err(invalid_parameter(
                "decisions",
                &decisions.len(),
                &format!(
                    "'{}' has {} records",
                    self.path.display(),
                    self.records.len()
                ),
            ))
        }
    }

    /// Ids whose written state differs from the loaded state
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if `decisions` does not have one
    /// entry per record
    pub fn changes(&self, decisions: &[Decision]) -> Result<RecordChanges> {
        self.check_decisions(decisions)?;

        let mut changes = RecordChanges::default();
        for (record, decision) in self.records.iter().zip(decisions) {
            match (record.active, record.effective_active(*decision)) {
                (true, false) => changes.rejected.push(record.id.clone()),
                (false, true) => changes.restored.push(record.id.clone()),
                _ => {}
            }
        }
        Ok(changes)
    }

    fn line_ending(&self) -> &'static str {
        if self.lines.iter().any(|line| line.ends_with(b"\r\n")) {
            "\r\n"
        } else {
            "\n"
        }
    }

    /// Rewritten file content for `decisions`
    ///
    /// When `history` carries a timestamp and at least one row gets
    /// commented out, a dated line listing the rejected ids is added to the
    /// `History:` section (created before `Results:` if missing).
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if `decisions` does not have one
    /// entry per record
    pub fn render(&self, decisions: &[Decision], history: Option<&str>) -> Result<Vec<u8>> {
        self.check_decisions(decisions)?;

        let mut lines: Vec<Cow<'_, [u8]>> =
            self.lines.iter().map(|line| Cow::from(line.as_slice())).collect();
        for (record, decision) in self.records.iter().zip(decisions) {
            let Some(slot) = lines.get_mut(record.line) else {
                continue;
            };
            match (record.active, record.effective_active(*decision)) {
                (true, false) => *slot = Cow::Owned([COMMENT_MARKER.as_bytes(), slot].concat()),
                (false, true) => *slot = Cow::Owned(uncomment(slot).to_owned()),
                _ => {}
            }
        }

        if let Some(stamp) = history {
            let changes = self.changes(decisions)?;
            if !changes.rejected.is_empty() {
                self.insert_history(&mut lines, stamp, &changes.rejected);
            }
        }

        Ok(lines.concat())
    }

    fn insert_history(&self, lines: &mut Vec<Cow<'_, [u8]>>, stamp: &str, rejected: &[String]) {
        let eol = self.line_ending();
        let entry = format!(
            "    {stamp}: {} items culled - [{}]{eol}",
            rejected.len(),
            rejected.join(", ")
        );

        match self.history {
            Some(marker) => {
                let blank = self
                    .lines
                    .iter()
                    .enumerate()
                    .take(self.results)
                    .skip(marker + 1)
                    .find(|(_, line)| content(line).trim_ascii().is_empty())
                    .map_or(self.results, |(index, _)| index);
                lines.insert(blank, Cow::Owned(entry.into_bytes()));
            }
            None => {
                let section = format!("{HISTORY_MARKER}{eol}{entry}{eol}");
                lines.insert(self.results, Cow::Owned(section.into_bytes()));
            }
        }
    }

    /// Render `decisions` and atomically replace the file on disk
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error for mismatched decisions, or a file
    /// system error if the replacement cannot be written; the original file
    /// is left untouched in both cases
    pub fn write(&self, decisions: &[Decision], history: Option<&str>) -> Result<()> {
        let rendered = self.render(decisions, history)?;
        write_atomically(&self.path, &rendered)?;
        tracing::info!(path = %self.path.display(), "rewrote CiliaQ file");
        Ok(())
    }

    /// Kept record rows only, with `source_name` in the 1-based `column`
    ///
    /// Rows are rebuilt with `delimiter` between columns; column bytes are
    /// copied unchanged.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if `decisions` does not have one
    /// entry per record or `column` is 0
    pub fn stripped(
        &self,
        decisions: &[Decision],
        source_name: &str,
        column: usize,
        delimiter: u8,
    ) -> Result<Vec<u8>> {
        self.check_decisions(decisions)?;
        let target = column
            .checked_sub(1)
            .ok_or_else(|| invalid_parameter("src_column", &column, &"columns are numbered from 1"))?;

        let mut out = Vec::new();
        for (record, decision) in self.records.iter().zip(decisions) {
            if !record.effective_active(*decision) {
                continue;
            }
            let Some(line) = self.lines.get(record.line) else {
                continue;
            };

            let mut columns = split_columns(uncomment(content(line)));
            if columns.len() <= target {
                columns.resize(target + 1, b"");
            }
            if let Some(slot) = columns.get_mut(target) {
                *slot = source_name.as_bytes();
            }

            out.extend_from_slice(&columns.join(&delimiter));
            out.push(b'\n');
        }
        Ok(out)
    }
}

/// Replace `path` with `content` through a temporary file in the same directory
///
/// The target keeps its permissions. Readers see either the old or the new
/// content, never a partial write.
///
/// # Errors
///
/// Returns a file system error naming the step that failed
pub fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(parent).map_err(fs_error(path, "create temporary file"))?;
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(fs_error(path, "copy permissions"))?;
    }
    temp.write_all(content)
        .map_err(fs_error(path, "write"))?;
    temp.as_file().sync_all().map_err(fs_error(path, "sync"))?;

    temp.persist(path).map_err(|err| CurationError::FileSystem {
        path: path.to_path_buf(),
        operation: "replace",
        source: err.error,
    })?;
    Ok(())
}
