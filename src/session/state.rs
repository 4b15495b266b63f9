//! Persisted session plan so a long review can be spread over several runs

use crate::ciliaq::document::write_atomically;
use crate::io::configuration::{CurationConfig, INVALID_STATE_SUFFIX, STATE_FILE_NAME, STATE_VERSION};
use crate::io::error::{CurationError, Result, fs_error};
use crate::session::discovery::Bundle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the results of the planned sessions are archived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group number
    pub number: u32,
    /// Group directory
    pub path: PathBuf,
}

/// A bundle as recorded when the plan was made
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Result file
    pub roi_path: PathBuf,
    /// Crop image, if one was found
    pub image_path: Option<PathBuf>,
    /// Number of records when the plan was made
    pub records: usize,
}

/// One planned session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// 1-based session number
    pub id: usize,
    /// True once its changes were written
    pub complete: bool,
    /// Bundles reviewed in this session
    pub bundles: Vec<BundleEntry>,
}

/// Contents of `.session_state.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Format version
    pub version: String,
    /// Result directory of this plan
    pub group: GroupInfo,
    /// Options the plan was made with
    pub options: CurationConfig,
    /// Sessions in review order
    pub sessions: Vec<SessionEntry>,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<String>,
}

fn state_error(path: &Path, reason: &impl ToString) -> CurationError {
    CurationError::SessionState {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

impl SessionState {
    /// State file location for `dir`
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(STATE_FILE_NAME)
    }

    /// Record the planned `partition` of `bundles`
    pub fn plan(
        group: GroupInfo,
        options: CurationConfig,
        partition: &[Vec<usize>],
        bundles: &[Bundle],
    ) -> Self {
        let sessions = partition
            .iter()
            .enumerate()
            .map(|(index, members)| SessionEntry {
                id: index + 1,
                complete: false,
                bundles: members
                    .iter()
                    .filter_map(|&member| bundles.get(member))
                    .map(|bundle| BundleEntry {
                        roi_path: bundle.roi_path().to_path_buf(),
                        image_path: bundle.image_path().map(Path::to_path_buf),
                        records: bundle.document().records().len(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            version: STATE_VERSION.to_owned(),
            group,
            options,
            sessions,
        }
    }

    /// Load the state saved in `dir`
    ///
    /// Returns `None` when there is no state file. A file written with an
    /// unknown format version is renamed with an `.invalid` suffix and
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns a file system error if the file cannot be read or moved aside,
    /// or a session state error if it is not valid JSON for this version
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(fs_error(&path, "read"))?;

        let probe: VersionProbe =
            serde_json::from_str(&text).map_err(|err| state_error(&path, &err))?;
        if probe.version.as_deref() != Some(STATE_VERSION) {
            let mut aside = path.clone().into_os_string();
            aside.push(INVALID_STATE_SUFFIX);
            let aside = PathBuf::from(aside);
            fs::rename(&path, &aside).map_err(fs_error(&path, "move aside"))?;
            tracing::warn!(
                found = probe.version.as_deref().unwrap_or("none"),
                moved_to = %aside.display(),
                "unsupported session state version, starting over"
            );
            return Ok(None);
        }

        let state = serde_json::from_str(&text).map_err(|err| state_error(&path, &err))?;
        Ok(Some(state))
    }

    /// Write the state into `dir`
    ///
    /// # Errors
    ///
    /// Returns a session state error if serialization fails, or a file
    /// system error if the file cannot be written
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path_in(dir);
        let json = serde_json::to_string_pretty(self).map_err(|err| state_error(&path, &err))?;
        write_atomically(&path, json.as_bytes())
    }

    /// Remove the state file of `dir`, if any
    ///
    /// # Errors
    ///
    /// Returns a file system error if an existing file cannot be removed
    pub fn clear(dir: &Path) -> Result<()> {
        let path = Self::path_in(dir);
        if path.exists() {
            fs::remove_file(&path).map_err(fs_error(&path, "remove"))?;
        }
        Ok(())
    }

    /// Number of sessions whose changes were written
    pub fn completed(&self) -> usize {
        self.sessions.iter().filter(|session| session.complete).count()
    }

    /// True when every session was completed
    pub fn is_finished(&self) -> bool {
        self.sessions.iter().all(|session| session.complete)
    }

    /// Flag session `id` as written
    pub fn mark_complete(&mut self, id: usize) {
        if let Some(session) = self.sessions.iter_mut().find(|session| session.id == id) {
            session.complete = true;
        }
    }

    /// Bundle indices of each incomplete session, matched against `bundles`
    ///
    /// # Errors
    ///
    /// Returns a session state error if a planned file is no longer loaded or
    /// its number of records changed since the plan was made
    pub fn pending(&self, dir: &Path, bundles: &[Bundle]) -> Result<Vec<(usize, Vec<usize>)>> {
        let path = Self::path_in(dir);
        let index: HashMap<&Path, usize> = bundles
            .iter()
            .enumerate()
            .map(|(position, bundle)| (bundle.roi_path(), position))
            .collect();

        let mut pending = Vec::new();
        for session in self.sessions.iter().filter(|session| !session.complete) {
            let mut members = Vec::with_capacity(session.bundles.len());
            for entry in &session.bundles {
                let position = *index.get(entry.roi_path.as_path()).ok_or_else(|| {
                    state_error(
                        &path,
                        &format!("'{}' is no longer available", entry.roi_path.display()),
                    )
                })?;
                let current = bundles
                    .get(position)
                    .map_or(0, |bundle| bundle.document().records().len());
                if current != entry.records {
                    return Err(state_error(
                        &path,
                        &format!(
                            "'{}' has {current} records, {} were planned",
                            entry.roi_path.display(),
                            entry.records
                        ),
                    ));
                }
                members.push(position);
            }
            pending.push((session.id, members));
        }
        Ok(pending)
    }
}
