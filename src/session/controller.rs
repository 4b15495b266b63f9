//! Review state machine driving a host through the pages of one session

use crate::ciliaq::record::Decision;
use crate::io::error::{CurationError, Result, invalid_parameter};
use crate::render::thumbnail::ThumbnailRenderer;
use crate::session::discovery::Bundle;
use crate::session::host::{GridPage, HostEvent, ReviewHost, Thumbnail};
use crate::session::layout::GridLayout;
use crate::session::review::ReviewSession;
use std::path::PathBuf;

/// Lifecycle of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Session built, nothing shown yet
    Loaded,
    /// Pages are being shown and toggles accepted
    Reviewing,
    /// Files are being rewritten
    Finalizing,
    /// All writes attempted
    Done,
    /// Abandoned, nothing will be written
    Cancelled,
}

impl Phase {
    /// Lower case name used in messages
    pub const fn name(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Reviewing => "reviewing",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Pending rewrite of one result file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Bundle id
    pub bundle: usize,
    /// Result file
    pub path: PathBuf,
    /// Number of records in the file
    pub records: usize,
    /// Ids that get commented out
    pub rejected: Vec<String>,
    /// Ids whose comment marker is removed
    pub restored: Vec<String>,
}

/// A result file that could not be rewritten
#[derive(Debug)]
pub struct WriteFailure {
    /// Result file
    pub path: PathBuf,
    /// Why the write failed
    pub error: CurationError,
}

/// Outcome of writing a session's decisions
#[derive(Debug, Default)]
pub struct FinalizeReport {
    /// Files rewritten, with what changed
    pub written: Vec<FileChange>,
    /// Files left alone because nothing changed
    pub unchanged: Vec<PathBuf>,
    /// Files whose rewrite failed; their content is untouched
    pub failed: Vec<WriteFailure>,
}

impl FinalizeReport {
    /// True when no write failed
    pub const fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// How a run through the pages ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Every page was completed
    Completed {
        /// Records that will be commented out
        marked: usize,
    },
    /// The reviewer cancelled, decisions were discarded
    Cancelled,
}

/// Options applied while rewriting files
#[derive(Debug, Clone, Default)]
pub struct FinalizeOptions {
    /// Timestamp for a history annotation, `None` to leave `History:` alone
    pub history_stamp: Option<String>,
}

/// Drives one review session from first page to rewritten files
pub struct ReviewController<'a> {
    session: ReviewSession,
    bundles: &'a [Bundle],
    layout: GridLayout,
    renderer: ThumbnailRenderer,
    phase: Phase,
}

impl<'a> ReviewController<'a> {
    /// Controller for `session` over the loaded `bundles`
    pub const fn new(
        session: ReviewSession,
        bundles: &'a [Bundle],
        layout: GridLayout,
        renderer: ThumbnailRenderer,
    ) -> Self {
        Self {
            session,
            bundles,
            layout,
            renderer,
            phase: Phase::Loaded,
        }
    }

    /// Current phase
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Session under review
    pub const fn session(&self) -> &ReviewSession {
        &self.session
    }

    fn transition_error(&self, operation: &'static str) -> CurationError {
        CurationError::InvalidTransition {
            phase: self.phase.name(),
            operation,
        }
    }

    /// Start accepting toggles
    ///
    /// # Errors
    ///
    /// Returns an invalid transition error unless the controller is loaded
    pub fn begin(&mut self) -> Result<()> {
        if self.phase != Phase::Loaded {
            return Err(self.transition_error("begin review"));
        }
        self.phase = Phase::Reviewing;
        tracing::debug!(
            session = self.session.id(),
            records = self.session.len(),
            "review started"
        );
        Ok(())
    }

    /// Flip the record at display position `index`
    ///
    /// # Errors
    ///
    /// Returns an invalid transition error outside of review, or an invalid
    /// parameter error when `index` is out of range
    pub fn toggle(&mut self, index: usize) -> Result<Decision> {
        if self.phase != Phase::Reviewing {
            return Err(self.transition_error("toggle"));
        }
        let len = self.session.len();
        self.session
            .toggle(index)
            .ok_or_else(|| invalid_parameter("index", &index, &format!("session has {len} records")))
    }

    /// Abandon the review and discard every decision
    ///
    /// # Errors
    ///
    /// Returns an invalid transition error once writing has started
    pub fn cancel(&mut self) -> Result<()> {
        match self.phase {
            Phase::Loaded | Phase::Reviewing | Phase::Cancelled => {
                self.session.clear_decisions();
                self.phase = Phase::Cancelled;
                tracing::info!(session = self.session.id(), "review cancelled");
                Ok(())
            }
            Phase::Finalizing | Phase::Done => Err(self.transition_error("cancel")),
        }
    }

    /// Number of pages in this session
    pub const fn page_count(&self) -> usize {
        self.layout.page_count(self.session.len())
    }

    /// Page `page` (0-based), with crops when `with_pixels` is set
    pub fn page(&mut self, page: usize, with_pixels: bool) -> Option<GridPage> {
        let range = self.layout.page(self.session.len(), page)?;
        let mut thumbnails = Vec::with_capacity(range.len());

        for (cell, index) in range.enumerate() {
            let image = if with_pixels {
                self.session.handle(index).and_then(|handle| {
                    let bundle = self.bundles.get(handle.bundle)?;
                    let record = bundle.document().records().get(handle.record)?;
                    self.renderer.thumbnail(bundle, record)
                })
            } else {
                None
            };
            thumbnails.push(Thumbnail {
                label: (cell + 1).to_string(),
                image,
                marked: self.session.is_marked(index),
            });
        }

        Some(GridPage {
            session: self.session.id(),
            number: page + 1,
            page_count: self.page_count(),
            layout: self.layout,
            thumbnails,
        })
    }

    /// Show every page on `host` and apply its toggles
    ///
    /// Returns once the last page is completed or the reviewer cancels.
    ///
    /// # Errors
    ///
    /// Returns host errors, or an invalid transition error if the review
    /// already ended
    pub fn run<H: ReviewHost + ?Sized>(&mut self, host: &mut H) -> Result<ReviewOutcome> {
        if self.phase == Phase::Loaded {
            self.begin()?;
        }
        if self.phase != Phase::Reviewing {
            return Err(self.transition_error("run review"));
        }

        let with_pixels = host.wants_pixels();
        for number in 0..self.page_count() {
            let Some(mut page) = self.page(number, with_pixels) else {
                break;
            };
            let start = number * self.layout.per_page();
            host.present(&page)?;

            loop {
                match host.next_event()? {
                    HostEvent::Toggle(cell) if cell < page.len() => {
                        self.toggle(start + cell)?;
                        if let Some(thumbnail) = page.thumbnails.get_mut(cell) {
                            thumbnail.marked = self.session.is_marked(start + cell);
                        }
                        host.refresh(&page)?;
                    }
                    HostEvent::Toggle(cell) => {
                        host.notify(&format!(
                            "There is no cell {} on this page ({} cells)",
                            cell + 1,
                            page.len()
                        ))?;
                    }
                    HostEvent::Complete => break,
                    HostEvent::Cancel => {
                        self.cancel()?;
                        return Ok(ReviewOutcome::Cancelled);
                    }
                }
            }
        }

        self.renderer.clear();
        Ok(ReviewOutcome::Completed {
            marked: self.session.marked_count(),
        })
    }

    /// Decisions for every record of the bundle at `bundle_index`
    pub fn decisions_for(&self, bundle_index: usize) -> Vec<Decision> {
        let count = self
            .bundles
            .get(bundle_index)
            .map_or(0, |bundle| bundle.document().records().len());
        self.session.decisions_for(bundle_index, count)
    }

    fn change_for(&self, bundle_index: usize) -> Result<Option<FileChange>> {
        let Some(bundle) = self.bundles.get(bundle_index) else {
            return Ok(None);
        };
        let changes = bundle
            .document()
            .changes(&self.decisions_for(bundle_index))?;
        Ok((!changes.is_empty()).then(|| FileChange {
            bundle: bundle.id(),
            path: bundle.roi_path().to_path_buf(),
            records: bundle.document().records().len(),
            rejected: changes.rejected,
            restored: changes.restored,
        }))
    }

    /// Files that finalizing would rewrite, without touching them
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if the session and the loaded
    /// bundles disagree on record counts
    pub fn plan(&self) -> Result<Vec<FileChange>> {
        let mut changes = Vec::new();
        for &bundle_index in self.session.bundle_indices() {
            changes.extend(self.change_for(bundle_index)?);
        }
        Ok(changes)
    }

    /// Rewrite every file with changes, each exactly once
    ///
    /// A failing file does not stop the others; it is listed in
    /// [`FinalizeReport::failed`] and keeps its previous content.
    ///
    /// # Errors
    ///
    /// Returns an invalid transition error unless the controller is reviewing
    pub fn finalize(&mut self, options: &FinalizeOptions) -> Result<FinalizeReport> {
        if self.phase != Phase::Reviewing {
            return Err(self.transition_error("finalize"));
        }
        self.phase = Phase::Finalizing;

        let mut report = FinalizeReport::default();
        for &bundle_index in self.session.bundle_indices() {
            let Some(bundle) = self.bundles.get(bundle_index) else {
                continue;
            };
            let change = match self.change_for(bundle_index) {
                Ok(Some(change)) => change,
                Ok(None) => {
                    report.unchanged.push(bundle.roi_path().to_path_buf());
                    continue;
                }
                Err(error) => {
                    report.failed.push(WriteFailure {
                        path: bundle.roi_path().to_path_buf(),
                        error,
                    });
                    continue;
                }
            };

            let decisions = self.decisions_for(bundle_index);
            match bundle
                .document()
                .write(&decisions, options.history_stamp.as_deref())
            {
                Ok(()) => report.written.push(change),
                Err(error) => {
                    tracing::warn!(path = %change.path.display(), %error, "rewrite failed");
                    report.failed.push(WriteFailure {
                        path: change.path,
                        error,
                    });
                }
            }
        }

        self.phase = Phase::Done;
        Ok(report)
    }
}
