//! Contract between the review controller and whatever displays thumbnails
//!
//! A host only ever sees pixels, 1-based cell labels and the current marks.
//! File names, directories and record ids never reach it while a page is
//! being reviewed.

use crate::io::error::Result;
use crate::session::controller::FileChange;
use crate::session::layout::GridLayout;
use image::RgbImage;
use std::collections::VecDeque;

/// One cell of a page
#[derive(Debug, Clone)]
pub struct Thumbnail {
    /// Anonymous label, the 1-based cell number
    pub label: String,
    /// Crop to display, `None` when no image is available
    pub image: Option<RgbImage>,
    /// True when the record will be commented out
    pub marked: bool,
}

/// A page of thumbnails to display
#[derive(Debug, Clone)]
pub struct GridPage {
    /// Session number
    pub session: usize,
    /// 1-based page number
    pub number: usize,
    /// Pages in this session
    pub page_count: usize,
    /// Geometry to lay the thumbnails out with
    pub layout: GridLayout,
    /// Cells in display order
    pub thumbnails: Vec<Thumbnail>,
}

impl GridPage {
    /// Number of cells on this page
    pub const fn len(&self) -> usize {
        self.thumbnails.len()
    }

    /// True when the page has no cells
    pub const fn is_empty(&self) -> bool {
        self.thumbnails.is_empty()
    }

    /// Cell under the montage pixel `(x, y)`, if any
    pub fn cell_at(&self, x: u32, y: u32) -> Option<usize> {
        self.layout.cell_at(x, y, self.len())
    }

    /// Labels of the marked cells
    pub fn marked_labels(&self) -> Vec<&str> {
        self.thumbnails
            .iter()
            .filter(|thumbnail| thumbnail.marked)
            .map(|thumbnail| thumbnail.label.as_str())
            .collect()
    }
}

/// Reviewer input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// Flip the cell at this 0-based index of the current page
    Toggle(usize),
    /// Accept the current page
    Complete,
    /// Abandon the session without writing anything
    Cancel,
}

/// Displays pages and reports reviewer input
pub trait ReviewHost {
    /// Whether thumbnails should carry pixels
    fn wants_pixels(&self) -> bool {
        true
    }

    /// Show a new page
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be displayed
    fn present(&mut self, page: &GridPage) -> Result<()>;

    /// Show the current page again after its marks changed
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be displayed
    fn refresh(&mut self, page: &GridPage) -> Result<()> {
        self.present(page)
    }

    /// Wait for the next reviewer input
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read
    fn next_event(&mut self) -> Result<HostEvent>;

    /// Ask whether the listed changes should be written
    ///
    /// # Errors
    ///
    /// Returns an error if the question cannot be asked
    fn confirm(&mut self, changes: &[FileChange]) -> Result<bool>;

    /// Show an informational message
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be shown
    fn notify(&mut self, message: &str) -> Result<()>;
}

/// What a [`ScriptedHost`] was shown for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedPage {
    /// Session number
    pub session: usize,
    /// 1-based page number
    pub number: usize,
    /// Cell labels
    pub labels: Vec<String>,
    /// Cell marks
    pub marked: Vec<bool>,
}

/// Host replaying a fixed list of events
///
/// Completes every page once the script runs out. Used by tests and for
/// non-interactive runs.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    events: VecDeque<HostEvent>,
    decline: bool,
    presented: Vec<PresentedPage>,
    messages: Vec<String>,
    confirmations: Vec<Vec<FileChange>>,
}

impl ScriptedHost {
    /// Host replaying `events` and confirming every write
    pub fn new(events: impl IntoIterator<Item = HostEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Decline every write request
    #[must_use]
    pub const fn declining(mut self) -> Self {
        self.decline = true;
        self
    }

    /// Pages shown so far, refreshes included
    pub fn presented(&self) -> &[PresentedPage] {
        &self.presented
    }

    /// Messages received so far
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Change lists the host was asked to confirm
    pub fn confirmations(&self) -> &[Vec<FileChange>] {
        &self.confirmations
    }
}

impl ReviewHost for ScriptedHost {
    fn wants_pixels(&self) -> bool {
        false
    }

    fn present(&mut self, page: &GridPage) -> Result<()> {
        self.presented.push(PresentedPage {
            session: page.session,
            number: page.number,
            labels: page.thumbnails.iter().map(|t| t.label.clone()).collect(),
            marked: page.thumbnails.iter().map(|t| t.marked).collect(),
        });
        Ok(())
    }

    fn next_event(&mut self) -> Result<HostEvent> {
        Ok(self.events.pop_front().unwrap_or(HostEvent::Complete))
    }

    fn confirm(&mut self, changes: &[FileChange]) -> Result<bool> {
        self.confirmations.push(changes.to_vec());
        Ok(!self.decline)
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        self.messages.push(message.to_owned());
        Ok(())
    }
}
