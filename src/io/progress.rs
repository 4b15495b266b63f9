//! Progress display for loading result files and rendering montages

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::LazyLock;

static STAGE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{prefix:>10}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Coordinates the progress bars of one run
///
/// Bars are stacked on a single [`MultiProgress`] so that log lines and bars
/// do not interleave. A hidden manager swallows all output, which is what
/// `--quiet` and the tests use.
pub struct ProgressManager {
    multi_progress: MultiProgress,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    /// Progress manager drawing to standard error
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
        }
    }

    /// Progress manager that never draws
    pub fn hidden() -> Self {
        Self {
            multi_progress: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    /// Add a bar for a stage of `total` steps
    pub fn stage(&self, label: &str, total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(STAGE_STYLE.clone());
        bar.set_prefix(label.to_owned());
        self.multi_progress.add(bar)
    }

    /// Remove every bar from the terminal
    pub fn finish(&self) {
        let _ = self.multi_progress.clear();
    }
}
