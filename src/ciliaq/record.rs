//! Single result rows and the reviewer's decision about them

use crate::io::configuration::COMMENT_MARKER;
use serde::{Deserialize, Serialize};

/// One cilium row of a CiliaQ results table
#[derive(Debug, Clone, PartialEq)]
pub struct CiliumRecord {
    /// Cilium identifier, unique within its file
    pub id: String,
    /// Centre x coordinate in calibrated units
    pub x: f64,
    /// Centre y coordinate in calibrated units
    pub y: f64,
    /// False when the row was already commented out on load
    pub active: bool,
    /// 0-based index of the row among the file's lines
    pub line: usize,
}

impl CiliumRecord {
    /// Centre of the cilium in image pixels
    pub fn pixel_center(&self, calibration: f64) -> (f64, f64) {
        (self.x * calibration, self.y * calibration)
    }

    /// State the row will have after applying `decision`
    pub const fn effective_active(&self, decision: Decision) -> bool {
        decision.resolve(self.active)
    }
}

/// Reviewer verdict for one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Not touched during review, the row keeps its loaded state
    #[default]
    Unset,
    /// Explicitly kept, restores a commented row
    Keep,
    /// Marked as contaminant, the row gets commented out
    Reject,
}

impl Decision {
    /// Decision after one toggle of a record loaded with `loaded_active`
    ///
    /// Toggling always flips the effective state, so two toggles return to a
    /// decision that resolves to the loaded state.
    pub const fn toggled(self, loaded_active: bool) -> Self {
        match self {
            Self::Unset if loaded_active => Self::Reject,
            Self::Unset => Self::Keep,
            Self::Keep => Self::Reject,
            Self::Reject => Self::Keep,
        }
    }

    /// Effective active state for a record loaded with `loaded_active`
    pub const fn resolve(self, loaded_active: bool) -> bool {
        match self {
            Self::Unset => loaded_active,
            Self::Keep => true,
            Self::Reject => false,
        }
    }
}

/// True when `line` is commented out
pub fn is_commented(line: &[u8]) -> bool {
    line.starts_with(b"#")
}

/// `line` with the comment marker removed
///
/// Accepts `#` with or without the trailing space so hand-edited files
/// round trip too.
pub fn uncomment(line: &[u8]) -> &[u8] {
    line.strip_prefix(COMMENT_MARKER.as_bytes())
        .or_else(|| line.strip_prefix(b"#"))
        .unwrap_or(line)
}

/// Split a results row into columns
///
/// CiliaQ writes tab separated tables, older exports used commas; both
/// delimiters are accepted. Columns stay raw bytes since headers may carry
/// text in the platform charset.
pub fn split_columns(line: &[u8]) -> Vec<&[u8]> {
    line.split(|&byte| byte == b'\t' || byte == b',').collect()
}
