//! Blinded, randomized review of cilia ROIs detected by CiliaQ
//!
//! Result files (`_CQ.txt`) from one or more directories are pooled, shuffled
//! into review sessions and shown as anonymous thumbnail grids. ROIs the
//! reviewer rejects are commented out in place; every other byte of the
//! files is preserved.

#![forbid(unsafe_code)]

/// CiliaQ result file reading and rewriting
pub mod ciliaq;
/// Input/output operations, configuration and error handling
pub mod io;
/// Contrast adjustment, crops and montages
pub mod render;
/// Session planning, review state machine and host contract
pub mod session;

pub use io::error::{CurationError, Result};
