//! Review sessions: discovery, randomization, paging and the review state machine

/// Randomized assignment of bundles to sessions
pub mod builder;
/// Review state machine and file rewriting
pub mod controller;
/// Result file discovery and bundle loading
pub mod discovery;
/// Numbered result directories
pub mod group;
/// Host contract and the scripted host
pub mod host;
/// Grid geometry and hit-testing
pub mod layout;
/// Session records and decisions
pub mod review;
/// Persisted multi-session plan
pub mod state;
