/// Parsed result files and their atomic rewriting
pub mod document;
/// Result rows and review decisions
pub mod record;
