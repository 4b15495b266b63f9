//! Thumbnail rendering: the pixels a host displays

/// Per-channel contrast windows
pub mod contrast;
/// Page montage composition and export
pub mod montage;
/// TIFF stack decoding and z projection
pub mod stack;
/// Cilium crops from the source images
pub mod thumbnail;
