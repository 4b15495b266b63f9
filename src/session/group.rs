//! Numbered `Group_<N>` result directories

use crate::io::configuration::GROUP_PREFIX;
use crate::io::error::{Result, fs_error};
use std::fs;
use std::path::{Path, PathBuf};

/// Group number encoded in a directory name, if it is a group directory
pub fn group_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(GROUP_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Path of group `number` inside `dir`
pub fn group_path(dir: &Path, number: u32) -> PathBuf {
    dir.join(format!("{GROUP_PREFIX}{number}"))
}

/// Highest existing group number inside `dir`
///
/// # Errors
///
/// Returns a file system error if `dir` cannot be listed
pub fn latest_group(dir: &Path) -> Result<Option<u32>> {
    let mut latest = None;
    for entry in fs::read_dir(dir).map_err(fs_error(dir, "list directory"))? {
        let entry = entry.map_err(fs_error(dir, "list directory"))?;
        if !entry.file_type().is_ok_and(|kind| kind.is_dir()) {
            continue;
        }
        if let Some(number) = group_number(&entry.file_name().to_string_lossy()) {
            latest = latest.max(Some(number));
        }
    }
    Ok(latest)
}

/// Number the next run in `dir` would use, without creating anything
///
/// The latest group is reused while it is still empty; otherwise the next
/// number is taken. The first group is `Group_1`.
///
/// # Errors
///
/// Returns a file system error if a directory cannot be listed
pub fn peek_next_group(dir: &Path) -> Result<u32> {
    Ok(match latest_group(dir)? {
        Some(latest) => {
            let path = group_path(dir, latest);
            let empty = fs::read_dir(&path)
                .map_err(fs_error(&path, "list directory"))?
                .next()
                .is_none();
            if empty { latest } else { latest + 1 }
        }
        None => 1,
    })
}

/// Pick and create the group directory for a new run
///
/// # Errors
///
/// Returns a file system error if `dir` cannot be listed or the group
/// directory cannot be created
pub fn next_group(dir: &Path) -> Result<(u32, PathBuf)> {
    let number = peek_next_group(dir)?;
    let path = group_path(dir, number);
    fs::create_dir_all(&path).map_err(fs_error(&path, "create directory"))?;
    tracing::debug!(group = number, path = %path.display(), "group directory ready");
    Ok((number, path))
}
