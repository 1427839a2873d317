//! Whole-file replacement via temp file + rename.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Replace `path` with `contents`, creating parent directories as needed.
///
/// The data is written to a hidden sibling first and renamed into place, so
/// readers observe either the old file or the complete new one. An existing
/// file keeps its permissions.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("path missing file name {}", path.display()))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    if let Err(err) = keep_permissions(path, &tmp_path).and_then(|()| {
        fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))
    }) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

fn keep_permissions(path: &Path, tmp_path: &Path) -> Result<()> {
    let Ok(existing) = fs::metadata(path) else {
        return Ok(());
    };
    fs::set_permissions(tmp_path, existing.permissions())
        .with_context(|| format!("copy permissions of {}", path.display()))
}
