//! Locale file output.
//!
//! Downloaded content is written byte-for-byte via `<path>.lingosync.tmp` and
//! a rename, so a reader never observes a half-written locale file and the
//! checksum recorded afterwards is the checksum of exactly what is on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::detector::content_crc32;
use crate::error::{io_err, SyncError};

/// Atomically write `content` to `path`, creating parent directories.
///
/// Returns the CRC-32 of the written bytes.
pub fn write_locale_file(path: &Path, content: &[u8]) -> Result<u32, SyncError> {
    let tmp = PathBuf::from(format!("{}.lingosync.tmp", path.display()));
    write_with_tmp(path, content, &tmp)
}

fn write_with_tmp(path: &Path, content: &[u8], tmp: &Path) -> Result<u32, SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("wrote: {}", path.display());
    Ok(content_crc32(content))
}

/// Ids whose translation is still the id itself.
///
/// Entries whose translation is not a plain string (plural forms) are never
/// reported. Fails only when `content` is not a JSON array.
pub fn untranslated_ids(content: &[u8]) -> Result<Vec<String>, serde_json::Error> {
    let entries: Vec<serde_json::Value> = serde_json::from_slice(content)?;
    Ok(entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id")?.as_str()?;
            let translation = entry.get("translation")?.as_str()?;
            (id == translation).then(|| id.to_string())
        })
        .collect())
}

/// Remove everything below `dir`, keeping `dir` itself.
///
/// Returns the number of top-level entries removed; a missing `dir` removes
/// nothing.
pub fn clear_dir(dir: &Path) -> Result<usize, SyncError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(io_err(dir, err)),
    };
    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        if file_type.is_dir() {
            std::fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
        } else {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
        }
        removed += 1;
    }
    tracing::info!(dir = %dir.display(), removed, "cleared localized data");
    Ok(removed)
}
