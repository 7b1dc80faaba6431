//! Disk-backed [`FileSystem`] for the data directory.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ports::filesystem::FileSystem;

/// Reads rosters and writes reports on the local disk.
///
/// Writes land in a sibling temp file first and are renamed into place, so a
/// report being rewritten by a scheduled pass is never seen half written.
pub struct LiveFileSystem;

fn with_path(path: &Path, err: std::io::Error) -> Box<dyn Error + Send + Sync> {
    format!("{}: {err}", path.display()).into()
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, Box<dyn Error + Send + Sync>> {
        fs::read_to_string(path).map_err(|e| with_path(path, e))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| with_path(parent, e))?;
        }
        let staging = staging_path(path);
        fs::write(&staging, contents).map_err(|e| with_path(&staging, e))?;
        fs::rename(&staging, path).map_err(|e| with_path(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Regular files only; subdirectories are skipped.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| with_path(path, e))? {
            let entry = entry.map_err(|e| with_path(path, e))?;
            if !entry.file_type().map_err(|e| with_path(path, e))?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
