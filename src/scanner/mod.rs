//! Discovery of recorded session files.
//!
//! Inputs may name session files directly or directories that are walked
//! for `*.json` recordings. Hidden entries are skipped.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Extension of recorded session files.
const SESSION_EXTENSION: &str = "json";

/// Scanned session file information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Finds recorded sessions under a set of input paths.
pub struct SessionScanner {
    inputs: Vec<PathBuf>,
    max_depth: usize,
}

impl SessionScanner {
    /// Create a scanner over the given files and directories.
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self {
            inputs,
            max_depth: usize::MAX,
        }
    }

    /// Limit how deep directories are walked.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Every session file, files first in input order, directory contents
    /// sorted by path.
    pub fn scan(&self) -> Result<Vec<SessionFile>> {
        let mut sessions = Vec::new();

        for input in &self.inputs {
            if input.is_file() {
                sessions.push(session_file(input)?);
            } else if input.is_dir() {
                self.walk_dir(input, &mut sessions);
            } else {
                return Err(anyhow!("Session path not found: {}", input.display()));
            }
        }

        Ok(sessions)
    }

    fn walk_dir(&self, dir: &Path, sessions: &mut Vec<SessionFile>) {
        let walker = WalkDir::new(dir)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read entry under {}: {}", dir.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !has_session_extension(entry.path()) {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => {
                    debug!("Found session {}", entry.path().display());
                    sessions.push(SessionFile {
                        path: entry.path().to_path_buf(),
                        size: metadata.len(),
                    });
                }
                Err(e) => debug!("Skipping {}: {}", entry.path().display(), e),
            }
        }
    }
}

fn session_file(path: &Path) -> Result<SessionFile> {
    let metadata = std::fs::metadata(path)?;
    Ok(SessionFile {
        path: path.to_path_buf(),
        size: metadata.len(),
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn has_session_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(SESSION_EXTENSION)
}
