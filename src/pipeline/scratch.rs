use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::ChartError;

const ZERO_CHUNK_BYTES: usize = 64 * 1024;

/// Per-song temporary directory for stem audio and other intermediates.
///
/// Every file under it is overwritten with zeros and unlinked before the
/// directory itself is removed. This happens in [`ScratchDir::close`] or,
/// failing that, on drop, so early returns and panics are covered too.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Creates the directory under `parent`, or the system temp dir.
    pub fn create(parent: Option<&Path>) -> Result<Self, ChartError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("chord-chart-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| ChartError::io("create scratch directory", e))?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Wipes and removes the directory, reporting the first failure.
    pub fn close(mut self) -> Result<(), ChartError> {
        match self.dir.take() {
            Some(dir) => {
                let failures = wipe_tree(dir.path());
                let closed = dir.close().map_err(|e| ChartError::io("remove scratch directory", e));
                match failures.into_iter().next() {
                    Some(err) => Err(ChartError::io("wipe scratch file", err)),
                    None => closed,
                }
            }
            None => Ok(()),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let failures = wipe_tree(dir.path());
            if !failures.is_empty() {
                tracing::warn!(
                    path = %self.path.display(),
                    failures = failures.len(),
                    "scratch: some files could not be wiped"
                );
            }
            if let Err(err) = dir.close() {
                tracing::warn!(path = %self.path.display(), error = %err, "scratch: directory not removed");
            }
        }
    }
}

/// Overwrites a regular file with zeros, flushes it to disk and unlinks it.
pub fn overwrite_and_remove(path: &Path) -> io::Result<()> {
    let len = fs::metadata(path)?.len();
    {
        let mut file = OpenOptions::new().write(true).open(path)?;
        let zeros = vec![0u8; ZERO_CHUNK_BYTES];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(ZERO_CHUNK_BYTES as u64) as usize;
            file.write_all(&zeros[..n])?;
            remaining -= n as u64;
        }
        file.sync_all()?;
    }
    fs::remove_file(path)
}

/// Zero-fills and unlinks every file below `root`. Symlinks are unlinked
/// without touching their target. Returns the failures; the walk continues
/// past them.
fn wipe_tree(root: &Path) -> Vec<io::Error> {
    let mut failures = Vec::new();
    let mut wiped = 0usize;
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                failures.push(io::Error::other(err.to_string()));
                continue;
            }
        };
        let file_type = entry.file_type();
        let result = if file_type.is_symlink() {
            fs::remove_file(entry.path())
        } else if file_type.is_file() {
            overwrite_and_remove(entry.path())
        } else {
            continue;
        };
        match result {
            Ok(()) => wiped += 1,
            Err(err) => failures.push(err),
        }
    }
    tracing::debug!(path = %root.display(), wiped, failed = failures.len(), "scratch: wiped");
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_and_remove_deletes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stem.raw");
        fs::write(&path, vec![7u8; ZERO_CHUNK_BYTES * 2 + 13]).expect("write");
        overwrite_and_remove(&path).expect("wipe");
        assert!(!path.exists());
    }

    #[test]
    fn overwrite_and_remove_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(overwrite_and_remove(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn drop_removes_nested_files_and_directory() {
        let parent = tempfile::tempdir().expect("tempdir");
        let scratch = ScratchDir::create(Some(parent.path())).expect("scratch");
        let root = scratch.path().to_path_buf();
        fs::create_dir_all(root.join("stems")).expect("mkdir");
        fs::write(root.join("stems").join("vocal.wav"), b"secret").expect("write");
        fs::write(scratch.file("mix.wav"), b"secret").expect("write");

        drop(scratch);
        assert!(!root.exists());
        assert_eq!(fs::read_dir(parent.path()).expect("read_dir").count(), 0);
    }

    #[test]
    fn close_reports_success() {
        let scratch = ScratchDir::create(None).expect("scratch");
        let root = scratch.path().to_path_buf();
        fs::write(scratch.file("a.bin"), [1u8, 2, 3]).expect("write");
        scratch.close().expect("close");
        assert!(!root.exists());
    }

    #[test]
    fn cleanup_runs_on_panic() {
        let parent = tempfile::tempdir().expect("tempdir");
        let parent_path = parent.path().to_path_buf();
        let result = std::panic::catch_unwind(move || {
            let scratch = ScratchDir::create(Some(&parent_path)).expect("scratch");
            fs::write(scratch.file("stem.wav"), b"audio").expect("write");
            panic!("separation blew up");
        });
        assert!(result.is_err());
        assert_eq!(fs::read_dir(parent.path()).expect("read_dir").count(), 0);
    }
}
