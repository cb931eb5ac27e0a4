//! Startup removal of disk tier directories abandoned by earlier runs.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::instrument;

/// Remove directories in `root` whose name starts with `prefix` and that
/// were last modified more than `age` ago. Returns how many were removed.
///
/// Only listing `root` can fail; problems with individual entries are
/// logged and skipped.
#[instrument(level = "debug", skip(root), fields(root = %root.display()))]
pub fn remove_stale_dirs(root: &Path, prefix: &str, age: Duration) -> Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in fs::read_dir(root).or_raise(|| ErrorKind::Io)? {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_dir() {
            continue;
        }
        let elapsed = meta.modified().ok().and_then(|modified| now.duration_since(modified).ok());
        let stale = elapsed.is_some_and(|elapsed| elapsed > age);
        if !stale {
            continue;
        }
        match fs::remove_dir_all(entry.path()) {
            Ok(()) => {
                tracing::debug!(path = %entry.path().display(), "Removed stale directory");
                removed += 1;
            },
            Err(err) => tracing::warn!(path = %entry.path().display(), error = %err, "Failed to remove stale directory"),
        }
    }
    Ok(removed)
}
