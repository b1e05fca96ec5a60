//! Staging files for pulled data.
//!
//! Pulled bytes are written next to the target under a hidden, unique name and
//! only moved into place once the transfer (and its checksum) succeeded. A
//! [`StagingFile`] that is dropped without being committed removes itself, so
//! a failed pull never leaves a file at the target path.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ruststack_tpc_core::TpcError;
use tracing::{trace, warn};
use uuid::Uuid;

#[derive(Debug)]
pub(crate) struct StagingFile {
    path: PathBuf,
    committed: bool,
}

impl StagingFile {
    /// Reserve a staging path in the directory of `target`.
    ///
    /// The name does not embed the target's, so any target name that fits the
    /// filesystem also has a staging name that fits.
    pub(crate) fn for_target(target: &Path) -> Result<Self, TpcError> {
        if target.file_name().is_none() {
            return Err(TpcError::transfer(format!(
                "Invalid local target: {}",
                target.display()
            )));
        }
        let path = target.with_file_name(format!(".tpc-{}", Uuid::new_v4().simple()));
        Ok(Self {
            path,
            committed: false,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged data to `target`.
    ///
    /// With `overwrite` the target is atomically replaced. Without it the data
    /// is linked into place, failing with [`TpcError::Precondition`] if the
    /// target appeared in the meantime.
    pub(crate) async fn commit(mut self, target: &Path, overwrite: bool) -> Result<(), TpcError> {
        if overwrite {
            tokio::fs::rename(&self.path, target).await.map_err(|e| {
                TpcError::transfer(format!("Cannot store {}: {e}", target.display()))
            })?;
            self.committed = true;
            return Ok(());
        }

        // The staging link itself is removed on drop.
        match tokio::fs::hard_link(&self.path, target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(TpcError::Precondition),
            Err(e) => Err(TpcError::transfer(format!(
                "Cannot store {}: {e}",
                target.display()
            ))),
        }
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // A single unlink; not worth a blocking-pool hop from async callers.
        match std::fs::remove_file(&self.path) {
            Ok(()) => trace!(path = %self.path.display(), "removed staging file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove staging file"),
        }
    }
}
