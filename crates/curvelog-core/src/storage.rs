//! Filesystem access for the local persistence collaborator.
//!
//! Every log identity owns one directory under the store root:
//!
//! ```text
//! store_root/
//!   logs/
//!     <hex(uri)>/
//!       _curvelog/
//!         CURRENT
//!         0000000001.json
//! ```
//!
//! This module only knows about relative paths under a [`StoreLocation`] and
//! the two write primitives the commit protocol needs: write-then-rename for
//! the `CURRENT` pointer and create-new for commit files.
mod error;

pub use error::StorageError;

use std::{
    io,
    path::{Path, PathBuf},
};

use error::{AlreadyExistsSnafu, IoSnafu, NotFoundSnafu};
use snafu::prelude::*;
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};

use crate::metadata::LogUri;

/// Result type of storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Root of a store.
#[derive(Clone, Debug)]
pub enum StoreLocation {
    /// A store rooted at a local directory.
    Local(PathBuf),
}

impl StoreLocation {
    /// Store rooted at a local directory.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        StoreLocation::Local(root.into())
    }

    /// Directory (relative to the root) holding everything about `uri`.
    ///
    /// URIs are hex-encoded so any identity maps to one safe path segment.
    pub fn log_dir(uri: &LogUri) -> PathBuf {
        let encoded: String = uri
            .as_str()
            .bytes()
            .map(|b| format!("{b:02x}"))
            .collect();
        Path::new("logs").join(encoded)
    }

    fn join(&self, rel: &Path) -> PathBuf {
        match self {
            StoreLocation::Local(root) => root.join(rel),
        }
    }
}

async fn create_parent_dir(abs: &Path) -> StorageResult<()> {
    if let Some(parent) = abs.parent() {
        fs::create_dir_all(parent)
            .await
            .context(IoSnafu { path: parent })?;
    }
    Ok(())
}

/// Removes a temporary file on drop unless disarmed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            // Best effort; the caller is already returning another error.
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Replace the file at `rel_path` atomically (write temp file, sync, rename).
pub async fn write_atomic(
    location: &StoreLocation,
    rel_path: &Path,
    contents: &[u8],
) -> StorageResult<()> {
    let abs = location.join(rel_path);
    create_parent_dir(&abs).await?;

    let tmp_path = abs.with_extension("tmp");
    let mut guard = TempFileGuard::new(tmp_path.clone());

    {
        let mut file = fs::File::create(&tmp_path)
            .await
            .context(IoSnafu { path: &tmp_path })?;
        file.write_all(contents)
            .await
            .context(IoSnafu { path: &tmp_path })?;
        file.sync_all()
            .await
            .context(IoSnafu { path: &tmp_path })?;
    }

    fs::rename(&tmp_path, &abs)
        .await
        .context(IoSnafu { path: &abs })?;
    guard.disarm();
    Ok(())
}

/// Create `rel_path` and write `contents`, failing with
/// [`StorageError::AlreadyExists`] if the file is already there.
pub async fn write_new(
    location: &StoreLocation,
    rel_path: &Path,
    contents: &[u8],
) -> StorageResult<()> {
    let abs = location.join(rel_path);
    create_parent_dir(&abs).await?;

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&abs)
        .await
    {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(e).context(AlreadyExistsSnafu { path: &abs });
        }
        Err(e) => return Err(e).context(IoSnafu { path: &abs }),
    };

    file.write_all(contents)
        .await
        .context(IoSnafu { path: &abs })?;
    file.sync_all().await.context(IoSnafu { path: &abs })?;
    Ok(())
}

/// Read `rel_path` as UTF-8 text.
pub async fn read_to_string(location: &StoreLocation, rel_path: &Path) -> StorageResult<String> {
    let abs = location.join(rel_path);
    match fs::read_to_string(&abs).await {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e).context(NotFoundSnafu { path: &abs }),
        Err(e) => Err(e).context(IoSnafu { path: &abs }),
    }
}
