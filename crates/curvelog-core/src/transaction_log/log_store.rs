//! Reading and writing one identity's commit log.
//!
//! A missing `CURRENT` means version 0: the identity has never been written.
//! Commits are created with create-new semantics so each version exists at
//! most once, then `CURRENT` is advanced with an atomic rename. A crash
//! between the two leaves an orphan commit file above `CURRENT`. Readers only
//! replay up to `CURRENT` and ignore it. The next writer whose create-new hits
//! the orphan rolls `CURRENT` forward onto it when it parses as the successor
//! of `CURRENT`, then reports a conflict so the caller retries on the new
//! state. An orphan that does not parse (torn write) must be removed by hand.
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{info, warn};
use snafu::{Backtrace, prelude::*};

use crate::metadata::LogUri;
use crate::storage::{self, StorageError, StoreLocation};
use crate::transaction_log::{
    Commit, CommitError, ConflictSnafu, CorruptStateSnafu, LogAction, StorageSnafu,
};

/// Commit log of a single log identity.
#[derive(Clone, Debug)]
pub struct TransactionLogStore {
    location: StoreLocation,
    log_dir: PathBuf,
}

impl TransactionLogStore {
    /// Name of the commit log subdirectory.
    pub const LOG_DIR_NAME: &str = "_curvelog";
    /// Name of the current version pointer.
    pub const CURRENT_FILE_NAME: &str = "CURRENT";
    /// Digits in zero-padded commit file names.
    pub const COMMIT_FILENAME_DIGITS: usize = 10;

    /// Commit log of `uri` under `location`.
    pub fn for_log(location: StoreLocation, uri: &LogUri) -> Self {
        let log_dir = StoreLocation::log_dir(uri).join(Self::LOG_DIR_NAME);
        Self { location, log_dir }
    }

    /// Directory of the commit log, relative to the store root.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn current_rel_path(&self) -> PathBuf {
        self.log_dir.join(Self::CURRENT_FILE_NAME)
    }

    fn commit_rel_path(&self, version: u64) -> PathBuf {
        self.log_dir.join(format!(
            "{:0width$}.json",
            version,
            width = Self::COMMIT_FILENAME_DIGITS
        ))
    }

    /// Load one commit.
    pub async fn load_commit(&self, version: u64) -> Result<Commit, CommitError> {
        let rel = self.commit_rel_path(version);
        let json = storage::read_to_string(&self.location, &rel)
            .await
            .context(StorageSnafu)?;

        serde_json::from_str(&json).map_err(|e| CommitError::CorruptState {
            msg: format!("failed to parse commit {version}: {e}"),
            backtrace: Backtrace::capture(),
        })
    }

    /// Load the `CURRENT` pointer; 0 when the identity was never written.
    pub async fn load_current_version(&self) -> Result<u64, CommitError> {
        let rel = self.current_rel_path();
        let contents = match storage::read_to_string(&self.location, &rel).await {
            Ok(s) => s,
            Err(StorageError::NotFound { .. }) => return Ok(0),
            Err(source) => return Err(CommitError::Storage { source }),
        };

        let trimmed = contents.trim();
        ensure!(
            !trimmed.is_empty(),
            CorruptStateSnafu {
                msg: format!("CURRENT has empty content at {rel:?}"),
            }
        );
        trimmed.parse::<u64>().map_err(|e| CommitError::CorruptState {
            msg: format!("CURRENT has invalid content {trimmed:?}: {e}"),
            backtrace: Backtrace::capture(),
        })
    }

    /// Commit `actions` as version `expected + 1`.
    ///
    /// Fails with [`CommitError::Conflict`] when `CURRENT` moved past
    /// `expected` or an orphaned commit was adopted, and with
    /// `Storage(AlreadyExists)` when the commit file is taken by anything else.
    pub async fn commit_with_expected_version(
        &self,
        expected: u64,
        actions: Vec<LogAction>,
    ) -> Result<u64, CommitError> {
        let current = self.load_current_version().await?;
        ensure!(
            current == expected,
            ConflictSnafu {
                expected,
                found: current,
            }
        );

        let version = expected.checked_add(1).context(CorruptStateSnafu {
            msg: "version counter overflow".to_string(),
        })?;

        let commit = Commit {
            version,
            base_version: expected,
            timestamp: Utc::now(),
            actions,
        };
        let json = serde_json::to_vec(&commit).map_err(|e| CommitError::CorruptState {
            msg: format!("failed to serialize commit {version}: {e}"),
            backtrace: Backtrace::capture(),
        })?;

        match storage::write_new(&self.location, &self.commit_rel_path(version), &json).await {
            Ok(()) => {}
            Err(source @ StorageError::AlreadyExists { .. }) => {
                if self.adopt_orphan(expected, version).await? {
                    return ConflictSnafu {
                        expected,
                        found: version,
                    }
                    .fail();
                }
                return Err(CommitError::Storage { source });
            }
            Err(source) => return Err(CommitError::Storage { source }),
        }
        self.write_current(version).await?;

        info!(
            "committed version {version} of {} ({} actions)",
            self.log_dir().display(),
            commit.actions.len()
        );
        Ok(version)
    }

    async fn write_current(&self, version: u64) -> Result<(), CommitError> {
        storage::write_atomic(
            &self.location,
            &self.current_rel_path(),
            format!("{version}\n").as_bytes(),
        )
        .await
        .context(StorageSnafu)
    }

    /// Point `CURRENT` at an existing commit `version` left behind by a writer
    /// that never advanced it. Returns false when the file is not a complete
    /// successor of `expected` or `CURRENT` has already moved.
    async fn adopt_orphan(&self, expected: u64, version: u64) -> Result<bool, CommitError> {
        if self.load_current_version().await? != expected {
            return Ok(false);
        }
        let Ok(orphan) = self.load_commit(version).await else {
            return Ok(false);
        };
        if orphan.version != version || orphan.base_version != expected {
            return Ok(false);
        }
        warn!(
            "adopting orphaned commit {version} of {}",
            self.log_dir().display()
        );
        self.write_current(version).await?;
        Ok(true)
    }
}
