//! Append-only commit log per log identity.
//!
//! Each identity gets its own log directory, so writers on different logs
//! never contend. Within one identity, commits are numbered 1, 2, 3, ... and
//! a `CURRENT` file names the latest committed version:
//!
//! ```text
//! logs/<hex(uri)>/_curvelog/
//!   CURRENT            # "3\n"
//!   0000000001.json    # InsertHeader + WriteRows + UpdateHeader(ranges)
//!   0000000002.json
//!   0000000003.json
//! ```
//!
//! Each commit file holds one [`Commit`] whose ordered [`LogAction`]s rebuild
//! the log's header and bulk rows when replayed from version 1. A commit is
//! only written if `CURRENT` still equals the version the writer started
//! from; the create-new open of the commit file is the real guard against two
//! writers racing for the same version.
pub mod actions;
pub mod log_state;
pub mod log_store;

pub use actions::{Commit, LogAction};
pub use log_state::LogState;
pub use log_store::TransactionLogStore;

use snafu::{Backtrace, prelude::*};

use crate::storage::StorageError;

/// Errors that can occur while reading or writing a commit log.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CommitError {
    /// The caller's expected version does not match `CURRENT`.
    #[snafu(display("Commit conflict: expected version {expected}, but CURRENT is {found}"))]
    Conflict {
        /// Version the writer started from.
        expected: u64,
        /// Version actually found.
        found: u64,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// A header insert found a live header for the identity.
    #[snafu(display("Log {uri} already has a header"))]
    HeaderExists {
        /// Log identity.
        uri: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// Underlying storage failure.
    #[snafu(display("Storage error while accessing commit log: {source}"))]
    Storage {
        /// Storage error; carries its own backtrace.
        #[snafu(backtrace)]
        source: StorageError,
    },

    /// The log or `CURRENT` is malformed.
    #[snafu(display("Corrupt log state: {msg}"))]
    CorruptState {
        /// Description of the problem.
        msg: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },
}

impl CommitError {
    /// True when the failure means another writer committed first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CommitError::Conflict { .. }
                | CommitError::Storage {
                    source: StorageError::AlreadyExists { .. }
                }
        )
    }
}
