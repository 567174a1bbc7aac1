use snafu::{Backtrace, prelude::*};

use crate::extract::ExtractError;
use crate::reconcile::ReconcileError;
use crate::store::partial_delete::DeleteShapeError;
use crate::transaction_log::CommitError;

/// Errors returned by [`LogStore`](crate::store::LogStore) operations.
///
/// No variant is ever returned after a partial commit: every mutation either
/// commits as a whole or leaves the log untouched.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    /// The log does not exist.
    #[snafu(display("Log {uri} not found"))]
    NotFound {
        /// Log identity.
        uri: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// An Add targeted a log that already exists.
    #[snafu(display("Log {uri} already exists"))]
    AlreadyExists {
        /// Log identity.
        uri: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// Another writer committed to the same log first.
    #[snafu(display("Concurrent modification of {uri}: {source}"))]
    Conflict {
        /// Log identity.
        uri: String,
        /// Commit failure reported by the persistence collaborator.
        source: CommitError,
    },

    /// A write reported zero affected rows.
    #[snafu(display("{operation} of {uri} affected no rows"))]
    ValidationFailure {
        /// Log identity.
        uri: String,
        /// Operation name.
        operation: &'static str,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// A delete request is not usable for the log.
    #[snafu(display("Unsupported delete request for {uri}: {source}"))]
    UnsupportedDeleteShape {
        /// Log identity.
        uri: String,
        /// What is wrong with the request.
        source: DeleteShapeError,
    },

    /// Inbound data could not be extracted.
    #[snafu(display("Invalid data for {uri}: {source}"))]
    InvalidData {
        /// Log identity.
        uri: String,
        /// Extraction failure.
        source: ExtractError,
    },

    /// The inbound header cannot be reconciled with the stored one.
    #[snafu(display("Invalid header for {uri}: {source}"))]
    InvalidHeader {
        /// Log identity.
        uri: String,
        /// Reconciliation failure.
        source: ReconcileError,
    },

    /// The persistence collaborator failed.
    #[snafu(display("Persistence failure for {uri}: {source}"))]
    Persistence {
        /// Log identity.
        uri: String,
        /// Underlying failure, unmodified.
        #[snafu(backtrace)]
        source: CommitError,
    },
}

impl StoreError {
    /// Classify a persistence failure: lost races become
    /// [`StoreError::Conflict`], a header insert over a live header becomes
    /// [`StoreError::AlreadyExists`].
    pub(crate) fn from_commit(uri: &str, source: CommitError) -> Self {
        match source {
            CommitError::HeaderExists { backtrace, .. } => StoreError::AlreadyExists {
                uri: uri.to_string(),
                backtrace,
            },
            source if source.is_conflict() => StoreError::Conflict {
                uri: uri.to_string(),
                source,
            },
            source => StoreError::Persistence {
                uri: uri.to_string(),
                source,
            },
        }
    }
}
