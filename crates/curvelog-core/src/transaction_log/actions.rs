//! Commit payloads.
//!
//! Actions are the log's verbs. Header actions carry full headers or field
//! masks; bulk actions carry rows or delete ranges. Replaying them in order
//! through [`LogState::apply`](crate::transaction_log::LogState::apply)
//! reproduces the exact committed state.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bulk::CurveDeleteRange;
use crate::extract::DataRow;
use crate::index::{Direction, IndexMode};
use crate::metadata::{HeaderPatch, LogHeader};

/// One recorded mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LogAction {
    /// Create the header.
    InsertHeader(LogHeader),
    /// Apply a field mask to the header.
    UpdateHeader(HeaderPatch),
    /// Overwrite the header wholesale.
    ReplaceHeader(LogHeader),
    /// Remove the header and every row.
    DeleteHeader,
    /// Upsert rows.
    WriteRows(Vec<DataRow>),
    /// Delete closed per-curve ranges.
    DeleteRanges {
        /// Direction the ranges are ordered for.
        direction: Direction,
        /// Index mode of the bounds.
        mode: IndexMode,
        /// Ranges to delete.
        ranges: Vec<CurveDeleteRange>,
    },
    /// Drop every row.
    DeleteAllRows,
    /// Drop every cell of the listed curve uids.
    DropCurves(Vec<String>),
}

/// A single immutable commit.
///
/// `version` matches the file name; `base_version` is what the writer saw as
/// current when it started.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Version of this commit (1-based).
    pub version: u64,
    /// Version the writer started from.
    pub base_version: u64,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Ordered actions.
    pub actions: Vec<LogAction>,
}
