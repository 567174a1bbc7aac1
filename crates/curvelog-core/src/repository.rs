//! Persistence and bulk collaborators.
//!
//! The store core drives every mutation through a [`LogTransaction`] scoped
//! to one log identity. Transactions are owned values: [`LogTransaction::commit`]
//! consumes them, and dropping one without committing discards everything it
//! staged.
pub mod local;

pub use local::{LocalLogRepository, LocalTransaction};

use async_trait::async_trait;

use crate::bulk::CurveDeleteRange;
use crate::extract::RowReader;
use crate::index::{CurveRanges, Direction, IndexMode};
use crate::metadata::{HeaderPatch, LogHeader, LogUri};
use crate::transaction_log::CommitError;

/// Read access plus transaction factory for stored logs.
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Transaction type handed out by [`LogRepository::begin`].
    type Transaction: LogTransaction;

    /// Committed header of `uri`, if the log exists.
    async fn get_header(&self, uri: &LogUri) -> Result<Option<LogHeader>, CommitError>;

    /// Committed rows of `uri` in direction order, if the log exists.
    async fn read_rows(&self, uri: &LogUri) -> Result<Option<RowReader>, CommitError>;

    /// Start a transaction scoped to `uri`.
    async fn begin(&self, uri: &LogUri) -> Result<Self::Transaction, CommitError>;
}

/// Staged header and bulk writes for one log identity.
///
/// Methods returning a row count report how many headers the write touched
/// (0 or 1).
#[async_trait]
pub trait LogTransaction: Send + Sized {
    /// Identity this transaction is scoped to.
    fn uri(&self) -> &LogUri;

    /// Header as staged so far.
    fn header(&self) -> Option<&LogHeader>;

    /// Create the header; fails when one already exists.
    fn insert_header(&mut self, header: LogHeader) -> Result<(), CommitError>;

    /// Apply a field mask to the header.
    fn update_header(&mut self, patch: HeaderPatch) -> Result<u64, CommitError>;

    /// Overwrite the header wholesale.
    fn replace_header(&mut self, header: LogHeader) -> Result<u64, CommitError>;

    /// Remove the header and all rows.
    fn delete_header(&mut self) -> Result<u64, CommitError>;

    /// Drop every bulk row.
    fn delete_all_rows(&mut self) -> Result<(), CommitError>;

    /// Delete closed per-curve ranges and return the remaining coverage of
    /// every curve of the staged header.
    fn delete_ranges(
        &mut self,
        direction: Direction,
        mode: IndexMode,
        ranges: &[CurveDeleteRange],
    ) -> Result<CurveRanges, CommitError>;

    /// Drop every cell of the given curves; rows stay keyed by the index.
    fn drop_curves(&mut self, uids: &[String]) -> Result<(), CommitError>;

    /// Upsert the reader's rows; returns how many rows were written.
    fn write_rows(&mut self, reader: &RowReader) -> Result<usize, CommitError>;

    /// Coverage of every curve of the staged header.
    fn curve_ranges(&self) -> CurveRanges;

    /// Make the staged work durable and visible; returns the new version.
    async fn commit(self) -> Result<u64, CommitError>;
}
