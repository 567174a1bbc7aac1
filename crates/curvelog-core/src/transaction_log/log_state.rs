//! Materialized state of one log, rebuilt by replaying its commits.
//!
//! The same [`LogState::apply`] drives replay and transaction staging, so a
//! staged transaction sees exactly the state its commit will produce.
use crate::bulk::BulkTable;
use crate::extract::RowReader;
use crate::index::CurveRanges;
use crate::metadata::LogHeader;
use crate::transaction_log::{CommitError, CorruptStateSnafu, LogAction, TransactionLogStore};

/// Header and bulk rows of one log at a given version.
///
/// Invariant: `header` and `bulk` are the result of applying commits
/// `1..=version` in order. `header` is `None` when the log was never created
/// or has been deleted.
#[derive(Clone, Debug, Default)]
pub struct LogState {
    /// Version the state reflects.
    pub version: u64,
    /// Live header, if any.
    pub header: Option<LogHeader>,
    /// Bulk rows.
    pub bulk: BulkTable,
}

fn index_uid(header: &LogHeader) -> String {
    header
        .index_curve_def()
        .map_or_else(|| header.index_curve.clone(), |c| c.uid.clone())
}

impl LogState {
    /// Apply one action.
    pub fn apply(&mut self, action: &LogAction) {
        match action {
            LogAction::InsertHeader(header) | LogAction::ReplaceHeader(header) => {
                self.bulk.set_index_uid(index_uid(header));
                self.header = Some(header.clone());
            }
            LogAction::UpdateHeader(patch) => {
                if let Some(header) = self.header.as_mut() {
                    patch.apply(header);
                    let uid = index_uid(header);
                    self.bulk.set_index_uid(uid);
                }
            }
            LogAction::DeleteHeader => {
                self.header = None;
                self.bulk.delete_all();
            }
            LogAction::WriteRows(rows) => self.bulk.write(rows),
            LogAction::DeleteRanges {
                direction,
                mode,
                ranges,
            } => self
                .bulk
                .delete_ranges(direction.is_increasing(), *mode, ranges),
            LogAction::DeleteAllRows => self.bulk.delete_all(),
            LogAction::DropCurves(uids) => self.bulk.drop_curves(uids.iter().map(String::as_str)),
        }
    }

    /// Coverage of every curve of the live header (empty without a header).
    pub fn curve_ranges(&self) -> CurveRanges {
        match &self.header {
            Some(header) => self.bulk.curve_ranges(
                header.curves.iter().map(|c| c.uid.as_str()),
                header.is_increasing(),
            ),
            None => CurveRanges::new(),
        }
    }

    /// Reader over every curve, index curve first, rows in direction order.
    pub fn reader(&self) -> Option<RowReader> {
        let header = self.header.as_ref()?;
        let index = index_uid(header);
        let mut curves = vec![index.clone()];
        curves.extend(
            header
                .curves
                .iter()
                .filter(|c| c.uid != index)
                .map(|c| c.uid.clone()),
        );
        Some(self.bulk.to_reader(curves, header.is_increasing()))
    }
}

impl TransactionLogStore {
    /// Rebuild the log state by replaying every commit up to `CURRENT`.
    ///
    /// A never-written identity yields the empty state at version 0.
    pub async fn rebuild_log_state(&self) -> Result<LogState, CommitError> {
        let current = self.load_current_version().await?;
        let mut state = LogState::default();

        for v in 1..=current {
            let commit = self.load_commit(v).await?;
            ensure_version(v, commit.version)?;
            for action in &commit.actions {
                state.apply(action);
            }
        }
        state.version = current;
        Ok(state)
    }
}

fn ensure_version(expected: u64, found: u64) -> Result<(), CommitError> {
    snafu::ensure!(
        expected == found,
        CorruptStateSnafu {
            msg: format!("Commit version mismatch: expected {expected}, found {found} in payload"),
        }
    );
    Ok(())
}
