//! Local filesystem repository backed by per-identity commit logs.
use async_trait::async_trait;
use log::debug;

use crate::bulk::CurveDeleteRange;
use crate::extract::RowReader;
use crate::index::{CurveRanges, Direction, IndexMode};
use crate::metadata::{HeaderPatch, LogHeader, LogUri};
use crate::repository::{LogRepository, LogTransaction};
use crate::storage::StoreLocation;
use crate::transaction_log::{
    CommitError, HeaderExistsSnafu, LogAction, LogState, TransactionLogStore,
};

/// Repository rooted at a local directory.
#[derive(Clone, Debug)]
pub struct LocalLogRepository {
    location: StoreLocation,
}

impl LocalLogRepository {
    /// Repository rooted at `location`.
    pub fn new(location: StoreLocation) -> Self {
        Self { location }
    }

    fn log_store(&self, uri: &LogUri) -> TransactionLogStore {
        TransactionLogStore::for_log(self.location.clone(), uri)
    }
}

#[async_trait]
impl LogRepository for LocalLogRepository {
    type Transaction = LocalTransaction;

    async fn get_header(&self, uri: &LogUri) -> Result<Option<LogHeader>, CommitError> {
        Ok(self.log_store(uri).rebuild_log_state().await?.header)
    }

    async fn read_rows(&self, uri: &LogUri) -> Result<Option<RowReader>, CommitError> {
        Ok(self.log_store(uri).rebuild_log_state().await?.reader())
    }

    async fn begin(&self, uri: &LogUri) -> Result<LocalTransaction, CommitError> {
        let log_store = self.log_store(uri);
        let state = log_store.rebuild_log_state().await?;
        debug!("begin transaction on {uri} at version {}", state.version);
        Ok(LocalTransaction {
            uri: uri.clone(),
            log_store,
            base_version: state.version,
            state,
            actions: Vec::new(),
            finished: false,
        })
    }
}

/// Transaction staging actions against an in-memory copy of the log state.
///
/// Dropping it without [`LogTransaction::commit`] discards the staged actions.
#[derive(Debug)]
pub struct LocalTransaction {
    uri: LogUri,
    log_store: TransactionLogStore,
    base_version: u64,
    state: LogState,
    actions: Vec<LogAction>,
    finished: bool,
}

impl LocalTransaction {
    fn stage(&mut self, action: LogAction) {
        self.state.apply(&action);
        self.actions.push(action);
    }
}

#[async_trait]
impl LogTransaction for LocalTransaction {
    fn uri(&self) -> &LogUri {
        &self.uri
    }

    fn header(&self) -> Option<&LogHeader> {
        self.state.header.as_ref()
    }

    fn insert_header(&mut self, header: LogHeader) -> Result<(), CommitError> {
        if self.state.header.is_some() {
            return HeaderExistsSnafu {
                uri: self.uri.to_string(),
            }
            .fail();
        }
        self.stage(LogAction::InsertHeader(header));
        Ok(())
    }

    fn update_header(&mut self, patch: HeaderPatch) -> Result<u64, CommitError> {
        if self.state.header.is_none() {
            return Ok(0);
        }
        if !patch.is_empty() {
            self.stage(LogAction::UpdateHeader(patch));
        }
        Ok(1)
    }

    fn replace_header(&mut self, header: LogHeader) -> Result<u64, CommitError> {
        if self.state.header.is_none() {
            return Ok(0);
        }
        self.stage(LogAction::ReplaceHeader(header));
        Ok(1)
    }

    fn delete_header(&mut self) -> Result<u64, CommitError> {
        if self.state.header.is_none() {
            return Ok(0);
        }
        self.stage(LogAction::DeleteHeader);
        Ok(1)
    }

    fn delete_all_rows(&mut self) -> Result<(), CommitError> {
        if !self.state.bulk.is_empty() {
            self.stage(LogAction::DeleteAllRows);
        }
        Ok(())
    }

    fn delete_ranges(
        &mut self,
        direction: Direction,
        mode: IndexMode,
        ranges: &[CurveDeleteRange],
    ) -> Result<CurveRanges, CommitError> {
        if !ranges.is_empty() {
            self.stage(LogAction::DeleteRanges {
                direction,
                mode,
                ranges: ranges.to_vec(),
            });
        }
        Ok(self.state.curve_ranges())
    }

    fn drop_curves(&mut self, uids: &[String]) -> Result<(), CommitError> {
        if !uids.is_empty() {
            self.stage(LogAction::DropCurves(uids.to_vec()));
        }
        Ok(())
    }

    fn write_rows(&mut self, reader: &RowReader) -> Result<usize, CommitError> {
        if reader.is_empty() {
            return Ok(0);
        }
        self.stage(LogAction::WriteRows(reader.rows().to_vec()));
        Ok(reader.len())
    }

    fn curve_ranges(&self) -> CurveRanges {
        self.state.curve_ranges()
    }

    async fn commit(mut self) -> Result<u64, CommitError> {
        self.finished = true;
        if self.actions.is_empty() {
            return Ok(self.base_version);
        }
        let actions = std::mem::take(&mut self.actions);
        self.log_store
            .commit_with_expected_version(self.base_version, actions)
            .await
    }
}

impl Drop for LocalTransaction {
    fn drop(&mut self) {
        if !self.finished && !self.actions.is_empty() {
            debug!(
                "rolling back {} staged actions on {}",
                self.actions.len(),
                self.uri
            );
        }
    }
}
