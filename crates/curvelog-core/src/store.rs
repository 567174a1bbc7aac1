//! Mutation orchestrator.
//!
//! [`LogStore`] turns Add, Update, Replace, partial delete, and full delete
//! requests into one transaction each against a [`LogRepository`]. Every
//! mutation follows the same shape:
//!
//! 1. begin a transaction scoped to the log identity,
//! 2. reconcile and stage the header,
//! 3. stage bulk row writes or deletes,
//! 4. recompute per-curve ranges from the staged rows and stage them,
//! 5. commit, then hand back a [`ChangeNotification`].
//!
//! Any early return drops the transaction, which discards everything it
//! staged; readers never observe a half-applied mutation.
mod error;
mod mutation;
mod options;
pub mod partial_delete;

pub use error::StoreError;
pub use mutation::{MutationPhase, MutationUnit, Operation};
pub use options::StoreOptions;
pub use partial_delete::{
    CurveSelector, DeletePlan, DeleteRequest, DeleteShapeError, plan_partial_delete,
};

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::info;
use snafu::prelude::*;

use crate::extract::{RowReader, extract_for_add, extract_for_replace, extract_for_update};
use crate::index::CurveRanges;
use crate::metadata::{HeaderField, HeaderPatch, LogHeader, LogUri};
use crate::notify::{ChangeKind, ChangeNotification};
use crate::projection::{ChannelMetadata, IndexMetadata, index_metadata, project_channels};
use crate::reconcile::{
    check_immutable, clear_index_values, ensure_range_slots, project, range_patch,
    set_index_range, set_log_index_range, update_patch, update_timestamps, validate_new_header,
};
use crate::repository::{LocalLogRepository, LogRepository, LogTransaction};
use crate::storage::StoreLocation;
use crate::transaction_log::CommitError;
use error::{
    InvalidDataSnafu, InvalidHeaderSnafu, NotFoundSnafu, UnsupportedDeleteShapeSnafu,
    ValidationFailureSnafu,
};

trait CommitResultExt<T> {
    fn for_log(self, uri: &LogUri) -> Result<T, StoreError>;
}

impl<T> CommitResultExt<T> for Result<T, CommitError> {
    fn for_log(self, uri: &LogUri) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::from_commit(uri.as_str(), source))
    }
}

/// Write derived ranges into the staged header: per-curve min/max from
/// `ranges`, log Start/End mirroring the index curve, and the modification
/// stamp when the stored header carries one.
fn stage_ranges<T: LogTransaction>(
    txn: &mut T,
    ranges: &CurveRanges,
    now: DateTime<Utc>,
) -> Result<(), CommitError> {
    let Some(staged) = txn.header() else {
        return Ok(());
    };
    let mut header = staged.clone();
    set_index_range(&mut header, ranges);
    let index_range = header
        .index_curve_def()
        .and_then(|c| ranges.get(&c.uid))
        .copied()
        .unwrap_or_default();
    set_log_index_range(&mut header, &index_range);

    let patch = range_patch(&header).with(HeaderField::LastModified(now));
    txn.update_header(patch)?;
    Ok(())
}

/// Entry point for reading and mutating logs.
#[derive(Debug)]
pub struct LogStore<R: LogRepository = LocalLogRepository> {
    repo: R,
    options: StoreOptions,
}

impl LogStore<LocalLogRepository> {
    /// Store backed by the local filesystem under `root`.
    pub fn open_local(root: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self::new(
            LocalLogRepository::new(StoreLocation::local(root)),
            options,
        )
    }
}

impl<R: LogRepository> LogStore<R> {
    /// Store over an arbitrary persistence collaborator.
    pub fn new(repo: R, options: StoreOptions) -> Self {
        Self { repo, options }
    }

    /// Store-wide settings.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Underlying persistence collaborator.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    async fn finish(
        &self,
        txn: R::Transaction,
        unit: MutationUnit,
        kind: ChangeKind,
    ) -> Result<ChangeNotification, StoreError> {
        let uri = txn.uri().clone();
        let version = txn.commit().await.for_log(&uri)?;
        unit.committed(version);
        info!("committed {kind:?} of {uri} at version {version}");
        Ok(ChangeNotification::new(uri, version, kind))
    }

    /// Create a log from `inbound` and its optional data.
    ///
    /// Inbound range values are ignored; stored ranges always describe the
    /// rows actually written.
    pub async fn add(&self, inbound: LogHeader) -> Result<ChangeNotification, StoreError> {
        let uri = inbound.uri.clone();
        let mut unit = MutationUnit::begin(Operation::Add, &uri);
        let mut txn = self.repo.begin(&uri).await.for_log(&uri)?;
        ensure!(
            txn.header().is_none(),
            error::AlreadyExistsSnafu { uri: uri.as_str() }
        );

        // 1) Normalize the header and split off its data.
        let mut inbound = inbound;
        validate_new_header(&mut inbound).context(InvalidHeaderSnafu { uri: uri.as_str() })?;
        let (mut header, reader) = extract_for_add(inbound, self.options.default_null())
            .context(InvalidDataSnafu { uri: uri.as_str() })?;

        // 2) Stored headers carry empty range slots until data says otherwise.
        let now = Utc::now();
        clear_index_values(&mut header);
        ensure_range_slots(&mut header);
        update_timestamps(&mut header, now, true);
        txn.insert_header(header).for_log(&uri)?;
        unit.advance(MutationPhase::HeaderWritten);

        // 3) Bulk rows.
        txn.write_rows(&reader).for_log(&uri)?;
        unit.advance(MutationPhase::BulkWritten);

        // 4) Ranges from the staged rows.
        let ranges = txn.curve_ranges();
        stage_ranges(&mut txn, &ranges, now).for_log(&uri)?;
        unit.advance(MutationPhase::RangesRecomputed);

        self.finish(txn, unit, ChangeKind::Insert).await
    }

    /// Merge `inbound` into an existing log and upsert its data.
    ///
    /// Fails with [`StoreError::ValidationFailure`] when the log does not
    /// exist.
    pub async fn update(&self, inbound: LogHeader) -> Result<ChangeNotification, StoreError> {
        let uri = inbound.uri.clone();
        let mut unit = MutationUnit::begin(Operation::Update, &uri);
        let mut txn = self.repo.begin(&uri).await.for_log(&uri)?;
        let existing = txn.header().cloned().context(ValidationFailureSnafu {
            uri: uri.as_str(),
            operation: Operation::Update.as_str(),
        })?;

        // 1) Field mask plus a reader resolved against the pre-update curves.
        let now = Utc::now();
        let patch = update_patch(&existing, &inbound, now)
            .context(InvalidHeaderSnafu { uri: uri.as_str() })?;
        let (_, reader) = extract_for_update(inbound, &existing, self.options.default_null())
            .context(InvalidDataSnafu { uri: uri.as_str() })?;

        let affected = txn.update_header(patch).for_log(&uri)?;
        ensure!(
            affected > 0,
            ValidationFailureSnafu {
                uri: uri.as_str(),
                operation: Operation::Update.as_str(),
            }
        );
        unit.advance(MutationPhase::HeaderWritten);

        // 2) Upsert rows.
        txn.write_rows(&reader).for_log(&uri)?;
        unit.advance(MutationPhase::BulkWritten);

        // 3) Ranges over old and new rows together.
        let ranges = txn.curve_ranges();
        stage_ranges(&mut txn, &ranges, now).for_log(&uri)?;
        unit.advance(MutationPhase::RangesRecomputed);

        self.finish(txn, unit, ChangeKind::Update).await
    }

    /// Overwrite an existing log wholesale: header and data.
    ///
    /// Curves missing from the replacement disappear together with their
    /// data. Direction and index curve cannot change.
    pub async fn replace(&self, inbound: LogHeader) -> Result<ChangeNotification, StoreError> {
        let uri = inbound.uri.clone();
        let mut unit = MutationUnit::begin(Operation::Replace, &uri);
        let mut txn = self.repo.begin(&uri).await.for_log(&uri)?;
        let existing = txn.header().cloned().context(ValidationFailureSnafu {
            uri: uri.as_str(),
            operation: Operation::Replace.as_str(),
        })?;
        check_immutable(&existing, &inbound).context(InvalidHeaderSnafu { uri: uri.as_str() })?;

        // 1) Old rows go first; the replacement brings its own.
        txn.delete_all_rows().for_log(&uri)?;

        // 2) Reader and header for the replacement curve set.
        let mut inbound = inbound;
        if inbound.index_curve.is_empty() {
            inbound.index_curve = existing.index_curve.clone();
        }
        if inbound.direction.is_none() {
            inbound.direction = existing.direction;
        }
        let (mut header, reader) =
            extract_for_replace(inbound, &existing, self.options.default_null())
                .context(InvalidDataSnafu { uri: uri.as_str() })?;
        validate_new_header(&mut header).context(InvalidHeaderSnafu { uri: uri.as_str() })?;

        let now = Utc::now();
        clear_index_values(&mut header);
        ensure_range_slots(&mut header);
        header
            .creation_time
            .assign(existing.creation_time.value().copied());
        update_timestamps(&mut header, now, false);

        let affected = txn.replace_header(header).for_log(&uri)?;
        ensure!(
            affected > 0,
            ValidationFailureSnafu {
                uri: uri.as_str(),
                operation: Operation::Replace.as_str(),
            }
        );
        unit.advance(MutationPhase::HeaderWritten);

        // 3) New rows.
        txn.write_rows(&reader).for_log(&uri)?;
        unit.advance(MutationPhase::BulkWritten);

        // 4) Ranges for the replacement curves only.
        let ranges = txn.curve_ranges();
        stage_ranges(&mut txn, &ranges, now).for_log(&uri)?;
        unit.advance(MutationPhase::RangesRecomputed);

        self.finish(txn, unit, ChangeKind::Update).await
    }

    /// Delete index ranges of some or all curves of a log.
    ///
    /// See [`plan_partial_delete`] for how the request is scoped. Ranges never
    /// widen: each curve's stored range afterwards is the coverage of its
    /// remaining rows. Returns `None` without committing when the request
    /// matches nothing to delete.
    pub async fn partial_delete(
        &self,
        request: &DeleteRequest,
    ) -> Result<Option<ChangeNotification>, StoreError> {
        let uri = &request.uri;
        let mut unit = MutationUnit::begin(Operation::PartialDelete, uri);
        let mut txn = self.repo.begin(uri).await.for_log(uri)?;
        let header = txn
            .header()
            .cloned()
            .context(NotFoundSnafu { uri: uri.as_str() })?;

        // 1) Scope.
        let plan = plan_partial_delete(&header, request)
            .context(UnsupportedDeleteShapeSnafu { uri: uri.as_str() })?;
        if plan.is_noop() {
            info!("delete request on {uri} matches no stored data");
            return Ok(None);
        }

        // 2) Removed curves leave the header before any range is deleted.
        let remaining = match plan {
            DeletePlan::DeleteAll => {
                info!("delete request on {uri} removes every row");
                txn.delete_all_rows().for_log(uri)?;
                unit.advance(MutationPhase::BulkWritten);
                txn.curve_ranges()
            }
            DeletePlan::Ranges { ranges, removed } => {
                if !removed.is_empty() {
                    info!("removing curves {removed:?} from {uri}");
                    let kept = header
                        .curves
                        .iter()
                        .filter(|c| !removed.contains(&c.uid))
                        .cloned()
                        .collect();
                    txn.update_header(HeaderPatch::new().with(HeaderField::Curves(kept)))
                        .for_log(uri)?;
                    unit.advance(MutationPhase::HeaderWritten);
                    txn.drop_curves(&removed).for_log(uri)?;
                }
                let remaining = txn
                    .delete_ranges(header.effective_direction(), header.index_mode(), &ranges)
                    .for_log(uri)?;
                unit.advance(MutationPhase::BulkWritten);
                remaining
            }
        };

        // 3) Persist the remaining coverage.
        stage_ranges(&mut txn, &remaining, Utc::now()).for_log(uri)?;
        unit.advance(MutationPhase::RangesRecomputed);

        self.finish(txn, unit, ChangeKind::Update).await.map(Some)
    }

    /// Remove a log: header and every row.
    pub async fn delete(&self, uri: &LogUri) -> Result<ChangeNotification, StoreError> {
        let mut unit = MutationUnit::begin(Operation::Delete, uri);
        let mut txn = self.repo.begin(uri).await.for_log(uri)?;
        ensure!(
            txn.header().is_some(),
            NotFoundSnafu { uri: uri.as_str() }
        );

        let affected = txn.delete_header().for_log(uri)?;
        ensure!(
            affected > 0,
            ValidationFailureSnafu {
                uri: uri.as_str(),
                operation: Operation::Delete.as_str(),
            }
        );
        unit.advance(MutationPhase::HeaderWritten);

        self.finish(txn, unit, ChangeKind::Delete).await
    }

    /// Committed header of `uri`, shaped like `template` when one is given.
    pub async fn get(
        &self,
        uri: &LogUri,
        template: Option<&LogHeader>,
    ) -> Result<LogHeader, StoreError> {
        let stored = self
            .repo
            .get_header(uri)
            .await
            .for_log(uri)?
            .context(NotFoundSnafu { uri: uri.as_str() })?;
        Ok(match template {
            Some(template) => project(template, &stored),
            None => stored,
        })
    }

    /// Committed rows of `uri`, index curve first, in direction order.
    pub async fn read_rows(&self, uri: &LogUri) -> Result<RowReader, StoreError> {
        self.repo
            .read_rows(uri)
            .await
            .for_log(uri)?
            .context(NotFoundSnafu { uri: uri.as_str() })
    }

    /// Channel descriptors of `uri`.
    ///
    /// `decimal_scale` overrides [`StoreOptions::decimal_scale`] for numeric
    /// indexes.
    pub async fn channel_metadata(
        &self,
        uri: &LogUri,
        decimal_scale: Option<u32>,
    ) -> Result<(IndexMetadata, Vec<ChannelMetadata>), StoreError> {
        let header = self.get(uri, None).await?;
        let scale = decimal_scale.unwrap_or(self.options.decimal_scale);
        Ok((index_metadata(&header, scale), project_channels(&header, scale)))
    }
}
