//! Row table semantics for bulk curve data.
//!
//! A [`BulkTable`] keys rows by index value (ordered with
//! [`IndexValue::total_cmp`]) and stores one optional cell per curve uid. The
//! index curve has no column of its own: a row exists exactly where the index
//! curve has data. Consequently deleting a range of the index curve removes
//! whole rows, while deleting a range of any other curve only removes that
//! curve's cells.
use std::{cmp::Ordering, collections::BTreeMap};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::extract::{CellValue, DataRow, RowReader};
use crate::index::{CurveRanges, IndexMode, IndexRange, IndexValue};

/// A closed delete range for one curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveDeleteRange {
    /// Curve uid.
    pub uid: String,
    /// First bound, direction order; `None` is unbounded.
    pub start: Option<IndexValue>,
    /// Last bound, direction order; `None` is unbounded.
    pub end: Option<IndexValue>,
}

impl CurveDeleteRange {
    /// Delete range for `uid` covering `range`.
    pub fn new(uid: impl Into<String>, range: IndexRange) -> Self {
        Self {
            uid: uid.into(),
            start: range.start,
            end: range.end,
        }
    }

    /// Bounds as a range.
    pub fn range(&self) -> IndexRange {
        IndexRange::new(self.start, self.end)
    }

    fn matches_mode(&self, mode: IndexMode) -> bool {
        self.start.is_none_or(|v| v.mode() == mode) && self.end.is_none_or(|v| v.mode() == mode)
    }
}

#[derive(Clone, Copy, Debug)]
struct RowKey(IndexValue);

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RowKey {}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RowKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Bulk rows of one log.
#[derive(Clone, Debug, Default)]
pub struct BulkTable {
    index_uid: String,
    rows: BTreeMap<RowKey, BTreeMap<String, CellValue>>,
}

impl BulkTable {
    /// Empty table whose index curve has the given uid.
    pub fn new(index_uid: impl Into<String>) -> Self {
        Self {
            index_uid: index_uid.into(),
            rows: BTreeMap::new(),
        }
    }

    /// Re-point the table at a new index curve uid.
    pub fn set_index_uid(&mut self, index_uid: impl Into<String>) {
        self.index_uid = index_uid.into();
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Upsert rows. Cells absent from a row (nulls) never overwrite stored
    /// values.
    pub fn write(&mut self, rows: &[DataRow]) {
        for row in rows {
            let Some(index) = row.index.bound() else {
                warn!("skipping bulk row with NaN index");
                continue;
            };
            let cells = self.rows.entry(RowKey(index)).or_default();
            for (uid, value) in &row.values {
                cells.insert(uid.clone(), value.clone());
            }
        }
    }

    /// Drop every row.
    pub fn delete_all(&mut self) {
        self.rows.clear();
    }

    /// Drop every cell of the given curves.
    pub fn drop_curves<'a>(&mut self, uids: impl IntoIterator<Item = &'a str>) {
        let uids: Vec<&str> = uids.into_iter().collect();
        for cells in self.rows.values_mut() {
            cells.retain(|uid, _| !uids.contains(&uid.as_str()));
        }
    }

    /// Delete closed ranges per curve.
    ///
    /// Ranges whose bounds are not of `mode` are skipped with a warning.
    pub fn delete_ranges(&mut self, increasing: bool, mode: IndexMode, ranges: &[CurveDeleteRange]) {
        for delete in ranges {
            if !delete.matches_mode(mode) {
                warn!(
                    "skipping delete range for {} with bounds outside {mode} mode",
                    delete.uid
                );
                continue;
            }
            let range = delete.range().sort(increasing);
            if delete.uid == self.index_uid {
                self.rows
                    .retain(|key, _| !range.contains(&key.0, increasing));
            } else {
                for (key, cells) in self.rows.iter_mut() {
                    if range.contains(&key.0, increasing) {
                        cells.remove(&delete.uid);
                    }
                }
            }
        }
    }

    /// Coverage of each listed curve; curves without data map to the empty
    /// range.
    pub fn curve_ranges<'a>(
        &self,
        uids: impl IntoIterator<Item = &'a str>,
        increasing: bool,
    ) -> CurveRanges {
        uids.into_iter()
            .map(|uid| {
                let indexes = self
                    .rows
                    .iter()
                    .filter(|(_, cells)| uid == self.index_uid || cells.contains_key(uid))
                    .map(|(key, _)| key.0);
                (uid.to_string(), IndexRange::spanning(indexes, increasing))
            })
            .collect()
    }

    /// Reader over the listed curves, rows in direction order.
    pub fn to_reader(&self, curves: Vec<String>, increasing: bool) -> RowReader {
        let row = |(key, cells): (&RowKey, &BTreeMap<String, CellValue>)| DataRow {
            index: key.0,
            values: cells
                .iter()
                .filter(|(uid, _)| curves.contains(*uid))
                .map(|(uid, value)| (uid.clone(), value.clone()))
                .collect(),
        };
        let rows: Vec<DataRow> = if increasing {
            self.rows.iter().map(row).collect()
        } else {
            self.rows.iter().rev().map(row).collect()
        };
        RowReader::new(self.index_uid.clone(), curves, rows)
    }
}
