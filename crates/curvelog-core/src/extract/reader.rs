//! Row-oriented bulk data reader.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::IndexValue;

/// One non-null data cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Integer cell (`long` curves).
    Long(i64),
    /// Floating point cell (`double` curves).
    Double(f64),
    /// Text cell (`string` and `datetime` curves).
    Text(String),
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Long(v) => write!(f, "{v}"),
            CellValue::Double(v) => write!(f, "{v}"),
            CellValue::Text(v) => f.write_str(v),
        }
    }
}

/// One bulk row: its index value and the non-null cells keyed by curve uid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    /// Row key.
    pub index: IndexValue,
    /// Non-null cells keyed by curve uid. Null cells are simply absent.
    #[serde(default)]
    pub values: BTreeMap<String, CellValue>,
}

impl DataRow {
    /// Row with no cells.
    pub fn new(index: IndexValue) -> Self {
        Self {
            index,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style cell setter.
    pub fn with(mut self, uid: impl Into<String>, value: CellValue) -> Self {
        self.values.insert(uid.into(), value);
        self
    }
}

/// Bulk rows for one log, in the order they were produced.
///
/// `curves` lists the uids of every column the reader carries, index curve
/// first; a column may be present without holding any non-null cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowReader {
    index_uid: String,
    curves: Vec<String>,
    rows: Vec<DataRow>,
}

impl RowReader {
    /// Reader over `rows` for the given columns.
    pub fn new(index_uid: impl Into<String>, curves: Vec<String>, rows: Vec<DataRow>) -> Self {
        Self {
            index_uid: index_uid.into(),
            curves,
            rows,
        }
    }

    /// Reader with no rows.
    pub fn empty(index_uid: impl Into<String>) -> Self {
        let index_uid = index_uid.into();
        Self::new(index_uid.clone(), vec![index_uid], Vec::new())
    }

    /// Uid of the index curve.
    pub fn index_uid(&self) -> &str {
        &self.index_uid
    }

    /// Uids of the columns carried by this reader.
    pub fn curves(&self) -> &[String] {
        &self.curves
    }

    /// All rows.
    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the reader holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
