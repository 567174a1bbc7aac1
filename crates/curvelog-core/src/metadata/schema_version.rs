//! Per-schema-version header capabilities.
//!
//! Headers written under different schema versions answer "which way does
//! this log run", "is it a time log", and "what is its overall range"
//! differently. Each version is one variant; callers pick the variant once per
//! request (from the stored header) and ask it.
use serde::{Deserialize, Serialize};

use crate::index::{IndexMode, IndexRange};
use crate::metadata::{CurveDataType, LogHeader};

/// Schema version a header was written with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Legacy headers: no direction concept (always increasing) and the
    /// overall range is read from the index curve.
    #[serde(rename = "1.3.1.1")]
    V131,
    /// Current headers: honor `direction` and the log Start/End fields.
    #[default]
    #[serde(rename = "1.4.1.1")]
    V141,
}

impl SchemaVersion {
    /// Effective row direction for `header`.
    pub fn is_increasing(self, header: &LogHeader) -> bool {
        match self {
            SchemaVersion::V131 => true,
            SchemaVersion::V141 => header.direction.is_none_or(|d| d.is_increasing()),
        }
    }

    /// Whether `header` describes a time-indexed log.
    pub fn is_time_log(self, header: &LogHeader) -> bool {
        match self {
            SchemaVersion::V131 => {
                header.index_type == IndexMode::Time
                    || header
                        .index_curve_def()
                        .is_some_and(|c| c.data_type == Some(CurveDataType::DateTime))
            }
            SchemaVersion::V141 => header.index_type == IndexMode::Time,
        }
    }

    /// Overall index range of `header`, ordered for its direction.
    pub fn index_range(self, header: &LogHeader) -> IndexRange {
        let increasing = self.is_increasing(header);
        match self {
            SchemaVersion::V131 => header
                .index_curve_def()
                .map(|c| c.range(increasing))
                .unwrap_or_default(),
            SchemaVersion::V141 => IndexRange::from_bounds(
                header.start_index.value().copied(),
                header.end_index.value().copied(),
            )
            .sort(increasing),
        }
    }
}
