//! Field-mask updates applied to a stored header.
//!
//! A [`HeaderPatch`] is an ordered list of field assignments. It is what an
//! update writes to the persistence layer and what the commit log records, so
//! replaying a patch reproduces the exact same header. Range and timestamp
//! assignments go through [`Slot::assign`](crate::metadata::Slot::assign) and
//! therefore never create a slot the header does not already expose.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::{Direction, IndexValue};
use crate::metadata::{Curve, LogHeader};

/// One field assignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HeaderField {
    /// Set or clear the log name.
    Name(Option<String>),
    /// Set or clear the log default null value.
    NullValue(Option<String>),
    /// Set the direction (only allowed while it is still unset).
    Direction(Direction),
    /// Replace the whole curve list.
    Curves(Vec<Curve>),
    /// Log Start index.
    StartIndex(Option<IndexValue>),
    /// Log End index.
    EndIndex(Option<IndexValue>),
    /// Min/max index of one curve, addressed by uid.
    CurveRange {
        /// Curve uid.
        uid: String,
        /// New minimum, `None` to empty the slot.
        min: Option<IndexValue>,
        /// New maximum, `None` to empty the slot.
        max: Option<IndexValue>,
    },
    /// Last modification stamp.
    LastModified(DateTime<Utc>),
}

/// Ordered list of field assignments.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderPatch {
    fields: Vec<HeaderField>,
}

impl HeaderPatch {
    /// Empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field assignment.
    pub fn push(&mut self, field: HeaderField) {
        self.fields.push(field);
    }

    /// Builder-style append.
    pub fn with(mut self, field: HeaderField) -> Self {
        self.push(field);
        self
    }

    /// Assignments in application order.
    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    /// True when the patch assigns nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Apply every assignment to `header` in order.
    pub fn apply(&self, header: &mut LogHeader) {
        for field in &self.fields {
            match field {
                HeaderField::Name(name) => header.name = name.clone(),
                HeaderField::NullValue(value) => header.null_value = value.clone(),
                HeaderField::Direction(direction) => {
                    if header.direction.is_none() {
                        header.direction = Some(*direction);
                    }
                }
                HeaderField::Curves(curves) => header.curves = curves.clone(),
                HeaderField::StartIndex(value) => {
                    header.start_index.assign(*value);
                }
                HeaderField::EndIndex(value) => {
                    header.end_index.assign(*value);
                }
                HeaderField::CurveRange { uid, min, max } => {
                    if let Some(curve) = header.curves.iter_mut().find(|c| &c.uid == uid) {
                        curve.min_index.assign(*min);
                        curve.max_index.assign(*max);
                    }
                }
                HeaderField::LastModified(stamp) => {
                    header.last_modified.assign(Some(*stamp));
                }
            }
        }
    }
}
