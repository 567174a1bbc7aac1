//! Direction-aware index ranges.
//!
//! A [`Range`] is a pair of optional bounds. A missing bound is unbounded on
//! that side; a range with neither bound is the empty / "no data" range. The
//! helpers here never look at a global ordering: every comparison goes
//! through [`starts_before`] with the caller's direction.
use std::collections::BTreeMap;

use chrono::FixedOffset;

use super::{IndexValue, starts_before};

/// Optional start/end pair with an optional UTC offset used for reporting
/// time bounds back in the caller's original offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range<T> {
    /// First bound in direction order, `None` when unbounded.
    pub start: Option<T>,
    /// Last bound in direction order, `None` when unbounded.
    pub end: Option<T>,
    /// Offset the bounds were originally expressed in (time logs only).
    pub offset: Option<FixedOffset>,
}

/// Range over normalized index values.
pub type IndexRange = Range<IndexValue>;

/// Per-curve ranges keyed by curve uid.
pub type CurveRanges = BTreeMap<String, IndexRange>;

impl<T> Default for Range<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Range<T> {
    /// Range with the given bounds and no offset.
    pub fn new(start: Option<T>, end: Option<T>) -> Self {
        Self {
            start,
            end,
            offset: None,
        }
    }

    /// The empty range (no data).
    pub fn empty() -> Self {
        Self::new(None, None)
    }

    /// Attach the offset the bounds were expressed in.
    pub fn with_offset(mut self, offset: Option<FixedOffset>) -> Self {
        self.offset = offset;
        self
    }

    /// True when neither bound is present.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// True when at least one bound is present.
    pub fn is_bounded(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: PartialOrd + Copy> Range<T> {
    /// Return the range with start/end ordered for the given direction.
    ///
    /// Only swaps when both bounds are present and out of order.
    pub fn sort(self, increasing: bool) -> Self {
        match (self.start, self.end) {
            (Some(start), Some(end)) if starts_before(&end, &start, increasing) => Self {
                start: Some(end),
                end: Some(start),
                offset: self.offset,
            },
            _ => self,
        }
    }

    /// True when `value` lies within the range, bounds inclusive.
    ///
    /// The range must already be sorted for `increasing`.
    pub fn contains(&self, value: &T, increasing: bool) -> bool {
        let after_start = self
            .start
            .as_ref()
            .is_none_or(|start| !starts_before(value, start, increasing));
        let before_end = self
            .end
            .as_ref()
            .is_none_or(|end| !starts_before(end, value, increasing));
        after_start && before_end
    }

    /// True when this range fully covers `other` on both sides.
    ///
    /// An unbounded side of `self` covers anything. A bounded side of `self`
    /// only covers a bounded side of `other` that does not extend past it. An
    /// empty `other` (no data) is covered by every range.
    pub fn covers(&self, other: &Range<T>, increasing: bool) -> bool {
        if other.is_empty() {
            return true;
        }
        let start_ok = match (&self.start, &other.start) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) => !starts_before(theirs, mine, increasing),
        };
        let end_ok = match (&self.end, &other.end) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) => !starts_before(mine, theirs, increasing),
        };
        start_ok && end_ok
    }
}

impl IndexRange {
    /// Build a range from raw bounds, treating NaN as "no bound".
    pub fn from_bounds(start: Option<IndexValue>, end: Option<IndexValue>) -> Self {
        Self::new(start.and_then(IndexValue::bound), end.and_then(IndexValue::bound))
    }

    /// Range spanning the smallest and largest of `values`, ordered for the
    /// direction. Empty when `values` is empty.
    pub fn spanning<I>(values: I, increasing: bool) -> Self
    where
        I: IntoIterator<Item = IndexValue>,
    {
        let mut lo: Option<IndexValue> = None;
        let mut hi: Option<IndexValue> = None;
        for value in values.into_iter().filter_map(IndexValue::bound) {
            if lo.is_none_or(|l| value < l) {
                lo = Some(value);
            }
            if hi.is_none_or(|h| value > h) {
                hi = Some(value);
            }
        }
        Self::new(lo, hi).sort(increasing)
    }
}
