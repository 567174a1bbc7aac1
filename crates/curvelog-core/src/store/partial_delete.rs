//! Scope decisions for partial deletes.
//!
//! [`plan_partial_delete`] is pure: given the stored header and a request it
//! decides between dropping everything and deleting per-curve closed ranges.
//! The store then hands the plan to the bulk collaborator and persists the
//! coverage it reports back.
//!
//! Per-curve ranges come from the selector's own range, then the request
//! bound. A named curve with neither is removed from the log: its cells are
//! dropped and its definition leaves the header. The index curve is never
//! removed; without a range it is cleared over its stored extent. Naming only
//! the index curve broadcasts its range to every curve. Curves left unnamed by
//! a request that names curves are untouched. A plan never contains an empty
//! (unbounded) range.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::bulk::CurveDeleteRange;
use crate::index::{IndexMode, IndexRange, IndexValue};
use crate::metadata::{Curve, LogHeader, LogUri};

/// Names one curve of a delete request, optionally with its own range.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveSelector {
    /// Curve uid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Curve mnemonic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    /// Lower bound of the curve's own range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_index: Option<IndexValue>,
    /// Upper bound of the curve's own range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_index: Option<IndexValue>,
}

impl CurveSelector {
    /// Selector naming a curve by uid.
    pub fn by_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Self::default()
        }
    }

    /// Selector naming a curve by mnemonic.
    pub fn by_mnemonic(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: Some(mnemonic.into()),
            ..Self::default()
        }
    }

    /// Builder-style own range.
    pub fn with_range(mut self, min: Option<IndexValue>, max: Option<IndexValue>) -> Self {
        self.min_index = min;
        self.max_index = max;
        self
    }
}

/// A partial delete request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Target log.
    pub uri: LogUri,
    /// Request bound start (direction order).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<IndexValue>,
    /// Request bound end (direction order).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<IndexValue>,
    /// Named curves; empty names every curve.
    #[serde(default)]
    pub curves: Vec<CurveSelector>,
}

impl DeleteRequest {
    /// Request without bound or curves.
    pub fn new(uri: impl Into<LogUri>) -> Self {
        Self {
            uri: uri.into(),
            start: None,
            end: None,
            curves: Vec::new(),
        }
    }

    /// Builder-style request bound.
    pub fn with_bounds(mut self, start: Option<IndexValue>, end: Option<IndexValue>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Builder-style curve selector.
    pub fn with_curve(mut self, selector: CurveSelector) -> Self {
        self.curves.push(selector);
        self
    }
}

/// Outcome of scope planning.
#[derive(Clone, Debug, PartialEq)]
pub enum DeletePlan {
    /// Drop every row; every range becomes empty.
    DeleteAll,
    /// Delete closed ranges and remove whole curves.
    Ranges {
        /// Closed per-curve ranges.
        ranges: Vec<CurveDeleteRange>,
        /// Uids of curves leaving the header together with their cells.
        removed: Vec<String>,
    },
}

impl DeletePlan {
    /// True when carrying out the plan changes nothing.
    pub fn is_noop(&self) -> bool {
        match self {
            DeletePlan::DeleteAll => false,
            DeletePlan::Ranges { ranges, removed } => ranges.is_empty() && removed.is_empty(),
        }
    }
}

/// Reasons a delete request cannot be applied to a log.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DeleteShapeError {
    /// A selector names neither uid nor mnemonic.
    #[snafu(display("Curve selector names neither uid nor mnemonic"))]
    EmptySelector,

    /// A selector names a curve the log does not have.
    #[snafu(display("No curve matches {key:?}"))]
    UnknownCurve {
        /// Uid or mnemonic given.
        key: String,
    },

    /// A selector's uid and mnemonic name different curves.
    #[snafu(display("Uid {uid:?} and mnemonic {mnemonic:?} name different curves"))]
    AmbiguousSelector {
        /// Uid given.
        uid: String,
        /// Mnemonic given.
        mnemonic: String,
    },

    /// A bound is infinite.
    #[snafu(display("Bound {value} is not finite"))]
    NonFiniteBound {
        /// Offending bound.
        value: IndexValue,
    },

    /// A bound is not of the log's index mode.
    #[snafu(display("Bound {value} is a {found} value but the log is indexed by {expected}"))]
    ModeMismatch {
        /// Offending bound.
        value: IndexValue,
        /// Log index mode.
        expected: IndexMode,
        /// Mode of the bound.
        found: IndexMode,
    },
}

fn check_mode(value: Option<IndexValue>, expected: IndexMode) -> Result<(), DeleteShapeError> {
    if let Some(value) = value.and_then(IndexValue::bound) {
        ensure!(value.is_finite(), NonFiniteBoundSnafu { value });
        ensure!(
            value.mode() == expected,
            ModeMismatchSnafu {
                value,
                expected,
                found: value.mode(),
            }
        );
    }
    Ok(())
}

fn resolve<'h>(header: &'h LogHeader, selector: &CurveSelector) -> Result<&'h Curve, DeleteShapeError> {
    let by_uid = selector.uid.as_deref().map(|uid| (uid, header.curve_by_uid(uid)));
    let by_mnemonic = selector
        .mnemonic
        .as_deref()
        .map(|m| (m, header.curve_by_mnemonic(m)));

    match (by_uid, by_mnemonic) {
        (None, None) => EmptySelectorSnafu.fail(),
        (Some((key, curve)), None) | (None, Some((key, curve))) => {
            curve.context(UnknownCurveSnafu { key })
        }
        (Some((uid, a)), Some((mnemonic, b))) => match (a, b) {
            (Some(a), Some(b)) if a.uid != b.uid => {
                AmbiguousSelectorSnafu { uid, mnemonic }.fail()
            }
            (Some(curve), _) | (None, Some(curve)) => Ok(curve),
            (None, None) => UnknownCurveSnafu { key: uid }.fail(),
        },
    }
}

/// Decide how to carry out `request` against the stored `header`.
pub fn plan_partial_delete(
    header: &LogHeader,
    request: &DeleteRequest,
) -> Result<DeletePlan, DeleteShapeError> {
    let only_index = match header.curves.as_slice() {
        [] => true,
        [single] => header.is_index_curve(single),
        _ => false,
    };
    if only_index {
        return Ok(DeletePlan::DeleteAll);
    }

    let increasing = header.is_increasing();
    let mode = header.index_mode();
    check_mode(request.start, mode)?;
    check_mode(request.end, mode)?;
    let bound = IndexRange::from_bounds(request.start, request.end).sort(increasing);
    let request_bound = bound.is_bounded().then_some(bound);

    let mut named: Vec<(&Curve, Option<IndexRange>)> = Vec::new();
    for selector in &request.curves {
        let curve = resolve(header, selector)?;
        check_mode(selector.min_index, mode)?;
        check_mode(selector.max_index, mode)?;
        let own = IndexRange::from_bounds(selector.min_index, selector.max_index).sort(increasing);
        let own = own.is_bounded().then_some(own);

        match named.iter_mut().find(|(c, _)| c.uid == curve.uid) {
            Some(entry) => entry.1 = own.or(entry.1),
            None => named.push((curve, own)),
        }
    }

    let coverage = header
        .index_curve_def()
        .map_or_else(|| header.index_range(), |c| c.range(increasing));
    let any_own = named.iter().any(|(_, own)| own.is_some());
    let names_all = named.is_empty() || {
        let non_index = |c: &&Curve| !header.is_index_curve(c);
        let requested: BTreeSet<&str> = named
            .iter()
            .map(|(c, _)| *c)
            .filter(non_index)
            .map(|c| c.uid.as_str())
            .collect();
        let stored: BTreeSet<&str> = header
            .curves
            .iter()
            .filter(non_index)
            .map(|c| c.uid.as_str())
            .collect();
        requested == stored
    };
    if !any_own && names_all && bound.covers(&coverage, increasing) {
        return Ok(DeletePlan::DeleteAll);
    }

    let mut removed = Vec::new();
    let ranges = match named.as_slice() {
        [(index, own)] if header.is_index_curve(index) => {
            let effective = own
                .or(request_bound)
                .unwrap_or_else(|| index.range(increasing));
            if effective.is_empty() {
                Vec::new()
            } else {
                header
                    .curves
                    .iter()
                    .map(|c| CurveDeleteRange::new(c.uid.clone(), effective))
                    .collect()
            }
        }
        [] => header
            .curves
            .iter()
            .map(|c| CurveDeleteRange::new(c.uid.clone(), bound))
            .collect(),
        _ => {
            let mut ranges = Vec::new();
            for (curve, own) in &named {
                let range = match own.or(request_bound) {
                    Some(range) => range,
                    None if header.is_index_curve(curve) => curve.range(increasing),
                    None => {
                        removed.push(curve.uid.clone());
                        continue;
                    }
                };
                if range.is_bounded() {
                    ranges.push(CurveDeleteRange::new(curve.uid.clone(), range));
                }
            }
            ranges
        }
    };
    Ok(DeletePlan::Ranges { ranges, removed })
}
