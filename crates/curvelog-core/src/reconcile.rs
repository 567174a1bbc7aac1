//! Header reconciliation.
//!
//! Every function here edits a header *shape-preservingly*: range and stamp
//! fields are written through [`Slot::assign`], so a field the header does not
//! expose is never created by a range rewrite. That keeps client-specified
//! response shapes intact and makes stored headers carry exactly the slots they
//! were created with (plus the range slots opened by [`ensure_range_slots`]).
use chrono::{DateTime, Utc};
use snafu::prelude::*;

use crate::index::{CurveRanges, Direction, IndexRange, IndexValue};
use crate::metadata::{Curve, HeaderField, HeaderPatch, LogHeader, Slot};

/// Errors raised while reconciling an inbound header with a stored one.
#[derive(Debug, Snafu)]
pub enum ReconcileError {
    /// A log's direction never changes once set.
    #[snafu(display("Direction of {uri} is {existing}; cannot change it to {requested}"))]
    DirectionChanged {
        /// Log identity.
        uri: String,
        /// Stored direction.
        existing: Direction,
        /// Direction requested by the caller.
        requested: Direction,
    },

    /// A log's index curve mnemonic never changes.
    #[snafu(display("Index curve of {uri} is {existing:?}; cannot change it to {requested:?}"))]
    IndexCurveChanged {
        /// Log identity.
        uri: String,
        /// Stored index curve mnemonic.
        existing: String,
        /// Mnemonic requested by the caller.
        requested: String,
    },

    /// The header names an index curve it does not define.
    #[snafu(display("Index curve {mnemonic:?} is not defined in the curve list"))]
    MissingIndexCurve {
        /// Index curve mnemonic.
        mnemonic: String,
    },

    /// The header does not name an index curve at all.
    #[snafu(display("Log header {uri} does not name an index curve"))]
    NoIndexCurve {
        /// Log identity.
        uri: String,
    },

    /// Two curves share a uid or a mnemonic.
    #[snafu(display("Duplicate curve {key:?}"))]
    DuplicateCurve {
        /// Repeated uid or mnemonic.
        key: String,
    },

    /// A curve has a blank mnemonic.
    #[snafu(display("Curve with uid {uid:?} has an empty mnemonic"))]
    EmptyMnemonic {
        /// Uid of the offending curve.
        uid: String,
    },
}

/// Empty every present range slot (log Start/End, curve min/max).
///
/// Inbound ranges are never trusted: derived ranges always come from the data.
pub fn clear_index_values(header: &mut LogHeader) {
    header.start_index.clear();
    header.end_index.clear();
    for curve in &mut header.curves {
        curve.min_index.clear();
        curve.max_index.clear();
    }
}

/// Open every range slot so a stored header can carry its derived ranges.
pub fn ensure_range_slots(header: &mut LogHeader) {
    header.start_index.open();
    header.end_index.open();
    for curve in &mut header.curves {
        curve.min_index.open();
        curve.max_index.open();
    }
}

fn min_max(range: &IndexRange) -> (Option<IndexValue>, Option<IndexValue>) {
    let ascending = range.sort(true);
    (ascending.start, ascending.end)
}

/// Write recomputed per-curve ranges into the header's present min/max slots.
///
/// Curves missing from `ranges` are left untouched; an empty range explicitly
/// empties the slots.
pub fn set_index_range(header: &mut LogHeader, ranges: &CurveRanges) {
    for curve in &mut header.curves {
        if let Some(range) = ranges.get(&curve.uid) {
            let (min, max) = min_max(range);
            curve.min_index.assign(min);
            curve.max_index.assign(max);
        }
    }
}

/// Write the log's own Start/End (direction order) into present slots.
pub fn set_log_index_range(header: &mut LogHeader, range: &IndexRange) {
    let range = range.sort(header.is_increasing());
    header.start_index.assign(range.start);
    header.end_index.assign(range.end);
}

/// Stamp creation (only when `creating`) and modification times into the
/// slots the caller supplied.
pub fn update_timestamps(header: &mut LogHeader, now: DateTime<Utc>, creating: bool) {
    if creating {
        header.creation_time.assign(Some(now));
    }
    header.last_modified.assign(Some(now));
}

fn curve_position(curves: &[Curve], inbound: &Curve) -> Option<usize> {
    if !inbound.uid.is_empty()
        && let Some(pos) = curves.iter().position(|c| c.uid == inbound.uid)
    {
        return Some(pos);
    }
    curves.iter().position(|c| c.mnemonic == inbound.mnemonic)
}

/// Merge `inbound` curve definitions onto `existing`.
///
/// Curves are matched by uid, falling back to mnemonic. Matched curves take
/// every field the inbound definition supplies (ranges excluded); unmatched
/// curves are appended with a uid defaulted to their mnemonic.
pub fn merge_curves(existing: &[Curve], inbound: &[Curve]) -> Vec<Curve> {
    let mut merged = existing.to_vec();
    for incoming in inbound {
        match curve_position(&merged, incoming) {
            Some(pos) => {
                let target = &mut merged[pos];
                if !incoming.mnemonic.is_empty() {
                    target.mnemonic = incoming.mnemonic.clone();
                }
                if incoming.unit.is_some() {
                    target.unit = incoming.unit.clone();
                }
                if incoming.null_value.is_some() {
                    target.null_value = incoming.null_value.clone();
                }
                if incoming.data_type.is_some() {
                    target.data_type = incoming.data_type;
                }
                if incoming.class.is_some() {
                    target.class = incoming.class.clone();
                }
                if incoming.description.is_some() {
                    target.description = incoming.description.clone();
                }
                if incoming.column_index.is_some() {
                    target.column_index = incoming.column_index;
                }
            }
            None => {
                let mut added = incoming.clone();
                if added.uid.trim().is_empty() {
                    added.uid = added.mnemonic.clone();
                }
                added.min_index.clear();
                added.max_index.clear();
                merged.push(added);
            }
        }
    }
    merged
}

/// Validate and normalize a header about to be stored for the first time.
///
/// Blank uids default to the mnemonic; mnemonics and uids must be unique and
/// the index curve must be defined.
pub fn validate_new_header(header: &mut LogHeader) -> Result<(), ReconcileError> {
    ensure!(
        !header.index_curve.trim().is_empty(),
        NoIndexCurveSnafu {
            uri: header.uri.to_string()
        }
    );

    for curve in &mut header.curves {
        ensure!(
            !curve.mnemonic.trim().is_empty(),
            EmptyMnemonicSnafu {
                uid: curve.uid.clone()
            }
        );
        if curve.uid.trim().is_empty() {
            curve.uid = curve.mnemonic.clone();
        }
    }

    for (i, curve) in header.curves.iter().enumerate() {
        for other in &header.curves[i + 1..] {
            if other.uid == curve.uid {
                return DuplicateCurveSnafu {
                    key: curve.uid.clone(),
                }
                .fail();
            }
            if other.mnemonic == curve.mnemonic {
                return DuplicateCurveSnafu {
                    key: curve.mnemonic.clone(),
                }
                .fail();
            }
        }
    }

    ensure!(
        header.index_curve_def().is_some(),
        MissingIndexCurveSnafu {
            mnemonic: header.index_curve.clone()
        }
    );
    Ok(())
}

/// Reject inbound changes to a log's direction or index curve.
///
/// A blank inbound index curve and an absent inbound direction mean "keep".
pub fn check_immutable(existing: &LogHeader, inbound: &LogHeader) -> Result<(), ReconcileError> {
    let uri = existing.uri.to_string();

    if !inbound.index_curve.is_empty() && inbound.index_curve != existing.index_curve {
        return IndexCurveChangedSnafu {
            uri,
            existing: existing.index_curve.clone(),
            requested: inbound.index_curve.clone(),
        }
        .fail();
    }

    if let Some(requested) = inbound.direction {
        let current = existing.effective_direction();
        ensure!(
            requested == current,
            DirectionChangedSnafu {
                uri: uri.clone(),
                existing: current,
                requested,
            }
        );
    }

    if let Some(index_def) = existing.index_curve_def() {
        let renamed = inbound.curves.iter().find(|c| {
            !c.uid.is_empty() && c.uid == index_def.uid && c.mnemonic != index_def.mnemonic
        });
        if let Some(renamed) = renamed {
            return IndexCurveChangedSnafu {
                uri,
                existing: index_def.mnemonic.clone(),
                requested: renamed.mnemonic.clone(),
            }
            .fail();
        }
    }
    Ok(())
}

/// Build the field mask an Update applies to `existing`.
///
/// Inbound range values are ignored (they are recomputed from data); new
/// curves get open, empty range slots. Direction and index curve are
/// immutable.
pub fn update_patch(
    existing: &LogHeader,
    inbound: &LogHeader,
    now: DateTime<Utc>,
) -> Result<HeaderPatch, ReconcileError> {
    check_immutable(existing, inbound)?;

    let mut patch = HeaderPatch::new();
    if let Some(direction) = inbound.direction
        && existing.direction.is_none()
    {
        patch.push(HeaderField::Direction(direction));
    }

    if inbound.name.is_some() {
        patch.push(HeaderField::Name(inbound.name.clone()));
    }
    if inbound.null_value.is_some() {
        patch.push(HeaderField::NullValue(inbound.null_value.clone()));
    }

    if !inbound.curves.is_empty() {
        let mut curves = merge_curves(&existing.curves, &inbound.curves);
        for curve in &mut curves {
            curve.min_index.open();
            curve.max_index.open();
        }
        for (i, curve) in curves.iter().enumerate() {
            if curves[i + 1..].iter().any(|c| c.mnemonic == curve.mnemonic) {
                return DuplicateCurveSnafu {
                    key: curve.mnemonic.clone(),
                }
                .fail();
            }
        }
        patch.push(HeaderField::Curves(curves));
    }

    if inbound.last_modified.is_present() {
        patch.push(HeaderField::LastModified(now));
    }

    Ok(patch)
}

/// Field mask persisting `header`'s current range slots.
pub fn range_patch(header: &LogHeader) -> HeaderPatch {
    let mut patch = HeaderPatch::new();
    for curve in &header.curves {
        if curve.min_index.is_present() || curve.max_index.is_present() {
            patch.push(HeaderField::CurveRange {
                uid: curve.uid.clone(),
                min: curve.min_index.value().copied(),
                max: curve.max_index.value().copied(),
            });
        }
    }
    if header.start_index.is_present() {
        patch.push(HeaderField::StartIndex(header.start_index.value().copied()));
    }
    if header.end_index.is_present() {
        patch.push(HeaderField::EndIndex(header.end_index.value().copied()));
    }
    patch
}

fn fill<T: Clone>(slot: &mut Slot<T>, stored: &Slot<T>) {
    slot.assign(stored.value().cloned());
}

fn fill_option<T: Clone>(field: &mut Option<T>, stored: &Option<T>) {
    if field.is_some() {
        *field = stored.clone();
    }
}

fn project_curve(template: &Curve, stored: &Curve) -> Curve {
    let mut out = template.clone();
    out.uid = stored.uid.clone();
    out.mnemonic = stored.mnemonic.clone();
    fill_option(&mut out.unit, &stored.unit);
    fill_option(&mut out.null_value, &stored.null_value);
    fill_option(&mut out.data_type, &stored.data_type);
    fill_option(&mut out.class, &stored.class);
    fill_option(&mut out.description, &stored.description);
    fill_option(&mut out.column_index, &stored.column_index);
    fill(&mut out.min_index, &stored.min_index);
    fill(&mut out.max_index, &stored.max_index);
    out
}

/// Fill a caller's header template from a stored header.
///
/// Only fields the template exposes are filled. An empty template curve list
/// selects every stored curve in full; otherwise only the listed curves are
/// returned, each shaped like its template entry.
pub fn project(template: &LogHeader, stored: &LogHeader) -> LogHeader {
    let mut out = template.clone();
    out.uri = stored.uri.clone();
    out.schema_version = stored.schema_version;
    out.index_type = stored.index_type;
    out.direction = stored.direction;
    out.index_curve = stored.index_curve.clone();
    out.data = None;
    fill_option(&mut out.name, &stored.name);
    fill_option(&mut out.null_value, &stored.null_value);
    fill(&mut out.start_index, &stored.start_index);
    fill(&mut out.end_index, &stored.end_index);
    fill(&mut out.creation_time, &stored.creation_time);
    fill(&mut out.last_modified, &stored.last_modified);

    out.curves = if template.curves.is_empty() {
        stored.curves.clone()
    } else {
        template
            .curves
            .iter()
            .filter_map(|t| {
                let key = if t.uid.is_empty() { &t.mnemonic } else { &t.uid };
                stored.curve(key).map(|s| project_curve(t, s))
            })
            .collect()
    };
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexMode;
    use chrono::TimeZone;

    fn num(v: f64) -> Option<IndexValue> {
        Some(IndexValue::Numeric(v))
    }

    fn stored_header() -> LogHeader {
        let mut header = LogHeader::new("log-1", IndexMode::Generic, "DEPTH")
            .with_curve(Curve::new("depth", "DEPTH").with_unit("m").with_range(num(0.0), num(100.0)))
            .with_curve(Curve::new("gr", "GR").with_unit("gAPI").with_range(num(0.0), num(100.0)));
        header.start_index = Slot::Value(IndexValue::Numeric(0.0));
        header.end_index = Slot::Value(IndexValue::Numeric(100.0));
        header
    }

    #[test]
    fn clear_index_values_keeps_shape() {
        let mut header = stored_header();
        header.curves.push(Curve::new("rop", "ROP"));
        clear_index_values(&mut header);

        assert_eq!(header.start_index, Slot::Empty);
        assert_eq!(header.curves[0].min_index, Slot::Empty);
        assert_eq!(header.curves[2].min_index, Slot::Omitted);
        assert_eq!(header.curves[2].max_index, Slot::Omitted);
    }

    #[test]
    fn set_index_range_writes_and_empties() {
        let mut header = stored_header();
        let mut ranges = CurveRanges::new();
        ranges.insert("gr".into(), IndexRange::new(num(0.0), num(39.0)));
        ranges.insert("depth".into(), IndexRange::empty());
        set_index_range(&mut header, &ranges);

        assert_eq!(header.curves[1].max_index, Slot::Value(IndexValue::Numeric(39.0)));
        assert_eq!(header.curves[0].min_index, Slot::Empty);
        assert_eq!(header.curves[0].max_index, Slot::Empty);
    }

    #[test]
    fn set_index_range_stores_min_max_for_decreasing_ranges() {
        let mut header = stored_header().with_direction(Direction::Decreasing);
        let mut ranges = CurveRanges::new();
        ranges.insert("gr".into(), IndexRange::new(num(80.0), num(20.0)));
        set_index_range(&mut header, &ranges);
        assert_eq!(header.curves[1].min_index, Slot::Value(IndexValue::Numeric(20.0)));
        assert_eq!(header.curves[1].max_index, Slot::Value(IndexValue::Numeric(80.0)));

        set_log_index_range(&mut header, &IndexRange::new(num(20.0), num(80.0)));
        assert_eq!(header.start_index, Slot::Value(IndexValue::Numeric(80.0)));
        assert_eq!(header.end_index, Slot::Value(IndexValue::Numeric(20.0)));
    }

    #[test]
    fn log_range_never_created_when_omitted() {
        let mut header = stored_header();
        header.start_index = Slot::Omitted;
        set_log_index_range(&mut header, &IndexRange::new(num(1.0), num(2.0)));
        assert_eq!(header.start_index, Slot::Omitted);
        assert_eq!(header.end_index, Slot::Value(IndexValue::Numeric(2.0)));
    }

    #[test]
    fn timestamps_only_fill_supplied_slots() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().expect("valid");
        let mut header = stored_header();
        header.creation_time = Slot::Empty;
        update_timestamps(&mut header, now, true);
        assert_eq!(header.creation_time, Slot::Value(now));
        assert_eq!(header.last_modified, Slot::Omitted);

        let mut later = stored_header();
        later.creation_time = Slot::Empty;
        later.last_modified = Slot::Empty;
        update_timestamps(&mut later, now, false);
        assert_eq!(later.creation_time, Slot::Empty);
        assert_eq!(later.last_modified, Slot::Value(now));
    }

    #[test]
    fn merge_curves_updates_known_and_appends_new() {
        let existing = stored_header().curves;
        let inbound = vec![
            Curve::new("", "GR").with_unit("API"),
            Curve::new("", "ROP").with_unit("m/h"),
        ];
        let merged = merge_curves(&existing, &inbound);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].unit.as_deref(), Some("API"));
        assert_eq!(merged[1].max_index, Slot::Value(IndexValue::Numeric(100.0)));
        assert_eq!(merged[2].uid, "ROP");
    }

    #[test]
    fn update_patch_rejects_immutable_changes() {
        let existing = stored_header();
        let now = Utc::now();

        let mut dir = LogHeader::new("log-1", IndexMode::Generic, "");
        dir.direction = Some(Direction::Decreasing);
        assert!(matches!(
            update_patch(&existing, &dir, now),
            Err(ReconcileError::DirectionChanged { .. })
        ));

        let index = LogHeader::new("log-1", IndexMode::Generic, "MD");
        assert!(matches!(
            update_patch(&existing, &index, now),
            Err(ReconcileError::IndexCurveChanged { .. })
        ));

        let rename =
            LogHeader::new("log-1", IndexMode::Generic, "").with_curve(Curve::new("depth", "MD"));
        assert!(matches!(
            update_patch(&existing, &rename, now),
            Err(ReconcileError::IndexCurveChanged { .. })
        ));
    }

    #[test]
    fn update_patch_merges_curves_and_opens_slots() {
        let existing = stored_header();
        let mut inbound =
            LogHeader::new("log-1", IndexMode::Generic, "").with_curve(Curve::new("rop", "ROP"));
        inbound.name = Some("renamed".into());

        let patch = update_patch(&existing, &inbound, Utc::now()).expect("patch");
        let mut updated = existing.clone();
        patch.apply(&mut updated);

        assert_eq!(updated.name.as_deref(), Some("renamed"));
        assert_eq!(updated.curves.len(), 3);
        assert_eq!(updated.curves[2].min_index, Slot::Empty);
        assert_eq!(updated.curves[0].max_index, Slot::Value(IndexValue::Numeric(100.0)));
    }

    #[test]
    fn validate_new_header_normalizes_and_checks() {
        let mut ok = LogHeader::new("log", IndexMode::Generic, "DEPTH")
            .with_curve(Curve::new("", "DEPTH"))
            .with_curve(Curve::new("", "GR"));
        validate_new_header(&mut ok).expect("valid");
        assert_eq!(ok.curves[1].uid, "GR");

        let mut dup = LogHeader::new("log", IndexMode::Generic, "DEPTH")
            .with_curve(Curve::new("a", "DEPTH"))
            .with_curve(Curve::new("b", "DEPTH"));
        assert!(matches!(
            validate_new_header(&mut dup),
            Err(ReconcileError::DuplicateCurve { .. })
        ));

        let mut missing =
            LogHeader::new("log", IndexMode::Generic, "DEPTH").with_curve(Curve::new("", "GR"));
        assert!(matches!(
            validate_new_header(&mut missing),
            Err(ReconcileError::MissingIndexCurve { .. })
        ));
    }

    #[test]
    fn range_patch_replays_to_same_ranges() {
        let stored = stored_header();
        let mut blank = stored.clone();
        clear_index_values(&mut blank);
        range_patch(&stored).apply(&mut blank);
        assert_eq!(blank, stored);
    }

    #[test]
    fn project_fills_only_template_fields() {
        let mut stored = stored_header();
        stored.name = Some("main pass".into());

        let template = LogHeader::new("log-1", IndexMode::Generic, "")
            .with_curve(Curve::new("", "GR").with_range(None, None));
        let out = project(&template, &stored);

        assert_eq!(out.name, None);
        assert_eq!(out.start_index, Slot::Omitted);
        assert_eq!(out.curves.len(), 1);
        assert_eq!(out.curves[0].uid, "gr");
        assert_eq!(out.curves[0].unit, None);
        assert_eq!(out.curves[0].max_index, Slot::Value(IndexValue::Numeric(100.0)));
    }
}
