//! Index algebra: directions, index values, and range math.
//!
//! Every log orders its rows along one index axis. That axis is either a time
//! axis (values normalized to signed microseconds since the Unix epoch) or a
//! numeric depth/generic axis (IEEE-754 doubles). Everything in this module is
//! pure and stateless; the header reconciler, the orchestrator, and the
//! partial delete engine build all of their scope decisions on
//! [`starts_before`] and the [`Range`] helpers defined here.
//!
//! `NaN` is treated as "no bound": it never participates in comparisons and
//! is dropped when a [`Range`] is built from raw bounds.
pub mod range;
pub mod time;

pub use range::{CurveRanges, IndexRange, Range};
pub use time::{format_time_index, from_unix_micros, parse_time_index, to_unix_micros};

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use snafu::prelude::*;

/// Ordering of index values along a log's rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Index values grow from the first row to the last.
    #[default]
    Increasing,
    /// Index values shrink from the first row to the last.
    Decreasing,
}

impl Direction {
    /// True for [`Direction::Increasing`].
    pub fn is_increasing(self) -> bool {
        matches!(self, Direction::Increasing)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Increasing => f.write_str("increasing"),
            Direction::Decreasing => f.write_str("decreasing"),
        }
    }
}

/// Kind of index axis a log is ordered by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Time axis; index values are microseconds since the Unix epoch.
    Time,
    /// Depth or any other numeric axis.
    #[default]
    Generic,
}

impl IndexMode {
    /// True for [`IndexMode::Time`].
    pub fn is_time(self) -> bool {
        matches!(self, IndexMode::Time)
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexMode::Time => f.write_str("time"),
            IndexMode::Generic => f.write_str("generic"),
        }
    }
}

/// A single, normalized index value.
///
/// JSON representation: a plain number for [`IndexValue::Numeric`] and an
/// RFC 3339 string for [`IndexValue::Time`]. Time values keep microsecond
/// precision through the round trip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndexValue {
    /// Depth / generic index value.
    Numeric(f64),
    /// Time index value in microseconds since the Unix epoch (UTC).
    Time(i64),
}

/// Errors raised while parsing an index value from text.
#[derive(Debug, Snafu)]
pub enum ParseIndexError {
    /// The text is not a valid number for a generic index.
    #[snafu(display("Invalid numeric index value {text:?}"))]
    InvalidNumber {
        /// Offending text.
        text: String,
        /// Underlying parse error.
        source: std::num::ParseFloatError,
    },

    /// The text is not a valid RFC 3339 timestamp for a time index.
    #[snafu(display("Invalid time index value {text:?}: {source}"))]
    InvalidTime {
        /// Offending text.
        text: String,
        /// Underlying chrono parse error.
        source: chrono::ParseError,
    },

    /// Numeric index values must be finite.
    #[snafu(display("Index value {text:?} is not a finite number"))]
    NotFinite {
        /// Offending text.
        text: String,
    },
}

impl IndexValue {
    /// Parse a textual index value according to the log's index mode.
    pub fn parse(text: &str, mode: IndexMode) -> Result<Self, ParseIndexError> {
        let text = text.trim();
        match mode {
            IndexMode::Time => {
                let (micros, _) = parse_time_index(text).context(InvalidTimeSnafu { text })?;
                Ok(IndexValue::Time(micros))
            }
            IndexMode::Generic => {
                let value = text.parse::<f64>().context(InvalidNumberSnafu { text })?;
                ensure!(value.is_finite(), NotFiniteSnafu { text });
                Ok(IndexValue::Numeric(value))
            }
        }
    }

    /// The index mode this value belongs to.
    pub fn mode(&self) -> IndexMode {
        match self {
            IndexValue::Numeric(_) => IndexMode::Generic,
            IndexValue::Time(_) => IndexMode::Time,
        }
    }

    /// True when the value is a numeric NaN.
    pub fn is_nan(&self) -> bool {
        matches!(self, IndexValue::Numeric(v) if v.is_nan())
    }

    /// False for infinite or NaN numeric values; time values are always
    /// finite.
    pub fn is_finite(&self) -> bool {
        match self {
            IndexValue::Numeric(v) => v.is_finite(),
            IndexValue::Time(_) => true,
        }
    }

    /// `Some(self)` unless the value is NaN, which counts as "no bound".
    pub fn bound(self) -> Option<Self> {
        (!self.is_nan()).then_some(self)
    }

    /// Numeric view of the value (time values as microseconds).
    pub fn as_f64(&self) -> f64 {
        match self {
            IndexValue::Numeric(v) => *v,
            IndexValue::Time(m) => *m as f64,
        }
    }

    /// Total order over values of the same mode; used for storage keys.
    ///
    /// Mixed modes order numeric values first. Callers never mix modes inside
    /// one log.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (IndexValue::Numeric(a), IndexValue::Numeric(b)) => a.total_cmp(b),
            (IndexValue::Time(a), IndexValue::Time(b)) => a.cmp(b),
            (IndexValue::Numeric(_), IndexValue::Time(_)) => Ordering::Less,
            (IndexValue::Time(_), IndexValue::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for IndexValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (IndexValue::Numeric(a), IndexValue::Numeric(b)) => a.partial_cmp(b),
            (IndexValue::Time(a), IndexValue::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Numeric(v) => write!(f, "{v}"),
            IndexValue::Time(m) => match format_time_index(*m, None) {
                Some(s) => f.write_str(&s),
                None => write!(f, "{m}us"),
            },
        }
    }
}

impl Serialize for IndexValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // JSON has no infinity; serde_json would silently write null.
            IndexValue::Numeric(v) if !v.is_finite() => Err(serde::ser::Error::custom(format!(
                "numeric index value {v} is not finite"
            ))),
            IndexValue::Numeric(v) => serializer.serialize_f64(*v),
            IndexValue::Time(m) => {
                let text = format_time_index(*m, None).ok_or_else(|| {
                    serde::ser::Error::custom(format!("time index {m}us is out of range"))
                })?;
                serializer.serialize_str(&text)
            }
        }
    }
}

struct IndexValueVisitor;

impl de::Visitor<'_> for IndexValueVisitor {
    type Value = IndexValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or an RFC 3339 timestamp")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<IndexValue, E> {
        Ok(IndexValue::Numeric(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<IndexValue, E> {
        Ok(IndexValue::Numeric(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<IndexValue, E> {
        Ok(IndexValue::Numeric(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<IndexValue, E> {
        IndexValue::parse(v, IndexMode::Time).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for IndexValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IndexValueVisitor)
    }
}

/// `a < b` when increasing, `a > b` when decreasing.
///
/// Values that do not compare (NaN, mixed modes) never start before anything.
pub fn starts_before<T: PartialOrd>(a: &T, b: &T, increasing: bool) -> bool {
    if increasing { a < b } else { a > b }
}

/// Project an index value onto a scaled integer for external reporting.
///
/// Time values are already integral microseconds and pass through unchanged.
/// Numeric values are multiplied by `10^decimal_scale` and rounded. Stored
/// ranges are never touched by this projection.
pub fn scale_index(value: IndexValue, decimal_scale: u32) -> i64 {
    match value {
        IndexValue::Time(micros) => micros,
        IndexValue::Numeric(v) => {
            let factor = 10f64.powi(decimal_scale.min(i32::MAX as u32) as i32);
            (v * factor).round() as i64
        }
    }
}
