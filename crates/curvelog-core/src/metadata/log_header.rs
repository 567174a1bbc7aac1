//! Log header, curve, and inbound data definitions.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::{Direction, IndexMode, IndexRange, IndexValue};
use crate::metadata::{SchemaVersion, Slot};

/// Opaque, stable identity of a log across header and bulk stores.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogUri(pub String);

impl LogUri {
    /// Wrap a URI string.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Borrow the URI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `self` equals `scope` or lies underneath it (`scope/...`).
    pub fn is_within(&self, scope: &LogUri) -> bool {
        let scope = scope.0.trim_end_matches('/');
        match self.0.strip_prefix(scope) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl fmt::Display for LogUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogUri {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LogUri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Declared value type of a curve's data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveDataType {
    /// 64-bit floating point.
    Double,
    /// 64-bit signed integer.
    Long,
    /// Free text.
    String,
    /// Timestamp carried as text.
    DateTime,
}

impl CurveDataType {
    /// Name used in discovery/streaming descriptors.
    pub fn as_str(self) -> &'static str {
        match self {
            CurveDataType::Double => "double",
            CurveDataType::Long => "long",
            CurveDataType::String => "string",
            CurveDataType::DateTime => "datetime",
        }
    }
}

/// One named data column of a log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    /// Stable identity, independent of the mnemonic. Defaults to the mnemonic
    /// when blank on insert.
    #[serde(default)]
    pub uid: String,

    /// Display key; data columns reference curves by mnemonic.
    pub mnemonic: String,

    /// Unit of measure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Per-curve null marker; falls back to the log default when blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_value: Option<String>,

    /// Declared value type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<CurveDataType>,

    /// Measurement class (for example "gamma ray").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional column position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<u32>,

    /// Smallest index value holding data for this curve.
    #[serde(default, skip_serializing_if = "Slot::is_omitted")]
    pub min_index: Slot<IndexValue>,

    /// Largest index value holding data for this curve.
    #[serde(default, skip_serializing_if = "Slot::is_omitted")]
    pub max_index: Slot<IndexValue>,
}

impl Curve {
    /// Curve with the given uid and mnemonic and every other field omitted.
    pub fn new(uid: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            mnemonic: mnemonic.into(),
            unit: None,
            null_value: None,
            data_type: None,
            class: None,
            description: None,
            column_index: None,
            min_index: Slot::Omitted,
            max_index: Slot::Omitted,
        }
    }

    /// Builder-style unit setter.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Builder-style data type setter.
    pub fn with_data_type(mut self, data_type: CurveDataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Builder-style range setter (min/max slots become present).
    pub fn with_range(mut self, min: Option<IndexValue>, max: Option<IndexValue>) -> Self {
        self.min_index = Slot::from_option(min);
        self.max_index = Slot::from_option(max);
        self
    }

    /// True when `key` matches this curve's uid or mnemonic.
    pub fn matches(&self, key: &str) -> bool {
        self.uid == key || self.mnemonic == key
    }

    /// Stored coverage ordered for the direction.
    pub fn range(&self, increasing: bool) -> IndexRange {
        IndexRange::from_bounds(
            self.min_index.value().copied(),
            self.max_index.value().copied(),
        )
        .sort(increasing)
    }
}

/// Inbound bulk data travelling with a header.
///
/// The first mnemonic must be the log's index curve; each row is one
/// comma-separated line with one token per mnemonic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogData {
    /// Column mnemonics, index curve first.
    pub mnemonics: Vec<String>,
    /// Optional units, parallel to `mnemonics`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<String>,
    /// Comma-separated data rows.
    #[serde(default)]
    pub rows: Vec<String>,
}

/// Header entity of a log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogHeader {
    /// Identity of the log.
    pub uri: LogUri,

    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Schema version the header was written with.
    #[serde(default)]
    pub schema_version: SchemaVersion,

    /// Kind of index axis.
    #[serde(default)]
    pub index_type: IndexMode,

    /// Row ordering; immutable once set. Absent means increasing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    /// Mnemonic of the index curve; never changes over the log's lifetime.
    #[serde(default)]
    pub index_curve: String,

    /// Default null marker for curves without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_value: Option<String>,

    /// Ordered curve definitions.
    #[serde(default)]
    pub curves: Vec<Curve>,

    /// First index value of the log (direction order).
    #[serde(default, skip_serializing_if = "Slot::is_omitted")]
    pub start_index: Slot<IndexValue>,

    /// Last index value of the log (direction order).
    #[serde(default, skip_serializing_if = "Slot::is_omitted")]
    pub end_index: Slot<IndexValue>,

    /// Creation stamp.
    #[serde(default, skip_serializing_if = "Slot::is_omitted")]
    pub creation_time: Slot<DateTime<Utc>>,

    /// Last modification stamp.
    #[serde(default, skip_serializing_if = "Slot::is_omitted")]
    pub last_modified: Slot<DateTime<Utc>>,

    /// Inbound data; never persisted with the header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<LogData>,
}

impl LogHeader {
    /// Minimal header: identity, index axis, and index curve mnemonic.
    pub fn new(uri: impl Into<LogUri>, index_type: IndexMode, index_curve: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: None,
            schema_version: SchemaVersion::default(),
            index_type,
            direction: None,
            index_curve: index_curve.into(),
            null_value: None,
            curves: Vec::new(),
            start_index: Slot::Omitted,
            end_index: Slot::Omitted,
            creation_time: Slot::Omitted,
            last_modified: Slot::Omitted,
            data: None,
        }
    }

    /// Builder-style curve append.
    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curves.push(curve);
        self
    }

    /// Builder-style direction setter.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Builder-style data attachment.
    pub fn with_data(mut self, data: LogData) -> Self {
        self.data = Some(data);
        self
    }

    /// Effective direction according to the header's schema version.
    pub fn is_increasing(&self) -> bool {
        self.schema_version.is_increasing(self)
    }

    /// Effective direction as a value.
    pub fn effective_direction(&self) -> Direction {
        if self.is_increasing() {
            Direction::Increasing
        } else {
            Direction::Decreasing
        }
    }

    /// Whether the log is indexed by time, according to the schema version.
    pub fn is_time_log(&self) -> bool {
        self.schema_version.is_time_log(self)
    }

    /// Effective index mode.
    pub fn index_mode(&self) -> IndexMode {
        if self.is_time_log() {
            IndexMode::Time
        } else {
            IndexMode::Generic
        }
    }

    /// Log-level index range according to the schema version.
    pub fn index_range(&self) -> IndexRange {
        self.schema_version.index_range(self)
    }

    /// Find a curve by uid.
    pub fn curve_by_uid(&self, uid: &str) -> Option<&Curve> {
        self.curves.iter().find(|c| c.uid == uid)
    }

    /// Find a curve by mnemonic.
    pub fn curve_by_mnemonic(&self, mnemonic: &str) -> Option<&Curve> {
        self.curves.iter().find(|c| c.mnemonic == mnemonic)
    }

    /// Find a curve by uid, falling back to mnemonic.
    pub fn curve(&self, key: &str) -> Option<&Curve> {
        self.curve_by_uid(key).or_else(|| self.curve_by_mnemonic(key))
    }

    /// The index curve definition, if present.
    pub fn index_curve_def(&self) -> Option<&Curve> {
        self.curve_by_mnemonic(&self.index_curve)
    }

    /// True when `curve` is the index curve.
    pub fn is_index_curve(&self, curve: &Curve) -> bool {
        curve.mnemonic == self.index_curve
    }

    /// Null marker for a curve: its own, else the log default.
    pub fn null_value_for<'a>(&'a self, curve: &'a Curve) -> Option<&'a str> {
        curve
            .null_value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.null_value.as_deref().filter(|v| !v.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_scope_matching() {
        let log = LogUri::from("eml://store/well(w1)/wellbore(b1)/log(l1)");
        assert!(log.is_within(&LogUri::from("eml://store/well(w1)")));
        assert!(log.is_within(&LogUri::from("eml://store/well(w1)/")));
        assert!(log.is_within(&log.clone()));
        assert!(!log.is_within(&LogUri::from("eml://store/well(w10)")));
        assert!(!log.is_within(&LogUri::from("eml://store/well(w1)/wellbore(b2)")));
    }

    #[test]
    fn header_json_keeps_shape() {
        let json = r#"{
            "uri": "log-1",
            "index_type": "generic",
            "index_curve": "DEPTH",
            "start_index": null,
            "curves": [
                { "uid": "c-depth", "mnemonic": "DEPTH", "unit": "m", "min_index": 0, "max_index": null },
                { "mnemonic": "GR" }
            ]
        }"#;

        let header: LogHeader = serde_json::from_str(json).expect("deserialize");
        assert_eq!(header.start_index, Slot::Empty);
        assert_eq!(header.end_index, Slot::Omitted);
        assert_eq!(header.curves[0].min_index, Slot::Value(IndexValue::Numeric(0.0)));
        assert_eq!(header.curves[0].max_index, Slot::Empty);
        assert_eq!(header.curves[1].min_index, Slot::Omitted);
        assert_eq!(header.curves[1].uid, "");

        let back = serde_json::to_value(&header).expect("serialize");
        assert!(back.get("end_index").is_none());
        assert!(back.get("start_index").is_some_and(|v| v.is_null()));
        assert!(back["curves"][1].get("min_index").is_none());
    }

    #[test]
    fn null_value_falls_back_to_log_default() {
        let mut header = LogHeader::new("log-1", IndexMode::Generic, "DEPTH");
        header.null_value = Some("-999.25".to_string());
        let mut own = Curve::new("gr", "GR");
        own.null_value = Some("-1".to_string());
        let mut blank = Curve::new("rop", "ROP");
        blank.null_value = Some("  ".to_string());

        assert_eq!(header.null_value_for(&own), Some("-1"));
        assert_eq!(header.null_value_for(&blank), Some("-999.25"));
    }

    #[test]
    fn curve_range_is_direction_ordered() {
        let curve = Curve::new("gr", "GR")
            .with_range(Some(IndexValue::Numeric(0.0)), Some(IndexValue::Numeric(100.0)));
        let dec = curve.range(false);
        assert_eq!(dec.start, Some(IndexValue::Numeric(100.0)));
        assert_eq!(dec.end, Some(IndexValue::Numeric(0.0)));
    }
}
