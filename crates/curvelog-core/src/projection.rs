//! Read-only projection of header curves into channel descriptors.
//!
//! Discovery and streaming consumers describe a log as one
//! [`ChannelMetadata`] per curve, all sharing one [`IndexMetadata`]. Nothing
//! here writes; descriptors are rebuilt per request.
use serde::{Deserialize, Serialize};

use crate::index::{Direction, IndexMode, scale_index};
use crate::metadata::{Curve, LogHeader};

/// Decimal scale reported for time indexes (microsecond resolution).
pub const TIME_INDEX_SCALE: u32 = 6;

const UNKNOWN: &str = "Unknown";

/// Description of a log's index axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Index curve mnemonic.
    pub mnemonic: String,
    /// Index unit ("none" when unknown).
    pub unit: String,
    /// Row direction.
    pub direction: Direction,
    /// Index axis kind.
    pub mode: IndexMode,
    /// Decimal scale of reported index values.
    pub scale: u32,
}

/// Whether a channel currently carries data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// The curve has stored data.
    Active,
    /// The curve has no stored data.
    Inactive,
}

/// Descriptor of one curve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// Position of the curve in the header.
    pub id: u32,
    /// Curve address: log URI plus mnemonic.
    pub uri: String,
    /// Curve uid.
    pub uid: String,
    /// Curve mnemonic.
    pub mnemonic: String,
    /// Measurement class.
    pub class: String,
    /// Unit of measure.
    pub unit: String,
    /// Data type name.
    pub data_type: String,
    /// Data source.
    pub source: String,
    /// Data status.
    pub status: ChannelStatus,
    /// First index with data (direction order), scaled.
    pub start_index: Option<i64>,
    /// Last index with data (direction order), scaled.
    pub end_index: Option<i64>,
    /// Free-form description.
    pub description: Option<String>,
    /// Shared index description.
    pub index: IndexMetadata,
}

/// Measurement class implied by a unit of measure.
pub fn class_for_unit(unit: &str) -> Option<&'static str> {
    let class = match unit.trim().to_ascii_lowercase().as_str() {
        "m" | "ft" | "cm" | "in" | "km" => "length",
        "s" | "ms" | "min" | "h" => "time",
        "gapi" | "api" => "gamma ray",
        "m/h" | "ft/h" | "m/s" | "ft/s" => "velocity",
        "degc" | "degf" | "k" => "temperature",
        "kpa" | "mpa" | "psi" | "bar" => "pressure",
        "g/cm3" | "kg/m3" => "density",
        "ohm.m" | "ohmm" => "resistivity",
        "klbf" | "kn" | "n" => "force",
        "rpm" | "c/s" => "angular velocity",
        "%" | "pu" | "v/v" => "dimensionless",
        _ => return None,
    };
    Some(class)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Shared index description of `header`.
pub fn index_metadata(header: &LogHeader, decimal_scale: u32) -> IndexMetadata {
    let mode = header.index_mode();
    let unit = header
        .index_curve_def()
        .and_then(|c| non_blank(c.unit.as_deref()))
        .unwrap_or("none");
    IndexMetadata {
        mnemonic: header.index_curve.clone(),
        unit: unit.to_string(),
        direction: header.effective_direction(),
        mode,
        scale: if mode.is_time() {
            TIME_INDEX_SCALE
        } else {
            decimal_scale
        },
    }
}

fn channel(
    header: &LogHeader,
    position: usize,
    curve: &Curve,
    decimal_scale: u32,
    index: &IndexMetadata,
) -> ChannelMetadata {
    let unit = non_blank(curve.unit.as_deref());
    let class = non_blank(curve.class.as_deref())
        .or_else(|| unit.and_then(class_for_unit))
        .unwrap_or(UNKNOWN);
    let range = curve.range(header.is_increasing());

    ChannelMetadata {
        id: u32::try_from(position).unwrap_or(u32::MAX),
        uri: format!("{}/{}", header.uri, curve.mnemonic),
        uid: curve.uid.clone(),
        mnemonic: curve.mnemonic.clone(),
        class: class.to_string(),
        unit: unit.unwrap_or("none").to_string(),
        data_type: curve
            .data_type
            .map_or("double", |t| t.as_str())
            .to_string(),
        source: UNKNOWN.to_string(),
        status: if range.is_empty() {
            ChannelStatus::Inactive
        } else {
            ChannelStatus::Active
        },
        start_index: range.start.map(|v| scale_index(v, decimal_scale)),
        end_index: range.end.map(|v| scale_index(v, decimal_scale)),
        description: curve.description.clone(),
        index: index.clone(),
    }
}

/// One descriptor per curve of `header`, in header order.
pub fn project_channels(header: &LogHeader, decimal_scale: u32) -> Vec<ChannelMetadata> {
    let index = index_metadata(header, decimal_scale);
    header
        .curves
        .iter()
        .enumerate()
        .map(|(i, curve)| channel(header, i, curve, decimal_scale, &index))
        .collect()
}
