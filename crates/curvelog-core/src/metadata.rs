//! Strongly-typed log header model.
//!
//! A log header describes one log: its identity, index axis, direction, and
//! the ordered list of curves sharing that index. Range fields are modelled
//! as [`Slot`]s so a header can say "this field is not part of my shape"
//! (omitted) apart from "this field is present but has no value" (empty).
//! Pure types only; persistence lives in [`crate::transaction_log`].
pub mod log_header;
pub mod patch;
pub mod schema_version;
pub mod slot;

pub use log_header::{Curve, CurveDataType, LogData, LogHeader, LogUri};
pub use patch::{HeaderField, HeaderPatch};
pub use schema_version::SchemaVersion;
pub use slot::Slot;
