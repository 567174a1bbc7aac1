//! Data extraction: split an inbound log into header fields plus a bulk
//! [`RowReader`].
//!
//! Inbound data is a mnemonic list (index curve first), an optional parallel
//! unit list, and comma-separated rows. Each mutation builds exactly one
//! reader, resolved against the curve set that mutation will store:
//!
//! - Add resolves against the inbound curves.
//! - Update resolves against the existing curves merged with the inbound ones.
//! - Replace resolves against the inbound curves completed from the existing
//!   header; columns the replacement does not define are rejected.
//!
//! A token is null when it is blank or equals the curve's effective null value
//! (curve null, then log null, then the store default).
pub mod reader;

pub use reader::{CellValue, DataRow, RowReader};

use snafu::prelude::*;

use crate::index::{IndexValue, ParseIndexError};
use crate::metadata::{Curve, CurveDataType, LogData, LogHeader};
use crate::reconcile::merge_curves;

/// Errors raised while turning inbound data into rows.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExtractError {
    /// The log's index curve is not among its curve definitions.
    #[snafu(display("Index curve {mnemonic:?} is not defined"))]
    MissingIndexCurve {
        /// Index curve mnemonic.
        mnemonic: String,
    },

    /// Data rows were supplied without a mnemonic list.
    #[snafu(display("Data has {rows} rows but no mnemonic list"))]
    NoMnemonics {
        /// Number of rows supplied.
        rows: usize,
    },

    /// The first data column is not the index curve.
    #[snafu(display("Data must start with index curve {expected:?}, found {found:?}"))]
    NotLedByIndex {
        /// Index curve mnemonic.
        expected: String,
        /// First mnemonic of the data.
        found: String,
    },

    /// A data column names a curve the log does not define.
    #[snafu(display("Data column {mnemonic:?} does not match any curve"))]
    UnknownMnemonic {
        /// Unknown mnemonic.
        mnemonic: String,
    },

    /// A data column appears twice.
    #[snafu(display("Data column {mnemonic:?} appears more than once"))]
    DuplicateMnemonic {
        /// Repeated mnemonic.
        mnemonic: String,
    },

    /// The unit list does not line up with the mnemonic list.
    #[snafu(display("Data lists {mnemonics} mnemonics but {units} units"))]
    UnitCountMismatch {
        /// Number of mnemonics.
        mnemonics: usize,
        /// Number of units.
        units: usize,
    },

    /// A row has the wrong number of tokens.
    #[snafu(display("Row {row} has {found} values, expected {expected}"))]
    MalformedRow {
        /// 1-based row number.
        row: usize,
        /// Number of mnemonics.
        expected: usize,
        /// Number of tokens in the row.
        found: usize,
    },

    /// A row has a null index value.
    #[snafu(display("Row {row} has no index value"))]
    MissingIndexValue {
        /// 1-based row number.
        row: usize,
    },

    /// A row's index value does not parse for the log's index mode.
    #[snafu(display("Row {row} has an invalid index value: {source}"))]
    InvalidIndex {
        /// 1-based row number.
        row: usize,
        /// Parse failure.
        source: ParseIndexError,
    },

    /// A data value does not parse for its curve's data type.
    #[snafu(display("Row {row}: value {token:?} is not a valid {data_type} for {mnemonic}"))]
    InvalidValue {
        /// 1-based row number.
        row: usize,
        /// Column mnemonic.
        mnemonic: String,
        /// Offending token.
        token: String,
        /// Expected data type name.
        data_type: &'static str,
    },

    /// A double value overflows to infinity.
    #[snafu(display("Row {row}: value {token:?} for {mnemonic} is not a finite number"))]
    NonFiniteValue {
        /// 1-based row number.
        row: usize,
        /// Column mnemonic.
        mnemonic: String,
        /// Offending token.
        token: String,
    },
}

/// Split an Add request: reader over the inbound curves, header without data.
pub fn extract_for_add(
    mut inbound: LogHeader,
    default_null: Option<&str>,
) -> Result<(LogHeader, RowReader), ExtractError> {
    let data = inbound.data.take();
    let reader = build_reader(&inbound, data.as_ref(), default_null)?;
    Ok((inbound, reader))
}

/// Split an Update request: the reader resolves columns against the existing
/// curves merged with the inbound ones.
pub fn extract_for_update(
    mut inbound: LogHeader,
    existing: &LogHeader,
    default_null: Option<&str>,
) -> Result<(LogHeader, RowReader), ExtractError> {
    let data = inbound.data.take();

    let mut merged = existing.clone();
    merged.curves = merge_curves(&existing.curves, &inbound.curves);
    if inbound.null_value.is_some() {
        merged.null_value = inbound.null_value.clone();
    }

    let reader = build_reader(&merged, data.as_ref(), default_null)?;
    Ok((inbound, reader))
}

/// Split a Replace request.
///
/// Inbound curves borrow uid, unit, null value, and data type from the
/// matching existing curve when they leave them out; the reader only accepts
/// columns of the replacement curve set.
pub fn extract_for_replace(
    mut inbound: LogHeader,
    existing: &LogHeader,
    default_null: Option<&str>,
) -> Result<(LogHeader, RowReader), ExtractError> {
    let data = inbound.data.take();

    for curve in &mut inbound.curves {
        complete_curve(curve, existing);
    }
    if inbound.null_value.is_none() {
        inbound.null_value = existing.null_value.clone();
    }

    let reader = build_reader(&inbound, data.as_ref(), default_null)?;
    Ok((inbound, reader))
}

fn complete_curve(curve: &mut Curve, existing: &LogHeader) {
    let key = if curve.uid.is_empty() {
        &curve.mnemonic
    } else {
        &curve.uid
    };
    if let Some(known) = existing.curve(key) {
        if curve.uid.is_empty() {
            curve.uid = known.uid.clone();
        }
        if curve.unit.is_none() {
            curve.unit = known.unit.clone();
        }
        if curve.null_value.is_none() {
            curve.null_value = known.null_value.clone();
        }
        if curve.data_type.is_none() {
            curve.data_type = known.data_type;
        }
    }
    if curve.uid.trim().is_empty() {
        curve.uid = curve.mnemonic.clone();
    }
}

fn curve_uid(curve: &Curve) -> String {
    if curve.uid.trim().is_empty() {
        curve.mnemonic.clone()
    } else {
        curve.uid.clone()
    }
}

enum Cell {
    Null,
    Value(CellValue),
    NonFinite,
    Invalid(&'static str),
}

fn parse_cell(token: &str, data_type: Option<CurveDataType>) -> Cell {
    match data_type.unwrap_or(CurveDataType::Double) {
        CurveDataType::Double => match token.parse::<f64>() {
            Ok(v) if v.is_nan() => Cell::Null,
            Ok(v) if v.is_infinite() => Cell::NonFinite,
            Ok(v) => Cell::Value(CellValue::Double(v)),
            Err(_) => Cell::Invalid("double"),
        },
        CurveDataType::Long => match token.parse::<i64>() {
            Ok(v) => Cell::Value(CellValue::Long(v)),
            Err(_) => Cell::Invalid("long"),
        },
        CurveDataType::String | CurveDataType::DateTime => {
            Cell::Value(CellValue::Text(token.to_string()))
        }
    }
}

struct Column<'a> {
    curve: &'a Curve,
    uid: String,
    null_value: Option<&'a str>,
}

fn build_reader(
    header: &LogHeader,
    data: Option<&LogData>,
    default_null: Option<&str>,
) -> Result<RowReader, ExtractError> {
    let index = header
        .index_curve_def()
        .context(MissingIndexCurveSnafu {
            mnemonic: header.index_curve.clone(),
        })?;
    let index_uid = curve_uid(index);

    let Some(data) = data else {
        return Ok(RowReader::empty(index_uid));
    };
    if data.mnemonics.is_empty() {
        ensure!(data.rows.is_empty(), NoMnemonicsSnafu { rows: data.rows.len() });
        return Ok(RowReader::empty(index_uid));
    }

    ensure!(
        data.units.is_empty() || data.units.len() == data.mnemonics.len(),
        UnitCountMismatchSnafu {
            mnemonics: data.mnemonics.len(),
            units: data.units.len(),
        }
    );
    ensure!(
        data.mnemonics[0] == index.mnemonic,
        NotLedByIndexSnafu {
            expected: index.mnemonic.clone(),
            found: data.mnemonics[0].clone(),
        }
    );

    let mut columns: Vec<Column<'_>> = Vec::with_capacity(data.mnemonics.len());
    for mnemonic in &data.mnemonics {
        ensure!(
            columns.iter().all(|c| &c.curve.mnemonic != mnemonic),
            DuplicateMnemonicSnafu { mnemonic }
        );
        let curve = header
            .curve_by_mnemonic(mnemonic)
            .context(UnknownMnemonicSnafu { mnemonic })?;
        let null_value = header
            .null_value_for(curve)
            .or(default_null.filter(|v| !v.trim().is_empty()));
        columns.push(Column {
            curve,
            uid: curve_uid(curve),
            null_value,
        });
    }

    let mode = header.index_mode();
    let mut rows = Vec::with_capacity(data.rows.len());
    for (i, line) in data.rows.iter().enumerate() {
        let row_no = i + 1;
        let tokens: Vec<&str> = line.split(',').map(str::trim).collect();
        ensure!(
            tokens.len() == columns.len(),
            MalformedRowSnafu {
                row: row_no,
                expected: columns.len(),
                found: tokens.len(),
            }
        );

        let is_null = |token: &str, column: &Column<'_>| {
            token.is_empty() || column.null_value.is_some_and(|n| n.trim() == token)
        };

        ensure!(
            !is_null(tokens[0], &columns[0]),
            MissingIndexValueSnafu { row: row_no }
        );
        let index_value =
            IndexValue::parse(tokens[0], mode).context(InvalidIndexSnafu { row: row_no })?;

        let mut row = DataRow::new(index_value);
        for (token, column) in tokens.iter().zip(&columns).skip(1) {
            if is_null(token, column) {
                continue;
            }
            match parse_cell(token, column.curve.data_type) {
                Cell::Null => {}
                Cell::Value(value) => {
                    row.values.insert(column.uid.clone(), value);
                }
                Cell::NonFinite => {
                    return NonFiniteValueSnafu {
                        row: row_no,
                        mnemonic: column.curve.mnemonic.clone(),
                        token: *token,
                    }
                    .fail();
                }
                Cell::Invalid(data_type) => {
                    return InvalidValueSnafu {
                        row: row_no,
                        mnemonic: column.curve.mnemonic.clone(),
                        token: *token,
                        data_type,
                    }
                    .fail();
                }
            }
        }
        rows.push(row);
    }

    let curves = columns.into_iter().map(|c| c.uid).collect();
    Ok(RowReader::new(index_uid, curves, rows))
}
