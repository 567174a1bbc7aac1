use curvelog_core::LogHeader;
use curvelog_core::extract::RowReader;
use curvelog_core::projection::{ChannelMetadata, ChannelStatus, IndexMetadata};
use tabled::{builder::Builder, settings::Style};

fn opt_index(v: Option<i64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Channel descriptors as a rounded table, preceded by one line describing
/// the shared index.
pub fn channels_table(index: &IndexMetadata, channels: &[ChannelMetadata]) -> String {
    let mut builder = Builder::default();
    builder.push_record([
        "id", "mnemonic", "uid", "class", "unit", "type", "status", "start", "end",
    ]);
    for ch in channels {
        let status = match ch.status {
            ChannelStatus::Active => "active",
            ChannelStatus::Inactive => "inactive",
        };
        builder.push_record([
            ch.id.to_string(),
            ch.mnemonic.clone(),
            ch.uid.clone(),
            ch.class.clone(),
            ch.unit.clone(),
            ch.data_type.clone(),
            status.to_string(),
            opt_index(ch.start_index),
            opt_index(ch.end_index),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    format!(
        "index: {} ({}, {}, {}, scale {})\n{table}",
        index.mnemonic, index.unit, index.mode, index.direction, index.scale
    )
}

/// Rows as CSV with a mnemonic header line, index curve first; nulls are
/// blank.
pub fn rows_csv(header: &LogHeader, reader: &RowReader) -> String {
    let mnemonic = |uid: &str| {
        header
            .curve_by_uid(uid)
            .map_or_else(|| uid.to_string(), |c| c.mnemonic.clone())
    };
    let columns = reader.curves();

    let mut out = columns
        .iter()
        .map(|uid| mnemonic(uid))
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');

    for row in reader.rows() {
        let mut fields = vec![row.index.to_string()];
        fields.extend(columns.iter().filter(|uid| *uid != reader.index_uid()).map(|uid| {
            row.values
                .get(uid)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}
