//! End-to-end tests for Add, Update, Replace, and full delete against a local
//! store:
//! - ranges always come from the rows actually stored,
//! - failed mutations leave nothing behind,
//! - reads project through caller templates.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use curvelog_core::index::{Direction, IndexMode, IndexValue};
use curvelog_core::metadata::{Curve, LogData, LogHeader, LogUri, Slot};
use curvelog_core::notify::ChangeKind;
use curvelog_core::projection::ChannelStatus;
use curvelog_core::repository::{LogRepository, LogTransaction};
use curvelog_core::store::{LogStore, StoreError, StoreOptions};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

// =============================================================================
// Test Helpers
// =============================================================================

fn open_store() -> (TempDir, LogStore) {
    let tmp = TempDir::new().expect("create temp dir");
    let store = LogStore::open_local(tmp.path(), StoreOptions::default());
    (tmp, store)
}

fn num(v: f64) -> Option<IndexValue> {
    Some(IndexValue::Numeric(v))
}

fn data(mnemonics: &[&str], rows: Vec<String>) -> LogData {
    LogData {
        mnemonics: mnemonics.iter().map(|m| m.to_string()).collect(),
        units: Vec::new(),
        rows,
    }
}

/// `{DEPTH, GR}` with a row at every integer depth in `0..=100`.
fn depth_gr_log(uri: &str) -> LogHeader {
    let rows = (0..=100)
        .map(|i| format!("{i},{}", f64::from(i) / 10.0))
        .collect();
    LogHeader::new(uri, IndexMode::Generic, "DEPTH")
        .with_curve(Curve::new("depth", "DEPTH").with_unit("m"))
        .with_curve(Curve::new("gr", "GR").with_unit("gAPI"))
        .with_data(data(&["DEPTH", "GR"], rows))
}

fn curve_range(header: &LogHeader, uid: &str) -> (Option<IndexValue>, Option<IndexValue>) {
    let curve = header.curve_by_uid(uid).expect("curve exists");
    (
        curve.min_index.value().copied(),
        curve.max_index.value().copied(),
    )
}

// =============================================================================
// Add
// =============================================================================

#[tokio::test]
async fn add_derives_ranges_from_rows() -> TestResult {
    let (_tmp, store) = open_store();
    let mut inbound = depth_gr_log("well-1/log-1");
    inbound.curves[1] = Curve::new("gr", "GR").with_range(num(-5.0), num(999.0));
    inbound.start_index = Slot::Value(IndexValue::Numeric(-5.0));

    let note = store.add(inbound).await?;
    assert_eq!(note.kind, ChangeKind::Insert);
    assert_eq!(note.version, 1);

    let uri = LogUri::from("well-1/log-1");
    let stored = store.get(&uri, None).await?;
    assert_eq!(curve_range(&stored, "depth"), (num(0.0), num(100.0)));
    assert_eq!(curve_range(&stored, "gr"), (num(0.0), num(100.0)));
    assert_eq!(stored.start_index, Slot::Value(IndexValue::Numeric(0.0)));
    assert_eq!(stored.end_index, Slot::Value(IndexValue::Numeric(100.0)));
    assert!(stored.data.is_none());

    let rows = store.read_rows(&uri).await?;
    assert_eq!(rows.len(), 101);
    assert_eq!(rows.curves(), ["depth".to_string(), "gr".to_string()]);
    Ok(())
}

#[tokio::test]
async fn add_without_data_stores_empty_ranges() -> TestResult {
    let (_tmp, store) = open_store();
    let mut inbound = depth_gr_log("log");
    inbound.data = None;
    store.add(inbound).await?;

    let stored = store.get(&LogUri::from("log"), None).await?;
    assert_eq!(stored.curves[0].min_index, Slot::Empty);
    assert_eq!(stored.start_index, Slot::Empty);
    Ok(())
}

#[tokio::test]
async fn add_over_existing_log_is_rejected() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;

    let err = store.add(depth_gr_log("log")).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }), "{err}");
    Ok(())
}

#[tokio::test]
async fn bad_data_leaves_nothing_behind() -> TestResult {
    let (_tmp, store) = open_store();
    let inbound = depth_gr_log("log").with_data(data(
        &["DEPTH", "GR"],
        vec!["0,1.0".into(), "1".into()],
    ));

    let err = store.add(inbound).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidData { .. }), "{err}");

    let err = store.get(&LogUri::from("log"), None).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn infinite_values_are_rejected_and_the_log_stays_usable() -> TestResult {
    let (_tmp, store) = open_store();
    let uri = LogUri::from("log");

    for rows in [vec!["0,1.0", "1,1e999"], vec!["inf,2.0"]] {
        let inbound = depth_gr_log("log").with_data(data(
            &["DEPTH", "GR"],
            rows.into_iter().map(String::from).collect(),
        ));
        let err = store.add(inbound).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData { .. }), "{err}");
    }

    store.add(depth_gr_log("log")).await?;
    let update = LogHeader::new("log", IndexMode::Generic, "DEPTH")
        .with_data(data(&["DEPTH", "GR"], vec!["5,-inf".into()]));
    let err = store.update(update).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidData { .. }), "{err}");

    let stored = store.get(&uri, None).await?;
    assert_eq!(curve_range(&stored, "gr"), (num(0.0), num(100.0)));
    assert_eq!(store.read_rows(&uri).await?.len(), 101);
    Ok(())
}

#[tokio::test]
async fn time_bounds_round_trip_in_microseconds() -> TestResult {
    let (_tmp, store) = open_store();
    let inbound = LogHeader::new("time-log", IndexMode::Time, "TIME")
        .with_curve(Curve::new("time", "TIME"))
        .with_curve(Curve::new("rpm", "RPM").with_unit("rpm"))
        .with_data(data(
            &["TIME", "RPM"],
            vec![
                "2024-03-01T12:00:00.000001+02:00,110".into(),
                "2024-03-01T10:00:00.500000Z,".into(),
                "2024-03-01T10:00:01.999999Z,120".into(),
            ],
        ));
    store.add(inbound).await?;

    let stored = store.get(&LogUri::from("time-log"), None).await?;
    let first = Some(IndexValue::Time(1_709_287_200_000_001));
    let last = Some(IndexValue::Time(1_709_287_201_999_999));
    assert_eq!(curve_range(&stored, "time"), (first, last));
    assert_eq!(curve_range(&stored, "rpm"), (first, last));

    let json = serde_json::to_string(&stored)?;
    let reparsed: LogHeader = serde_json::from_str(&json)?;
    assert_eq!(reparsed.curves, stored.curves);
    assert_eq!(reparsed.start_index, stored.start_index);
    Ok(())
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn update_of_missing_log_is_validation_failure() -> TestResult {
    let (_tmp, store) = open_store();
    let err = store.update(depth_gr_log("nope")).await.unwrap_err();
    assert!(matches!(err, StoreError::ValidationFailure { .. }), "{err}");
    Ok(())
}

#[tokio::test]
async fn update_appends_rows_and_curves() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;

    let rows = (101..=120).map(|i| format!("{i},{}", i * 2)).collect();
    let inbound = LogHeader::new("log", IndexMode::Generic, "DEPTH")
        .with_curve(Curve::new("rop", "ROP").with_unit("m/h"))
        .with_data(data(&["DEPTH", "ROP"], rows));
    let note = store.update(inbound).await?;
    assert_eq!(note.kind, ChangeKind::Update);
    assert_eq!(note.version, 2);

    let uri = LogUri::from("log");
    let stored = store.get(&uri, None).await?;
    assert_eq!(stored.curves.len(), 3);
    assert_eq!(curve_range(&stored, "depth"), (num(0.0), num(120.0)));
    assert_eq!(curve_range(&stored, "gr"), (num(0.0), num(100.0)));
    assert_eq!(curve_range(&stored, "rop"), (num(101.0), num(120.0)));
    assert_eq!(stored.end_index, Slot::Value(IndexValue::Numeric(120.0)));
    assert_eq!(store.read_rows(&uri).await?.len(), 121);
    Ok(())
}

#[tokio::test]
async fn failed_update_keeps_committed_state() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;

    let inbound = LogHeader::new("log", IndexMode::Generic, "DEPTH")
        .with_data(data(&["DEPTH", "CALI"], vec!["200,1".into()]));
    let err = store.update(inbound).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidData { .. }), "{err}");

    let uri = LogUri::from("log");
    let stored = store.get(&uri, None).await?;
    assert_eq!(curve_range(&stored, "depth"), (num(0.0), num(100.0)));
    assert_eq!(store.read_rows(&uri).await?.len(), 101);
    Ok(())
}

#[tokio::test]
async fn update_cannot_flip_direction() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;

    let inbound = LogHeader::new("log", IndexMode::Generic, "DEPTH")
        .with_direction(Direction::Decreasing);
    let err = store.update(inbound).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidHeader { .. }), "{err}");
    Ok(())
}

// =============================================================================
// Replace
// =============================================================================

#[tokio::test]
async fn replace_removes_curves_missing_from_the_new_list() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;

    let rows = (0..=10).map(|i| format!("{i},{}", i * 3)).collect();
    let replacement = LogHeader::new("log", IndexMode::Generic, "DEPTH")
        .with_curve(Curve::new("", "DEPTH"))
        .with_curve(Curve::new("rop", "ROP"))
        .with_data(data(&["DEPTH", "ROP"], rows));
    store.replace(replacement).await?;

    let uri = LogUri::from("log");
    let stored = store.get(&uri, None).await?;
    assert!(stored.curve_by_uid("gr").is_none());
    assert_eq!(curve_range(&stored, "depth"), (num(0.0), num(10.0)));
    assert_eq!(curve_range(&stored, "rop"), (num(0.0), num(10.0)));
    assert_eq!(stored.curves[0].unit.as_deref(), Some("m"));

    let rows = store.read_rows(&uri).await?;
    assert_eq!(rows.len(), 11);
    assert_eq!(rows.curves(), ["depth".to_string(), "rop".to_string()]);
    assert!(rows.rows().iter().all(|r| !r.values.contains_key("gr")));
    Ok(())
}

#[tokio::test]
async fn replace_of_missing_log_is_validation_failure() -> TestResult {
    let (_tmp, store) = open_store();
    let err = store.replace(depth_gr_log("nope")).await.unwrap_err();
    assert!(matches!(err, StoreError::ValidationFailure { .. }), "{err}");
    Ok(())
}

#[tokio::test]
async fn replace_cannot_change_index_curve() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;

    let replacement = LogHeader::new("log", IndexMode::Generic, "GR")
        .with_curve(Curve::new("gr", "GR"));
    let err = store.replace(replacement).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidHeader { .. }), "{err}");

    let rows = store.read_rows(&LogUri::from("log")).await?;
    assert_eq!(rows.len(), 101);
    Ok(())
}

// =============================================================================
// Full delete and reads
// =============================================================================

#[tokio::test]
async fn delete_removes_header_and_rows() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;
    let uri = LogUri::from("log");

    let note = store.delete(&uri).await?;
    assert_eq!(note.kind, ChangeKind::Delete);

    assert!(matches!(
        store.get(&uri, None).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        store.read_rows(&uri).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        store.delete(&uri).await,
        Err(StoreError::NotFound { .. })
    ));

    let note = store.add(depth_gr_log("log")).await?;
    assert_eq!(note.version, 3);
    assert_eq!(store.read_rows(&uri).await?.len(), 101);
    Ok(())
}

#[tokio::test]
async fn get_fills_only_template_fields() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;

    let mut template = LogHeader::new("log", IndexMode::Generic, "");
    template.start_index = Slot::Empty;
    let mut gr = Curve::new("", "GR");
    gr.min_index = Slot::Empty;
    template.curves.push(gr);

    let shaped = store.get(&LogUri::from("log"), Some(&template)).await?;
    assert_eq!(shaped.index_curve, "DEPTH");
    assert_eq!(shaped.start_index, Slot::Value(IndexValue::Numeric(0.0)));
    assert_eq!(shaped.end_index, Slot::Omitted);
    assert_eq!(shaped.curves.len(), 1);
    assert_eq!(shaped.curves[0].uid, "gr");
    assert_eq!(shaped.curves[0].min_index, Slot::Value(IndexValue::Numeric(0.0)));
    assert_eq!(shaped.curves[0].max_index, Slot::Omitted);
    assert!(shaped.curves[0].unit.is_none());
    Ok(())
}

#[tokio::test]
async fn channel_metadata_scales_numeric_indexes() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;

    let (index, channels) = store.channel_metadata(&LogUri::from("log"), None).await?;
    assert_eq!(index.mnemonic, "DEPTH");
    assert_eq!(index.unit, "m");
    assert_eq!(index.scale, 3);

    assert_eq!(channels.len(), 2);
    assert_eq!(channels[1].uri, "log/GR");
    assert_eq!(channels[1].class, "gamma ray");
    assert_eq!(channels[1].status, ChannelStatus::Active);
    assert_eq!(channels[1].start_index, Some(0));
    assert_eq!(channels[1].end_index, Some(100_000));

    let (_, channels) = store.channel_metadata(&LogUri::from("log"), Some(0)).await?;
    assert_eq!(channels[0].end_index, Some(100));
    Ok(())
}

#[tokio::test]
async fn default_null_applies_when_log_has_none() -> TestResult {
    let tmp = TempDir::new()?;
    let store = LogStore::open_local(
        tmp.path(),
        StoreOptions::default().with_default_null_value("-999.25"),
    );
    let inbound = depth_gr_log("log").with_data(data(
        &["DEPTH", "GR"],
        vec!["0,-999.25".into(), "1,2.5".into()],
    ));
    store.add(inbound).await?;

    let stored = store.get(&LogUri::from("log"), None).await?;
    assert_eq!(curve_range(&stored, "gr"), (num(1.0), num(1.0)));
    assert_eq!(curve_range(&stored, "depth"), (num(0.0), num(1.0)));
    Ok(())
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn stale_writer_loses_to_committed_mutation() -> TestResult {
    let (_tmp, store) = open_store();
    store.add(depth_gr_log("log")).await?;
    let uri = LogUri::from("log");

    let mut stale = store.repository().begin(&uri).await?;
    stale.delete_all_rows()?;

    let more = LogHeader::new("log", IndexMode::Generic, "DEPTH")
        .with_data(data(&["DEPTH", "GR"], vec!["101,1".into()]));
    store.update(more).await?;

    let err = stale.commit().await.unwrap_err();
    assert!(err.is_conflict(), "{err}");
    assert_eq!(store.read_rows(&uri).await?.len(), 102);
    Ok(())
}
