//! Partial delete scenarios against a local store.
//!
//! Every test stores rows at each integer index and checks both the stored
//! ranges and the rows that remain.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use curvelog_core::index::{Direction, IndexMode, IndexValue};
use curvelog_core::metadata::{Curve, LogData, LogHeader, LogUri, Slot};
use curvelog_core::store::{CurveSelector, DeleteRequest, LogStore, StoreError, StoreOptions};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const URI: &str = "well-7/logs/depth";

fn num(v: f64) -> Option<IndexValue> {
    Some(IndexValue::Numeric(v))
}

fn curve_range(header: &LogHeader, uid: &str) -> (Option<IndexValue>, Option<IndexValue>) {
    let curve = header.curve_by_uid(uid).expect("curve exists");
    (
        curve.min_index.value().copied(),
        curve.max_index.value().copied(),
    )
}

/// Store holding `{DEPTH[0,100], GR[0,100]}` in the given direction.
async fn depth_gr_store(direction: Direction) -> (TempDir, LogStore) {
    let tmp = TempDir::new().expect("create temp dir");
    let store = LogStore::open_local(tmp.path(), StoreOptions::default());

    let indexes: Vec<i32> = if direction.is_increasing() {
        (0..=100).collect()
    } else {
        (0..=100).rev().collect()
    };
    let rows = indexes.iter().map(|i| format!("{i},{}", i * 2)).collect();
    let header = LogHeader::new(URI, IndexMode::Generic, "DEPTH")
        .with_direction(direction)
        .with_curve(Curve::new("depth", "DEPTH"))
        .with_curve(Curve::new("gr", "GR"))
        .with_data(LogData {
            mnemonics: vec!["DEPTH".into(), "GR".into()],
            units: Vec::new(),
            rows,
        });
    store.add(header).await.expect("add log");
    (tmp, store)
}

async fn stored(store: &LogStore) -> LogHeader {
    store.get(&LogUri::from(URI), None).await.expect("get log")
}

#[tokio::test]
async fn deleting_tail_of_one_curve_keeps_the_untouched_edge() -> TestResult {
    let (_tmp, store) = depth_gr_store(Direction::Increasing).await;
    let request = DeleteRequest::new(URI)
        .with_bounds(num(40.0), num(100.0))
        .with_curve(CurveSelector::by_mnemonic("GR"));
    store.partial_delete(&request).await?;

    let header = stored(&store).await;
    assert_eq!(curve_range(&header, "gr"), (num(0.0), num(39.0)));
    assert_eq!(curve_range(&header, "depth"), (num(0.0), num(100.0)));
    assert_eq!(header.end_index, Slot::Value(IndexValue::Numeric(100.0)));

    let rows = store.read_rows(&LogUri::from(URI)).await?;
    assert_eq!(rows.len(), 101);
    let with_gr = rows.rows().iter().filter(|r| r.values.contains_key("gr")).count();
    assert_eq!(with_gr, 40);
    Ok(())
}

#[tokio::test]
async fn naming_only_the_index_curve_broadcasts() -> TestResult {
    let (_tmp, store) = depth_gr_store(Direction::Increasing).await;
    let request = DeleteRequest::new(URI)
        .with_bounds(num(40.0), num(100.0))
        .with_curve(CurveSelector::by_uid("depth"));
    store.partial_delete(&request).await?;

    let header = stored(&store).await;
    assert_eq!(curve_range(&header, "gr"), (num(0.0), num(39.0)));
    assert_eq!(curve_range(&header, "depth"), (num(0.0), num(39.0)));
    assert_eq!(header.start_index, Slot::Value(IndexValue::Numeric(0.0)));
    assert_eq!(header.end_index, Slot::Value(IndexValue::Numeric(39.0)));
    assert_eq!(store.read_rows(&LogUri::from(URI)).await?.len(), 40);
    Ok(())
}

#[tokio::test]
async fn log_with_only_the_index_curve_is_emptied() -> TestResult {
    let tmp = TempDir::new()?;
    let store = LogStore::open_local(tmp.path(), StoreOptions::default());
    let header = LogHeader::new(URI, IndexMode::Generic, "DEPTH")
        .with_curve(Curve::new("depth", "DEPTH"))
        .with_data(LogData {
            mnemonics: vec!["DEPTH".into()],
            units: Vec::new(),
            rows: (0..=20).map(|i| i.to_string()).collect(),
        });
    store.add(header).await?;

    let request = DeleteRequest::new(URI).with_bounds(num(5.0), num(6.0));
    store.partial_delete(&request).await?;

    let header = stored(&store).await;
    assert_eq!(curve_range(&header, "depth"), (None, None));
    assert_eq!(header.start_index, Slot::Empty);
    assert!(store.read_rows(&LogUri::from(URI)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn covering_bound_over_every_curve_equals_delete_all() -> TestResult {
    let (_tmp, store) = depth_gr_store(Direction::Increasing).await;
    let request = DeleteRequest::new(URI)
        .with_bounds(num(-1.0), num(500.0))
        .with_curve(CurveSelector::by_mnemonic("GR"));
    store.partial_delete(&request).await?;

    let header = stored(&store).await;
    assert_eq!(curve_range(&header, "gr"), (None, None));
    assert_eq!(curve_range(&header, "depth"), (None, None));
    assert_eq!(header.start_index, Slot::Empty);
    assert_eq!(header.end_index, Slot::Empty);
    assert!(store.read_rows(&LogUri::from(URI)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn naming_every_curve_without_bounds_deletes_all() -> TestResult {
    let (_tmp, store) = depth_gr_store(Direction::Increasing).await;
    let request = DeleteRequest::new(URI).with_curve(CurveSelector::by_mnemonic("GR"));
    store.partial_delete(&request).await?;

    let header = stored(&store).await;
    assert_eq!(curve_range(&header, "gr"), (None, None));
    assert_eq!(curve_range(&header, "depth"), (None, None));
    assert!(store.read_rows(&LogUri::from(URI)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn own_range_wins_over_request_bound() -> TestResult {
    let (_tmp, store) = depth_gr_store(Direction::Increasing).await;
    let request = DeleteRequest::new(URI)
        .with_bounds(num(50.0), num(100.0))
        .with_curve(CurveSelector::by_mnemonic("GR").with_range(num(0.0), num(9.0)));
    store.partial_delete(&request).await?;

    let header = stored(&store).await;
    assert_eq!(curve_range(&header, "gr"), (num(10.0), num(100.0)));
    assert_eq!(curve_range(&header, "depth"), (num(0.0), num(100.0)));
    Ok(())
}

#[tokio::test]
async fn decreasing_logs_report_bounds_in_direction_order() -> TestResult {
    let (_tmp, store) = depth_gr_store(Direction::Decreasing).await;
    let request = DeleteRequest::new(URI)
        .with_bounds(num(40.0), num(100.0))
        .with_curve(CurveSelector::by_mnemonic("DEPTH"));
    store.partial_delete(&request).await?;

    let header = stored(&store).await;
    assert_eq!(curve_range(&header, "depth"), (num(0.0), num(39.0)));
    assert_eq!(header.start_index, Slot::Value(IndexValue::Numeric(39.0)));
    assert_eq!(header.end_index, Slot::Value(IndexValue::Numeric(0.0)));

    let rows = store.read_rows(&LogUri::from(URI)).await?;
    assert_eq!(rows.rows()[0].index, IndexValue::Numeric(39.0));
    Ok(())
}

#[tokio::test]
async fn naming_a_curve_without_ranges_removes_it() -> TestResult {
    let tmp = TempDir::new()?;
    let store = LogStore::open_local(tmp.path(), StoreOptions::default());
    let header = LogHeader::new(URI, IndexMode::Generic, "DEPTH")
        .with_curve(Curve::new("depth", "DEPTH"))
        .with_curve(Curve::new("gr", "GR"))
        .with_curve(Curve::new("rop", "ROP"))
        .with_data(LogData {
            mnemonics: vec!["DEPTH".into(), "GR".into(), "ROP".into()],
            units: Vec::new(),
            rows: (0..=10).map(|i| format!("{i},{i},{}", i * 3)).collect(),
        });
    store.add(header).await?;

    let request = DeleteRequest::new(URI).with_curve(CurveSelector::by_mnemonic("GR"));
    let note = store.partial_delete(&request).await?.expect("a commit");
    assert_eq!(note.version, 2);

    let header = stored(&store).await;
    let mnemonics: Vec<&str> = header.curves.iter().map(|c| c.mnemonic.as_str()).collect();
    assert_eq!(mnemonics, ["DEPTH", "ROP"]);
    assert_eq!(curve_range(&header, "rop"), (num(0.0), num(10.0)));
    assert_eq!(header.end_index, Slot::Value(IndexValue::Numeric(10.0)));

    let rows = store.read_rows(&LogUri::from(URI)).await?;
    assert_eq!(rows.curves(), ["depth", "rop"]);
    assert_eq!(rows.len(), 11);
    assert!(rows.rows().iter().all(|r| !r.values.contains_key("gr")));

    // The next write sees the narrowed curve set.
    let gone = DeleteRequest::new(URI).with_curve(CurveSelector::by_mnemonic("GR"));
    let err = store.partial_delete(&gone).await.unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedDeleteShape { .. }), "{err}");
    Ok(())
}

#[tokio::test]
async fn request_matching_no_data_commits_nothing() -> TestResult {
    let tmp = TempDir::new()?;
    let store = LogStore::open_local(tmp.path(), StoreOptions::default());
    let header = LogHeader::new(URI, IndexMode::Generic, "DEPTH")
        .with_curve(Curve::new("depth", "DEPTH"))
        .with_curve(Curve::new("gr", "GR"));
    store.add(header).await?;

    let request = DeleteRequest::new(URI).with_curve(CurveSelector::by_uid("depth"));
    assert!(store.partial_delete(&request).await?.is_none());

    let note = store.delete(&LogUri::from(URI)).await?;
    assert_eq!(note.version, 2);
    Ok(())
}

#[tokio::test]
async fn infinite_bounds_are_rejected() -> TestResult {
    let (_tmp, store) = depth_gr_store(Direction::Increasing).await;
    let request = DeleteRequest::new(URI)
        .with_bounds(num(40.0), Some(IndexValue::Numeric(f64::INFINITY)))
        .with_curve(CurveSelector::by_mnemonic("GR"));
    let err = store.partial_delete(&request).await.unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedDeleteShape { .. }), "{err}");

    let header = stored(&store).await;
    assert_eq!(curve_range(&header, "gr"), (num(0.0), num(100.0)));
    Ok(())
}

#[tokio::test]
async fn unusable_requests_change_nothing() -> TestResult {
    let (_tmp, store) = depth_gr_store(Direction::Increasing).await;

    let unknown = DeleteRequest::new(URI).with_curve(CurveSelector::by_mnemonic("CALI"));
    let err = store.partial_delete(&unknown).await.unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedDeleteShape { .. }), "{err}");

    let time_bound = DeleteRequest::new(URI).with_bounds(Some(IndexValue::Time(0)), None);
    let err = store.partial_delete(&time_bound).await.unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedDeleteShape { .. }), "{err}");

    let missing = DeleteRequest::new("other").with_bounds(num(0.0), None);
    let err = store.partial_delete(&missing).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "{err}");

    assert_eq!(store.read_rows(&LogUri::from(URI)).await?.len(), 101);
    Ok(())
}

#[tokio::test]
async fn requests_deserialize_from_json() -> TestResult {
    let (_tmp, store) = depth_gr_store(Direction::Increasing).await;
    let request: DeleteRequest = serde_json::from_str(&format!(
        r#"{{ "uri": "{URI}", "start": 90, "curves": [{{ "mnemonic": "GR" }}] }}"#
    ))?;
    store.partial_delete(&request).await?;

    let header = stored(&store).await;
    assert_eq!(curve_range(&header, "gr"), (num(0.0), num(89.0)));
    Ok(())
}
