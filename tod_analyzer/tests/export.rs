mod common;

use std::{fs, sync::Arc};

use chrono::{TimeZone, Utc};
use common::StubProvider;
use tod_analyzer::{
    config::AnalysisConfig,
    pipeline::run_universe,
    report::{CsvExporter, MetadataRow},
    universe::Instrument,
};

#[tokio::test]
async fn writes_every_table_into_a_timestamped_dir() {
    let cfg = AnalysisConfig::default();
    let stub = StubProvider::with(
        &[("AAA.AX", 1.0, 1.0), ("BBB.AX", 1.0, 2.0), ("CCC.AX", 1.0, 3.0)],
        5,
    );
    let instruments = ["AAA.AX", "BBB.AX", "CCC.AX"]
        .iter()
        .map(|t| Instrument::new(*t, *t, 1.0, 1e5))
        .collect();
    let now = Utc.with_ymd_and_hms(2025, 3, 20, 1, 30, 0).unwrap();
    let run = run_universe(Arc::new(stub), instruments, &cfg, now)
        .await
        .unwrap();

    let root = tempfile::tempdir().unwrap();
    let tz = chrono_tz::Australia::Perth;
    let exporter = CsvExporter::for_run(root.path(), &run, tz);
    assert!(exporter.dir().ends_with("tod_20250320_093000"));

    let meta = MetadataRow::new(&run, &cfg, tz, "stub");
    let files = exporter.export_all(&run, &meta).unwrap();
    assert_eq!(files.len(), 6);
    for f in &files {
        assert!(f.is_file(), "{} missing", f.display());
    }

    let stats = fs::read_to_string(exporter.dir().join("window_stats.csv")).unwrap();
    let header = stats.lines().next().unwrap();
    assert!(header.starts_with("ticker,resolution,window,avg_return_pct"));
    assert!(stats.lines().nth(1).unwrap().starts_with("AAA.AX,5min,"));

    let trades = fs::read_to_string(exporter.dir().join("trades.csv")).unwrap();
    assert_eq!(trades.lines().next(), Some("ticker,date,return,return_pct,cumulative_return"));
    assert_eq!(trades.lines().count(), 1 + 3 * 5);

    let meta_csv = fs::read_to_string(exporter.dir().join("metadata.csv")).unwrap();
    assert!(meta_csv.contains("Australia/Perth"));
    assert!(meta_csv.contains("AWST"));
}

#[test]
fn unwritable_root_is_an_export_error() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let run = tod_analyzer::pipeline::AnalysisRun::from_analyses(
        vec![],
        0,
        &AnalysisConfig::default(),
        Utc::now(),
    );
    // a regular file cannot hold a run directory
    let exporter = CsvExporter::for_run(file.path(), &run, chrono_tz::UTC);
    let err = exporter.export_trades(&run).unwrap_err();
    assert!(err.to_string().starts_with("failed to create"));
}
