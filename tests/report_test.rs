//! Rendered reports and exports from the front end crate.

mod common;

use fairplay_analysis::report::DetailedReport;
use fairplay_analysis::{aggregate, Thresholds};
use fairplay_cli::cli::ReportFormat;
use fairplay_cli::report;

fn sample_report(username: &str) -> DetailedReport {
    let games: Vec<_> = (0..10)
        .map(|i| common::analysis_with_correlation(if i < 5 { 60 } else { 85 }))
        .collect();
    let player = aggregate(username, 10, games, vec![]);
    DetailedReport::build(&player, &Thresholds::default())
}

#[test]
fn text_report_has_every_section() {
    let text = report::render(&sample_report("tester"), ReportFormat::Text).unwrap();
    for section in [
        "CHESS FAIRPLAY ANALYSIS REPORT",
        "SUMMARY",
        "PERFORMANCE BY TIME CONTROL",
        "DETECTED PATTERNS",
        "RECENT GAMES",
        "RECOMMENDATIONS",
        "ANALYSIS THRESHOLDS",
        "IMPORTANT DISCLAIMER",
    ] {
        assert!(text.contains(section), "missing {section}");
    }
    assert!(text.contains("Engine correlation improved from 60.0% to 85.0% [HIGH]"));
    assert!(text.contains("Engine Correlation Red Flag: 95%"));
}

#[test]
fn html_report_escapes_player_text() {
    let html = report::render(&sample_report("<script>"), ReportFormat::Html).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("Sudden Improvement"));
}

#[test]
fn json_report_parses_back() {
    let json = report::render(&sample_report("tester"), ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["username"], "tester");
    assert_eq!(value["summary"]["games_analyzed"], 10);
    assert_eq!(value["suspicious_patterns"][0]["severity"], "high");
}

#[test]
fn all_formats_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let written = report::write_reports(&sample_report("tester"), ReportFormat::All, dir.path(), Some("final")).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["final.html", "final.txt", "final.json"]);
    assert!(written.iter().all(|p| p.is_file()));
}
