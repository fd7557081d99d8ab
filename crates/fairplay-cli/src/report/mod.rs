//! Report rendering and saving.

pub mod html;
pub mod json;
pub mod text;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use fairplay_analysis::report::{DetailedReport, Severity};
use fairplay_analysis::EnhancedResult;
use tracing::info;

use crate::cli::ReportFormat;
use crate::error::CliError;

pub const DISCLAIMER: &str = "This report provides statistical indicators only, not proof of cheating. \
Use results responsibly. Final judgment rests with the platform's Fair Play team.";

/// `sudden_improvement` -> `Sudden Improvement`
pub fn pattern_title(pattern: &str) -> String {
    pattern
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "high",
    }
}

pub fn render(report: &DetailedReport, format: ReportFormat) -> Result<String, CliError> {
    Ok(match format {
        ReportFormat::Html => html::render(report),
        ReportFormat::Text => text::render(report),
        ReportFormat::Json | ReportFormat::All => json::render(report)?,
    })
}

pub fn render_enhanced(result: &EnhancedResult, format: ReportFormat) -> Result<String, CliError> {
    Ok(match format {
        ReportFormat::Html => html::render_enhanced(result),
        ReportFormat::Text => text::render_enhanced(result),
        ReportFormat::Json | ReportFormat::All => json::render(result)?,
    })
}

/// `{dir}/{output}.{ext}` when an output name is given, else
/// `{dir}/{prefix}_{username}_{YYYYmmdd_HHMMSS}.{ext}`.
pub fn report_path(
    dir: &Path,
    prefix: &str,
    username: &str,
    output: Option<&str>,
    format: ReportFormat,
    now: DateTime<Local>,
) -> PathBuf {
    let ext = format.extension();
    let name = match output {
        Some(out) if out.ends_with(&format!(".{ext}")) => out.to_string(),
        Some(out) => format!("{out}.{ext}"),
        None => format!("{prefix}_{username}_{}.{ext}", now.format("%Y%m%d_%H%M%S")),
    };
    dir.join(name)
}

pub fn save(content: &str, path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    info!(path = %path.display(), bytes = content.len(), "Report saved");
    Ok(())
}

/// Render every requested format and write them next to each other.
pub fn write_reports(
    report: &DetailedReport,
    format: ReportFormat,
    dir: &Path,
    output: Option<&str>,
) -> Result<Vec<PathBuf>, CliError> {
    let now = Local::now();
    let mut written = Vec::new();
    for fmt in format.expand() {
        let path = report_path(dir, "report", &report.username, output, fmt, now);
        save(&render(report, fmt)?, &path)?;
        written.push(path);
    }
    Ok(written)
}

pub fn write_enhanced_reports(
    result: &EnhancedResult,
    format: ReportFormat,
    dir: &Path,
    output: Option<&str>,
) -> Result<Vec<PathBuf>, CliError> {
    let now = Local::now();
    let mut written = Vec::new();
    for fmt in format.expand() {
        let path = report_path(dir, "enhanced", &result.username, output, fmt, now);
        save(&render_enhanced(result, fmt)?, &path)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn titles_from_snake_case() {
        assert_eq!(pattern_title("sudden_improvement"), "Sudden Improvement");
        assert_eq!(pattern_title("excessive_perfect_games"), "Excessive Perfect Games");
    }

    #[test]
    fn report_file_names() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let dir = Path::new("reports");

        let named = report_path(dir, "report", "bob", Some("final"), ReportFormat::Text, now);
        assert_eq!(named, PathBuf::from("reports/final.txt"));

        let stamped = report_path(dir, "report", "bob", None, ReportFormat::Html, now);
        assert_eq!(stamped, PathBuf::from("reports/report_bob_20240305_140709.html"));

        let kept = report_path(dir, "report", "bob", Some("x.json"), ReportFormat::Json, now);
        assert_eq!(kept, PathBuf::from("reports/x.json"));
    }
}
