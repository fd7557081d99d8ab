//! Plain-text reports for terminals and mail.

use std::fmt::Write;

use fairplay_analysis::report::DetailedReport;
use fairplay_analysis::{EnhancedResult, RiskLevel};

use super::{severity_name, DISCLAIMER};

const RECENT_GAMES: usize = 5;

fn rule(out: &mut String, c: char, width: usize) {
    out.extend(std::iter::repeat(c).take(width));
    out.push('\n');
}

fn heading(out: &mut String, title: &str) {
    out.push_str(title);
    out.push('\n');
    rule(out, '-', 40);
}

fn disclaimer(out: &mut String) {
    rule(out, '=', 60);
    heading(out, "IMPORTANT DISCLAIMER");
    out.push_str(DISCLAIMER);
    out.push('\n');
    rule(out, '=', 60);
}

pub fn render(report: &DetailedReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    rule(&mut out, '=', 60);
    out.push_str("CHESS FAIRPLAY ANALYSIS REPORT\n");
    let _ = writeln!(out, "Player: {}", report.username);
    let _ = writeln!(out, "Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S"));
    rule(&mut out, '=', 60);
    out.push('\n');

    heading(&mut out, "SUMMARY");
    let _ = writeln!(out, "Games Fetched: {}", s.total_games_fetched);
    let _ = writeln!(out, "Games Analyzed: {}", s.games_analyzed);
    if s.games_failed > 0 {
        let _ = writeln!(out, "Games Failed: {}", s.games_failed);
    }
    let _ = writeln!(out, "Suspicion Score: {:.1}/100", s.suspicion_score);
    let _ = writeln!(out, "Risk Level: {}", s.risk_level);
    let _ = writeln!(out, "Avg Engine Correlation: {:.1}%", s.avg_engine_correlation);
    let _ = writeln!(out, "Avg Centipawn Loss: {:.1}", s.avg_centipawn_loss);
    let _ = writeln!(out, "Suspicious Games: {}", s.suspicious_games);
    let _ = writeln!(out, "Extremely Accurate Games: {}", s.extremely_accurate_games);
    out.push('\n');

    if !report.performance_by_time_control.is_empty() {
        heading(&mut out, "PERFORMANCE BY TIME CONTROL");
        for (tc, stats) in &report.performance_by_time_control {
            let _ = writeln!(out, "{tc}:");
            let _ = writeln!(out, "  Games: {}", stats.game_count);
            let _ = writeln!(out, "  Avg Engine Correlation: {:.1}%", stats.avg_engine_correlation);
            let _ = writeln!(out, "  Avg CPL: {:.1}", stats.avg_cpl);
            let _ = writeln!(out, "  Consistency: {:.1}", stats.consistency);
            out.push('\n');
        }
    }

    if !report.suspicious_patterns.is_empty() {
        heading(&mut out, "DETECTED PATTERNS");
        for p in &report.suspicious_patterns {
            let _ = writeln!(out, "* {} [{}]", p.description, severity_name(p.severity).to_uppercase());
        }
        out.push('\n');
    }

    if !report.game_details.is_empty() {
        heading(&mut out, "RECENT GAMES");
        let _ = writeln!(out, "{:<6} {:<10} {:<10} {:<8} {:<10} {:<12}", "Game", "Result", "Engine%", "CPL", "TC", "Suspicious");
        rule(&mut out, '-', 60);
        for g in report.game_details.iter().take(RECENT_GAMES) {
            let _ = writeln!(
                out,
                "{:<6} {:<10} {:<9.1}% {:<8.1} {:<10} {:<12}",
                g.game_number,
                g.result,
                g.engine_correlation,
                g.avg_cpl,
                g.time_control,
                if g.is_suspicious { "YES" } else { "No" }
            );
        }
        out.push('\n');
    }

    if !report.recommendations.is_empty() {
        heading(&mut out, "RECOMMENDATIONS");
        for rec in &report.recommendations {
            let _ = writeln!(out, "* {rec}");
        }
        out.push('\n');
    }

    let t = &report.thresholds;
    heading(&mut out, "ANALYSIS THRESHOLDS");
    let _ = writeln!(out, "Engine Correlation Red Flag: {}%", t.engine_correlation_red_flag);
    let _ = writeln!(out, "Avg CPL Red Flag: {}", t.avg_centipawn_loss_red_flag);
    let _ = writeln!(out, "Accuracy Fluctuation Red Flag: {}%", t.accuracy_fluctuation_red_flag);
    out.push('\n');

    disclaimer(&mut out);
    out
}

pub fn render_enhanced(result: &EnhancedResult) -> String {
    let mut out = String::new();

    rule(&mut out, '=', 60);
    out.push_str("ENHANCED FAIRPLAY ANALYSIS REPORT\n");
    let _ = writeln!(out, "Player: {}", result.username);
    if let Some(ts) = &result.analysis_timestamp {
        let _ = writeln!(out, "Generated: {}", ts.format("%Y-%m-%d %H:%M:%S"));
    }
    rule(&mut out, '=', 60);
    out.push('\n');

    heading(&mut out, "SUMMARY");
    let _ = writeln!(out, "Games Analyzed: {}", result.games_analyzed);
    let _ = writeln!(out, "Games Failed: {}", result.failures.len());
    let _ = writeln!(out, "Suspicious Games: {}", result.suspicious_games);
    let _ = writeln!(out, "Suspicion Score: {:.1}/100", result.suspicion_score);
    let _ = writeln!(out, "Risk Level: {}", RiskLevel::from_score(result.suspicion_score));
    let _ = writeln!(out, "Avg Engine Match Rate: {:.1}%", result.avg_engine_match_rate);
    let _ = writeln!(out, "Avg Blunder Rate: {:.1}%", result.avg_blunder_rate);
    let _ = writeln!(out, "Avg Accuracy: {:.1}%", result.avg_accuracy);
    let _ = writeln!(out, "Avg Time Variation: {:.2}", result.avg_time_consistency);
    out.push('\n');

    if !result.platform_breakdown.is_empty() {
        heading(&mut out, "PLATFORMS");
        for (platform, count) in &result.platform_breakdown {
            let _ = writeln!(out, "{platform}: {count}");
        }
        out.push('\n');
    }

    let suspicious: Vec<_> = result.suspicious().collect();
    if !suspicious.is_empty() {
        heading(&mut out, "SUSPICIOUS GAMES");
        for g in suspicious {
            let _ = writeln!(
                out,
                "{} vs {} ({}) score {:.1}, engine match {:.1}%{}",
                g.white,
                g.black,
                g.result,
                g.suspicion_score,
                g.engine_pattern.top_1_match_rate,
                g.link.as_deref().map(|l| format!(", {l}")).unwrap_or_default()
            );
        }
        out.push('\n');
    }

    if !result.failures.is_empty() {
        heading(&mut out, "FAILED GAMES");
        for f in &result.failures {
            let _ = writeln!(out, "Game {} [{}]: {}", f.index, f.kind, f.message);
        }
        out.push('\n');
    }

    disclaimer(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_enhanced_result_still_renders() {
        let result = EnhancedResult {
            username: "nobody".into(),
            ..Default::default()
        };
        let text = render_enhanced(&result);
        assert!(text.contains("Player: nobody"));
        assert!(text.contains("Risk Level: MINIMAL"));
        assert!(text.contains("IMPORTANT DISCLAIMER"));
        assert!(!text.contains("SUSPICIOUS GAMES"));
    }
}
