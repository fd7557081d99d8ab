//! Self-contained HTML pages: inline CSS, no scripts or external assets.

use std::fmt::Write;

use fairplay_analysis::report::DetailedReport;
use fairplay_analysis::{EnhancedResult, RiskLevel};

use super::{pattern_title, severity_name, DISCLAIMER};

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; background: #f4f5f7; color: #2c3e50; margin: 0; }
.container { max-width: 1100px; margin: 0 auto; padding: 24px; }
header { background: #2c3e50; color: #fff; padding: 24px; border-radius: 8px; }
.subtitle { opacity: .8; margin-top: 4px; }
.risk-badge { font-size: .6em; padding: 4px 12px; border-radius: 12px; margin-left: 12px; vertical-align: middle; }
.risk-minimal { background: #27ae60; } .risk-low { background: #2ecc71; }
.risk-moderate { background: #f39c12; } .risk-high { background: #e67e22; } .risk-very-high { background: #e74c3c; }
.disclaimer { background: #fff3cd; border-left: 4px solid #f39c12; padding: 12px 16px; margin: 16px 0; }
.section { background: #fff; border-radius: 8px; padding: 16px 24px; margin: 16px 0; }
.summary-cards { display: flex; flex-wrap: wrap; gap: 16px; }
.card { flex: 1 1 200px; background: #f8f9fa; border-radius: 8px; padding: 12px 16px; }
.card .value { font-size: 2em; font-weight: bold; }
.card .label { font-size: .85em; color: #7f8c8d; }
.score-bar { height: 8px; background: #ecf0f1; border-radius: 4px; overflow: hidden; }
.score-fill { height: 100%; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid #ecf0f1; }
tr.suspicious { background: #fdecea; }
.pattern-list li.high { color: #c0392b; } .pattern-list li.medium { color: #d35400; }
footer { text-align: center; color: #95a5a6; font-size: .85em; margin: 24px 0; }
"#;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn risk_class(risk: RiskLevel) -> String {
    format!("risk-{}", risk.as_str().to_lowercase().replace(' ', "-"))
}

fn score_color(score: f64) -> &'static str {
    if score >= 70.0 {
        "#e74c3c"
    } else if score >= 40.0 {
        "#f39c12"
    } else {
        "#27ae60"
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<div class=\"container\">\n{body}\n<footer><p>Generated by Chess Fairplay Analyzer</p><p>This analysis is for informational purposes only.</p></footer>\n</div>\n</body>\n</html>\n",
        escape(title)
    )
}

fn card(out: &mut String, heading: &str, value: &str, label: &str) {
    let _ = write!(
        out,
        "<div class=\"card\"><h3>{}</h3><div class=\"value\">{}</div><div class=\"label\">{}</div></div>",
        escape(heading),
        escape(value),
        escape(label)
    );
}

pub fn render(report: &DetailedReport) -> String {
    let summary = &report.summary;
    let score = summary.suspicion_score;
    let mut body = String::new();

    let _ = write!(
        body,
        "<header><h1>Chess Fairplay Analysis</h1><p class=\"subtitle\">Statistical analysis for fair play detection</p><h2>{} <span class=\"risk-badge {}\">{} RISK</span></h2></header>",
        escape(&report.username),
        risk_class(summary.risk_level),
        escape(summary.risk_level.as_str())
    );
    let _ = write!(
        body,
        "<div class=\"disclaimer\"><strong>IMPORTANT DISCLAIMER:</strong> {}</div>",
        escape(DISCLAIMER)
    );

    body.push_str("<div class=\"section\"><h2>Summary</h2><div class=\"summary-cards\">");
    let _ = write!(
        body,
        "<div class=\"card\"><h3>Suspicion Score</h3><div class=\"value\">{score:.1}/100</div><div class=\"score-bar\"><div class=\"score-fill\" style=\"width: {:.0}%; background: {}\"></div></div><div class=\"label\">Higher score indicates more suspicious patterns</div></div>",
        score.clamp(0.0, 100.0),
        score_color(score)
    );
    card(
        &mut body,
        "Engine Correlation",
        &format!("{:.1}%", summary.avg_engine_correlation),
        "Average % of moves matching engine's top choice",
    );
    card(
        &mut body,
        "Avg Centipawn Loss",
        &format!("{:.1}", summary.avg_centipawn_loss),
        "Lower values indicate stronger play (human avg: 20-50)",
    );
    card(
        &mut body,
        "Games Analyzed",
        &summary.games_analyzed.to_string(),
        &format!(
            "{} suspicious games detected, {} of {} fetched failed",
            summary.suspicious_games, summary.games_failed, summary.total_games_fetched
        ),
    );
    body.push_str("</div></div>");

    body.push_str("<div class=\"section\"><h2>Performance by Time Control</h2><table><thead><tr><th>Time Control</th><th>Games</th><th>Avg Engine Correlation</th><th>Avg CPL</th><th>Consistency</th></tr></thead><tbody>");
    for (tc, stats) in &report.performance_by_time_control {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}</td><td>{:.1}</td></tr>",
            escape(tc),
            stats.game_count,
            stats.avg_engine_correlation,
            stats.avg_cpl,
            stats.consistency
        );
    }
    body.push_str("</tbody></table></div>");

    if !report.game_details.is_empty() {
        body.push_str("<div class=\"section\"><h2>Recent Games Analysis</h2><table><thead><tr><th>Game</th><th>Players</th><th>Result</th><th>Engine Correlation</th><th>Avg CPL</th><th>Time Control</th><th>Suspicious</th></tr></thead><tbody>");
        for game in &report.game_details {
            let players = match &game.link {
                Some(link) => format!("<a href=\"{}\">{}</a>", escape(link), escape(&game.players)),
                None => escape(&game.players),
            };
            let _ = write!(
                body,
                "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}</td><td>{}</td><td>{}</td></tr>",
                if game.is_suspicious { "suspicious" } else { "" },
                game.game_number,
                players,
                escape(&game.result),
                game.engine_correlation,
                game.avg_cpl,
                escape(&game.time_control),
                if game.is_suspicious { "Yes" } else { "No" }
            );
        }
        body.push_str("</tbody></table></div>");
    }

    if !report.suspicious_patterns.is_empty() {
        body.push_str("<div class=\"section\"><h2>Detected Patterns</h2><ul class=\"pattern-list\">");
        for pattern in &report.suspicious_patterns {
            let _ = write!(
                body,
                "<li class=\"{}\"><strong>{}:</strong> {}</li>",
                severity_name(pattern.severity),
                escape(&pattern_title(&pattern.pattern)),
                escape(&pattern.description)
            );
        }
        body.push_str("</ul></div>");
    }

    if !report.recommendations.is_empty() {
        body.push_str("<div class=\"section\"><h2>Recommendations</h2><ul>");
        for rec in &report.recommendations {
            let _ = write!(body, "<li>{}</li>", escape(rec));
        }
        body.push_str("</ul></div>");
    }

    if !report.failures.is_empty() {
        body.push_str("<div class=\"section\"><h2>Failed Games</h2><ul>");
        for failure in &report.failures {
            let _ = write!(
                body,
                "<li>Game {}: {}</li>",
                failure.index,
                escape(&failure.message)
            );
        }
        body.push_str("</ul></div>");
    }

    let t = &report.thresholds;
    let _ = write!(
        body,
        "<div class=\"section\"><h2>Analysis Details</h2><p><strong>Generated:</strong> {}</p><p><strong>Analysis Thresholds:</strong></p><ul><li>Engine Correlation Red Flag: {}%</li><li>Avg CPL Red Flag: {}</li><li>Accuracy Fluctuation Red Flag: {}%</li></ul></div>",
        report.generated_at.format("%Y-%m-%d %H:%M:%S"),
        t.engine_correlation_red_flag,
        t.avg_centipawn_loss_red_flag,
        t.accuracy_fluctuation_red_flag
    );

    page(&format!("Chess Fairplay Analysis: {}", report.username), &body)
}

pub fn render_enhanced(result: &EnhancedResult) -> String {
    let mut body = String::new();
    let risk = RiskLevel::from_score(result.suspicion_score);

    let _ = write!(
        body,
        "<header><h1>Enhanced Fairplay Analysis</h1><p class=\"subtitle\">Engine match, blunder rate, accuracy and timing per game</p><h2>{} <span class=\"risk-badge {}\">{} RISK</span></h2></header>",
        escape(&result.username),
        risk_class(risk),
        escape(risk.as_str())
    );
    let _ = write!(
        body,
        "<div class=\"disclaimer\"><strong>IMPORTANT DISCLAIMER:</strong> {}</div>",
        escape(DISCLAIMER)
    );

    body.push_str("<div class=\"section\"><h2>Summary</h2><div class=\"summary-cards\">");
    card(&mut body, "Suspicion Score", &format!("{:.1}/100", result.suspicion_score), "Average per-game score");
    card(
        &mut body,
        "Games",
        &result.games_analyzed.to_string(),
        &format!("{} suspicious, {} failed", result.suspicious_games, result.failures.len()),
    );
    card(&mut body, "Engine Match", &format!("{:.1}%", result.avg_engine_match_rate), "Average top-1 engine match rate");
    card(&mut body, "Accuracy", &format!("{:.1}%", result.avg_accuracy), "Average overall accuracy");
    body.push_str("</div></div>");

    body.push_str("<div class=\"section\"><h2>Games</h2><table><thead><tr><th>White</th><th>Black</th><th>Result</th><th>Colour</th><th>Platform</th><th>Engine Match</th><th>Blunder Rate</th><th>Accuracy</th><th>Score</th></tr></thead><tbody>");
    for game in &result.game_analyses {
        let _ = write!(
            body,
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}%</td><td>{:.1}%</td><td>{:.1}</td></tr>",
            if game.is_suspicious { "suspicious" } else { "" },
            escape(&game.white),
            escape(&game.black),
            escape(&game.result),
            escape(&game.player_color),
            game.platform,
            game.engine_pattern.top_1_match_rate,
            game.blunder_analysis.blunder_rate,
            game.accuracy.overall_accuracy,
            game.suspicion_score
        );
    }
    body.push_str("</tbody></table></div>");

    page(&format!("Enhanced Fairplay Analysis: {}", result.username), &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn risk_badge_class() {
        assert_eq!(risk_class(RiskLevel::VeryHigh), "risk-very-high");
        assert_eq!(risk_class(RiskLevel::Minimal), "risk-minimal");
    }
}
