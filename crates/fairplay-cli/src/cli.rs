use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use game_fetcher::Source;

#[derive(Parser, Debug)]
#[command(
    name = "fairplay",
    version,
    about = "Forensic analysis of chess games for fair-play violations",
    after_help = "Examples:\n  fairplay magnuscarlsen --games 100 --format html\n  fairplay hikaru --depth 20 --output report\n  fairplay --check-stockfish"
)]
pub struct Cli {
    /// Player to analyze (optional with --check-stockfish, --list-formats or --menu)
    pub username: Option<String>,

    /// Maximum number of games to analyze
    #[arg(short, long, default_value_t = 50)]
    pub games: usize,

    #[arg(short, long, value_enum, default_value_t = ReportFormat::Html)]
    pub format: ReportFormat,

    /// Output file name, without extension
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Stockfish search depth (overrides config)
    #[arg(short, long)]
    pub depth: Option<u32>,

    #[arg(short, long, value_enum, default_value_t = PlatformArg::ChessCom)]
    pub platform: PlatformArg,

    /// Use the parallel, cached analyzer
    #[arg(short, long)]
    pub enhanced: bool,

    /// Parallel games for --enhanced (overrides config)
    #[arg(short, long)]
    pub workers: Option<usize>,

    #[arg(short, long)]
    pub verbose: bool,

    /// List available output formats and exit
    #[arg(long)]
    pub list_formats: bool,

    /// Check the Stockfish installation and exit
    #[arg(long)]
    pub check_stockfish: bool,

    /// Start the interactive menu
    #[arg(long)]
    pub menu: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Html,
    Text,
    Json,
    All,
}

impl ReportFormat {
    /// Concrete formats to render; `All` expands to the three.
    pub fn expand(self) -> Vec<ReportFormat> {
        match self {
            ReportFormat::All => vec![ReportFormat::Html, ReportFormat::Text, ReportFormat::Json],
            other => vec![other],
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::All => "",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    ChessCom,
    Lichess,
    Both,
}

impl From<PlatformArg> for Source {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::ChessCom => Source::ChessCom,
            PlatformArg::Lichess => Source::Lichess,
            PlatformArg::Both => Source::Both,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "fairplay", "hikaru", "--games", "20", "--format", "all", "--platform", "both", "--enhanced", "-w", "3",
        ])
        .unwrap();
        assert_eq!(cli.username.as_deref(), Some("hikaru"));
        assert_eq!(cli.games, 20);
        assert_eq!(cli.format, ReportFormat::All);
        assert_eq!(Source::from(cli.platform), Source::Both);
        assert!(cli.enhanced);
        assert_eq!(cli.workers, Some(3));
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["fairplay", "--check-stockfish"]).unwrap();
        assert!(cli.username.is_none());
        assert_eq!(cli.games, 50);
        assert_eq!(cli.format, ReportFormat::Html);
        assert_eq!(cli.platform, PlatformArg::ChessCom);
        assert_eq!(cli.config, PathBuf::from("config.json"));
    }

    #[test]
    fn all_expands_and_text_uses_txt() {
        assert_eq!(ReportFormat::All.expand().len(), 3);
        assert_eq!(ReportFormat::Text.extension(), "txt");
        assert_eq!(ReportFormat::parse("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::parse("pdf"), None);
    }
}
