use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use fairplay_cli::cli::Cli;
use fairplay_cli::commands;
use fairplay_cli::menu::Menu;
use fairplay_cli::report;
use fairplay_cli::{AppConfig, CliError};
use game_fetcher::Source;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const BANNER: &str = "
=========================================================
      CHESS FAIRPLAY ANALYZER
      Forensic analysis for chess fair play
=========================================================";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .init();

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e:#}");
                eprintln!("Error: {e:#}");
                ExitCode::from(1)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\n\nInterrupted, partial results discarded.");
            ExitCode::from(130)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    println!("{BANNER}");

    if cli.list_formats {
        println!("\n{}", commands::FORMATS);
        return Ok(());
    }

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(depth) = cli.depth {
        config.analysis.engine_depth = depth;
    }
    if let Some(workers) = cli.workers {
        config.analysis.workers = workers;
    }

    if cli.check_stockfish {
        println!("\nChecking Stockfish installation...");
        let status = commands::check_stockfish(&config).await;
        commands::print_stockfish_status(&status);
        let found = status?;
        info!(path = %found.path.display(), "Stockfish check passed");
        return Ok(());
    }

    if cli.menu {
        Menu::new(config, cli.config.clone()).run().await?;
        return Ok(());
    }

    let username = cli.username.clone().ok_or(CliError::MissingUsername)?;
    game_fetcher::validate_username(&username).map_err(CliError::from)?;
    let source: Source = cli.platform.into();

    println!("\nStarting analysis for player: {username}");
    println!("Games to analyze: {}", cli.games);
    println!("Platform: {source}");
    println!("Output format: {:?}", cli.format);
    println!("Analysis depth: {}", config.analysis.engine_depth);

    println!("\nFetching games...");
    let fetched = commands::fetch_games(&config, &username, source, cli.games).await?;
    commands::print_fetch_summary(&fetched, cli.games);

    let output_dir = config.report.output_dir.clone();
    let written = if cli.enhanced {
        println!("\nRunning enhanced analysis with {} workers...", config.analysis.effective_workers());
        let result = commands::run_enhanced(&config, &username, fetched.games).await?;
        commands::print_enhanced_summary(&result);
        report::write_enhanced_reports(&result, cli.format, &output_dir, cli.output.as_deref())?
    } else {
        println!(
            "\nAnalyzing {} games with Stockfish at depth {}...",
            fetched.games.len(),
            config.analysis.engine_depth
        );
        let detailed = commands::run_standard(&config, &username, &fetched.games).await?;
        commands::print_report_summary(&detailed);
        report::write_reports(&detailed, cli.format, &output_dir, cli.output.as_deref())?
    };

    for path in &written {
        let size_kb = std::fs::metadata(path).map(|m| m.len() as f64 / 1024.0).unwrap_or(0.0);
        println!("Report saved: {} ({size_kb:.1} KB)", path.display());
    }
    info!(%username, reports = written.len(), "Analysis complete");
    Ok(())
}
