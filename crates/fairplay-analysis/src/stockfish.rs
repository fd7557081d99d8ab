//! Stockfish engine wrapper using UCI protocol (async I/O)

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use crate::error::AnalysisError;

/// Result of a single position evaluation
#[derive(Debug, Clone, Default)]
pub struct EvalResult {
    /// Centipawn score (from engine's perspective, i.e., side to move)
    pub cp: Option<i32>,
    /// Mate in N moves (positive = engine wins, negative = engine loses)
    pub mate: Option<i32>,
    /// Best move in UCI notation
    pub best_move: Option<String>,
    /// Deepest completed iteration
    pub depth: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub threads: u32,
    pub hash_mb: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 2,
            hash_mb: 256,
        }
    }
}

/// How long Stockfish searches each position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    Depth(u32),
    /// Whichever limit is hit first
    DepthOrTime { depth: u32, movetime_ms: u64 },
}

impl SearchLimit {
    fn go_command(&self) -> String {
        match self {
            SearchLimit::Depth(depth) => format!("go depth {depth}"),
            SearchLimit::DepthOrTime { depth, movetime_ms } => {
                format!("go depth {depth} movetime {movetime_ms}")
            }
        }
    }
}

/// Position search over UCI, restartable after the process dies.
#[async_trait]
pub trait UciEngine: Send {
    async fn evaluate(&mut self, fen: &str, limit: SearchLimit) -> Result<EvalResult, AnalysisError>;
    async fn restart(&mut self) -> Result<(), AnalysisError>;
    async fn quit(&mut self);
}

/// Stockfish engine instance
pub struct StockfishEngine {
    path: PathBuf,
    options: EngineOptions,
    name: Option<String>,
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &Path, options: EngineOptions) -> Result<Self, AnalysisError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AnalysisError::Engine(format!("Failed to spawn Stockfish: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| AnalysisError::Engine("Stockfish stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::Engine("Stockfish stdout unavailable".into()))?;

        let mut engine = Self {
            path: path.to_path_buf(),
            options,
            name: None,
            process,
            stdin,
            stdout: BufReader::new(stdout),
        };

        // Initialize UCI
        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        // Configure for analysis
        engine
            .send(&format!("setoption name Threads value {}", options.threads))
            .await?;
        engine
            .send(&format!("setoption name Hash value {}", options.hash_mb))
            .await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        info!(path = %path.display(), name = engine.name.as_deref().unwrap_or("?"), "Stockfish ready");
        Ok(engine)
    }

    /// Engine name reported in the UCI handshake (`id name ...`)
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Kill the current process and spawn a fresh one with the same settings.
    pub async fn restart(&mut self) -> Result<(), AnalysisError> {
        let _ = self.process.start_kill();
        let fresh = Self::new(&self.path, self.options).await?;
        *self = fresh;
        Ok(())
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), AnalysisError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| AnalysisError::Engine(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| AnalysisError::Engine(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Read one line; EOF means the process died.
    async fn read_line(&mut self, line: &mut String) -> Result<(), AnalysisError> {
        line.clear();
        let read = self
            .stdout
            .read_line(line)
            .await
            .map_err(|e| AnalysisError::Engine(format!("Failed to read from Stockfish: {e}")))?;
        if read == 0 {
            return Err(AnalysisError::Engine("Stockfish terminated unexpectedly".into()));
        }
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), AnalysisError> {
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();
            debug!(line = trimmed, "SF >");
            if let Some(name) = trimmed.strip_prefix("id name ") {
                self.name = Some(name.to_string());
            }
            if trimmed == expected {
                return Ok(());
            }
        }
    }

    /// Evaluate a position and get the best move with score
    pub async fn evaluate(&mut self, fen: &str, limit: SearchLimit) -> Result<EvalResult, AnalysisError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&limit.go_command()).await?;

        let mut result = EvalResult::default();

        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") && trimmed.contains(" pv ") {
                // Parse score from info line
                if let Some(cp) = parse_cp(trimmed) {
                    result.cp = Some(cp);
                    result.mate = None;
                }
                if let Some(mate) = parse_mate(trimmed) {
                    result.mate = Some(mate);
                    result.cp = None;
                }
                if let Some(depth) = parse_depth(trimmed) {
                    result.depth = depth;
                }
            } else if trimmed.starts_with("bestmove") {
                // Parse best move
                result.best_move = trimmed
                    .split_whitespace()
                    .nth(1)
                    .filter(|m| *m != "(none)")
                    .map(str::to_string);
                break;
            }
        }

        Ok(result)
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

#[async_trait]
impl UciEngine for StockfishEngine {
    async fn evaluate(&mut self, fen: &str, limit: SearchLimit) -> Result<EvalResult, AnalysisError> {
        StockfishEngine::evaluate(self, fen, limit).await
    }

    async fn restart(&mut self) -> Result<(), AnalysisError> {
        StockfishEngine::restart(self).await
    }

    async fn quit(&mut self) {
        StockfishEngine::quit(self).await
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

/// Value following `key` in a whitespace-separated info line
fn parse_field<T: std::str::FromStr>(line: &str, key: &str) -> Option<T> {
    let mut parts = line.split_whitespace();
    while let Some(part) = parts.next() {
        if part == key {
            return parts.next()?.parse().ok();
        }
    }
    None
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_field(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_field(line, "mate")
}

/// Parse search depth from info line
fn parse_depth(line: &str) -> Option<u32> {
    parse_field(line, "depth")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cp() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4";
        assert_eq!(parse_cp(line), Some(35));
        assert_eq!(parse_depth(line), Some(20));
    }

    #[test]
    fn test_parse_mate() {
        let line = "info depth 20 score mate -3 nodes 100000 pv e2e4";
        assert_eq!(parse_mate(line), Some(-3));
        assert_eq!(parse_cp(line), None);
    }

    #[test]
    fn test_go_command() {
        assert_eq!(SearchLimit::Depth(18).go_command(), "go depth 18");
        assert_eq!(
            SearchLimit::DepthOrTime { depth: 16, movetime_ms: 500 }.go_command(),
            "go depth 16 movetime 500"
        );
    }
}
