//! Server-side analysis already stored by Lichess for a game.

use std::time::Duration;

use async_trait::async_trait;
use chess_core::ReplayedGame;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::AnalysisError;
use crate::evaluator::{EvalSource, Evaluator, PositionEvaluation};

#[derive(Debug, Deserialize)]
struct ExportedGame {
    #[serde(default)]
    analysis: Vec<AnalysisEntry>,
}

/// One entry per ply: the evaluation after the move, plus the engine's
/// preferred move when the played one was judged a mistake.
#[derive(Debug, Deserialize)]
struct AnalysisEntry {
    eval: Option<i32>,
    mate: Option<i32>,
    best: Option<String>,
}

pub struct LichessCloud {
    client: Client,
}

impl LichessCloud {
    pub fn new() -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .user_agent("FairPlayAnalyzer/1.0")
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Evaluator for LichessCloud {
    fn name(&self) -> &'static str {
        "lichess-cloud"
    }

    /// Games without a Lichess id, or without stored analysis, yield an empty list.
    async fn evaluate_game(
        &self,
        game: &ReplayedGame,
        max_plies: Option<usize>,
    ) -> Result<Vec<PositionEvaluation>, AnalysisError> {
        let Some(id) = game.game.lichess_id() else {
            return Ok(Vec::new());
        };

        let url = format!("https://lichess.org/game/export/{id}");
        let resp = self
            .client
            .get(&url)
            .query(&[("evals", "true"), ("moves", "false")])
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            debug!(game_id = %id, status = resp.status().as_u16(), "No cloud analysis");
            return Ok(Vec::new());
        }

        let exported: ExportedGame = resp.json().await?;
        let evaluations = entries_to_evaluations(&exported.analysis, game, max_plies);
        debug!(game_id = %id, count = evaluations.len(), "Cloud evaluations received");
        Ok(evaluations)
    }
}

fn entries_to_evaluations(
    entries: &[AnalysisEntry],
    game: &ReplayedGame,
    max_plies: Option<usize>,
) -> Vec<PositionEvaluation> {
    entries
        .iter()
        .zip(&game.plies)
        .take(max_plies.unwrap_or(usize::MAX))
        .filter(|(entry, _)| entry.eval.is_some() || entry.mate.is_some())
        .map(|(entry, ply)| PositionEvaluation {
            move_number: ply.number,
            played: ply.uci.clone(),
            best_move: entry.best.clone(),
            // Mate lines carry no centipawn value
            score_cp: if entry.mate.is_some() { None } else { entry.eval },
            minor_major_count: ply.minor_major_count,
            source: EvalSource::Cloud,
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::pgn::parse_pgn;
    use chess_core::replay_game;

    #[test]
    fn analysis_entries_map_onto_plies() {
        let json = r#"{"id":"abcdefgh","analysis":[{"eval":18},{"eval":25,"best":"c7c5"},{},{"mate":4}]}"#;
        let exported: ExportedGame = serde_json::from_str(json).unwrap();

        let game = parse_pgn("1. e4 e5 2. Nf3 Nc6 3. Bc4 *").unwrap();
        let replayed = replay_game(&game).unwrap();
        let evals = entries_to_evaluations(&exported.analysis, &replayed, None);

        assert_eq!(evals.len(), 3);
        assert_eq!(evals[0].score_cp, Some(18));
        assert_eq!(evals[1].best_move.as_deref(), Some("c7c5"));
        assert!(!evals[1].matched);
        assert_eq!(evals[2].move_number, 4);
        assert_eq!(evals[2].score_cp, None);
    }
}
