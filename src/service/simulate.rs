//! 電腦對電腦批次模擬
//!
//! 每局用 `seed + i` 建立獨立的 `StdRng`，結果與執行緒數無關。

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::config::GameConfig;
use super::state::{GameSession, PlayerId};
use crate::game::EngineResult;

/// 單局安全上限，避免策略異常時無限進行
pub const MAX_TURNS_PER_GAME: u32 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GameResult {
    pub winner: Option<PlayerId>,
    pub rounds: u32,
    pub turns: u32,
    pub totals: [i64; 2],
    pub busts: [u32; 2],
    pub hot_dice: [u32; 2],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MatchStats {
    pub games: usize,
    pub wins: [usize; 2],
    /// 未分勝負（達到回合上限或中止）
    pub unfinished: usize,
    pub mean_rounds: f64,
    pub busts: [u64; 2],
    pub hot_dice: [u64; 2],
}

impl MatchStats {
    pub fn win_rate(&self, player: PlayerId) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.wins[player.index()] as f64 / self.games as f64
    }

    fn from_results(results: &[GameResult]) -> Self {
        let mut stats = MatchStats {
            games: results.len(),
            ..Self::default()
        };
        let mut rounds = 0u64;
        for result in results {
            match result.winner {
                Some(player) => stats.wins[player.index()] += 1,
                None => stats.unfinished += 1,
            }
            rounds += u64::from(result.rounds);
            for seat in 0..2 {
                stats.busts[seat] += u64::from(result.busts[seat]);
                stats.hot_dice[seat] += u64::from(result.hot_dice[seat]);
            }
        }
        if !results.is_empty() {
            stats.mean_rounds = rounds as f64 / results.len() as f64;
        }
        stats
    }
}

/// 跑完一局電腦對電腦
pub fn play_game(config: GameConfig) -> EngineResult<GameResult> {
    let config = config.self_play();
    let mut session = GameSession::with_dice(config.clone(), StdRng::seed_from_u64(config.seed));
    while !session.is_finished() && session.turns_played() < MAX_TURNS_PER_GAME {
        session.play_agent_turn()?;
    }

    let stats = session.stats();
    Ok(GameResult {
        winner: session.winner(),
        rounds: session.round_number(),
        turns: session.turns_played(),
        totals: session.totals(),
        busts: stats.busts,
        hot_dice: stats.hot_dice,
    })
}

/// 平行跑多局並彙總
pub fn simulate(config: &GameConfig, games: usize) -> MatchStats {
    let results: Vec<GameResult> = (0..games)
        .into_par_iter()
        .filter_map(|i| {
            let game_config = config.clone().seeded(config.seed.wrapping_add(i as u64));
            match play_game(game_config) {
                Ok(result) => Some(result),
                Err(err) => {
                    warn!(game = i, %err, "simulated game aborted");
                    None
                }
            }
        })
        .collect();

    let mut stats = MatchStats::from_results(&results);
    // 中止的局也算在總數內
    stats.unfinished += games - results.len();
    stats.games = games;
    info!(
        games,
        wins_one = stats.wins[0],
        wins_two = stats.wins[1],
        mean_rounds = stats.mean_rounds,
        "simulation finished"
    );
    stats
}

// ============================================================================
// 單元測試
// ============================================================================
