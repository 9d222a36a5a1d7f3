//! 遊戲核心模組
//!
//! 包含骰子遊戲的純規則定義：
//! - `constants`: 遊戲常量
//! - `dice`: 骰面、骰池、可注入的隨機來源
//! - `scoring`: 計分引擎
//! - `combos`: 合法保留組合枚舉
//! - `turn`: 回合狀態機
//! - `policy`: 電腦玩家決策
//! - `stakes`: 底注（目標分數）
//! - `error`: 引擎錯誤
//!
//! 注意：玩家總分與輪替由 service 層的 session 管理

pub mod constants;
pub mod dice;
pub mod scoring;
pub mod combos;
pub mod turn;
pub mod policy;
pub mod stakes;
pub mod error;

// Re-export 常用類型
pub use constants::*;
pub use dice::{face_counts, select_faces, unkept_faces, mask_positions, DiceSource, FaceCounts, ScriptedDice};
pub use scoring::{
    all_dice_scoring, has_scoring_opportunity, is_die_scoring, score_dice,
};
pub use combos::{best_combo, enumerate_combos, is_qualifying, single_die_combos, Combo};
pub use turn::{
    preview_selection, CommitMode, CommitOutcome, RollOutcome, RoundState, SelectionPreview,
    TurnEnd, TurnPhase, TurnStateMachine,
};
pub use policy::{Decision, HeuristicPolicy, Policy, PolicyInput, Strategy, StrategyWeights};
pub use stakes::Stake;
pub use error::{EngineError, EngineResult};
