//! 電腦玩家決策
//!
//! 擲骰後先算出最高分組合，再依局勢加權抽選激進 / 保守策略。
//! 決策是一次算完的純函數（除了注入的隨機來源），展示節奏與此無關。

use serde::Serialize;
use tracing::debug;

use super::combos::{best_combo, enumerate_combos, single_die_combos, Combo};
use super::constants::{
    DICE_COUNT, FEW_DICE_LEFT, LOW_OPENING_SCORE, WEIGHTS_BALANCED, WEIGHTS_CAN_WIN,
    WEIGHTS_FAR_FROM_TARGET, WEIGHTS_FEW_DICE,
};
use super::dice::{select_faces, DiceSource};
use super::turn::CommitMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 保留後繼續擲
    Aggressive,
    /// 保留後結束回合
    Conservative,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StrategyWeights {
    pub aggressive: u32,
    pub conservative: u32,
}

impl From<(u32, u32)> for StrategyWeights {
    fn from((aggressive, conservative): (u32, u32)) -> Self {
        Self {
            aggressive,
            conservative,
        }
    }
}

/// 決策輸入
#[derive(Clone, Copy, Debug)]
pub struct PolicyInput<'a> {
    pub pool: &'a [u8],
    /// 本回合已累積分數（不含這次擲骰）
    pub round_score: i64,
    /// 目標分數 - 自己總分
    pub deficit: i64,
}

impl PolicyInput<'_> {
    /// 回合首擲：6 顆骰子且尚未得分
    pub fn is_opening(&self) -> bool {
        self.pool.len() == DICE_COUNT && self.round_score == 0
    }
}

/// 電腦玩家的完整決策
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub keep_mask: u8,
    pub kept: Vec<u8>,
    pub score: i64,
    pub mode: CommitMode,
    pub strategy: Strategy,
    pub weights: StrategyWeights,
    /// 首擲低分時只取一顆
    pub single_die: bool,
}

impl Decision {
    pub fn keep_positions(&self) -> Vec<usize> {
        super::dice::mask_positions(self.keep_mask)
    }
}

/// 決策介面；回傳 None 代表沒有合法組合（爆掉）
pub trait Policy: Send + Sync {
    fn decide(&self, input: &PolicyInput<'_>, dice: &mut dyn DiceSource) -> Option<Decision>;
}

// ============================================================================
// 啟發式策略
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeuristicPolicy {
    pub far_from_target: StrategyWeights,
    pub can_win: StrategyWeights,
    pub few_dice: StrategyWeights,
    pub balanced: StrategyWeights,
    pub few_dice_left: usize,
    pub low_opening_score: i64,
}

impl Default for HeuristicPolicy {
    fn default() -> Self {
        Self {
            far_from_target: WEIGHTS_FAR_FROM_TARGET.into(),
            can_win: WEIGHTS_CAN_WIN.into(),
            few_dice: WEIGHTS_FEW_DICE.into(),
            balanced: WEIGHTS_BALANCED.into(),
            few_dice_left: FEW_DICE_LEFT,
            low_opening_score: LOW_OPENING_SCORE,
        }
    }
}

impl HeuristicPolicy {
    /// 依序檢查條件，第一個成立的決定權重
    pub fn weights_for(&self, deficit: i64, best_score: i64, remaining_after: usize) -> StrategyWeights {
        if deficit > 2 * best_score {
            self.far_from_target
        } else if deficit <= best_score {
            self.can_win
        } else if remaining_after < self.few_dice_left {
            self.few_dice
        } else {
            self.balanced
        }
    }
}

/// 保留後剩下的骰子數（全部保留時重置為 6）
fn remaining_after(pool_len: usize, combo: &Combo) -> usize {
    match pool_len - combo.len() {
        0 => DICE_COUNT,
        n => n,
    }
}

impl Policy for HeuristicPolicy {
    fn decide(&self, input: &PolicyInput<'_>, dice: &mut dyn DiceSource) -> Option<Decision> {
        let combos = enumerate_combos(input.pool);
        let best = best_combo(&combos)?;

        let weights = self.weights_for(input.deficit, best.score, remaining_after(input.pool.len(), &best));
        let strategy = match dice.choose_weighted(&[weights.aggressive, weights.conservative]) {
            0 => Strategy::Aggressive,
            _ => Strategy::Conservative,
        };

        let mut chosen = best;
        let mut single_die = false;
        if strategy == Strategy::Conservative
            && input.is_opening()
            && best.score < self.low_opening_score
        {
            let singles = single_die_combos(&combos);
            if !singles.is_empty() {
                chosen = singles[dice.choose_index(singles.len())];
                single_die = true;
            }
        }

        // 全部保留必須重擲
        let all_kept = chosen.len() == input.pool.len();
        let mode = if strategy == Strategy::Aggressive || all_kept {
            CommitMode::Continue
        } else {
            CommitMode::End
        };

        debug!(
            pool = ?input.pool,
            deficit = input.deficit,
            best = best.score,
            aggressive = weights.aggressive,
            conservative = weights.conservative,
            ?strategy,
            single_die,
            "agent decision"
        );

        Some(Decision {
            keep_mask: chosen.mask,
            kept: select_faces(input.pool, chosen.mask),
            score: chosen.score,
            mode,
            strategy,
            weights,
            single_die,
        })
    }
}

// ============================================================================
// 單元測試
// ============================================================================
