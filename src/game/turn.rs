//! 回合狀態機
//!
//! ```text
//! AwaitingRoll -> (擲骰) -> SelectionPending -> (continue/end) -> AwaitingRoll | Over
//!              \-> 無得分 -> Over(Busted)
//! ```
//!
//! 回合分數只在回合內累積，結束時才由 session 記入玩家總分。

use serde::{Deserialize, Serialize};

use super::combos::is_qualifying;
use super::constants::DICE_COUNT;
use super::dice::{full_mask, is_valid_face, select_faces, unkept_faces, DiceSource};
use super::error::{EngineError, EngineResult};
use super::scoring::{all_dice_scoring, has_scoring_opportunity, score_dice};

/// 繼續擲骰或結束回合
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    Continue,
    End,
}

/// 回合結束原因
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnEnd {
    Banked { score: i64 },
    Busted,
    Abandoned,
}

impl TurnEnd {
    /// 記入總分的分數
    pub fn credited(&self) -> i64 {
        match self {
            TurnEnd::Banked { score } => *score,
            TurnEnd::Busted | TurnEnd::Abandoned => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    AwaitingRoll,
    SelectionPending,
    Over(TurnEnd),
}

impl TurnPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TurnPhase::AwaitingRoll => "AwaitingRoll",
            TurnPhase::SelectionPending => "SelectionPending",
            TurnPhase::Over(_) => "TurnOver",
        }
    }
}

/// 回合內狀態
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoundState {
    pub pool: Vec<u8>,
    pub kept_mask: u8,
    pub round_score: i64,
    pub remaining_dice: usize,
    /// 本回合已擲骰次數
    pub rolls: u32,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            pool: Vec::new(),
            kept_mask: 0,
            round_score: 0,
            remaining_dice: DICE_COUNT,
            rolls: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RollOutcome {
    pub pool: Vec<u8>,
    pub bust: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectionPreview {
    pub selected: Vec<u8>,
    pub selection_valid: bool,
    pub preview_score: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    pub kept: Vec<u8>,
    pub gained: i64,
    pub round_score: i64,
    pub hot_dice: bool,
    pub remaining_dice: usize,
    pub turn_end: Option<TurnEnd>,
}

/// 計算選取預覽；不合法的選取預覽分數為 0
pub fn preview_selection(pool: &[u8], mask: u8) -> SelectionPreview {
    let selected = select_faces(pool, mask);
    let scoring = all_dice_scoring(&selected, pool);
    SelectionPreview {
        selection_valid: !selected.is_empty() && scoring,
        preview_score: if scoring { score_dice(&selected) } else { 0 },
        selected,
    }
}

// ============================================================================
// 狀態機
// ============================================================================

#[derive(Clone, Debug)]
pub struct TurnStateMachine {
    round: RoundState,
    phase: TurnPhase,
}

impl Default for TurnStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnStateMachine {
    pub fn new() -> Self {
        Self {
            round: RoundState::default(),
            phase: TurnPhase::AwaitingRoll,
        }
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, TurnPhase::Over(_))
    }

    fn require(&self, expected: TurnPhase, op: &'static str) -> EngineResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                op,
                phase: self.phase.name(),
            })
        }
    }

    /// 擲出剩餘的骰子
    pub fn roll<D: DiceSource + ?Sized>(&mut self, dice: &mut D) -> EngineResult<RollOutcome> {
        self.require(TurnPhase::AwaitingRoll, "roll")?;
        let faces = dice.roll_pool(self.round.remaining_dice);
        // 自己的隨機來源給出壞骰面是內部錯誤
        self.apply_roll(faces).map_err(|err| match err {
            EngineError::InvalidRoll { .. } => EngineError::InvariantViolation(err.to_string()),
            other => other,
        })
    }

    /// 套用外部提供的擲骰結果（主機轉發或重播）
    ///
    /// 長度不符或點數超出範圍時回傳 `InvalidRoll`，狀態不變。
    pub fn apply_roll(&mut self, faces: Vec<u8>) -> EngineResult<RollOutcome> {
        self.require(TurnPhase::AwaitingRoll, "roll")?;
        if faces.len() != self.round.remaining_dice || !faces.iter().all(|&f| is_valid_face(f)) {
            return Err(EngineError::InvalidRoll {
                faces,
                expected: self.round.remaining_dice,
            });
        }

        self.round.rolls += 1;
        self.round.kept_mask = 0;
        self.round.pool = faces;

        let bust = !has_scoring_opportunity(&self.round.pool);
        if bust {
            // 爆掉：本回合累積分數歸零，回合立即結束
            self.round.round_score = 0;
            self.round.remaining_dice = DICE_COUNT;
            self.phase = TurnPhase::Over(TurnEnd::Busted);
        } else {
            self.phase = TurnPhase::SelectionPending;
        }

        Ok(RollOutcome {
            pool: self.round.pool.clone(),
            bust,
        })
    }

    /// 切換某顆骰子的保留狀態
    pub fn toggle_keep(&mut self, position: usize) -> EngineResult<SelectionPreview> {
        self.require(TurnPhase::SelectionPending, "toggle_keep")?;
        if position >= self.round.pool.len() {
            return Err(EngineError::InvalidPosition {
                position,
                len: self.round.pool.len(),
            });
        }
        self.round.kept_mask ^= 1 << position;
        Ok(self.preview())
    }

    /// 一次設定整個選取
    pub fn set_selection(&mut self, mask: u8) -> EngineResult<SelectionPreview> {
        self.require(TurnPhase::SelectionPending, "set_selection")?;
        let extra = mask & !full_mask(self.round.pool.len());
        if extra != 0 {
            return Err(EngineError::InvalidPosition {
                position: extra.trailing_zeros() as usize,
                len: self.round.pool.len(),
            });
        }
        self.round.kept_mask = mask;
        Ok(self.preview())
    }

    pub fn preview(&self) -> SelectionPreview {
        preview_selection(&self.round.pool, self.round.kept_mask)
    }

    /// 目前選取是否可以 continue / end
    pub fn can_commit(&self) -> bool {
        self.phase == TurnPhase::SelectionPending
            && is_qualifying(&self.round.pool, self.round.kept_mask)
    }

    /// 結算選取並 continue 或 end
    pub fn commit(&mut self, mode: CommitMode) -> EngineResult<CommitOutcome> {
        self.require(TurnPhase::SelectionPending, "commit")?;
        let kept = select_faces(&self.round.pool, self.round.kept_mask);
        if !self.can_commit() {
            return Err(EngineError::IllegalSelection { faces: kept });
        }

        let gained = score_dice(&kept);
        self.round.round_score += gained;
        self.round.pool = unkept_faces(&self.round.pool, self.round.kept_mask);
        self.round.kept_mask = 0;
        self.round.remaining_dice = self.round.pool.len();

        let mut hot_dice = false;
        let mut turn_end = None;
        if self.round.remaining_dice == 0 {
            // 全部骰子都保留：不論選擇為何，都要重新擲 6 顆
            hot_dice = true;
            self.round.remaining_dice = DICE_COUNT;
            self.phase = TurnPhase::AwaitingRoll;
        } else {
            match mode {
                CommitMode::Continue => self.phase = TurnPhase::AwaitingRoll,
                CommitMode::End => {
                    let end = TurnEnd::Banked {
                        score: self.round.round_score,
                    };
                    self.round.remaining_dice = DICE_COUNT;
                    self.phase = TurnPhase::Over(end);
                    turn_end = Some(end);
                }
            }
        }

        self.check_invariants()?;

        Ok(CommitOutcome {
            kept,
            gained,
            round_score: self.round.round_score,
            hot_dice,
            remaining_dice: self.round.remaining_dice,
            turn_end,
        })
    }

    /// 外部放棄本回合（例如玩家離開），不計分
    pub fn abandon(&mut self) -> TurnEnd {
        if let TurnPhase::Over(end) = self.phase {
            return end;
        }
        self.round.round_score = 0;
        self.round.kept_mask = 0;
        self.round.remaining_dice = DICE_COUNT;
        self.phase = TurnPhase::Over(TurnEnd::Abandoned);
        TurnEnd::Abandoned
    }

    pub fn check_invariants(&self) -> EngineResult<()> {
        let round = &self.round;
        if round.remaining_dice == 0 || round.remaining_dice > DICE_COUNT {
            return Err(EngineError::InvariantViolation(format!(
                "remaining dice {} out of range",
                round.remaining_dice
            )));
        }
        if round.kept_mask & !full_mask(round.pool.len()) != 0 {
            return Err(EngineError::InvariantViolation(format!(
                "kept mask {:#08b} exceeds pool of {}",
                round.kept_mask,
                round.pool.len()
            )));
        }
        if self.phase == TurnPhase::SelectionPending && round.pool.len() != round.remaining_dice {
            return Err(EngineError::InvariantViolation(format!(
                "pool has {} dice but remaining count is {}",
                round.pool.len(),
                round.remaining_dice
            )));
        }
        if round.round_score < 0 {
            return Err(EngineError::InvariantViolation(format!(
                "negative round score {}",
                round.round_score
            )));
        }
        Ok(())
    }
}

// ============================================================================
// 單元測試
// ============================================================================
