//! Action Mask 構建
//!
//! 給展示層用的可操作狀態：哪些按鈕可以按。
//! 電腦玩家的回合只開放 `agent_act`，人類操作全部關閉。

use serde::Serialize;

use super::state::GameSession;
use crate::game::{DiceSource, TurnPhase, DICE_COUNT};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActionMask {
    pub roll: bool,
    pub toggle: [bool; DICE_COUNT],
    pub continue_turn: bool,
    pub end_turn: bool,
    pub agent_act: bool,
}

impl ActionMask {
    pub fn any(&self) -> bool {
        self.roll || self.continue_turn || self.end_turn || self.agent_act || self.toggle.iter().any(|&t| t)
    }
}

/// 從對局狀態構建 action mask
pub fn action_mask_from_state<D: DiceSource>(state: &GameSession<D>) -> ActionMask {
    let mut mask = ActionMask::default();

    if state.is_finished() {
        return mask;
    }

    if state.active_is_agent() {
        mask.agent_act = true;
        return mask;
    }

    let turn = state.turn();
    match turn.phase() {
        TurnPhase::AwaitingRoll => mask.roll = true,
        TurnPhase::SelectionPending => {
            let pool_len = turn.round().pool.len();
            for (idx, slot) in mask.toggle.iter_mut().enumerate() {
                *slot = idx < pool_len;
            }
            // 選取非空且全部可計分時才能繼續 / 結束
            let can_commit = turn.can_commit();
            mask.continue_turn = can_commit;
            mask.end_turn = can_commit;
        }
        TurnPhase::Over(_) => {}
    }

    mask
}

// ============================================================================
// 單元測試
// ============================================================================
