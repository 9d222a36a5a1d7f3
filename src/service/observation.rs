//! Observation 構建
//!
//! 展示層只讀取快照並發出指令，不直接改動引擎內部。快照包含：
//! - 目標分數、雙方總分、當前玩家
//! - 回合階段、骰池、選取與預覽分數
//! - 回合分數、剩餘骰子
//! - 可操作按鈕 (action mask)

use serde::Serialize;

use super::action_mask::{action_mask_from_state, ActionMask};
use super::state::{GameSession, PlayerId};
use crate::game::{DiceSource, TurnPhase};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub target_score: i64,
    pub totals: [i64; 2],
    pub active: PlayerId,
    pub active_is_agent: bool,
    pub round: u32,
    pub turns_played: u32,
    pub phase: TurnPhase,
    pub pool: Vec<u8>,
    pub kept_mask: u8,
    pub selected: Vec<u8>,
    pub selection_valid: bool,
    pub preview_score: i64,
    pub round_score: i64,
    pub remaining_dice: usize,
    pub winner: Option<PlayerId>,
    pub aborted: bool,
    pub actions: ActionMask,
}

impl Snapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// 從對局狀態構建快照
pub fn observation_from_state<D: DiceSource>(state: &GameSession<D>) -> Snapshot {
    let turn = state.turn();
    let round = turn.round();
    let preview = turn.preview();

    Snapshot {
        target_score: state.config().target_score,
        totals: state.totals(),
        active: state.active(),
        active_is_agent: state.active_is_agent(),
        round: state.round_number(),
        turns_played: state.turns_played(),
        phase: turn.phase(),
        pool: round.pool.clone(),
        kept_mask: round.kept_mask,
        selected: preview.selected,
        selection_valid: preview.selection_valid,
        preview_score: preview.preview_score,
        round_score: round.round_score,
        remaining_dice: round.remaining_dice,
        winner: state.winner(),
        aborted: state.aborted().is_some(),
        actions: action_mask_from_state(state),
    }
}

// ============================================================================
// 單元測試
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ScriptedDice;
    use crate::service::config::GameConfig;

    #[test]
    fn test_snapshot_tracks_selection() {
        let dice = ScriptedDice::new([1, 5, 2, 3, 4, 6]);
        let mut state = GameSession::with_dice(GameConfig::default(), dice);
        state.roll().unwrap();
        state.toggle_keep(0).unwrap();

        let snap = observation_from_state(&state);
        assert_eq!(snap.pool, vec![1, 5, 2, 3, 4, 6]);
        assert_eq!(snap.selected, vec![1]);
        assert!(snap.selection_valid);
        assert_eq!(snap.preview_score, 100);
        assert_eq!(snap.phase, TurnPhase::SelectionPending);
        assert!(snap.actions.end_turn);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let state = GameSession::with_dice(GameConfig::new(2000), ScriptedDice::new(Vec::<u8>::new()));
        let json = observation_from_state(&state).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["target_score"], 2000);
        assert_eq!(value["active"], "one");
        assert_eq!(value["phase"], "awaiting_roll");
        assert_eq!(value["actions"]["roll"], true);
    }
}
