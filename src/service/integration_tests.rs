//! Service-layer integration tests (full turns and games)

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::game::{CommitMode, DiceSource, EngineError, ScriptedDice, TurnEnd, TurnPhase};
    use crate::service::{action_mask_from_state, observation_from_state};
    use crate::service::config::GameConfig;
    use crate::service::state::{GameSession, PlayerId, TurnEvent};

    fn scripted(faces: &[u8], config: GameConfig) -> GameSession<ScriptedDice> {
        GameSession::with_dice(config, ScriptedDice::new(faces.iter().copied()))
    }

    /// 擲骰 -> 選取 -> commit
    fn keep(state: &mut GameSession<ScriptedDice>, mask: u8, mode: CommitMode) {
        state.roll().unwrap();
        state.set_selection(mask).unwrap();
        state.commit(mode).unwrap();
    }

    #[test]
    fn test_two_turns_advance_round() {
        let mut state = scripted(&[1, 2, 3, 4, 6, 6, 5, 2, 3, 4, 6, 6], GameConfig::default());
        assert_eq!(state.round_number(), 1);

        keep(&mut state, 0b1, CommitMode::End);
        assert_eq!(state.active(), PlayerId::Two);
        assert_eq!(state.round_number(), 1);
        assert_eq!(state.totals(), [100, 0]);

        keep(&mut state, 0b1, CommitMode::End);
        assert_eq!(state.active(), PlayerId::One);
        assert_eq!(state.round_number(), 2);
        assert_eq!(state.totals(), [100, 50]);
    }

    #[test]
    fn test_bust_discards_round_score() {
        // 先拿 100，再擲出 2 3 4 6 6 爆掉
        let mut state = scripted(&[1, 2, 3, 4, 6, 6, 2, 3, 4, 6, 6], GameConfig::default());
        keep(&mut state, 0b1, CommitMode::Continue);
        assert_eq!(state.turn().round().round_score, 100);

        let roll = state.roll().unwrap();
        assert!(roll.bust);
        assert_eq!(state.totals(), [0, 0]);
        assert_eq!(state.active(), PlayerId::Two);
        assert_eq!(state.turn().phase(), TurnPhase::AwaitingRoll);
        assert_eq!(state.stats().busts, [1, 0]);
    }

    #[test]
    fn test_hot_dice_forces_reroll_even_on_end() {
        let mut state = scripted(&[1, 1, 1, 1, 5, 5, 2, 2, 2, 3, 4, 6], GameConfig::new(5000));
        state.roll().unwrap();
        state.set_selection(0b111111).unwrap();
        let report = state.commit(CommitMode::End).unwrap();

        assert!(report.outcome.hot_dice);
        assert!(!report.turn_over);
        assert_eq!(report.round_score, 2100);
        assert_eq!(state.active(), PlayerId::One);
        assert_eq!(state.turn().round().remaining_dice, 6);
        assert_eq!(state.totals(), [0, 0]);

        let roll = state.roll().unwrap();
        assert_eq!(roll.pool.len(), 6);
        assert!(!roll.bust);
    }

    #[test]
    fn test_straight_cannot_be_kept_whole() {
        let mut state = scripted(&[1, 2, 3, 4, 5, 6], GameConfig::default());
        let roll = state.roll().unwrap();
        assert!(!roll.bust);
        state.set_selection(0b111111).unwrap();
        assert!(!action_mask_from_state(&state).end_turn);
        state.set_selection(0b10001).unwrap();
        let report = state.commit(CommitMode::End).unwrap();
        assert_eq!(report.outcome.gained, 150);
    }

    #[test]
    fn test_win_stops_before_opponent_moves() {
        let config = GameConfig::new(1000);
        let mut state = scripted(&[1, 1, 1, 1, 2, 3], config);
        keep(&mut state, 0b1111, CommitMode::End);

        assert_eq!(state.winner(), Some(PlayerId::One));
        assert_eq!(state.totals(), [2000, 0]);
        // 回合照常交出，但對手不會再行動
        assert_eq!(state.active(), PlayerId::Two);
        assert!(!action_mask_from_state(&state).any());
        assert!(matches!(state.roll(), Err(EngineError::GameOver)));
        assert!(matches!(state.agent_act(), Err(EngineError::GameOver)));
        assert!(matches!(state.events().last(), Some(TurnEvent::Won { player: PlayerId::One, .. })));
    }

    #[test]
    fn test_restore_checks_player_one_first() {
        let dice = ScriptedDice::new(Vec::<u8>::new());
        let state = GameSession::restore(GameConfig::new(1000), dice, [1200, 1500], PlayerId::Two, 4).unwrap();
        assert_eq!(state.winner(), Some(PlayerId::One));

        let dice = ScriptedDice::new(Vec::<u8>::new());
        assert!(GameSession::restore(GameConfig::new(1000), dice, [-1, 0], PlayerId::One, 1).is_err());
    }

    #[test]
    fn test_abandon_keeps_totals_and_passes_turn() {
        let mut state = scripted(&[1, 2, 3, 4, 6, 6, 5, 2, 3, 4, 6, 6, 1, 5, 3, 3, 4, 6], GameConfig::default());
        keep(&mut state, 0b1, CommitMode::End);
        keep(&mut state, 0b1, CommitMode::Continue);

        let report = state.abandon_turn().unwrap();
        assert_eq!(report.end, TurnEnd::Abandoned);
        assert_eq!(report.credited, 0);
        assert_eq!(state.totals(), [100, 0]);
        assert_eq!(state.active(), PlayerId::One);
        assert_eq!(state.round_number(), 2);
    }

    #[test]
    fn test_illegal_selection_is_rejected_without_state_change() {
        let mut state = scripted(&[1, 2, 3, 4, 6, 6], GameConfig::default());
        state.roll().unwrap();
        state.set_selection(0b11).unwrap();
        let err = state.commit(CommitMode::Continue).unwrap_err();
        assert_eq!(err, EngineError::IllegalSelection { faces: vec![1, 2] });
        assert_eq!(state.turn().phase(), TurnPhase::SelectionPending);
        assert_eq!(state.turn().round().round_score, 0);

        state.set_selection(0).unwrap();
        assert!(matches!(
            state.commit(CommitMode::End),
            Err(EngineError::IllegalSelection { .. })
        ));
    }

    #[test]
    fn test_bad_external_roll_is_rejected_and_game_continues() {
        let mut state = scripted(&[], GameConfig::default());
        let err = state.apply_roll(vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRoll { expected: 6, .. }));
        let err = state.apply_roll(vec![0, 1, 5, 9, 2, 2]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRoll { .. }));

        assert!(state.aborted().is_none());
        assert!(!state.is_finished());
        assert_eq!(state.stats().rolls, 0);
        assert!(!observation_from_state(&state).aborted);
        assert!(action_mask_from_state(&state).roll);

        let roll = state.apply_roll(vec![1, 5, 2, 3, 4, 6]).unwrap();
        assert!(!roll.bust);
        assert_eq!(state.turn().phase(), TurnPhase::SelectionPending);
    }

    /// 只會擲出 9 的壞骰子
    struct BrokenDice;

    impl DiceSource for BrokenDice {
        fn roll_face(&mut self) -> u8 {
            9
        }

        fn choose_weighted(&mut self, _weights: &[u32]) -> usize {
            0
        }

        fn choose_index(&mut self, _len: usize) -> usize {
            0
        }
    }

    #[test]
    fn test_broken_dice_source_aborts_session() {
        let mut state = GameSession::with_dice(GameConfig::default(), BrokenDice);
        let err = state.roll().unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
        assert!(state.aborted().is_some());
        assert!(state.is_finished());
        assert!(matches!(state.roll(), Err(EngineError::InvalidState { .. })));
        assert!(observation_from_state(&state).aborted);
        assert!(!action_mask_from_state(&state).any());
    }

    #[test]
    fn test_human_vs_agent_turns() {
        let faces = [1, 2, 3, 4, 6, 6, 2, 3, 4, 6, 6, 2];
        let dice = ScriptedDice::new(faces).with_choices([1]);
        let mut state = GameSession::with_dice(GameConfig::default().against_agent(), dice);

        assert!(matches!(state.agent_act(), Err(EngineError::InvalidState { .. })));
        keep(&mut state, 0b1, CommitMode::End);

        assert!(state.active_is_agent());
        let steps = state.play_agent_turn().unwrap();
        assert_eq!(steps.len(), 1);
        assert!(steps[0].roll.as_ref().is_some_and(|roll| roll.bust));
        assert_eq!(state.active(), PlayerId::One);
        assert_eq!(state.round_number(), 2);
    }

    #[test]
    fn test_event_log_is_bounded() {
        let mut state = GameSession::new(GameConfig::new(1_000_000).self_play().seeded(9));
        for _ in 0..400 {
            state.play_agent_turn().unwrap();
        }
        assert!(state.events().count() <= crate::game::EVENT_LOG_LIMIT);
    }

    proptest! {
        #[test]
        fn prop_agent_never_commits_illegal_selection(seed in any::<u64>(), target in 500i64..5000) {
            let config = GameConfig::new(target).self_play();
            let mut state = GameSession::with_dice(config, StdRng::seed_from_u64(seed));
            let mut turns = 0;
            while !state.is_finished() && turns < 200 {
                let steps = state.play_agent_turn();
                prop_assert!(steps.is_ok(), "agent error: {:?}", steps.err());
                turns += 1;
            }
            prop_assert!(state.aborted().is_none());
            let totals = state.totals();
            prop_assert!(totals[0] >= 0 && totals[1] >= 0);
            if let Some(winner) = state.winner() {
                prop_assert!(totals[winner.index()] >= target);
                // 玩家 1 總是先被檢查
                if winner == PlayerId::Two {
                    prop_assert!(totals[0] < target);
                }
            }
        }
    }
}
