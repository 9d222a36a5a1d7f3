//! 對局狀態管理
//!
//! `GameSession` 擁有兩位玩家的總分、輪到誰、回合狀態機與電腦玩家策略。
//! 總分只在回合結束時增加；任何內部不變量被破壞時整局中止。

use std::collections::VecDeque;
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::config::GameConfig;
use crate::game::{
    CommitMode, CommitOutcome, Decision, DiceSource, EngineError, EngineResult, HeuristicPolicy,
    Policy, PolicyInput, RollOutcome, SelectionPreview, TurnEnd, TurnPhase, TurnStateMachine,
    EVENT_LOG_LIMIT, PLAYER_COUNT,
};

/// 玩家座位
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub fn index(&self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    pub fn other(&self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::One => write!(f, "player 1"),
            PlayerId::Two => write!(f, "player 2"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlayerState {
    pub total_score: i64,
}

/// 操作記錄
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    Rolled {
        round: u32,
        player: PlayerId,
        pool: Vec<u8>,
        bust: bool,
    },
    Committed {
        round: u32,
        player: PlayerId,
        kept: Vec<u8>,
        gained: i64,
        round_score: i64,
        mode: CommitMode,
        hot_dice: bool,
    },
    TurnPassed {
        round: u32,
        player: PlayerId,
        end: TurnEnd,
        total: i64,
    },
    Won {
        player: PlayerId,
        total: i64,
    },
}

/// 回合結束結算
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub player: PlayerId,
    pub end: TurnEnd,
    pub credited: i64,
    pub totals: [i64; 2],
    pub winner: Option<PlayerId>,
}

/// commit 的結果
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub outcome: CommitOutcome,
    pub turn_over: bool,
    pub round_score: i64,
    pub totals: [i64; 2],
    pub winner: Option<PlayerId>,
    pub turn: Option<TurnReport>,
}

/// 電腦玩家一步：擲骰 -> 決策 -> 選取 -> commit
///
/// 從已擲好的骰池接手時 `roll` 為 None，`pool` 仍是決策所依據的骰池。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentStep {
    pub player: PlayerId,
    pub roll: Option<RollOutcome>,
    pub pool: Vec<u8>,
    pub decision: Option<Decision>,
    pub preview: Option<SelectionPreview>,
    pub commit: Option<CommitReport>,
    pub turn: Option<TurnReport>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub rolls: u32,
    pub busts: [u32; 2],
    pub hot_dice: [u32; 2],
}

// ============================================================================
// GameSession
// ============================================================================

pub struct GameSession<D: DiceSource = StdRng> {
    config: GameConfig,
    dice: D,
    policy: Box<dyn Policy>,
    players: [PlayerState; PLAYER_COUNT],
    active: PlayerId,
    round: u32,
    turns_played: u32,
    turn: TurnStateMachine,
    winner: Option<PlayerId>,
    aborted: Option<String>,
    log: VecDeque<TurnEvent>,
    stats: SessionStats,
}

impl GameSession<StdRng> {
    pub fn new(config: GameConfig) -> Self {
        let dice = StdRng::seed_from_u64(config.seed);
        Self::with_dice(config, dice)
    }
}

impl<D: DiceSource> GameSession<D> {
    pub fn with_dice(config: GameConfig, dice: D) -> Self {
        Self {
            config,
            dice,
            policy: Box::new(HeuristicPolicy::default()),
            players: [PlayerState::default(); PLAYER_COUNT],
            active: PlayerId::One,
            round: 1,
            turns_played: 0,
            turn: TurnStateMachine::new(),
            winner: None,
            aborted: None,
            log: VecDeque::new(),
            stats: SessionStats::default(),
        }
    }

    /// 從外部提供的狀態恢復（例如主機轉交的總分與當前玩家）
    pub fn restore(config: GameConfig, dice: D, totals: [i64; 2], active: PlayerId, round: u32) -> EngineResult<Self> {
        if totals.iter().any(|&t| t < 0) {
            return Err(EngineError::InvariantViolation(format!("negative totals {totals:?}")));
        }
        let mut session = Self::with_dice(config, dice);
        session.players[0].total_score = totals[0];
        session.players[1].total_score = totals[1];
        session.active = active;
        session.round = round.max(1);
        session.winner = session.check_winner();
        Ok(session)
    }

    pub fn with_policy(mut self, policy: Box<dyn Policy>) -> Self {
        self.policy = policy;
        self
    }

    // ========================================================================
    // 查詢
    // ========================================================================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn totals(&self) -> [i64; 2] {
        [self.players[0].total_score, self.players[1].total_score]
    }

    pub fn active(&self) -> PlayerId {
        self.active
    }

    pub fn round_number(&self) -> u32 {
        self.round
    }

    pub fn turns_played(&self) -> u32 {
        self.turns_played
    }

    pub fn turn(&self) -> &TurnStateMachine {
        &self.turn
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some() || self.aborted.is_some()
    }

    pub fn aborted(&self) -> Option<&str> {
        self.aborted.as_deref()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn events(&self) -> impl Iterator<Item = &TurnEvent> {
        self.log.iter()
    }

    pub fn is_agent(&self, player: PlayerId) -> bool {
        self.config.agent_seats()[player.index()]
    }

    pub fn active_is_agent(&self) -> bool {
        self.is_agent(self.active)
    }

    /// 距離目標還差多少
    pub fn deficit(&self, player: PlayerId) -> i64 {
        self.config.target_score - self.players[player.index()].total_score
    }

    // ========================================================================
    // 操作
    // ========================================================================

    fn guard(&self, op: &'static str) -> EngineResult<()> {
        if self.aborted.is_some() {
            return Err(EngineError::InvalidState { op, phase: "Aborted" });
        }
        if self.winner.is_some() {
            return Err(EngineError::GameOver);
        }
        Ok(())
    }

    /// 不變量被破壞即中止整局
    fn track<T>(&mut self, result: EngineResult<T>) -> EngineResult<T> {
        if let Err(EngineError::InvariantViolation(reason)) = &result {
            warn!(round = self.round, player = %self.active, %reason, "session aborted");
            self.aborted = Some(reason.clone());
        }
        result
    }

    fn record(&mut self, event: TurnEvent) {
        if self.log.len() >= EVENT_LOG_LIMIT {
            self.log.pop_front();
        }
        self.log.push_back(event);
    }

    pub fn roll(&mut self) -> EngineResult<RollOutcome> {
        self.roll_and_settle().map(|(outcome, _)| outcome)
    }

    fn roll_and_settle(&mut self) -> EngineResult<(RollOutcome, Option<TurnReport>)> {
        self.guard("roll")?;
        let result = self.turn.roll(&mut self.dice);
        let outcome = self.track(result)?;
        let report = self.after_roll(&outcome);
        Ok((outcome, report))
    }

    /// 套用外部擲骰結果（網路對戰時由主機擲骰）；格式不對的擲骰被拒絕，對局繼續
    pub fn apply_roll(&mut self, faces: Vec<u8>) -> EngineResult<RollOutcome> {
        self.guard("roll")?;
        let result = self.turn.apply_roll(faces);
        let outcome = match self.track(result) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(round = self.round, player = %self.active, %err, "external roll rejected");
                return Err(err);
            }
        };
        self.after_roll(&outcome);
        Ok(outcome)
    }

    /// 爆掉時直接結算回合
    fn after_roll(&mut self, outcome: &RollOutcome) -> Option<TurnReport> {
        self.stats.rolls += 1;
        info!(
            round = self.round,
            player = %self.active,
            pool = ?outcome.pool,
            bust = outcome.bust,
            "rolled"
        );
        self.record(TurnEvent::Rolled {
            round: self.round,
            player: self.active,
            pool: outcome.pool.clone(),
            bust: outcome.bust,
        });
        if outcome.bust {
            self.stats.busts[self.active.index()] += 1;
            info!(round = self.round, player = %self.active, "no scoring dice, round score lost");
            return Some(self.finish_turn(TurnEnd::Busted));
        }
        None
    }

    pub fn toggle_keep(&mut self, position: usize) -> EngineResult<SelectionPreview> {
        self.guard("toggle_keep")?;
        self.turn.toggle_keep(position)
    }

    pub fn set_selection(&mut self, mask: u8) -> EngineResult<SelectionPreview> {
        self.guard("set_selection")?;
        self.turn.set_selection(mask)
    }

    pub fn commit(&mut self, mode: CommitMode) -> EngineResult<CommitReport> {
        self.guard("commit")?;
        let result = self.turn.commit(mode);
        let outcome = match self.track(result) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(round = self.round, player = %self.active, %err, "commit rejected");
                return Err(err);
            }
        };

        info!(
            round = self.round,
            player = %self.active,
            kept = ?outcome.kept,
            gained = outcome.gained,
            round_score = outcome.round_score,
            ?mode,
            hot_dice = outcome.hot_dice,
            "committed"
        );
        if outcome.hot_dice {
            self.stats.hot_dice[self.active.index()] += 1;
        }
        self.record(TurnEvent::Committed {
            round: self.round,
            player: self.active,
            kept: outcome.kept.clone(),
            gained: outcome.gained,
            round_score: outcome.round_score,
            mode,
            hot_dice: outcome.hot_dice,
        });

        let round_score = outcome.round_score;
        let turn = outcome.turn_end.map(|end| self.finish_turn(end));

        Ok(CommitReport {
            outcome,
            turn_over: turn.is_some(),
            round_score,
            totals: self.totals(),
            winner: self.winner,
            turn,
        })
    }

    /// 外部放棄本回合，不影響任何人的總分
    pub fn abandon_turn(&mut self) -> EngineResult<TurnReport> {
        self.guard("abandon_turn")?;
        let end = self.turn.abandon();
        info!(round = self.round, player = %self.active, "turn abandoned");
        Ok(self.finish_turn(end))
    }

    fn check_winner(&self) -> Option<PlayerId> {
        // 玩家 1 每輪先行動，所以先檢查
        [PlayerId::One, PlayerId::Two]
            .into_iter()
            .find(|p| self.players[p.index()].total_score >= self.config.target_score)
    }

    fn finish_turn(&mut self, end: TurnEnd) -> TurnReport {
        let player = self.active;
        let credited = end.credited();
        self.players[player.index()].total_score += credited;
        let total = self.players[player.index()].total_score;
        self.turns_played += 1;

        info!(round = self.round, %player, credited, total, "turn over");
        self.record(TurnEvent::TurnPassed {
            round: self.round,
            player,
            end,
            total,
        });

        self.turn = TurnStateMachine::new();
        if player == PlayerId::Two {
            self.round += 1;
        }
        self.active = player.other();

        self.winner = self.check_winner();
        if let Some(winner) = self.winner {
            let total = self.players[winner.index()].total_score;
            info!(%winner, total, "game won");
            self.record(TurnEvent::Won { player: winner, total });
        }

        TurnReport {
            player,
            end,
            credited,
            totals: self.totals(),
            winner: self.winner,
        }
    }

    // ========================================================================
    // 電腦玩家
    // ========================================================================

    /// 電腦玩家執行一步；只在輪到電腦座位時可呼叫
    pub fn agent_act(&mut self) -> EngineResult<AgentStep> {
        self.guard("agent_act")?;
        if !self.active_is_agent() {
            return Err(EngineError::InvalidState {
                op: "agent_act",
                phase: "HumanTurn",
            });
        }
        let player = self.active;

        let (roll, bust_report) = match self.turn.phase() {
            TurnPhase::AwaitingRoll => {
                let (outcome, report) = self.roll_and_settle()?;
                (Some(outcome), report)
            }
            // 骰子已擲好，從選取階段接手
            TurnPhase::SelectionPending => (None, None),
            TurnPhase::Over(_) => {
                let result = Err(EngineError::InvariantViolation(
                    "finished turn left in session".to_string(),
                ));
                return self.track(result);
            }
        };
        if let Some(outcome) = roll.as_ref().filter(|outcome| outcome.bust) {
            let pool = outcome.pool.clone();
            return Ok(AgentStep {
                player,
                roll,
                pool,
                decision: None,
                preview: None,
                commit: None,
                turn: bust_report,
            });
        }

        let input = PolicyInput {
            pool: &self.turn.round().pool,
            round_score: self.turn.round().round_score,
            deficit: self.deficit(player),
        };
        let decision = self.policy.decide(&input, &mut self.dice);
        let Some(decision) = decision else {
            let result = Err(EngineError::InvariantViolation(
                "agent found no combo in a scoring roll".to_string(),
            ));
            return self.track(result);
        };

        let pool = self.turn.round().pool.clone();
        let preview = self.set_selection(decision.keep_mask)?;
        let commit = self.commit(decision.mode)?;
        let turn = commit.turn;

        Ok(AgentStep {
            player,
            roll,
            pool,
            decision: Some(decision),
            preview: Some(preview),
            commit: Some(commit),
            turn,
        })
    }

    /// 電腦玩家連續行動直到換人或遊戲結束
    pub fn play_agent_turn(&mut self) -> EngineResult<Vec<AgentStep>> {
        let player = self.active;
        let mut steps = Vec::new();
        loop {
            let step = self.agent_act()?;
            let done = step.turn.is_some();
            steps.push(step);
            if done || self.active != player || self.is_finished() {
                return Ok(steps);
            }
        }
    }

    pub fn check_invariants(&mut self) -> EngineResult<()> {
        let result = self.turn.check_invariants().and_then(|_| {
            if self.players.iter().any(|p| p.total_score < 0) {
                Err(EngineError::InvariantViolation("negative player total".to_string()))
            } else {
                Ok(())
            }
        });
        self.track(result)
    }
}

// ============================================================================
// 單元測試
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{best_combo, enumerate_combos, ScriptedDice, Strategy, StrategyWeights};

    fn session(faces: &[u8]) -> GameSession<ScriptedDice> {
        GameSession::with_dice(GameConfig::default(), ScriptedDice::new(faces.iter().copied()))
    }

    #[test]
    fn test_player_id() {
        assert_eq!(PlayerId::One.other(), PlayerId::Two);
        assert_eq!(PlayerId::Two.index(), 1);
        assert_eq!(PlayerId::Two.to_string(), "player 2");
    }

    #[test]
    fn test_new_session() {
        let state = session(&[]);
        assert_eq!(state.active(), PlayerId::One);
        assert_eq!(state.round_number(), 1);
        assert_eq!(state.totals(), [0, 0]);
        assert_eq!(state.deficit(PlayerId::Two), 1000);
        assert!(!state.is_finished());
        assert_eq!(state.events().count(), 0);
    }

    #[test]
    fn test_events_follow_turn() {
        let mut state = session(&[1, 5, 2, 3, 4, 6]);
        state.roll().unwrap();
        state.set_selection(0b11).unwrap();
        let report = state.commit(CommitMode::End).unwrap();

        let turn = report.turn.unwrap();
        assert_eq!(turn.player, PlayerId::One);
        assert_eq!(turn.end, TurnEnd::Banked { score: 150 });
        assert_eq!(turn.credited, 150);

        let events: Vec<&TurnEvent> = state.events().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], TurnEvent::Rolled { bust: false, .. }));
        assert!(matches!(events[1], TurnEvent::Committed { gained: 150, mode: CommitMode::End, .. }));
        assert!(matches!(events[2], TurnEvent::TurnPassed { total: 150, .. }));
        assert_eq!(state.stats().rolls, 1);
    }

    #[test]
    fn test_continue_keeps_turn() {
        let mut state = session(&[1, 2, 3, 4, 6, 6]);
        state.roll().unwrap();
        state.toggle_keep(0).unwrap();
        let report = state.commit(CommitMode::Continue).unwrap();
        assert!(!report.turn_over);
        assert!(report.turn.is_none());
        assert_eq!(report.totals, [0, 0]);
        assert_eq!(state.active(), PlayerId::One);
        assert_eq!(state.turn().round().remaining_dice, 5);
    }

    #[test]
    fn test_agent_step_single_die_opening() {
        // 保守策略 + 開局最高分 < 200：只留一顆
        let dice = ScriptedDice::new([1, 5, 2, 3, 4, 6]).with_choices([1]);
        let mut state = GameSession::with_dice(GameConfig::default().self_play(), dice);
        let step = state.agent_act().unwrap();

        let decision = step.decision.unwrap();
        assert!(decision.single_die);
        assert_eq!(decision.kept.len(), 1);
        assert_eq!(decision.mode, CommitMode::End);
        assert!(step.turn.is_some());
        assert_eq!(state.active(), PlayerId::Two);
    }

    #[test]
    fn test_agent_resumes_pending_selection() {
        let dice = ScriptedDice::new([1, 1, 1, 5, 5, 2]).with_choices([0]);
        let mut state = GameSession::with_dice(GameConfig::default().self_play(), dice);
        state.roll().unwrap();

        let step = state.agent_act().unwrap();
        assert!(step.roll.is_none());
        assert_eq!(step.pool, vec![1, 1, 1, 5, 5, 2]);
        assert_eq!(step.decision.unwrap().kept, vec![1, 1, 1, 5, 5]);
        assert_eq!(state.stats().rolls, 1);
    }

    /// 只拿最高分組合並結束回合
    struct BankBest;

    impl Policy for BankBest {
        fn decide(&self, input: &PolicyInput<'_>, _dice: &mut dyn DiceSource) -> Option<Decision> {
            let best = best_combo(&enumerate_combos(input.pool))?;
            Some(Decision {
                keep_mask: best.mask,
                kept: best.faces(input.pool),
                score: best.score,
                mode: CommitMode::End,
                strategy: Strategy::Conservative,
                weights: StrategyWeights::from((0, 100)),
                single_die: false,
            })
        }
    }

    #[test]
    fn test_custom_policy() {
        let dice = ScriptedDice::new([1, 1, 1, 5, 5, 2]);
        let mut state = GameSession::with_dice(GameConfig::new(5000).self_play(), dice)
            .with_policy(Box::new(BankBest));
        let steps = state.play_agent_turn().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(state.totals(), [1100, 0]);
        assert_eq!(state.active(), PlayerId::Two);
    }

    #[test]
    fn test_winning_turn_still_passes_turn() {
        let mut state = GameSession::restore(
            GameConfig::new(1000),
            ScriptedDice::new([1, 5, 2, 3, 4, 6]),
            [0, 900],
            PlayerId::Two,
            3,
        )
        .unwrap();
        state.roll().unwrap();
        state.set_selection(0b11).unwrap();
        let report = state.commit(CommitMode::End).unwrap();

        assert_eq!(report.winner, Some(PlayerId::Two));
        assert_eq!(state.active(), PlayerId::One);
        assert_eq!(state.round_number(), 4);
        assert!(state.is_finished());
    }

    #[test]
    fn test_check_invariants_on_fresh_session() {
        let mut state = session(&[]);
        assert!(state.check_invariants().is_ok());
        assert!(state.aborted().is_none());
    }
}
