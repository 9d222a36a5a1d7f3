//! 電腦玩家逐顆展示
//!
//! 決策在引擎內一次算完並已 commit；這裡只把結果拆成依序顯示的事件，
//! 再配上隨機延遲。展示被取消不影響已完成的決策。

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio_stream::Iter;

use super::config::PacingConfig;
use super::state::AgentStep;
use crate::game::{preview_selection, CommitMode};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevealEvent {
    Rolled { pool: Vec<u8> },
    Busted,
    /// 第 position 顆被選中，並顯示目前選取的預覽分數
    Selected { position: usize, face: u8, preview_score: i64 },
    Committed { mode: CommitMode, hot_dice: bool },
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RevealPlan {
    events: Vec<RevealEvent>,
}

impl RevealPlan {
    /// 從已擲好的骰池接手的一步不重播擲骰
    pub fn from_step(step: &AgentStep) -> Self {
        let mut events = Vec::new();
        if let Some(roll) = &step.roll {
            events.push(RevealEvent::Rolled {
                pool: roll.pool.clone(),
            });
            if roll.bust {
                events.push(RevealEvent::Busted);
                return Self { events };
            }
        }

        if let Some(decision) = &step.decision {
            let pool = &step.pool;
            let mut partial = 0u8;
            for position in decision.keep_positions() {
                partial |= 1 << position;
                events.push(RevealEvent::Selected {
                    position,
                    face: pool[position],
                    preview_score: preview_selection(pool, partial).preview_score,
                });
            }
            let hot_dice = step
                .commit
                .as_ref()
                .map(|c| c.outcome.hot_dice)
                .unwrap_or(false);
            events.push(RevealEvent::Committed {
                mode: decision.mode,
                hot_dice,
            });
        }

        Self { events }
    }

    pub fn events(&self) -> &[RevealEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 每個事件配上等待時間（延遲在建立時一次抽好）
    pub fn paced<R: Rng + ?Sized>(
        self,
        pacing: &PacingConfig,
        rng: &mut R,
    ) -> Iter<std::vec::IntoIter<(Duration, RevealEvent)>> {
        let paced: Vec<(Duration, RevealEvent)> = self
            .events
            .into_iter()
            .map(|event| (pacing.next_delay(rng), event))
            .collect();
        tokio_stream::iter(paced)
    }
}

// ============================================================================
// 單元測試
// ============================================================================
