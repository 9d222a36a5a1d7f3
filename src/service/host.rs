//! 對局主機任務
//!
//! 一個 tokio 任務獨佔 `GameSession`，所有指令經 mpsc 佇列依序處理，
//! 結果由 oneshot 回傳。展示層與網路層只持有 `HostHandle`。

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::observation::{observation_from_state, Snapshot};
use super::state::{AgentStep, CommitReport, GameSession, TurnReport};
use crate::game::{CommitMode, DiceSource, EngineError, RollOutcome, SelectionPreview};

/// 指令佇列長度
pub const HOST_QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("host task is closed")]
    Closed,
}

pub type HostResult<T> = Result<T, HostError>;

pub enum HostCommand {
    Roll {
        response: oneshot::Sender<Result<RollOutcome, EngineError>>,
    },
    ToggleKeep {
        position: usize,
        response: oneshot::Sender<Result<SelectionPreview, EngineError>>,
    },
    Commit {
        mode: CommitMode,
        response: oneshot::Sender<Result<CommitReport, EngineError>>,
    },
    AgentAct {
        response: oneshot::Sender<Result<AgentStep, EngineError>>,
    },
    Abandon {
        response: oneshot::Sender<Result<TurnReport, EngineError>>,
    },
    Snapshot {
        response: oneshot::Sender<Snapshot>,
    },
}

#[derive(Clone)]
pub struct HostHandle {
    sender: mpsc::Sender<HostCommand>,
}

/// 啟動主機任務；所有 handle 被丟棄後任務結束
pub fn spawn_host<D>(session: GameSession<D>) -> (HostHandle, JoinHandle<GameSession<D>>)
where
    D: DiceSource + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(HOST_QUEUE_CAPACITY);
    let task = tokio::spawn(run(session, receiver));
    (HostHandle { sender }, task)
}

async fn run<D: DiceSource>(mut session: GameSession<D>, mut receiver: mpsc::Receiver<HostCommand>) -> GameSession<D> {
    info!(target_score = session.config().target_score, "host started");
    while let Some(command) = receiver.recv().await {
        // 接收端已離開時直接丟棄結果
        match command {
            HostCommand::Roll { response } => {
                let _ = response.send(session.roll());
            }
            HostCommand::ToggleKeep { position, response } => {
                let _ = response.send(session.toggle_keep(position));
            }
            HostCommand::Commit { mode, response } => {
                let _ = response.send(session.commit(mode));
            }
            HostCommand::AgentAct { response } => {
                let _ = response.send(session.agent_act());
            }
            HostCommand::Abandon { response } => {
                let _ = response.send(session.abandon_turn());
            }
            HostCommand::Snapshot { response } => {
                let _ = response.send(observation_from_state(&session));
            }
        }
    }
    debug!(turns = session.turns_played(), "host stopped");
    session
}

impl HostHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> HostCommand,
    ) -> HostResult<T> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(build(response))
            .await
            .map_err(|_| HostError::Closed)?;
        receiver.await.map_err(|_| HostError::Closed)
    }

    pub async fn roll(&self) -> HostResult<RollOutcome> {
        Ok(self.request(|response| HostCommand::Roll { response }).await??)
    }

    pub async fn toggle_keep(&self, position: usize) -> HostResult<SelectionPreview> {
        Ok(self
            .request(|response| HostCommand::ToggleKeep { position, response })
            .await??)
    }

    pub async fn commit(&self, mode: CommitMode) -> HostResult<CommitReport> {
        Ok(self
            .request(|response| HostCommand::Commit { mode, response })
            .await??)
    }

    pub async fn agent_act(&self) -> HostResult<AgentStep> {
        Ok(self.request(|response| HostCommand::AgentAct { response }).await??)
    }

    pub async fn abandon(&self) -> HostResult<TurnReport> {
        Ok(self.request(|response| HostCommand::Abandon { response }).await??)
    }

    pub async fn snapshot(&self) -> HostResult<Snapshot> {
        self.request(|response| HostCommand::Snapshot { response }).await
    }
}

// ============================================================================
// 單元測試
// ============================================================================
