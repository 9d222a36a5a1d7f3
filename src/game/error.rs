//! 引擎錯誤類型
//!
//! 非法操作都是可恢復的：呼叫端收到錯誤，狀態不變。
//! 只有 `InvariantViolation` 會讓整局中止。

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("operation `{op}` not allowed in phase {phase}")]
    InvalidState { op: &'static str, phase: &'static str },
    #[error("die position {position} out of range (pool has {len} dice)")]
    InvalidPosition { position: usize, len: usize },
    #[error("rolled faces {faces:?} do not fit {expected} dice in range 1..=6")]
    InvalidRoll { faces: Vec<u8>, expected: usize },
    #[error("selection {faces:?} is not a qualifying combo")]
    IllegalSelection { faces: Vec<u8> },
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
    #[error("game already finished")]
    GameOver,
}

pub type EngineResult<T> = Result<T, EngineError>;
