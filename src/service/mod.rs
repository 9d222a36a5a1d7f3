//! 服務層模組
//!
//! 在純規則之上提供對局 session、快照、動作遮罩、電腦玩家展示、
//! 主機任務、大廳邊界與批次模擬

pub mod action_mask;
pub mod config;
pub mod host;
pub mod lobby;
pub mod observation;
pub mod reveal;
pub mod simulate;
pub mod state;

pub use action_mask::{action_mask_from_state, ActionMask};
pub use config::{ConfigError, GameConfig, PacingConfig};
pub use host::{spawn_host, HostError, HostHandle};
pub use lobby::{HostAnnouncement, JoinGate, JoinRequest, JoinResponse, JoinStatus, Lobby, LobbyError};
pub use observation::{observation_from_state, Snapshot};
pub use reveal::{RevealEvent, RevealPlan};
pub use simulate::{play_game, simulate, MatchStats};
pub use state::{AgentStep, CommitReport, GameSession, PlayerId, TurnEvent, TurnReport};

#[cfg(test)]
mod integration_tests;
