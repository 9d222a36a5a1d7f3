//! 雙人擲骰計分遊戲引擎
//!
//! - `game`: 純規則（計分、合法選取、回合狀態機、電腦玩家策略）
//! - `service`: 對局 session、快照、主機任務、大廳邊界與模擬

pub mod game;
pub mod service;
