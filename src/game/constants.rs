//! 遊戲常量定義

// ============================================================================
// 遊戲規則常量
// ============================================================================

pub const DICE_COUNT: usize = 6;         // 每回合起始骰子數
pub const FACE_MIN: u8 = 1;              // 骰子最小點數
pub const FACE_MAX: u8 = 6;              // 骰子最大點數
pub const PLAYER_COUNT: usize = 2;       // 對戰人數
pub const EVENT_LOG_LIMIT: usize = 256;  // 操作記錄上限

// ============================================================================
// 計分常量
// ============================================================================

pub const SINGLE_ONE_POINTS: i64 = 100;     // 單顆 1
pub const SINGLE_FIVE_POINTS: i64 = 50;     // 單顆 5
pub const TRIPLE_ONE_POINTS: i64 = 1000;    // 三顆 1
pub const TRIPLE_FACE_MULTIPLIER: i64 = 100; // 三顆 v = v × 100
pub const TRIPLE_COUNT: usize = 3;            // 成組最少顆數
pub const FULL_STRAIGHT_POINTS: i64 = 1500; // 1-6 順子
pub const SHORT_STRAIGHT_POINTS: i64 = 500; // 1-5 順子

// ============================================================================
// 電腦玩家策略常量
// ============================================================================

/// 單顆保守選擇門檻：首擲最佳組合低於此分數時只取一顆
pub const LOW_OPENING_SCORE: i64 = 200;

/// 剩餘骰子少於此數時偏保守
pub const FEW_DICE_LEFT: usize = 3;

// (aggressive %, conservative %)
pub const WEIGHTS_FAR_FROM_TARGET: (u32, u32) = (70, 30);
pub const WEIGHTS_CAN_WIN: (u32, u32) = (20, 80);
pub const WEIGHTS_FEW_DICE: (u32, u32) = (30, 70);
pub const WEIGHTS_BALANCED: (u32, u32) = (50, 50);

// ============================================================================
// 展示節奏常量
// ============================================================================

pub const REVEAL_DELAY_MIN_MS: u64 = 800;
pub const REVEAL_DELAY_MAX_MS: u64 = 2000;

// ============================================================================
// 大廳常量
// ============================================================================

pub const LOBBY_SCHEMA_VERSION: u16 = 1;
pub const ANNOUNCE_STALE_SECS: u64 = 10;
