//! 對局設定
//!
//! 預設值來自常量，環境變數可覆蓋，命令列參數再覆蓋環境變數。

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::game::{Stake, REVEAL_DELAY_MAX_MS, REVEAL_DELAY_MIN_MS};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("target score must be positive (got {0})")]
    NonPositiveTarget(i64),
    #[error("reveal delay range is empty ({min}ms..={max}ms)")]
    EmptyDelayRange { min: u64, max: u64 },
}

/// 對局設定
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfig {
    /// 目標分數（底注）
    pub target_score: i64,
    /// 第二位玩家由電腦操作
    pub opponent_is_agent: bool,
    /// 兩位玩家都由電腦操作（模擬用）
    pub self_play: bool,
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            target_score: Stake::default().target_score(),
            opponent_is_agent: false,
            self_play: false,
            seed: 0,
        }
    }
}

impl GameConfig {
    pub fn new(target_score: i64) -> Self {
        Self {
            target_score,
            ..Self::default()
        }
    }

    pub fn with_stake(stake: Stake) -> Self {
        Self::new(stake.target_score())
    }

    pub fn against_agent(mut self) -> Self {
        self.opponent_is_agent = true;
        self
    }

    pub fn self_play(mut self) -> Self {
        self.self_play = true;
        self
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// 讀取 `FARKLE_TARGET` / `FARKLE_AGENT` / `FARKLE_SEED`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            target_score: read_i64("FARKLE_TARGET", defaults.target_score),
            opponent_is_agent: read_bool("FARKLE_AGENT", defaults.opponent_is_agent),
            self_play: read_bool("FARKLE_SELF_PLAY", defaults.self_play),
            seed: read_u64("FARKLE_SEED", defaults.seed),
        }
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.target_score <= 0 {
            return Err(ConfigError::NonPositiveTarget(self.target_score));
        }
        Ok(self)
    }

    /// 各座位是否由電腦操作
    pub fn agent_seats(&self) -> [bool; 2] {
        [self.self_play, self.self_play || self.opponent_is_agent]
    }
}

/// 電腦玩家逐顆展示的節奏（僅影響展示）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: REVEAL_DELAY_MIN_MS,
            max_delay_ms: REVEAL_DELAY_MAX_MS,
        }
    }
}

impl PacingConfig {
    /// 不等待，測試與模擬使用
    pub fn instant() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_delay_ms: read_u64("FARKLE_DELAY_MIN_MS", defaults.min_delay_ms),
            max_delay_ms: read_u64("FARKLE_DELAY_MAX_MS", defaults.max_delay_ms),
        }
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::EmptyDelayRange {
                min: self.min_delay_ms,
                max: self.max_delay_ms,
            });
        }
        Ok(self)
    }

    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_delay_ms <= self.min_delay_ms {
            return Duration::from_millis(self.min_delay_ms);
        }
        Duration::from_millis(rng.gen_range(self.min_delay_ms..=self.max_delay_ms))
    }
}

fn read_i64(key: &str, fallback: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(fallback)
}

fn read_u64(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(fallback)
}

fn read_bool(key: &str, fallback: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => fallback,
    }
}

// ============================================================================
// 單元測試
// ============================================================================
