//! 底注等級
//!
//! 開局選擇的底注即為目標分數：先達到者獲勝。
//!
//! # 架構
//!
//! 使用聲明式 `STAKE_DEFS` 表定義所有底注的元數據。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Stake 定義系統
// ============================================================================

/// Stake 定義結構
#[derive(Clone, Copy)]
pub struct StakeDef {
    pub name: &'static str,
    pub key: &'static str,
    pub target_score: i64,
}

/// Stake 定義表（順序與 Stake 枚舉值一致）
pub static STAKE_DEFS: [StakeDef; 4] = [
    StakeDef { name: "Beggar", key: "beggar", target_score: 1000 },   // 乞丐
    StakeDef { name: "Peasant", key: "peasant", target_score: 2000 }, // 農民
    StakeDef { name: "Knight", key: "knight", target_score: 4000 },   // 騎士
    StakeDef { name: "King", key: "king", target_score: 8000 },       // 國王
];

/// 底注等級
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stake {
    #[default]
    Beggar = 0,
    Peasant = 1,
    Knight = 2,
    King = 3,
}

impl Stake {
    pub fn all() -> &'static [Stake] {
        &[Stake::Beggar, Stake::Peasant, Stake::Knight, Stake::King]
    }

    pub fn name(&self) -> &'static str {
        STAKE_DEFS[self.to_index()].name
    }

    /// 目標分數
    pub fn target_score(&self) -> i64 {
        STAKE_DEFS[self.to_index()].target_score
    }

    pub fn to_index(&self) -> usize {
        *self as usize
    }

    /// 由目標分數反查（非標準分數回傳 None）
    pub fn from_target(target: i64) -> Option<Stake> {
        Stake::all()
            .iter()
            .copied()
            .find(|s| s.target_score() == target)
    }
}

impl fmt::Display for Stake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.target_score())
    }
}

impl FromStr for Stake {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Stake::all()
            .iter()
            .copied()
            .find(|stake| STAKE_DEFS[stake.to_index()].key == lowered)
            .ok_or_else(|| format!("unknown stake `{s}` (expected beggar, peasant, knight or king)"))
    }
}

// ============================================================================
// 單元測試
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_targets() {
        assert_eq!(Stake::Beggar.target_score(), 1000);
        assert_eq!(Stake::Peasant.target_score(), 2000);
        assert_eq!(Stake::Knight.target_score(), 4000);
        assert_eq!(Stake::King.target_score(), 8000);
    }

    #[test]
    fn test_stake_lookup() {
        assert_eq!(Stake::from_target(4000), Some(Stake::Knight));
        assert_eq!(Stake::from_target(1234), None);
        assert_eq!("King".parse::<Stake>(), Ok(Stake::King));
        assert!("emperor".parse::<Stake>().is_err());
    }

    #[test]
    fn test_stake_index_matches_table() {
        for (i, stake) in Stake::all().iter().enumerate() {
            assert_eq!(stake.to_index(), i);
        }
    }
}
