//! 合法組合枚舉
//!
//! 骰池最多 6 顆，直接枚舉全部 2^n - 1 個非空子集即可（至多 63 個）。

use super::dice::{full_mask, select_faces};
use super::scoring::{all_dice_scoring, score_dice};

/// 一個合法的保留組合
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Combo {
    /// 選中位置的 bitmask
    pub mask: u8,
    pub score: i64,
}

impl Combo {
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    pub fn faces(&self, pool: &[u8]) -> Vec<u8> {
        select_faces(pool, self.mask)
    }
}

/// 枚舉所有合法組合（依 mask 由小到大）
pub fn enumerate_combos(pool: &[u8]) -> Vec<Combo> {
    let limit = full_mask(pool.len());
    let mut combos = Vec::new();
    for mask in 1..=limit {
        let faces = select_faces(pool, mask);
        if all_dice_scoring(&faces, pool) {
            combos.push(Combo {
                mask,
                score: score_dice(&faces),
            });
        }
    }
    combos
}

/// 分數最高的組合；同分時取最先枚舉到的
pub fn best_combo(combos: &[Combo]) -> Option<Combo> {
    let mut best: Option<Combo> = None;
    for combo in combos {
        if best.map_or(true, |b| combo.score > b.score) {
            best = Some(*combo);
        }
    }
    best
}

/// 只含一顆骰子的合法組合
pub fn single_die_combos(combos: &[Combo]) -> Vec<Combo> {
    combos.iter().filter(|c| c.len() == 1).copied().collect()
}

/// 目前選取是否為合法組合（非空且全部可計分）
pub fn is_qualifying(pool: &[u8], mask: u8) -> bool {
    if mask == 0 || mask & !full_mask(pool.len()) != 0 {
        return false;
    }
    all_dice_scoring(&select_faces(pool, mask), pool)
}

// ============================================================================
// 單元測試
// ============================================================================
