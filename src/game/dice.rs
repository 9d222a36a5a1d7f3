//! 骰子與隨機來源
//!
//! 骰池 (pool) 是一串點數，索引即位置；選取以 bitmask 表示，
//! 第 i 位為 1 代表保留第 i 顆骰子。

use std::collections::VecDeque;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::constants::{FACE_MAX, FACE_MIN};

/// 各點數出現次數，索引 1..=6 有效（索引 0 不用）
pub type FaceCounts = [usize; 7];

// ============================================================================
// 隨機來源
// ============================================================================

/// 引擎僅有的兩種隨機性：擲骰與電腦玩家的加權抽選
pub trait DiceSource {
    /// 均勻擲出 1..=6
    fn roll_face(&mut self) -> u8;

    /// 依權重抽出索引
    fn choose_weighted(&mut self, weights: &[u32]) -> usize;

    /// 均勻抽出 0..len
    fn choose_index(&mut self, len: usize) -> usize;

    fn roll_pool(&mut self, count: usize) -> Vec<u8> {
        (0..count).map(|_| self.roll_face()).collect()
    }
}

impl DiceSource for StdRng {
    fn roll_face(&mut self) -> u8 {
        self.gen_range(FACE_MIN..=FACE_MAX)
    }

    fn choose_weighted(&mut self, weights: &[u32]) -> usize {
        match WeightedIndex::new(weights) {
            Ok(dist) => dist.sample(self),
            Err(_) => 0,
        }
    }

    fn choose_index(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.gen_range(0..len)
        }
    }
}

/// 預先排好的骰面與抽選結果，用完後退回固定種子的 StdRng
///
/// 用於測試與重播：給定腳本即可重現整局。
#[derive(Clone, Debug)]
pub struct ScriptedDice {
    faces: VecDeque<u8>,
    choices: VecDeque<usize>,
    fallback: StdRng,
}

impl ScriptedDice {
    pub fn new(faces: impl IntoIterator<Item = u8>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            choices: VecDeque::new(),
            fallback: StdRng::seed_from_u64(0),
        }
    }

    /// 指定抽選結果（加權抽選與均勻抽選共用同一佇列）
    pub fn with_choices(mut self, choices: impl IntoIterator<Item = usize>) -> Self {
        self.choices = choices.into_iter().collect();
        self
    }

    pub fn faces_left(&self) -> usize {
        self.faces.len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll_face(&mut self) -> u8 {
        match self.faces.pop_front() {
            Some(face) => face.clamp(FACE_MIN, FACE_MAX),
            None => self.fallback.roll_face(),
        }
    }

    fn choose_weighted(&mut self, weights: &[u32]) -> usize {
        match self.choices.pop_front() {
            Some(choice) => choice.min(weights.len().saturating_sub(1)),
            None => self.fallback.choose_weighted(weights),
        }
    }

    fn choose_index(&mut self, len: usize) -> usize {
        match self.choices.pop_front() {
            Some(choice) => choice.min(len.saturating_sub(1)),
            None => self.fallback.choose_index(len),
        }
    }
}

// ============================================================================
// 骰池工具
// ============================================================================

pub fn is_valid_face(face: u8) -> bool {
    (FACE_MIN..=FACE_MAX).contains(&face)
}

/// 統計各點數出現次數（非法點數忽略）
pub fn face_counts(faces: &[u8]) -> FaceCounts {
    let mut counts = [0usize; 7];
    for &face in faces {
        if is_valid_face(face) {
            counts[face as usize] += 1;
        }
    }
    counts
}

/// 取出 mask 選中的點數
pub fn select_faces(pool: &[u8], mask: u8) -> Vec<u8> {
    pool.iter()
        .enumerate()
        .filter(|(idx, _)| (mask >> idx) & 1 == 1)
        .map(|(_, &face)| face)
        .collect()
}

/// 取出 mask 未選中的點數（保持原順序）
pub fn unkept_faces(pool: &[u8], mask: u8) -> Vec<u8> {
    pool.iter()
        .enumerate()
        .filter(|(idx, _)| (mask >> idx) & 1 == 0)
        .map(|(_, &face)| face)
        .collect()
}

/// mask 對應的位置列表
pub fn mask_positions(mask: u8) -> Vec<usize> {
    (0..8).filter(|idx| (mask >> idx) & 1 == 1).collect()
}

/// 骰池長度對應的完整 mask
pub fn full_mask(len: usize) -> u8 {
    if len >= 8 {
        u8::MAX
    } else {
        ((1u16 << len) - 1) as u8
    }
}

// ============================================================================
// 單元測試
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_counts() {
        let counts = face_counts(&[1, 1, 5, 6, 6, 6]);
        assert_eq!(counts[1], 2);
        assert_eq!(counts[5], 1);
        assert_eq!(counts[6], 3);
        assert_eq!(counts[2], 0);

        let counts = face_counts(&[4u8; 300]);
        assert_eq!(counts[4], 300);
    }

    #[test]
    fn test_select_and_unkept_faces() {
        let pool = [1, 2, 3, 4, 5, 6];
        assert_eq!(select_faces(&pool, 0b010001), vec![1, 5]);
        assert_eq!(unkept_faces(&pool, 0b010001), vec![2, 3, 4, 6]);
        assert_eq!(mask_positions(0b010001), vec![0, 4]);
        assert_eq!(full_mask(6), 0b111111);
        assert_eq!(full_mask(0), 0);
    }

    #[test]
    fn test_std_rng_faces_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            assert!(is_valid_face(rng.roll_face()));
        }
        assert_eq!(rng.roll_pool(4).len(), 4);
    }

    #[test]
    fn test_std_rng_weighted_respects_zero_weight() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(rng.choose_weighted(&[0, 100]), 1);
        }
    }

    #[test]
    fn test_scripted_dice_then_fallback() {
        let mut dice = ScriptedDice::new([1, 5, 6]).with_choices([1, 9]);
        assert_eq!(dice.roll_pool(3), vec![1, 5, 6]);
        assert_eq!(dice.faces_left(), 0);
        assert!(is_valid_face(dice.roll_face()));
        assert_eq!(dice.choose_weighted(&[50, 50]), 1);
        // 超出範圍的腳本值會被夾住
        assert_eq!(dice.choose_index(3), 2);
    }
}
