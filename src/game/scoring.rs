//! 計分引擎
//!
//! 處理骰面組合的計分與單顆骰子的合法性判定

use super::constants::{
    FULL_STRAIGHT_POINTS, SHORT_STRAIGHT_POINTS, SINGLE_FIVE_POINTS, SINGLE_ONE_POINTS,
    TRIPLE_COUNT, TRIPLE_FACE_MULTIPLIER, TRIPLE_ONE_POINTS,
};
use super::dice::{face_counts, FaceCounts};

// ============================================================================
// 計分函數
// ============================================================================

/// 單顆骰子是否可計分：1、5，或該點數在整個骰池出現 3 次以上
pub fn is_die_scoring(face: u8, counts: &FaceCounts) -> bool {
    if face == 1 || face == 5 {
        return true;
    }
    // 部分順子不算單顆計分
    counts.get(face as usize).is_some_and(|&n| n >= TRIPLE_COUNT)
}

/// 計算一組骰面的分數
///
/// 順子以點數是否出現判定：1-6 都出現為 1500，1-5 都出現為 500，覆蓋其他計分。
/// 超長的骰面串以飽和運算計分，不會溢位。
pub fn score_dice(dice: &[u8]) -> i64 {
    let counts = face_counts(dice);

    if (1..=6).all(|face| counts[face] > 0) {
        return FULL_STRAIGHT_POINTS;
    }
    if (1..=5).all(|face| counts[face] > 0) {
        return SHORT_STRAIGHT_POINTS;
    }

    // 單顆 1 和 5
    let mut score = (counts[1] as i64)
        .saturating_mul(SINGLE_ONE_POINTS)
        .saturating_add((counts[5] as i64).saturating_mul(SINGLE_FIVE_POINTS));

    // 三顆以上同點數，每多一顆翻倍
    for face in 1..=6usize {
        let count = counts[face];
        if count < TRIPLE_COUNT {
            continue;
        }
        let base = if face == 1 {
            TRIPLE_ONE_POINTS
        } else {
            face as i64 * TRIPLE_FACE_MULTIPLIER
        };
        let doublings = u32::try_from(count - TRIPLE_COUNT).unwrap_or(u32::MAX);
        score = score.saturating_add(base.saturating_mul(2i64.saturating_pow(doublings)));

        // 扣回前面單顆計過的分數
        match face {
            1 => score = score.saturating_sub((count as i64).saturating_mul(SINGLE_ONE_POINTS)),
            5 => score = score.saturating_sub((count as i64).saturating_mul(SINGLE_FIVE_POINTS)),
            _ => {}
        }
    }

    score
}

/// 擲骰後是否有得分機會；沒有即爆掉
pub fn has_scoring_opportunity(pool: &[u8]) -> bool {
    score_dice(pool) > 0
}

/// 選中的骰子是否全部可計分（以整個骰池的點數統計判定）
pub fn all_dice_scoring(selected: &[u8], pool: &[u8]) -> bool {
    let counts = face_counts(pool);
    selected.iter().all(|&face| is_die_scoring(face, &counts))
}

// ============================================================================
// 單元測試
// ============================================================================
