//! Level geometry: arena anchors and the crate pyramid

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::physics::Region;

/// Number of crate columns on the bottom row
pub fn columns_for_level(level: u32) -> u32 {
    (2 + level.max(1)).min(5)
}

/// Number of crate rows
pub fn rows_for_level(level: u32) -> u32 {
    (3 + level.max(1) / 2).min(5)
}

/// Shots allowed per attempt when ammo is limited
pub fn shots_for_level(level: u32) -> u32 {
    (3 + (level.max(1) - 1) / 2).min(5)
}

/// Crates in row `row` (odd rows are one shorter)
#[inline]
fn row_len(cols: u32, row: u32) -> u32 {
    cols - row % 2
}

/// Total crates generated for a level
pub fn target_count(level: u32) -> usize {
    let cols = columns_for_level(level);
    (0..rows_for_level(level))
        .map(|r| row_len(cols, r) as usize)
        .sum()
}

/// Crate centers for `level`, bottom row first, left to right.
///
/// Rows stack upward from `base` (y grows downward); odd rows shift right by
/// half a crate so each crate straddles the two below it.
pub fn pyramid_layout(level: u32, base: Vec2) -> Vec<Vec2> {
    let cols = columns_for_level(level);
    let rows = rows_for_level(level);
    let mut positions = Vec::with_capacity(target_count(level));

    for r in 0..rows {
        let stagger = if r % 2 == 1 { TARGET_WIDTH / 2.0 } else { 0.0 };
        let y = base.y - r as f32 * (TARGET_HEIGHT + TARGET_GAP_Y);
        for c in 0..row_len(cols, r) {
            let x = base.x + c as f32 * (TARGET_WIDTH + TARGET_GAP_X) + stagger;
            positions.push(Vec2::new(x, y));
        }
    }

    positions
}

/// Playfield size and the fixed anchors derived from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(ARENA_WIDTH, ARENA_HEIGHT)
    }
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Arena sized to a container width (capped at 1000, 5:3 aspect)
    pub fn for_container(client_width: f32) -> Self {
        let width = client_width.min(ARENA_WIDTH);
        Self::new(width, (width * 0.6).round())
    }

    /// Where the pumpkin rests while armed
    pub fn sling_anchor(&self) -> Vec2 {
        Vec2::new(self.width * 0.18, self.height * 0.72)
    }

    /// Bottom-left crate of every pyramid
    pub fn target_base(&self) -> Vec2 {
        Vec2::new(self.width * 0.64, self.height * 0.72)
    }

    /// Shooter spawn point, standing on the floor
    pub fn player_spawn(&self) -> Vec2 {
        Vec2::new(self.width * 0.1, self.height - PLAYER_HEIGHT / 2.0 - 1.0)
    }

    pub fn bounds(&self) -> Region {
        Region::new(Vec2::ZERO, Vec2::new(self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_level_one_pyramid() {
        assert_eq!(columns_for_level(1), 3);
        assert_eq!(rows_for_level(1), 3);
        assert_eq!(target_count(1), 8);

        let base = Vec2::new(640.0, 432.0);
        let layout = pyramid_layout(1, base);
        assert_eq!(layout.len(), 8);
        assert_eq!(layout[0], base);
        // Second row starts half a crate in and one row up
        assert_eq!(layout[3], Vec2::new(base.x + 18.0, base.y - 31.0));
        assert_eq!(layout[5], Vec2::new(base.x, base.y - 62.0));
    }

    #[test]
    fn test_caps() {
        assert_eq!(columns_for_level(3), 5);
        assert_eq!(columns_for_level(50), 5);
        assert_eq!(rows_for_level(4), 5);
        assert_eq!(rows_for_level(50), 5);
        assert_eq!(target_count(50), 5 + 4 + 5 + 4 + 5);
    }

    #[test]
    fn test_shots_for_level() {
        assert_eq!(shots_for_level(1), 3);
        assert_eq!(shots_for_level(2), 3);
        assert_eq!(shots_for_level(3), 4);
        assert_eq!(shots_for_level(5), 5);
        assert_eq!(shots_for_level(99), 5);
    }

    #[test]
    fn test_arena_for_container() {
        let arena = Arena::for_container(1400.0);
        assert_eq!(arena.width, 1000.0);
        assert_eq!(arena.height, 600.0);
        let arena = Arena::for_container(500.0);
        assert_eq!(arena.height, 300.0);
    }

    proptest! {
        #[test]
        fn prop_count_matches_formula(level in 1u32..200) {
            let cols = (2 + level).min(5);
            let rows = (3 + level / 2).min(5);
            let expected: u32 = (0..rows).map(|r| cols - r % 2).sum();
            prop_assert_eq!(target_count(level), expected as usize);
            prop_assert_eq!(pyramid_layout(level, Vec2::ZERO).len(), expected as usize);
        }

        #[test]
        fn prop_layout_is_deterministic(level in 1u32..50, x in 0.0f32..1000.0, y in 0.0f32..600.0) {
            let base = Vec2::new(x, y);
            prop_assert_eq!(pyramid_layout(level, base), pyramid_layout(level, base));
        }

        #[test]
        fn prop_crates_never_overlap(level in 1u32..20) {
            let layout = pyramid_layout(level, Vec2::new(600.0, 400.0));
            for (i, a) in layout.iter().enumerate() {
                for b in &layout[i + 1..] {
                    let d = (*a - *b).abs();
                    prop_assert!(d.x >= TARGET_WIDTH || d.y >= TARGET_HEIGHT);
                }
            }
        }
    }
}
