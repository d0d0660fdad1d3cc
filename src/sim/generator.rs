//! Procedural platform shaft
//!
//! Platforms are generated upward (decreasing y) ahead of the camera and
//! dropped once they scroll out of reach below it. The active list stays
//! sorted by id, which is also descending y.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::state::{Platform, PlatformKind, Rect};
use crate::settings::WorldTuning;

/// Seeded platform generator owning the active platform set
#[derive(Debug, Clone)]
pub struct WorldGenerator {
    tuning: WorldTuning,
    rng: Pcg32,
    platforms: Vec<Platform>,
    /// Top y of the most recently generated platform
    highest_y: f32,
    next_id: u32,
}

impl WorldGenerator {
    pub fn new(tuning: WorldTuning, seed: u64) -> Self {
        let highest_y = tuning.floor_y;
        Self {
            tuning,
            rng: Pcg32::seed_from_u64(seed),
            platforms: Vec::new(),
            highest_y,
            next_id: 1,
        }
    }

    /// Active platforms, lowest first
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn highest_y(&self) -> f32 {
        self.highest_y
    }

    fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Reset to a floor plus a pre-populated stretch of platforms above it
    pub fn generate_initial(&mut self) {
        self.platforms.clear();

        let floor = Platform {
            id: self.next_entity_id(),
            kind: PlatformKind::Floor,
            rect: Rect::new(
                0.0,
                self.tuning.floor_y,
                self.tuning.width,
                self.tuning.floor_height,
            ),
        };
        self.highest_y = floor.rect.y;
        self.platforms.push(floor);

        for _ in 0..self.tuning.initial_platforms {
            self.generate_next();
        }
        log::debug!(
            "Generated initial world: {} platforms up to y={:.0}",
            self.platforms.len(),
            self.highest_y
        );
    }

    /// Add one platform a random gap above the current highest
    pub fn generate_next(&mut self) -> &Platform {
        let t = &self.tuning;
        let gap = self.rng.random_range(t.gap_min..=t.gap_max);
        let kind = self.pick_kind();

        let t = &self.tuning;
        let (w, h) = match kind {
            PlatformKind::Vertical => (
                t.vertical_width,
                self.rng.random_range(t.vertical_height_min..=t.vertical_height_max),
            ),
            _ => (
                self.rng.random_range(t.platform_width_min..=t.platform_width_max),
                t.platform_thickness,
            ),
        };
        let x = self.rng.random_range(0.0..=(t.width - w).max(0.0));
        let y = self.highest_y - gap;

        let platform = Platform {
            id: self.next_entity_id(),
            kind,
            rect: Rect::new(x, y, w, h),
        };
        self.highest_y = y;
        self.platforms.push(platform);
        // Just pushed
        &self.platforms[self.platforms.len() - 1]
    }

    /// Weighted material draw
    fn pick_kind(&mut self) -> PlatformKind {
        let t = &self.tuning;
        let total = t.weight_normal + t.weight_bouncy + t.weight_vertical;
        let roll = self.rng.random_range(0..total.max(1));
        if roll < t.weight_normal {
            PlatformKind::Normal
        } else if roll < t.weight_normal + t.weight_bouncy {
            PlatformKind::Bouncy
        } else {
            PlatformKind::Vertical
        }
    }

    /// Generate until the top of the shaft is a lookahead above the camera
    pub fn extend(&mut self, camera_offset: f32) -> usize {
        let mut added = 0;
        while camera_offset - self.tuning.lookahead < self.highest_y {
            self.generate_next();
            added += 1;
        }
        added
    }

    /// Drop platforms that scrolled far enough below the viewport
    pub fn prune(&mut self, camera_offset: f32) -> usize {
        let cutoff = camera_offset + self.tuning.viewport_height + self.tuning.prune_margin;
        let before = self.platforms.len();
        self.platforms.retain(|p| p.rect.y <= cutoff);
        before - self.platforms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> WorldGenerator {
        let mut g = WorldGenerator::new(WorldTuning::default(), seed);
        g.generate_initial();
        g
    }

    #[test]
    fn test_initial_world_has_floor_and_platforms() {
        let g = generator(42);
        let tuning = WorldTuning::default();
        let platforms = g.platforms();
        assert_eq!(platforms.len(), 1 + tuning.initial_platforms as usize);
        assert_eq!(platforms[0].kind, PlatformKind::Floor);
        assert_eq!(platforms[0].rect.w, tuning.width);
        assert!(platforms[1..].iter().all(|p| p.kind != PlatformKind::Floor));
    }

    #[test]
    fn test_gaps_and_bounds() {
        let mut g = generator(7);
        let tuning = WorldTuning::default();
        for _ in 0..200 {
            g.generate_next();
        }
        for pair in g.platforms().windows(2) {
            let gap = pair[0].rect.y - pair[1].rect.y;
            // f32 rounding at large |y|
            let tol = 1e-2;
            assert!(gap >= tuning.gap_min - tol && gap <= tuning.gap_max + tol, "gap {gap}");
        }
        for p in g.platforms() {
            assert!(p.rect.x >= 0.0);
            assert!(p.rect.x + p.rect.w <= tuning.width + 1e-3);
            assert!(p.rect.h >= tuning.platform_thickness.min(tuning.vertical_height_min));
        }
    }

    #[test]
    fn test_vertical_platforms_are_tall_and_narrow() {
        let mut g = generator(3);
        for _ in 0..300 {
            g.generate_next();
        }
        let verticals: Vec<_> = g
            .platforms()
            .iter()
            .filter(|p| p.kind == PlatformKind::Vertical)
            .collect();
        assert!(!verticals.is_empty());
        assert!(verticals.iter().all(|p| p.rect.h > p.rect.w));
    }

    #[test]
    fn test_same_seed_same_world() {
        let a = generator(1234);
        let b = generator(1234);
        let ys_a: Vec<f32> = a.platforms().iter().map(|p| p.rect.y).collect();
        let ys_b: Vec<f32> = b.platforms().iter().map(|p| p.rect.y).collect();
        assert_eq!(ys_a, ys_b);
    }

    #[test]
    fn test_extend_reaches_lookahead() {
        let mut g = generator(5);
        let camera = -3000.0;
        let added = g.extend(camera);
        assert!(added > 0);
        assert!(g.highest_y() <= camera - WorldTuning::default().lookahead);
        assert_eq!(g.extend(camera), 0);
    }

    #[test]
    fn test_prune_drops_only_far_below() {
        let mut g = generator(9);
        let tuning = WorldTuning::default();
        let camera = -1000.0;
        g.extend(camera);
        let removed = g.prune(camera);
        assert!(removed > 0);
        let cutoff = camera + tuning.viewport_height + tuning.prune_margin;
        assert!(g.platforms().iter().all(|p| p.rect.y <= cutoff));
        // Floor at y=560 is gone
        assert!(g.platforms().iter().all(|p| p.kind != PlatformKind::Floor));
    }
}
