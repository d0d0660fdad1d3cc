//! Continuous collision detection for a circle against axis-aligned platforms
//!
//! The avatar is a circle moving along a segment during each sub-step. Each
//! platform is inflated by the circle radius (Minkowski sum, corners treated
//! as square) so the test becomes a ray against a box, solved with slabs.

use glam::Vec2;

use super::state::Rect;

/// Slab times closer than this to zero count as "at the start"
const TOI_EPSILON: f32 = 1e-6;
/// Displacements shorter than this are treated as no motion
const MIN_MOTION: f32 = 1e-6;

/// Earliest contact along a motion segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Index of the rectangle that was hit
    pub index: usize,
    /// Time of impact as a fraction of the segment, in [0, 1]
    pub toi: f32,
    /// Circle center at the moment of contact
    pub point: Vec2,
    /// Face normal, pointing from the platform toward the circle
    pub normal: Vec2,
}

/// Swept test of one circle against one rectangle
///
/// Returns `(toi, normal)` for the first contact of a circle of `radius`
/// moving from `start` to `end`. Contacts the circle is leaving are ignored,
/// so an avatar resting on a face can move off it. A circle that already
/// overlaps the rectangle while moving deeper reports `toi == 0`.
pub fn sweep_circle_rect(start: Vec2, end: Vec2, radius: f32, rect: &Rect) -> Option<(f32, Vec2)> {
    if !start.is_finite() || !end.is_finite() {
        return None;
    }
    let motion = end - start;
    if motion.length_squared() < MIN_MOTION * MIN_MOTION {
        return None;
    }

    let bounds = rect.inflate(radius);
    let lo = bounds.min().to_array();
    let hi = bounds.max().to_array();
    let s = start.to_array();
    let d = motion.to_array();

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut entry_normal = Vec2::ZERO;

    for axis in 0..2 {
        if d[axis].abs() < MIN_MOTION {
            // Parallel to this slab: must already be between its planes
            if s[axis] < lo[axis] || s[axis] > hi[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d[axis];
        let mut t_near = (lo[axis] - s[axis]) * inv;
        let mut t_far = (hi[axis] - s[axis]) * inv;
        if t_near > t_far {
            std::mem::swap(&mut t_near, &mut t_far);
        }

        if t_near > t_enter {
            t_enter = t_near;
            let mut n = [0.0, 0.0];
            n[axis] = -d[axis].signum();
            entry_normal = Vec2::from_array(n);
        }
        t_exit = t_exit.min(t_far);

        if t_enter > t_exit {
            return None;
        }
    }

    // Box behind us, or we are leaving it right at the start
    if t_exit <= TOI_EPSILON || t_enter > 1.0 {
        return None;
    }

    let toi = t_enter.max(0.0);
    let point = start + motion * toi;

    // Dominant axis of the impact offset picks the face; the slab entry axis
    // settles corners where that face is not being approached.
    let refined = dominant_normal(point, &bounds);
    let normal = if motion.dot(refined) < 0.0 {
        refined
    } else {
        entry_normal
    };

    Some((toi, normal))
}

/// Face normal from the offset to the box center, normalized by half extents
pub fn dominant_normal(point: Vec2, bounds: &Rect) -> Vec2 {
    let half = bounds.half_extents().max(Vec2::splat(f32::EPSILON));
    let rel = (point - bounds.center()) / half;
    if rel.x.abs() > rel.y.abs() {
        Vec2::new(rel.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, rel.y.signum())
    }
}

/// Find the earliest contact between a moving circle and a set of rectangles
///
/// Broad phase rejects rectangles outside the motion's bounding box (grown by
/// the radius). Ties on time of impact keep the earlier rectangle.
pub fn sweep_circle<'a, I>(start: Vec2, end: Vec2, radius: f32, rects: I) -> Option<SweepHit>
where
    I: IntoIterator<Item = &'a Rect>,
{
    let motion_bounds = Rect::spanning(start, end).inflate(radius);
    let mut best: Option<SweepHit> = None;

    for (index, rect) in rects.into_iter().enumerate() {
        if !motion_bounds.overlaps(rect) {
            continue;
        }
        if let Some((toi, normal)) = sweep_circle_rect(start, end, radius, rect) {
            if best.is_none_or(|b| toi < b.toi) {
                best = Some(SweepHit {
                    index,
                    toi,
                    point: start + (end - start) * toi,
                    normal,
                });
            }
        }
    }

    best
}

/// Move a circle that has sunk into `rect` back out through the nearest face
///
/// The exit sits `skin` beyond the inflated face. Exits that would leave the
/// center outside `x_range` are skipped unless no face is usable. Returns the
/// new center and the face normal, or `None` when the center is not strictly
/// inside the inflated rectangle.
pub fn push_out(
    center: Vec2,
    radius: f32,
    rect: &Rect,
    skin: f32,
    x_range: (f32, f32),
) -> Option<(Vec2, Vec2)> {
    if !center.is_finite() {
        return None;
    }
    let bounds = rect.inflate(radius);
    let lo = bounds.min();
    let hi = bounds.max();
    if center.x <= lo.x || center.x >= hi.x || center.y <= lo.y || center.y >= hi.y {
        return None;
    }

    let exits = [
        (Vec2::new(center.x, lo.y - skin), Vec2::NEG_Y),
        (Vec2::new(center.x, hi.y + skin), Vec2::Y),
        (Vec2::new(lo.x - skin, center.y), Vec2::NEG_X),
        (Vec2::new(hi.x + skin, center.y), Vec2::X),
    ];
    let nearest = |candidates: &mut dyn Iterator<Item = (Vec2, Vec2)>| {
        candidates.min_by(|a, b| {
            a.0.distance_squared(center)
                .total_cmp(&b.0.distance_squared(center))
        })
    };

    let (min_x, max_x) = x_range;
    nearest(&mut exits.into_iter().filter(|(p, _)| p.x >= min_x && p.x <= max_x))
        .or_else(|| nearest(&mut exits.into_iter()))
}

/// Discrete overlap test (circle vs rectangle, exact at corners)
pub fn circle_overlaps_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let closest = center.clamp(rect.min(), rect.max());
    (center - closest).length_squared() < radius * radius
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}
