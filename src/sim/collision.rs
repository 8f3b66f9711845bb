//! Contact tests between circles and axis-aligned boxes
//!
//! Every contact reports a normal pointing from the second shape toward the
//! first, so pushing the first shape along it separates the pair.

use glam::Vec2;

/// Result of a contact check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether the shapes overlap
    pub hit: bool,
    /// Separation direction for the first shape
    pub normal: Vec2,
    /// Overlap depth
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }

    /// Swap which shape the normal points toward
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Signed distance to a circle
#[inline]
pub fn sd_circle(p: Vec2, center: Vec2, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// Signed distance to an axis-aligned box
#[inline]
pub fn sd_box(p: Vec2, center: Vec2, half_extents: Vec2) -> f32 {
    let q = (p - center).abs() - half_extents;
    q.max(Vec2::ZERO).length() + q.x.max(q.y).min(0.0)
}

/// Circle `a` against circle `b`
pub fn circle_circle_collision(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> CollisionResult {
    let delta = a - b;
    let dist = delta.length();
    let reach = radius_a + radius_b;
    if dist >= reach {
        return CollisionResult::miss();
    }

    // Coincident centres: separate sideways
    let normal = if dist > f32::EPSILON { delta / dist } else { Vec2::X };
    CollisionResult {
        hit: true,
        normal,
        penetration: reach - dist,
    }
}

/// Circle against an axis-aligned box centred at `box_center`
pub fn circle_box_collision(
    circle: Vec2,
    radius: f32,
    box_center: Vec2,
    half_extents: Vec2,
) -> CollisionResult {
    let local = circle - box_center;
    let closest = local.clamp(-half_extents, half_extents);

    if closest == local {
        // Centre is inside the box: push out through the nearest face
        let dx = half_extents.x - local.x.abs();
        let dy = half_extents.y - local.y.abs();
        let (normal, depth) = if dx < dy {
            (Vec2::new(local.x.signum(), 0.0), dx)
        } else {
            (Vec2::new(0.0, local.y.signum()), dy)
        };
        return CollisionResult {
            hit: true,
            normal,
            penetration: depth + radius,
        };
    }

    let delta = local - closest;
    let dist = delta.length();
    if dist >= radius {
        return CollisionResult::miss();
    }

    CollisionResult {
        hit: true,
        normal: delta / dist,
        penetration: radius - dist,
    }
}
