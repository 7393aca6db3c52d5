//! Narrow-phase collision detection
//!
//! Exact overlap tests for every ordered pair of shape kinds. All tests return
//! a normal pointing from the first shape toward the second, so
//! `collide(b, a)` is `collide(a, b)` with the normal negated.
//!
//! Known limitation: boxes are axis-aligned. The owning transform's rotation is
//! ignored by both box tests.

use glam::Vec2;

use super::collider::Shape;
use crate::consts::FALLBACK_NORMAL;
use crate::sign_or_one;

/// Result of a positive overlap test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifold {
    /// Unit vector from the first shape toward the second
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub depth: f32,
}

impl Manifold {
    /// Same contact seen from the other shape
    #[inline]
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            depth: self.depth,
        }
    }
}

/// Test two world-space shapes for overlap
pub fn collide(pos_a: Vec2, a: &Shape, pos_b: Vec2, b: &Shape) -> Option<Manifold> {
    match (*a, *b) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(pos_a, ra, pos_b, rb)
        }
        (Shape::Circle { radius }, Shape::Box { half_extents }) => {
            circle_box(pos_a, radius, pos_b, half_extents)
        }
        (Shape::Box { half_extents }, Shape::Circle { radius }) => {
            circle_box(pos_b, radius, pos_a, half_extents).map(Manifold::flipped)
        }
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            box_box(pos_a, ha, pos_b, hb)
        }
    }
}

/// Circle vs circle
pub fn circle_circle(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> Option<Manifold> {
    let d = pos_b - pos_a;
    let r = radius_a + radius_b;
    if d.length_squared() >= r * r {
        return None;
    }

    let dist = d.length();
    // Coincident centers: any direction works, pick a fixed one
    let normal = if dist == 0.0 { FALLBACK_NORMAL } else { d / dist };
    Some(Manifold {
        normal,
        depth: r - dist,
    })
}

/// Circle vs axis-aligned box, normal from circle toward box
pub fn circle_box(
    circle_pos: Vec2,
    radius: f32,
    box_pos: Vec2,
    half_extents: Vec2,
) -> Option<Manifold> {
    let d = box_pos - circle_pos;
    let mut closest = d.clamp(-half_extents, half_extents);

    if closest == d {
        // Circle center inside the box: push out along the axis with the smaller margin
        let margin_x = half_extents.x - d.x.abs();
        let margin_y = half_extents.y - d.y.abs();
        let normal = if margin_x < margin_y {
            closest.x = sign_or_one(d.x) * half_extents.x;
            Vec2::new(sign_or_one(d.x), 0.0)
        } else {
            closest.y = sign_or_one(d.y) * half_extents.y;
            Vec2::new(0.0, sign_or_one(d.y))
        };
        let depth = (radius - (closest - d).length()).max(0.0);
        return Some(Manifold { normal, depth });
    }

    let offset = d - closest;
    let dist_sq = offset.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }
    let dist = dist_sq.sqrt();
    Some(Manifold {
        normal: offset / dist,
        depth: radius - dist,
    })
}

/// Axis-aligned box vs axis-aligned box
pub fn box_box(pos_a: Vec2, half_a: Vec2, pos_b: Vec2, half_b: Vec2) -> Option<Manifold> {
    let d = pos_b - pos_a;
    let overlap = half_a + half_b - d.abs();
    if overlap.x <= 0.0 || overlap.y <= 0.0 {
        return None;
    }

    if overlap.x < overlap.y {
        Some(Manifold {
            normal: Vec2::new(sign_or_one(d.x), 0.0),
            depth: overlap.x,
        })
    } else {
        Some(Manifold {
            normal: Vec2::new(0.0, sign_or_one(d.y)),
            depth: overlap.y,
        })
    }
}
