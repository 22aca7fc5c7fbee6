//! Sphere geometry and sampling helpers shared by the passes.

use glam::Vec3;
use rand::Rng;
use std::f32::consts::{PI, TAU};

/// Lengths below this are treated as zero when a direction is needed.
pub const DEGENERATE_LENGTH: f32 = 1e-6;

/// Relative tolerance of the global containment invariant.
pub const CONTAINMENT_TOLERANCE: f32 = 0.01;

/// Fraction of the radius items are pulled back to when clamped.
pub const CLAMP_MARGIN: f32 = 0.99;

/// The sphere every item must end up inside. Centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(radius: f32) -> Self {
        Self {
            center: Vec3::ZERO,
            radius,
        }
    }

    pub fn volume(&self) -> f32 {
        ball_volume(self.radius)
    }

    /// True if the point lies inside or on the sphere.
    pub fn contains(&self, point: Vec3) -> bool {
        point.distance(self.center) <= self.radius
    }

    /// True if the point satisfies the containment invariant.
    pub fn contains_with_tolerance(&self, point: Vec3) -> bool {
        point.distance(self.center) <= self.radius * (1.0 + CONTAINMENT_TOLERANCE)
    }

    /// Pulls an outside point radially back to `CLAMP_MARGIN` of the radius.
    ///
    /// Returns `None` when the point was already inside.
    pub fn clamp(&self, point: Vec3) -> Option<Vec3> {
        let offset = point - self.center;
        let distance = offset.length();
        if distance <= self.radius {
            return None;
        }
        Some(self.center + offset * (self.radius * CLAMP_MARGIN / distance))
    }

    /// Like [`clamp`](Self::clamp) but always returns a position.
    pub fn clamped(&self, point: Vec3) -> Vec3 {
        self.clamp(point).unwrap_or(point)
    }
}

/// Volume of a ball with the given radius.
pub fn ball_volume(radius: f32) -> f32 {
    4.0 / 3.0 * PI * radius * radius * radius
}

/// Radius of a ball with the given volume.
pub fn radius_for_volume(volume: f32) -> f32 {
    (3.0 * volume / (4.0 * PI)).cbrt()
}

/// Uniformly distributed direction on the unit sphere.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..1.0);
    let theta: f32 = rng.gen_range(0.0..TAU);
    let ring = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(ring * theta.cos(), ring * theta.sin(), z)
}

/// Uniform-by-volume sample inside a ball: `r = R * cbrt(u)`.
pub fn sample_in_ball<R: Rng + ?Sized>(rng: &mut R, center: Vec3, radius: f32) -> Vec3 {
    let u: f32 = rng.gen();
    center + random_unit_vector(rng) * (radius * u.cbrt())
}

/// Normalizes `v`, or returns `fallback` if `v` is too short to have a direction.
pub fn direction_or(v: Vec3, fallback: Vec3) -> Vec3 {
    if v.length() < DEGENERATE_LENGTH {
        fallback
    } else {
        v.normalize()
    }
}

/// Direction `index` of `count` spread over the sphere on a golden-angle spiral.
pub fn spiral_direction(index: u32, count: u32, twist: f32) -> Vec3 {
    let golden_angle = PI * (3.0 - 5.0f32.sqrt());
    let y = 1.0 - (2.0 * index as f32 + 1.0) / count as f32;
    let ring = (1.0 - y * y).max(0.0).sqrt();
    let theta = golden_angle * index as f32 + twist;
    Vec3::new(ring * theta.cos(), y, ring * theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_volume_radius_inverse() {
        for r in [0.5f32, 1.0, 42.0, 300.0] {
            let back = radius_for_volume(ball_volume(r));
            assert!((back - r).abs() / r < 1e-4, "{} -> {}", r, back);
        }
    }

    #[test]
    fn test_clamp_outside_point() {
        let sphere = BoundingSphere::new(10.0);
        let clamped = sphere.clamp(Vec3::new(20.0, 0.0, 0.0)).unwrap();
        assert!((clamped.x - 9.9).abs() < 1e-5);
        assert!(sphere.contains(clamped));
    }

    #[test]
    fn test_clamp_inside_point_untouched() {
        let sphere = BoundingSphere::new(10.0);
        assert!(sphere.clamp(Vec3::new(3.0, 4.0, 0.0)).is_none());
        assert!(sphere.clamp(Vec3::ZERO).is_none());
        assert_eq!(sphere.clamped(Vec3::new(1.0, 1.0, 1.0)), Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_tolerance() {
        let sphere = BoundingSphere::new(100.0);
        assert!(sphere.contains_with_tolerance(Vec3::new(100.5, 0.0, 0.0)));
        assert!(!sphere.contains_with_tolerance(Vec3::new(101.5, 0.0, 0.0)));
    }

    #[test]
    fn test_random_unit_vector_is_unit() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..500 {
            let v = random_unit_vector(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_sample_in_ball_stays_inside() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let center = Vec3::new(5.0, -3.0, 2.0);
        for _ in 0..1000 {
            let p = sample_in_ball(&mut rng, center, 4.0);
            assert!(p.distance(center) <= 4.0 + 1e-4);
        }
    }

    #[test]
    fn test_sample_in_ball_fills_volume() {
        // Uniform by volume: about half the samples lie beyond r = R * cbrt(0.5).
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let inner = 0.5f32.cbrt();
        let outer_count = (0..4000)
            .map(|_| sample_in_ball(&mut rng, Vec3::ZERO, 1.0))
            .filter(|p| p.length() > inner)
            .count();
        assert!((1700..2300).contains(&outer_count), "outer = {}", outer_count);
    }

    #[test]
    fn test_direction_or_degenerate() {
        let fallback = Vec3::Y;
        assert_eq!(direction_or(Vec3::ZERO, fallback), fallback);
        assert_eq!(direction_or(Vec3::new(0.0, 0.0, 5.0), fallback), Vec3::Z);
    }

    #[test]
    fn test_spiral_directions_unit() {
        for i in 0..32 {
            let d = spiral_direction(i, 32, 0.3);
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }
}
