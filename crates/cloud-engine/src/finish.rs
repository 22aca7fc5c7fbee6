//! Pass 5: break up grid regularity left by the density equalizer.
//!
//! Items relocated into voxels sit in visibly regular patterns; a small
//! high-frequency displacement hides that. This pass only re-clamps to the
//! global sphere. It does not re-check ownership or allocated volumes, so a
//! nudge may carry an item a little past its cell border.

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::hash::noise_vector;
use crate::layout::Layout;

const FINISH_SALT: u64 = 0x4649_4E49;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinishReport {
    pub displaced: usize,
    pub clamped: usize,
    /// Maximum per-axis displacement used
    pub amplitude: f32,
}

/// Displaces every placed item by fine-scale noise, then clamps.
pub fn break_regularity(layout: &mut Layout, config: &LayoutConfig) -> FinishReport {
    let settings = &config.finish;
    let voxel_size = 2.0 * layout.sphere.radius / config.density.grid_resolution.max(1) as f32;
    let amplitude = settings.amplitude_factor * voxel_size;
    let mut report = FinishReport {
        amplitude,
        ..FinishReport::default()
    };
    if !(amplitude.is_finite() && amplitude > 0.0 && settings.fine_scale.is_finite()) {
        return report;
    }

    let hash = config.noise.hash.hasher();
    let seed = config.noise.seed;
    let sphere = layout.sphere;

    for item in layout.items.iter_mut().filter(|item| item.placed) {
        let offset = noise_vector(hash, seed, FINISH_SALT, item.position * settings.fine_scale);
        let moved = item.position + offset * amplitude;
        if moved != item.position {
            report.displaced += 1;
        }
        item.position = match sphere.clamp(moved) {
            Some(inside) => {
                report.clamped += 1;
                inside
            }
            None => moved,
        };
    }

    tracing::debug!(
        "Final noise: {} displaced, {} clamped (amplitude {:.3})",
        report.displaced,
        report.clamped,
        amplitude
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingSphere;
    use crate::layout::{Anchor, LayoutItem};
    use glam::Vec3;

    fn layout(config: &LayoutConfig) -> Layout {
        let items = (0..50)
            .map(|i| LayoutItem {
                position: Vec3::new(i as f32 - 25.0, (i % 7) as f32, 0.0),
                placed: true,
                ..LayoutItem::new(format!("post_{}", i), Some(0))
            })
            .collect();
        Layout::new(
            BoundingSphere::new(config.sphere.radius),
            vec![Anchor::new("a", Vec3::ZERO)],
            items,
            config,
        )
    }

    #[test]
    fn test_displacement_bounded_by_voxel_fraction() {
        let config = LayoutConfig::with_radius(80.0);
        let mut layout = layout(&config);
        let before = layout.items.clone();

        let report = break_regularity(&mut layout, &config);
        // 0.3 * (160 / 16)
        assert!((report.amplitude - 3.0).abs() < 1e-5);
        assert!(report.displaced > 0);
        for (old, new) in before.iter().zip(&layout.items) {
            assert!((new.position - old.position).abs().max_element() <= 3.0 + 1e-4);
        }
    }

    #[test]
    fn test_items_stay_in_sphere() {
        let config = LayoutConfig::with_radius(26.0);
        let mut layout = layout(&config);
        // Start with everything clamped in
        let sphere = layout.sphere;
        crate::clamp::clamp_to_sphere(&mut layout.items, &sphere);

        break_regularity(&mut layout, &config);
        assert!(layout
            .items
            .iter()
            .all(|item| layout.sphere.contains(item.position)));
    }

    #[test]
    fn test_flags_left_alone() {
        let config = LayoutConfig::with_radius(80.0);
        let mut layout = layout(&config);
        for item in &mut layout.items {
            item.flags = cloud_records::ItemFlags::settled();
        }

        break_regularity(&mut layout, &config);
        assert!(layout.items.iter().all(|item| item.flags.is_settled()));
    }

    #[test]
    fn test_zero_amplitude_noop() {
        let mut config = LayoutConfig::with_radius(80.0);
        config.finish.amplitude_factor = 0.0;
        let mut layout = layout(&config);
        let before = layout.items.clone();

        let report = break_regularity(&mut layout, &config);
        assert_eq!(report.displaced, 0);
        assert_eq!(layout.items, before);
    }

    #[test]
    fn test_non_finite_amplitude_noop() {
        // Bypasses validation, as a caller building the config in code might
        let mut config = LayoutConfig::with_radius(80.0);
        config.finish.amplitude_factor = f32::INFINITY;
        let mut layout = layout(&config);
        let before = layout.items.clone();

        break_regularity(&mut layout, &config);
        assert_eq!(layout.items, before);

        config.finish.amplitude_factor = 0.3;
        config.finish.fine_scale = f32::NAN;
        break_regularity(&mut layout, &config);
        assert!(layout.items.iter().all(|item| item.position.is_finite()));
    }
}
