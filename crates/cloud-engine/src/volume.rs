//! Volume allocation: how much of the global sphere each anchor gets.
//!
//! With proportional allocation an anchor's share of the sphere volume
//! follows its share of the items, scaled by `volume_scale` so neighbouring
//! cells overlap and ownership (not geometry) settles the borders. Without
//! it every anchor receives the same volume.

use crate::config::AllocationConfig;
use crate::error::LayoutError;
use crate::geometry::{ball_volume, radius_for_volume};
use crate::layout::Anchor;

/// Computes allocated radii for anchors with the given item counts.
pub fn allocate_radii(
    item_counts: &[usize],
    sphere_radius: f32,
    config: &AllocationConfig,
) -> Result<Vec<f32>, LayoutError> {
    if item_counts.is_empty() {
        return Err(LayoutError::NoAnchors);
    }

    let total_volume = ball_volume(sphere_radius);
    let total_items: usize = item_counts.iter().sum();

    let radii = if config.proportional_volume && total_items > 0 {
        item_counts
            .iter()
            .map(|&count| {
                let share = count as f32 / total_items as f32;
                radius_for_volume(total_volume * share * config.volume_scale)
            })
            .collect()
    } else {
        let equal = radius_for_volume(total_volume / item_counts.len() as f32);
        vec![equal; item_counts.len()]
    };

    Ok(radii)
}

/// Allocates radii in place from each anchor's `item_count`.
pub fn assign_radii(
    anchors: &mut [Anchor],
    sphere_radius: f32,
    config: &AllocationConfig,
) -> Result<(), LayoutError> {
    let counts: Vec<usize> = anchors.iter().map(|a| a.item_count).collect();
    let radii = allocate_radii(&counts, sphere_radius, config)?;
    for (anchor, radius) in anchors.iter_mut().zip(radii) {
        anchor.allocated_radius = radius;
    }
    Ok(())
}
