//! Layout statistics
//!
//! Summarizes how well a finished layout honors containment, ownership and
//! density, for logging and for hosts that want to show quality numbers.

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::density::count_empty_voxels;
use crate::layout::Layout;
use crate::ownership::OwnershipClassifier;

/// Statistics for a single anchor
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnchorStats {
    pub id: String,
    pub item_count: usize,
    pub placed: usize,
    pub allocated_radius: f32,
    pub in_volume: usize,
    pub owned: usize,
    pub blended: usize,
    /// Mean distance of placed items from the anchor
    pub mean_distance: f32,
}

/// How far items sit from the center, in thirds of the radius
#[derive(Debug, Clone, Default, Serialize)]
pub struct RadialDistribution {
    pub inner: usize,  // < R/3
    pub middle: usize, // R/3 - 2R/3
    pub outer: usize,  // > 2R/3
}

/// Overall layout statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayoutStats {
    pub total_items: usize,
    pub placed: usize,
    pub unplaced: usize,
    pub unowned: usize,
    /// Largest `|p| / R` over placed items
    pub max_radius_ratio: f32,
    /// Placed items violating the containment tolerance
    pub outside_tolerance: usize,
    /// Fraction of placed owned items their anchor owns
    pub owned_fraction: f32,
    /// Fraction of placed owned items inside their allocated sphere
    pub in_volume_fraction: f32,
    pub empty_voxels: usize,
    pub in_sphere_voxels: usize,
    pub radial: RadialDistribution,
    pub anchors: Vec<AnchorStats>,
}

impl LayoutStats {
    /// Computes statistics for the layout as it stands.
    pub fn collect(layout: &Layout, config: &LayoutConfig) -> Self {
        let classifier = OwnershipClassifier::new(&layout.anchors, config.ownership.permissiveness);
        let sphere = &layout.sphere;
        let mut stats = LayoutStats {
            total_items: layout.items.len(),
            ..LayoutStats::default()
        };
        let mut anchors: Vec<AnchorStats> = layout
            .anchors
            .iter()
            .map(|anchor| AnchorStats {
                id: anchor.id.clone(),
                item_count: anchor.item_count,
                allocated_radius: anchor.allocated_radius,
                ..AnchorStats::default()
            })
            .collect();
        let mut distance_sums = vec![0.0f32; anchors.len()];

        for item in &layout.items {
            if !item.placed {
                stats.unplaced += 1;
                continue;
            }
            stats.placed += 1;

            let ratio = item.position.distance(sphere.center) / sphere.radius;
            stats.max_radius_ratio = stats.max_radius_ratio.max(ratio);
            if !sphere.contains_with_tolerance(item.position) {
                stats.outside_tolerance += 1;
            }
            if ratio < 1.0 / 3.0 {
                stats.radial.inner += 1;
            } else if ratio < 2.0 / 3.0 {
                stats.radial.middle += 1;
            } else {
                stats.radial.outer += 1;
            }

            let Some(owner) = item.anchor.filter(|owner| *owner < anchors.len()) else {
                stats.unowned += 1;
                continue;
            };
            let flags = classifier.flags_for(item.position, owner);
            let entry = &mut anchors[owner];
            entry.placed += 1;
            entry.in_volume += usize::from(flags.in_allocated_volume);
            entry.owned += usize::from(flags.in_voronoi_cell);
            entry.blended += usize::from(flags.in_blended_area);
            distance_sums[owner] += item.position.distance(layout.anchors[owner].position);
        }

        for (entry, sum) in anchors.iter_mut().zip(distance_sums) {
            if entry.placed > 0 {
                entry.mean_distance = sum / entry.placed as f32;
            }
        }

        let owned_placed: usize = anchors.iter().map(|a| a.placed).sum();
        if owned_placed > 0 {
            let owned: usize = anchors.iter().map(|a| a.owned).sum();
            let in_volume: usize = anchors.iter().map(|a| a.in_volume).sum();
            stats.owned_fraction = owned as f32 / owned_placed as f32;
            stats.in_volume_fraction = in_volume as f32 / owned_placed as f32;
        }

        let resolution = config.density.grid_resolution;
        stats.empty_voxels = count_empty_voxels(&layout.items, sphere, resolution);
        stats.in_sphere_voxels = crate::density::VoxelGrid::new(sphere, resolution).in_sphere_count();
        stats.anchors = anchors;
        stats
    }

    /// Logs a one-line summary.
    pub fn log_summary(&self) {
        tracing::info!(
            "Layout stats: {}/{} placed, max radius ratio {:.3}, {:.1}% owned, {}/{} voxels empty",
            self.placed,
            self.total_items,
            self.max_radius_ratio,
            self.owned_fraction * 100.0,
            self.empty_voxels,
            self.in_sphere_voxels
        );
    }
}
