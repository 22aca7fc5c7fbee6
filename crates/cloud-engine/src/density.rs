//! Pass 4: density equalization over a voxel grid.
//!
//! The cube enclosing the global sphere is cut into `N³` voxels; voxels whose
//! center lies inside the sphere are the ones that should hold items. Each
//! round buckets the items, then pulls a few items out of over-dense voxels
//! into empty ones. Donors never drop below the target occupancy, so the
//! number of empty in-sphere voxels can only go down.

use std::collections::BTreeMap;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{DensityConfig, LayoutConfig};
use crate::geometry::BoundingSphere;
use crate::layout::{Anchor, Layout, LayoutItem};
use crate::ownership::OwnershipClassifier;
use crate::par::maybe_par_iter;

const DENSITY_SALT: u64 = 0xD3E5_1771;

/// Jittered relocations stay this far from the voxel faces.
const JITTER_MIN: f32 = 0.15;
const JITTER_MAX: f32 = 0.85;
const JITTER_ATTEMPTS: usize = 8;

/// Occupied voxels only, keyed by voxel index.
pub type VoxelBuckets = BTreeMap<usize, Vec<usize>>;

/// A regular grid over the cube `[c - R, c + R]³`.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    resolution: usize,
    origin: Vec3,
    voxel_size: f32,
    in_sphere: Vec<bool>,
}

impl VoxelGrid {
    pub fn new(sphere: &BoundingSphere, resolution: usize) -> Self {
        let resolution = resolution.max(1);
        let origin = sphere.center - Vec3::splat(sphere.radius);
        let voxel_size = 2.0 * sphere.radius / resolution as f32;
        let mut grid = Self {
            resolution,
            origin,
            voxel_size,
            in_sphere: Vec::new(),
        };
        grid.in_sphere = (0..grid.len())
            .map(|index| sphere.contains(grid.center(index)))
            .collect();
        grid
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Total number of voxels, inside the sphere or not.
    pub fn len(&self) -> usize {
        self.resolution * self.resolution * self.resolution
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Voxel containing `point`; points outside the cube map to the nearest edge voxel.
    pub fn index_of(&self, point: Vec3) -> usize {
        let max = (self.resolution - 1) as f32;
        let cell = ((point - self.origin) / self.voxel_size)
            .floor()
            .clamp(Vec3::ZERO, Vec3::splat(max));
        let (x, y, z) = (cell.x as usize, cell.y as usize, cell.z as usize);
        (z * self.resolution + y) * self.resolution + x
    }

    fn coords(&self, index: usize) -> Vec3 {
        let n = self.resolution;
        Vec3::new(
            (index % n) as f32,
            ((index / n) % n) as f32,
            (index / (n * n)) as f32,
        )
    }

    pub fn min_corner(&self, index: usize) -> Vec3 {
        self.origin + self.coords(index) * self.voxel_size
    }

    pub fn center(&self, index: usize) -> Vec3 {
        self.min_corner(index) + Vec3::splat(self.voxel_size * 0.5)
    }

    /// Whether the voxel center lies inside the sphere.
    pub fn is_in_sphere(&self, index: usize) -> bool {
        self.in_sphere.get(index).copied().unwrap_or(false)
    }

    pub fn in_sphere_count(&self) -> usize {
        self.in_sphere.iter().filter(|inside| **inside).count()
    }

    /// Item indices per occupied voxel. Unplaced items are ignored.
    pub fn bucket(&self, items: &[LayoutItem]) -> VoxelBuckets {
        let cells: Vec<Option<usize>> = maybe_par_iter!(items)
            .map(|item: &LayoutItem| item.placed.then(|| self.index_of(item.position)))
            .collect();

        let mut buckets = VoxelBuckets::new();
        for (item, cell) in cells.into_iter().enumerate() {
            if let Some(cell) = cell {
                buckets.entry(cell).or_default().push(item);
            }
        }
        buckets
    }

    /// In-sphere voxels holding no item.
    pub fn empty_in_sphere(&self, buckets: &VoxelBuckets) -> Vec<usize> {
        self.in_sphere
            .iter()
            .enumerate()
            .filter(|(index, inside)| **inside && !buckets.contains_key(index))
            .map(|(index, _)| index)
            .collect()
    }
}

/// Number of empty in-sphere voxels for the given items.
pub fn count_empty_voxels(items: &[LayoutItem], sphere: &BoundingSphere, resolution: usize) -> usize {
    let grid = VoxelGrid::new(sphere, resolution);
    grid.empty_in_sphere(&grid.bucket(items)).len()
}

/// Outcome of an equalization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DensityReport {
    pub rounds: usize,
    /// Target occupancy per in-sphere voxel
    pub target: usize,
    pub in_sphere_voxels: usize,
    pub empty_before: usize,
    pub empty_after: usize,
    /// Relocations performed, counting repeat moves of the same item
    pub moved: usize,
    /// Stopped before the round cap: either no empty voxels remain or a round
    /// filled fewer than the convergence threshold
    pub converged: bool,
    pub hit_round_cap: bool,
}

struct Donor {
    voxel: usize,
    center: Vec3,
    items: Vec<usize>,
}

/// Redistributes items from over-dense voxels into empty ones.
pub fn equalize(layout: &mut Layout, config: &LayoutConfig) -> DensityReport {
    let settings = &config.density;
    let grid = VoxelGrid::new(&layout.sphere, settings.grid_resolution);
    let sphere = layout.sphere;
    let anchors = &layout.anchors;
    let items = &mut layout.items;
    let classifier = OwnershipClassifier::new(anchors, config.ownership.permissiveness);

    let total = items.iter().filter(|item| item.placed).count();
    let in_sphere = grid.in_sphere_count();
    let mut report = DensityReport {
        in_sphere_voxels: in_sphere,
        ..DensityReport::default()
    };
    if total == 0 || in_sphere == 0 {
        report.converged = true;
        return report;
    }

    let target = (total + in_sphere - 1) / in_sphere;
    let quota = ((settings.pull_fraction * target as f32).floor() as usize).max(1);
    report.target = target;

    let mut rng = ChaCha8Rng::seed_from_u64(config.noise.seed ^ DENSITY_SALT);
    let mut empty = grid.empty_in_sphere(&grid.bucket(items)).len();
    report.empty_before = empty;

    loop {
        if empty == 0 {
            report.converged = true;
            break;
        }
        if report.rounds >= settings.max_rounds {
            report.hit_round_cap = true;
            break;
        }

        let buckets = grid.bucket(items);
        let empties = grid.empty_in_sphere(&buckets);
        let mut donors = find_donors(&grid, buckets, target, settings);
        if donors.is_empty() {
            report.converged = true;
            break;
        }

        for voxel in order_by_donor_distance(&grid, empties, &donors) {
            let center = grid.center(voxel);
            let eligible = |item: &LayoutItem| {
                !settings.respect_ownership || owns_destination(item, center, anchors, &classifier)
            };
            let pulled = pull_items(&mut donors, center, target, quota, items, &eligible);
            for index in pulled {
                let item = &mut items[index];
                item.position = sphere.clamped(jitter_into(&grid, voxel, &sphere, &mut rng));
                if let Some(owner) = item.anchor {
                    item.flags = classifier.flags_for(item.position, owner);
                }
                report.moved += 1;
            }
        }
        report.rounds += 1;

        let remaining = grid.empty_in_sphere(&grid.bucket(items)).len();
        let filled = empty.saturating_sub(remaining);
        empty = remaining;
        if empty > 0 && filled < settings.convergence_threshold {
            report.converged = true;
            break;
        }
    }

    report.empty_after = empty;
    tracing::debug!(
        "Density: {} -> {} empty voxels of {} in {} rounds (target {}, {} moves)",
        report.empty_before,
        report.empty_after,
        report.in_sphere_voxels,
        report.rounds,
        report.target,
        report.moved
    );
    report
}

/// Over-dense voxels, fullest first.
fn find_donors(
    grid: &VoxelGrid,
    buckets: VoxelBuckets,
    target: usize,
    settings: &DensityConfig,
) -> Vec<Donor> {
    let threshold = settings.overdense_factor * target as f32;
    let mut donors: Vec<Donor> = buckets
        .into_iter()
        .filter(|(_, items)| items.len() as f32 > threshold)
        .map(|(voxel, items)| Donor {
            voxel,
            center: grid.center(voxel),
            items,
        })
        .collect();
    donors.sort_by(|a, b| b.items.len().cmp(&a.items.len()).then(a.voxel.cmp(&b.voxel)));
    donors
}

/// Empty voxels sorted so those closest to any donor are filled first.
fn order_by_donor_distance(grid: &VoxelGrid, empties: Vec<usize>, donors: &[Donor]) -> Vec<usize> {
    let mut keyed: Vec<(f32, usize)> = empties
        .into_iter()
        .map(|voxel| {
            let center = grid.center(voxel);
            let nearest = donors
                .iter()
                .map(|donor| donor.center.distance_squared(center))
                .fold(f32::INFINITY, f32::min);
            (nearest, voxel)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    keyed.into_iter().map(|(_, voxel)| voxel).collect()
}

/// Takes up to `quota` items from the donors nearest `center`, leaving every
/// donor with at least `target` items.
fn pull_items(
    donors: &mut [Donor],
    center: Vec3,
    target: usize,
    quota: usize,
    items: &[LayoutItem],
    eligible: &impl Fn(&LayoutItem) -> bool,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..donors.len()).collect();
    order.sort_by(|&a, &b| {
        donors[a]
            .center
            .distance_squared(center)
            .total_cmp(&donors[b].center.distance_squared(center))
            .then(a.cmp(&b))
    });

    let mut pulled = Vec::with_capacity(quota);
    for index in order {
        if pulled.len() >= quota {
            break;
        }
        let donor = &mut donors[index];
        let surplus = donor.items.len().saturating_sub(target);
        if surplus == 0 {
            continue;
        }

        let mut candidates: Vec<usize> = donor
            .items
            .iter()
            .copied()
            .filter(|&index| eligible(&items[index]))
            .collect();
        candidates.sort_by(|&a, &b| {
            items[a]
                .position
                .distance_squared(center)
                .total_cmp(&items[b].position.distance_squared(center))
                .then(a.cmp(&b))
        });
        candidates.truncate(surplus.min(quota - pulled.len()));

        donor.items.retain(|index| !candidates.contains(index));
        pulled.extend(candidates);
    }
    pulled
}

fn owns_destination(
    item: &LayoutItem,
    center: Vec3,
    anchors: &[Anchor],
    classifier: &OwnershipClassifier<'_>,
) -> bool {
    item.anchor.map_or(false, |owner| {
        anchors
            .get(owner)
            .map_or(false, |anchor| anchor.contains(center) && classifier.owns(center, owner))
    })
}

/// A random point well inside the voxel, falling back to its center when
/// every try lands outside the sphere.
fn jitter_into(grid: &VoxelGrid, voxel: usize, sphere: &BoundingSphere, rng: &mut ChaCha8Rng) -> Vec3 {
    let corner = grid.min_corner(voxel);
    for _ in 0..JITTER_ATTEMPTS {
        let offset = Vec3::new(
            rng.gen_range(JITTER_MIN..JITTER_MAX),
            rng.gen_range(JITTER_MIN..JITTER_MAX),
            rng.gen_range(JITTER_MIN..JITTER_MAX),
        );
        let point = corner + offset * grid.voxel_size();
        if sphere.contains(point) {
            return point;
        }
    }
    grid.center(voxel)
}
