//! Pass 1: initial placement around owning anchors.
//!
//! Every owned item is rejection-sampled uniformly by volume inside its
//! anchor's allocated sphere until a candidate is owned by that anchor and
//! inside the global sphere. If sampling runs dry a deterministic spiral
//! search walks outward from the anchor; if that finds nothing either the
//! item lands a hair away from the anchor center.
//!
//! Each item draws from its own ChaCha8 stream (`seed`, stream = item index)
//! so the pass gives the same answer sequentially or on rayon.

use cloud_records::ItemFlags;
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{LayoutConfig, PlacementConfig};
use crate::geometry::{random_unit_vector, sample_in_ball, spiral_direction, BoundingSphere};
use crate::layout::{Anchor, Layout, LayoutItem};
use crate::ownership::OwnershipClassifier;
use crate::par::maybe_par_iter_mut;

const PLACEMENT_SALT: u64 = 0x9E3D_51A1_0000_0001;

/// How an item got its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementTier {
    /// Rejection sampling succeeded
    Sampled,
    /// Spiral search succeeded
    Spiral,
    /// Near-center fallback
    Fallback,
    /// Unowned item put on the periphery
    Periphery,
    /// Unowned item left without a position
    Unplaced,
}

/// Outcome counts of a placement pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacementReport {
    pub sampled: usize,
    pub spiral: usize,
    pub fallback: usize,
    pub periphery: usize,
    pub unplaced: usize,
    /// Ids of items that needed the near-center fallback
    pub exhausted: Vec<String>,
}

impl PlacementReport {
    pub fn placed(&self) -> usize {
        self.sampled + self.spiral + self.fallback + self.periphery
    }
}

/// Runs placement over every item in the layout.
pub fn place_items(layout: &mut Layout, config: &LayoutConfig) -> PlacementReport {
    let sphere = layout.sphere;
    let anchors = &layout.anchors;
    let classifier = OwnershipClassifier::new(anchors, config.ownership.permissiveness);
    let settings = &config.placement;
    let seed = config.noise.seed ^ PLACEMENT_SALT;

    let tiers: Vec<PlacementTier> = maybe_par_iter_mut!(layout.items)
        .enumerate()
        .map(|(index, item)| {
            place_item(item, &mut item_rng(seed, index), &classifier, anchors, &sphere, settings)
        })
        .collect();

    let mut report = PlacementReport::default();
    for (item, tier) in layout.items.iter().zip(tiers) {
        match tier {
            PlacementTier::Sampled => report.sampled += 1,
            PlacementTier::Spiral => report.spiral += 1,
            PlacementTier::Fallback => {
                report.fallback += 1;
                report.exhausted.push(item.id.clone());
            }
            PlacementTier::Periphery => report.periphery += 1,
            PlacementTier::Unplaced => report.unplaced += 1,
        }
    }

    tracing::debug!(
        "Placement: {} sampled, {} spiral, {} fallback, {} periphery, {} unplaced",
        report.sampled,
        report.spiral,
        report.fallback,
        report.periphery,
        report.unplaced
    );
    if report.fallback > 0 {
        tracing::warn!(
            "{} items exhausted sampling and spiral search, placed near their anchor",
            report.fallback
        );
    }

    report
}

fn item_rng(seed: u64, index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(index as u64);
    rng
}

fn place_item(
    item: &mut LayoutItem,
    rng: &mut ChaCha8Rng,
    classifier: &OwnershipClassifier<'_>,
    anchors: &[Anchor],
    sphere: &BoundingSphere,
    config: &PlacementConfig,
) -> PlacementTier {
    let owner = item
        .anchor
        .and_then(|index| anchors.get(index).map(|anchor| (index, anchor)));

    let Some((index, anchor)) = owner else {
        item.flags = ItemFlags::default();
        if config.include_unowned {
            item.position =
                sphere.center + random_unit_vector(rng) * (sphere.radius * config.periphery_factor);
            item.placed = true;
            return PlacementTier::Periphery;
        }
        item.placed = false;
        return PlacementTier::Unplaced;
    };

    let (position, tier) = find_position(index, anchor, rng, classifier, sphere, config);
    item.position = position;
    item.placed = true;
    item.flags = classifier.flags_for(position, index);
    tier
}

fn find_position(
    index: usize,
    anchor: &Anchor,
    rng: &mut ChaCha8Rng,
    classifier: &OwnershipClassifier<'_>,
    sphere: &BoundingSphere,
    config: &PlacementConfig,
) -> (Vec3, PlacementTier) {
    let accepts =
        |p: Vec3| anchor.contains(p) && sphere.contains(p) && classifier.owns(p, index);
    let radius = anchor.allocated_radius;

    if radius > 0.0 {
        for _ in 0..config.max_attempts {
            let candidate = sample_in_ball(rng, anchor.position, radius);
            if accepts(candidate) {
                return (candidate, PlacementTier::Sampled);
            }
        }
    }

    if let Some(candidate) = spiral_search(anchor, config, &accepts) {
        return (candidate, PlacementTier::Spiral);
    }

    let offset = random_unit_vector(rng) * (radius * config.fallback_offset);
    (sphere.clamped(anchor.position + offset), PlacementTier::Fallback)
}

/// Walks concentric shells outward from the anchor, trying golden-angle
/// directions on each, and returns the first acceptable point.
fn spiral_search(
    anchor: &Anchor,
    config: &PlacementConfig,
    accepts: &impl Fn(Vec3) -> bool,
) -> Option<Vec3> {
    let shells = config.spiral_radial_steps;
    let directions = config.spiral_angular_steps;
    for shell in 1..=shells {
        let radius = anchor.allocated_radius * shell as f32 / shells as f32;
        let twist = shell as f32 * 0.5;
        for k in 0..directions {
            let candidate = anchor.position + spiral_direction(k, directions, twist) * radius;
            if accepts(candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingSphere;

    fn layout_with(anchors: Vec<Anchor>, owners: &[Option<usize>], config: &LayoutConfig) -> Layout {
        let items = owners
            .iter()
            .enumerate()
            .map(|(i, owner)| LayoutItem::new(format!("post_{:04}", i), *owner))
            .collect();
        Layout::new(BoundingSphere::new(config.sphere.radius), anchors, items, config)
    }

    fn two_anchor_layout(config: &LayoutConfig) -> Layout {
        let anchors = vec![
            Anchor::new("a", Vec3::new(-40.0, 0.0, 0.0)),
            Anchor::new("b", Vec3::new(40.0, 0.0, 0.0)),
        ];
        let mut owners = vec![Some(0); 60];
        owners.extend(vec![Some(1); 40]);
        layout_with(anchors, &owners, config)
    }

    #[test]
    fn test_items_land_in_volume_cell_and_sphere() {
        let config = LayoutConfig::with_radius(100.0);
        let mut layout = two_anchor_layout(&config);

        let report = place_items(&mut layout, &config);
        assert_eq!(report.placed(), 100);
        assert_eq!(report.fallback, 0);

        let classifier = OwnershipClassifier::new(&layout.anchors, config.ownership.permissiveness);
        for item in &layout.items {
            let owner = item.anchor.unwrap();
            assert!(item.placed);
            assert!(layout.sphere.contains(item.position));
            assert!(layout.anchors[owner].contains(item.position));
            assert!(classifier.owns(item.position, owner));
            assert!(item.flags.in_allocated_volume);
            assert!(item.flags.in_voronoi_cell);
        }
    }

    /// The rayon path must match a plain sequential loop bit for bit.
    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_placement_matches_sequential() {
        let config = LayoutConfig::with_radius(200.0);
        let anchors = vec![
            Anchor::new("a", Vec3::new(-60.0, 10.0, 0.0)),
            Anchor::new("b", Vec3::new(50.0, -20.0, 30.0)),
            Anchor::new("c", Vec3::new(0.0, 70.0, -40.0)),
        ];
        let owners: Vec<Option<usize>> = (0..5000)
            .map(|i| if i % 97 == 0 { None } else { Some(i % 3) })
            .collect();
        let mut parallel = layout_with(anchors, &owners, &config);
        let mut sequential = parallel.clone();

        place_items(&mut parallel, &config);

        let classifier =
            OwnershipClassifier::new(&sequential.anchors, config.ownership.permissiveness);
        let seed = config.noise.seed ^ PLACEMENT_SALT;
        for (index, item) in sequential.items.iter_mut().enumerate() {
            place_item(
                item,
                &mut item_rng(seed, index),
                &classifier,
                &sequential.anchors,
                &sequential.sphere,
                &config.placement,
            );
        }

        for (par, seq) in parallel.items.iter().zip(&sequential.items) {
            assert_eq!(
                par.position.to_array().map(f32::to_bits),
                seq.position.to_array().map(f32::to_bits),
                "{} differs",
                par.id
            );
            assert_eq!(par.flags, seq.flags);
            assert_eq!(par.placed, seq.placed);
        }
    }

    #[test]
    fn test_strict_mode_never_sets_blended_flag() {
        let mut config = LayoutConfig::with_radius(100.0);
        config.ownership.permissiveness = 0.0;
        let mut layout = two_anchor_layout(&config);

        place_items(&mut layout, &config);
        assert!(layout.items.iter().all(|item| !item.flags.in_blended_area));
    }

    #[test]
    fn test_unowned_items_on_periphery() {
        let config = LayoutConfig::with_radius(100.0);
        let anchors = vec![Anchor::new("a", Vec3::ZERO)];
        let mut layout = layout_with(anchors, &[Some(0), None, None], &config);

        let report = place_items(&mut layout, &config);
        assert_eq!(report.periphery, 2);
        for item in layout.items.iter().filter(|i| i.anchor.is_none()) {
            assert!(item.placed);
            assert!((item.position.length() - 95.0).abs() < 1e-3);
            assert_eq!(item.flags, ItemFlags::default());
        }
    }

    #[test]
    fn test_unowned_items_skipped_when_disabled() {
        let mut config = LayoutConfig::with_radius(100.0);
        config.placement.include_unowned = false;
        let anchors = vec![Anchor::new("a", Vec3::ZERO)];
        let mut layout = layout_with(anchors, &[Some(0), None], &config);

        let report = place_items(&mut layout, &config);
        assert_eq!(report.unplaced, 1);
        assert!(!layout.items[1].placed);
    }

    #[test]
    fn test_small_attempt_budget_still_places() {
        let mut config = LayoutConfig::with_radius(100.0);
        // One sample per item; misses fall through to the spiral search
        config.placement.max_attempts = 1;
        let anchors = vec![
            Anchor::new("far", Vec3::new(0.0, 98.0, 0.0)),
            Anchor::new("center", Vec3::ZERO),
        ];
        let mut owners = vec![Some(0); 1];
        owners.extend(vec![Some(1); 200]);
        let mut layout = layout_with(anchors, &owners, &config);

        let report = place_items(&mut layout, &config);
        assert_eq!(report.placed(), 201);
        let far = &layout.items[0];
        assert!(layout.sphere.contains(far.position));
        assert!(far.flags.in_voronoi_cell);
    }

    #[test]
    fn test_fallback_when_anchor_outside_sphere() {
        let config = LayoutConfig::with_radius(50.0);
        let anchors = vec![
            Anchor::new("outside", Vec3::new(500.0, 0.0, 0.0)),
            Anchor::new("inside", Vec3::ZERO),
        ];
        let mut owners = vec![Some(0); 1];
        owners.extend(vec![Some(1); 999]);
        let mut layout = layout_with(anchors, &owners, &config);

        let report = place_items(&mut layout, &config);
        assert_eq!(report.fallback, 1);
        assert_eq!(report.exhausted, vec!["post_0000".to_string()]);
        // Still pulled inside the global sphere
        assert!(layout.sphere.contains(layout.items[0].position));
    }

    #[test]
    fn test_placement_deterministic() {
        let config = LayoutConfig::with_radius(100.0);
        let mut a = two_anchor_layout(&config);
        let mut b = two_anchor_layout(&config);

        place_items(&mut a, &config);
        place_items(&mut b, &config);

        assert_eq!(a.items, b.items);
    }

    #[test]
    fn test_seed_changes_placement() {
        let config = LayoutConfig::with_radius(100.0);
        let mut other = config.clone();
        other.noise.seed = 7;
        let mut a = two_anchor_layout(&config);
        let mut b = two_anchor_layout(&other);

        place_items(&mut a, &config);
        place_items(&mut b, &other);

        assert_ne!(a.items[0].position, b.items[0].position);
    }
}
