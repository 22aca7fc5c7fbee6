//! Pass 3: organic perturbation.
//!
//! Nudges each owned item along a hash-driven noise field so clusters lose
//! the look of uniform sampling. Every move is checked against the item's
//! allocated sphere and its ownership before it is kept; moves that cannot
//! be repaired are rolled back.

use glam::Vec3;
use serde::Serialize;

use crate::config::LayoutConfig;
use crate::geometry::{direction_or, BoundingSphere};
use crate::hash::{hashed_direction, noise_vector, DeterministicHash};
use crate::layout::{Anchor, Layout};
use crate::ownership::OwnershipClassifier;

const PERTURB_SALT: u64 = 0x5045_5254;
const DIRECTION_SALT: u64 = 0x5045_5255;

/// Displacement cap as a fraction of the allocated radius.
const MAX_RADIUS_FRACTION: f32 = 0.2;
/// Where out-of-volume moves are pulled back to, as a fraction of the radius.
const VOLUME_MARGIN: f32 = 0.95;

/// Counts of what happened to each perturbed item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerturbationReport {
    /// Items whose final position differs from where they started
    pub moved: usize,
    /// Moves pulled back into the allocated sphere
    pub rescaled: usize,
    /// Moves halved to stay owned
    pub softened: usize,
    /// Moves discarded entirely
    pub rolled_back: usize,
    /// Moves pulled back into the global sphere
    pub clamped: usize,
    /// False when the pass was disabled by a zero scale or amplitude
    pub applied: bool,
}

/// Applies the displacement field to every placed, owned item.
pub fn perturb_items(layout: &mut Layout, config: &LayoutConfig) -> PerturbationReport {
    let settings = &config.perturbation;
    let mut report = PerturbationReport::default();
    let usable = |value: f32| value.is_finite() && value > 0.0;
    if !(usable(settings.noise_scale) && usable(settings.amplitude)) {
        tracing::debug!("Perturbation skipped: zero scale or amplitude");
        return report;
    }
    report.applied = true;

    let hash = config.noise.hash.hasher();
    let seed = config.noise.seed;
    let sphere = layout.sphere;
    let anchors = &layout.anchors;
    let classifier = OwnershipClassifier::new(anchors, config.ownership.permissiveness);

    for item in layout.items.iter_mut().filter(|item| item.placed) {
        let Some((index, anchor)) = item
            .anchor
            .and_then(|index| anchors.get(index).map(|anchor| (index, anchor)))
        else {
            continue;
        };

        let cap = settings.amplitude.min(anchor.allocated_radius * MAX_RADIUS_FRACTION);
        let field = noise_vector(hash, seed, PERTURB_SALT, item.position * settings.noise_scale);
        let original = item.position;
        let target = displace(
            original,
            field * cap,
            index,
            anchor,
            &classifier,
            &sphere,
            hash,
            seed,
            &mut report,
        );

        if target != original {
            report.moved += 1;
        }
        item.position = target;
        item.flags = classifier.flags_for(target, index);
    }

    tracing::debug!(
        "Perturbation: {} moved, {} rescaled, {} softened, {} rolled back",
        report.moved,
        report.rescaled,
        report.softened,
        report.rolled_back
    );
    report
}

#[allow(clippy::too_many_arguments)]
fn displace(
    original: Vec3,
    offset: Vec3,
    index: usize,
    anchor: &Anchor,
    classifier: &OwnershipClassifier<'_>,
    sphere: &BoundingSphere,
    hash: &dyn DeterministicHash,
    seed: u64,
    report: &mut PerturbationReport,
) -> Vec3 {
    let mut candidate = original + offset;

    if !anchor.contains(candidate) {
        let fallback = hashed_direction(hash, seed, DIRECTION_SALT, original);
        let direction = direction_or(candidate - anchor.position, fallback);
        candidate = anchor.position + direction * (anchor.allocated_radius * VOLUME_MARGIN);
        report.rescaled += 1;
    }

    if !classifier.owns(candidate, index) {
        candidate = original + (candidate - original) * 0.5;
        if !classifier.owns(candidate, index) || !anchor.contains(candidate) {
            report.rolled_back += 1;
            return original;
        }
        report.softened += 1;
    }

    if let Some(inside) = sphere.clamp(candidate) {
        report.clamped += 1;
        candidate = inside;
    }
    candidate
}
