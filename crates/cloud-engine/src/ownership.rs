//! Ownership classification: which anchor's cell a position belongs to.
//!
//! Strict mode is the plain nearest-anchor (Voronoi) rule. Permissive mode
//! lets a position cross into a neighbouring cell by up to
//! `permissiveness * allocated_radius` of the anchor under test, which blurs
//! cell borders into blended areas.
//!
//! Exact distance ties in strict mode go to the anchor with the
//! lexicographically lowest id, so the result never depends on input order.

use cloud_records::ItemFlags;
use glam::Vec3;

use crate::layout::Anchor;

/// Slack on allocated-volume checks to absorb rounding after rescaling.
const VOLUME_EPSILON: f32 = 1e-4;

/// Classifies positions against a fixed anchor set.
#[derive(Debug, Clone, Copy)]
pub struct OwnershipClassifier<'a> {
    anchors: &'a [Anchor],
    permissiveness: f32,
}

impl<'a> OwnershipClassifier<'a> {
    pub fn new(anchors: &'a [Anchor], permissiveness: f32) -> Self {
        Self {
            anchors,
            permissiveness: permissiveness.clamp(0.0, 1.0),
        }
    }

    pub fn permissiveness(&self) -> f32 {
        self.permissiveness
    }

    pub fn is_permissive(&self) -> bool {
        self.permissiveness > 0.0
    }

    /// Whether `anchor` owns `point` under the configured permissiveness.
    pub fn owns(&self, point: Vec3, anchor: usize) -> bool {
        if !self.is_permissive() {
            return self.strictly_owns(point, anchor);
        }
        let Some(own) = self.anchors.get(anchor) else {
            return false;
        };
        self.boundary_margin(point, anchor) > -self.permissiveness * own.allocated_radius
    }

    /// Nearest-anchor rule with the lowest-id tie-break.
    pub fn strictly_owns(&self, point: Vec3, anchor: usize) -> bool {
        let Some(own) = self.anchors.get(anchor) else {
            return false;
        };
        let own_distance = point.distance(own.position);
        self.anchors
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != anchor)
            .all(|(_, other)| {
                let other_distance = point.distance(other.position);
                own_distance < other_distance
                    || (own_distance == other_distance && own.id < other.id)
            })
    }

    /// Signed distance to the nearest cell border of `anchor`.
    ///
    /// `min over others of (distance_to_other - distance_to_own)`: positive
    /// inside the strict cell, negative past a border. Infinite when there is
    /// no other anchor.
    pub fn boundary_margin(&self, point: Vec3, anchor: usize) -> f32 {
        let Some(own) = self.anchors.get(anchor) else {
            return f32::NEG_INFINITY;
        };
        let own_distance = point.distance(own.position);
        self.anchors
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != anchor)
            .map(|(_, other)| point.distance(other.position) - own_distance)
            .fold(f32::INFINITY, f32::min)
    }

    /// The anchor that strictly owns `point`, if any anchors exist.
    pub fn nearest(&self, point: Vec3) -> Option<usize> {
        self.anchors
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                point
                    .distance(a.position)
                    .total_cmp(&point.distance(b.position))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|(index, _)| index)
    }

    /// Diagnostic flags for an item of `anchor` sitting at `point`.
    pub fn flags_for(&self, point: Vec3, anchor: usize) -> ItemFlags {
        let Some(own) = self.anchors.get(anchor) else {
            return ItemFlags::default();
        };
        let in_voronoi_cell = self.owns(point, anchor);
        ItemFlags {
            in_allocated_volume: point.distance(own.position)
                <= own.allocated_radius * (1.0 + VOLUME_EPSILON),
            in_voronoi_cell,
            in_blended_area: self.is_permissive()
                && in_voronoi_cell
                && !self.strictly_owns(point, anchor),
        }
    }
}
