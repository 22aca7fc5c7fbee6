//! The mutable point set threaded through the passes.

use cloud_records::{AnchorRecord, ItemFlags, ItemRecord, Position3};
use glam::Vec3;

use crate::config::LayoutConfig;
use crate::diagnostics::Diagnostic;
use crate::error::LayoutError;
use crate::geometry::BoundingSphere;
use crate::matching::{OwnerIndex, OwnerMatch};
use crate::volume;

/// A positioned anchor taking part in ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: String,
    pub position: Vec3,
    /// Number of items owned by this anchor
    pub item_count: usize,
    /// Radius of the sub-volume allocated to this anchor
    pub allocated_radius: f32,
}

impl Anchor {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            item_count: 0,
            allocated_radius: 0.0,
        }
    }

    /// True if the point lies inside the allocated sphere.
    pub fn contains(&self, point: Vec3) -> bool {
        point.distance(self.position) <= self.allocated_radius
    }
}

/// One item being laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutItem {
    pub id: String,
    /// Index into [`Layout::anchors`]
    pub anchor: Option<usize>,
    pub position: Vec3,
    pub flags: ItemFlags,
    /// False until placement gives the item a position; unplaced items are
    /// skipped by every later pass.
    pub placed: bool,
}

impl LayoutItem {
    pub fn new(id: impl Into<String>, anchor: Option<usize>) -> Self {
        Self {
            id: id.into(),
            anchor,
            position: Vec3::ZERO,
            flags: ItemFlags::default(),
            placed: false,
        }
    }
}

/// Anchors, items and the bounding sphere for one layout run.
#[derive(Debug, Clone)]
pub struct Layout {
    pub sphere: BoundingSphere,
    pub anchors: Vec<Anchor>,
    pub items: Vec<LayoutItem>,
    setup_diagnostics: Vec<Diagnostic>,
}

impl Layout {
    /// Creates a layout from already resolved anchors and items.
    ///
    /// Anchor item counts are recomputed from the items and volumes are
    /// allocated with the given configuration.
    pub fn new(
        sphere: BoundingSphere,
        mut anchors: Vec<Anchor>,
        items: Vec<LayoutItem>,
        config: &LayoutConfig,
    ) -> Self {
        for anchor in &mut anchors {
            anchor.item_count = 0;
        }
        for owner in items.iter().filter_map(|item| item.anchor) {
            if let Some(anchor) = anchors.get_mut(owner) {
                anchor.item_count += 1;
            }
        }
        if let Err(e) = volume::assign_radii(&mut anchors, sphere.radius, &config.allocation) {
            tracing::debug!("Volume allocation skipped: {}", e);
        }

        Self {
            sphere,
            anchors,
            items,
            setup_diagnostics: Vec::new(),
        }
    }

    /// Builds a layout from collaborator records.
    ///
    /// Anchors without a usable position are excluded and their items become
    /// unowned; every such decision is recorded as a setup diagnostic.
    pub fn from_records(
        anchor_records: &[AnchorRecord],
        item_records: &[ItemRecord],
        config: &LayoutConfig,
    ) -> Self {
        let mut diagnostics = Vec::new();
        let mut anchors = Vec::new();
        let mut owners = OwnerIndex::new();

        for record in anchor_records {
            let position = record.valid_position();
            let slot = position.map(|_| anchors.len());
            if !owners.claim(&record.owner_key, slot) {
                diagnostics.push(Diagnostic::DuplicateOwnerKey {
                    owner_key: record.owner_key.clone(),
                    anchor_id: record.id.clone(),
                });
                continue;
            }
            match position {
                Some(p) => anchors.push(Anchor::new(record.id.clone(), to_vec3(p))),
                None => diagnostics.push(Diagnostic::AnchorExcluded {
                    anchor_id: record.id.clone(),
                }),
            }
        }

        let mut unmatched = 0;
        let mut orphaned = 0;
        let items: Vec<LayoutItem> = item_records
            .iter()
            .map(|record| {
                let owner = owners.resolve(record, &config.matching);
                match owner {
                    OwnerMatch::Unmatched => unmatched += 1,
                    OwnerMatch::Excluded => orphaned += 1,
                    OwnerMatch::Anchor(_) => {}
                }
                let mut item = LayoutItem::new(record.id.clone(), owner.anchor());
                if let Some(p) = record.position().filter(Position3::is_finite) {
                    item.position = to_vec3(p);
                }
                item
            })
            .collect();

        if unmatched > 0 {
            diagnostics.push(Diagnostic::UnmatchedItems { count: unmatched });
        }
        if orphaned > 0 {
            diagnostics.push(Diagnostic::OrphanedItems { count: orphaned });
        }

        let mut layout = Self::new(
            BoundingSphere::new(config.sphere.radius),
            anchors,
            items,
            config,
        );
        layout.setup_diagnostics = diagnostics;
        layout
    }

    /// Diagnostics collected while building the layout.
    pub fn setup_diagnostics(&self) -> &[Diagnostic] {
        &self.setup_diagnostics
    }

    /// Items owned by the given anchor.
    pub fn items_of(&self, anchor: usize) -> impl Iterator<Item = &LayoutItem> {
        self.items
            .iter()
            .filter(move |item| item.anchor == Some(anchor))
    }

    /// Number of items that have a position.
    pub fn placed_count(&self) -> usize {
        self.items.iter().filter(|item| item.placed).count()
    }

    /// The coordinate array, `None` for items that were not placed.
    pub fn positions(&self) -> Vec<Option<[f32; 3]>> {
        self.items
            .iter()
            .map(|item| item.placed.then(|| item.position.to_array()))
            .collect()
    }

    /// Writes positions and flags back into the records the layout was built from.
    ///
    /// Records are matched by index and must carry the same ids in the same
    /// order; on a mismatch nothing is written. Unplaced items lose any stale
    /// coordinates.
    pub fn write_back(&self, records: &mut [ItemRecord]) -> Result<(), LayoutError> {
        if records.len() != self.items.len() {
            return Err(LayoutError::RecordCountMismatch {
                expected: self.items.len(),
                found: records.len(),
            });
        }
        if let Some((index, (record, item))) = records
            .iter()
            .zip(&self.items)
            .enumerate()
            .find(|(_, (record, item))| record.id != item.id)
        {
            return Err(LayoutError::RecordIdMismatch {
                index,
                expected: item.id.clone(),
                found: record.id.clone(),
            });
        }

        for (record, item) in records.iter_mut().zip(&self.items) {
            if item.placed {
                record.set_position(Position3::from(item.position.to_array()));
                record.flags = Some(item.flags);
            } else {
                record.clear_position();
                record.flags = None;
            }
        }
        Ok(())
    }
}

fn to_vec3(p: Position3) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}
