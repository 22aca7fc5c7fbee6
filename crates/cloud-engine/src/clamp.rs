//! Pass 2: pull every placed item back inside the global sphere.

use crate::geometry::BoundingSphere;
use crate::layout::LayoutItem;

/// Radially rescales items outside `sphere` to just inside its surface.
///
/// Returns the number of items moved. Items already inside are untouched,
/// so running the pass twice changes nothing the second time.
pub fn clamp_to_sphere(items: &mut [LayoutItem], sphere: &BoundingSphere) -> usize {
    let mut clamped = 0;
    for item in items.iter_mut().filter(|item| item.placed) {
        if let Some(inside) = sphere.clamp(item.position) {
            item.position = inside;
            clamped += 1;
        }
    }
    if clamped > 0 {
        tracing::debug!("Clamped {} items into radius {}", clamped, sphere.radius);
    }
    clamped
}
