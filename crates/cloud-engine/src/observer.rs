//! Progress hooks for pipeline runs.
//!
//! A host that wants to show the cloud forming, or just log what happened,
//! injects a [`LayoutObserver`] into the runner instead of flipping a global
//! verbosity switch.

use glam::Vec3;

use crate::diagnostics::Diagnostic;
use crate::layout::LayoutItem;
use crate::pipeline::PassName;

/// Receives pass completions and diagnostics as a run proceeds.
pub trait LayoutObserver {
    /// Called after each executed pass with the items as that pass left them.
    fn on_pass_complete(&mut self, _pass: PassName, _items: &[LayoutItem]) {}

    /// Called once per diagnostic, in the order they are raised.
    fn on_diagnostic(&mut self, _diagnostic: &Diagnostic) {}
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl LayoutObserver for NullObserver {}

/// Forwards progress to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LayoutObserver for TracingObserver {
    fn on_pass_complete(&mut self, pass: PassName, items: &[LayoutItem]) {
        let placed = items.iter().filter(|item| item.placed).count();
        tracing::info!("Pass {} complete: {} of {} items placed", pass, placed, items.len());
    }

    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::PlacementExhausted { .. } | Diagnostic::DensityNotConverged { .. } => {
                tracing::debug!("{}", diagnostic)
            }
            _ => tracing::warn!("{}", diagnostic),
        }
    }
}

/// Positions of every item after one pass; `None` for unplaced items.
#[derive(Debug, Clone, PartialEq)]
pub struct PassSnapshot {
    pub pass: PassName,
    pub positions: Vec<Option<Vec3>>,
}

/// Keeps a snapshot per pass and every diagnostic.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub snapshots: Vec<PassSnapshot>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent snapshot, if any pass has run.
    pub fn latest(&self) -> Option<&PassSnapshot> {
        self.snapshots.last()
    }

    /// Order in which passes completed.
    pub fn passes(&self) -> Vec<PassName> {
        self.snapshots.iter().map(|snapshot| snapshot.pass).collect()
    }
}

impl LayoutObserver for RecordingObserver {
    fn on_pass_complete(&mut self, pass: PassName, items: &[LayoutItem]) {
        self.snapshots.push(PassSnapshot {
            pass,
            positions: items
                .iter()
                .map(|item| item.placed.then_some(item.position))
                .collect(),
        });
    }

    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }
}

/// Adapts a closure to a pass-completion observer.
pub struct FnObserver<F>(pub F);

impl<F> LayoutObserver for FnObserver<F>
where
    F: FnMut(PassName, &[LayoutItem]),
{
    fn on_pass_complete(&mut self, pass: PassName, items: &[LayoutItem]) {
        (self.0)(pass, items)
    }
}

impl<T: LayoutObserver + ?Sized> LayoutObserver for &mut T {
    fn on_pass_complete(&mut self, pass: PassName, items: &[LayoutItem]) {
        (**self).on_pass_complete(pass, items)
    }

    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        (**self).on_diagnostic(diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<LayoutItem> {
        vec![
            LayoutItem {
                position: Vec3::X,
                placed: true,
                ..LayoutItem::new("a", Some(0))
            },
            LayoutItem::new("b", None),
        ]
    }

    #[test]
    fn test_recording_observer_snapshots() {
        let mut observer = RecordingObserver::new();
        observer.on_pass_complete(PassName::Place, &items());
        observer.on_pass_complete(PassName::Clamp, &items());
        observer.on_diagnostic(&Diagnostic::NoItems);

        assert_eq!(observer.passes(), vec![PassName::Place, PassName::Clamp]);
        assert_eq!(
            observer.latest().unwrap().positions,
            vec![Some(Vec3::X), None]
        );
        assert_eq!(observer.diagnostics, vec![Diagnostic::NoItems]);
    }

    #[test]
    fn test_fn_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = FnObserver(|pass: PassName, items: &[LayoutItem]| {
                seen.push((pass, items.len()));
            });
            observer.on_pass_complete(PassName::Finish, &items());
            observer.on_diagnostic(&Diagnostic::NoAnchors);
        }
        assert_eq!(seen, vec![(PassName::Finish, 2)]);
    }

    #[test]
    fn test_observer_through_mut_ref() {
        let mut recording = RecordingObserver::new();
        let mut by_ref = &mut recording;
        LayoutObserver::on_diagnostic(&mut by_ref, &Diagnostic::NoItems);
        assert_eq!(recording.diagnostics.len(), 1);
    }
}
