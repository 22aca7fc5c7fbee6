//! Volumetric post-cloud layout engine.
//!
//! Given anchors (characters) at fixed 3D positions and items (posts) that
//! belong to them, the engine places every item inside a global bounding
//! sphere so that each anchor's items form a cluster around it, neighbouring
//! clusters blend at their borders and the sphere is filled without large
//! holes.
//!
//! # Passes
//!
//! ```text
//! records ──▶ Layout ──▶ place ─▶ clamp ─▶ perturb ─▶ equalize ─▶ finish ──▶ write_back
//! ```
//!
//! - [`placer`]: rejection sampling inside each anchor's allocated sphere
//! - [`clamp`]: radial clamp into the global sphere
//! - [`perturb`]: organic, ownership-preserving noise
//! - [`density`]: voxel-grid hole filling
//! - [`finish`]: fine noise that hides grid regularity
//!
//! [`pipeline::PipelineRunner`] runs them in the configured order and
//! collects [`Diagnostic`]s; nothing but an invalid configuration is fatal.

mod par;

pub mod clamp;
pub mod config;
pub mod density;
pub mod diagnostics;
pub mod error;
pub mod finish;
pub mod geometry;
pub mod hash;
pub mod layout;
pub mod matching;
pub mod observer;
pub mod ownership;
pub mod perturb;
pub mod pipeline;
pub mod placer;
pub mod stats;
pub mod volume;

// Re-export config types
pub use config::{
    default_config_toml, AllocationConfig, DensityConfig, FinishConfig, LayoutConfig,
    MatchingConfig, NoiseConfig, OwnershipConfig, PassToggles, PerturbationConfig,
    PipelineConfig, PlacementConfig, SphereConfig,
};

// Re-export error and diagnostic types
pub use diagnostics::Diagnostic;
pub use error::{ConfigError, LayoutError};

// Re-export the layout model
pub use geometry::BoundingSphere;
pub use layout::{Anchor, Layout, LayoutItem};
pub use ownership::OwnershipClassifier;

// Re-export pass reports
pub use density::{DensityReport, VoxelBuckets, VoxelGrid};
pub use finish::FinishReport;
pub use perturb::PerturbationReport;
pub use placer::PlacementReport;

// Re-export pipeline types
pub use hash::{DeterministicHash, HashKind, MixHash, TrigHash};
pub use observer::{FnObserver, LayoutObserver, NullObserver, RecordingObserver, TracingObserver};
pub use pipeline::{
    CancelToken, PassName, PassOutcome, PassRecord, PipelineRunner, PipelineStepper, RunReport,
    StepStatus,
};
pub use stats::{AnchorStats, LayoutStats};

use cloud_records::{AnchorRecord, ItemRecord};

/// Lays out `items` around `anchors` and writes positions and flags back.
///
/// Progress is logged through `tracing`. If placement never ran (no usable
/// anchors, no items, or placement disabled) the records are left as they were.
pub fn layout_records(
    anchors: &[AnchorRecord],
    items: &mut [ItemRecord],
    config: &LayoutConfig,
) -> Result<RunReport, LayoutError> {
    let runner = PipelineRunner::new(config.clone())?;
    let mut layout = Layout::from_records(anchors, items, config);
    let report = runner.run(&mut layout, &mut TracingObserver);
    if report.ran(PassName::Place) {
        layout.write_back(items)?;
    }
    Ok(report)
}
