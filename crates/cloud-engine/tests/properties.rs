//! Invariants that hold for every layout run.

use cloud_engine::clamp::clamp_to_sphere;
use cloud_engine::density::count_empty_voxels;
use cloud_engine::finish::break_regularity;
use cloud_engine::volume::allocate_radii;
use cloud_engine::{
    Anchor, BoundingSphere, Layout, LayoutConfig, LayoutItem, NullObserver, OwnershipClassifier,
    PassName, PipelineRunner, RecordingObserver, StepStatus,
};
use glam::Vec3;

fn clustered(config: &LayoutConfig, counts: &[usize], strays: usize) -> Layout {
    let positions = [
        Vec3::new(100.0, 0.0, 0.0),
        Vec3::new(-100.0, 0.0, 0.0),
        Vec3::new(0.0, 100.0, 0.0),
        Vec3::new(0.0, -80.0, 90.0),
    ];
    let anchors = counts
        .iter()
        .enumerate()
        .map(|(i, _)| Anchor::new(format!("anchor_{}", i), positions[i % positions.len()]))
        .collect();
    let mut items = Vec::new();
    for (anchor, count) in counts.iter().enumerate() {
        for k in 0..*count {
            items.push(LayoutItem::new(format!("post_{}_{}", anchor, k), Some(anchor)));
        }
    }
    for k in 0..strays {
        items.push(LayoutItem::new(format!("stray_{}", k), None));
    }
    Layout::new(BoundingSphere::new(config.sphere.radius), anchors, items, config)
}

fn owned_fraction(layout: &Layout, permissiveness: f32) -> f32 {
    let classifier = OwnershipClassifier::new(&layout.anchors, permissiveness);
    let owned_items: Vec<_> = layout.items.iter().filter(|i| i.anchor.is_some()).collect();
    let owned = owned_items
        .iter()
        .filter(|item| classifier.owns(item.position, item.anchor.unwrap()))
        .count();
    owned as f32 / owned_items.len() as f32
}

/// Every snapshot from the clamp pass onward stays within 1% of the radius
#[test]
fn test_containment_after_clamp() {
    let config = LayoutConfig::with_radius(200.0);
    let runner = PipelineRunner::new(config.clone()).unwrap();
    let mut layout = clustered(&config, &[120, 80, 200, 40], 25);
    let mut observer = RecordingObserver::new();

    runner.run(&mut layout, &mut observer);

    let limit = config.sphere.radius * 1.01;
    for snapshot in observer.snapshots.iter().filter(|s| s.pass != PassName::Place) {
        for position in snapshot.positions.iter().flatten() {
            assert!(
                position.length() <= limit,
                "{} left an item at {}",
                snapshot.pass,
                position.length()
            );
        }
    }
}

/// Allocated radius cubed is proportional to item count
#[test]
fn test_volume_proportionality() {
    let config = LayoutConfig::with_radius(300.0);
    let counts = [7, 100, 250, 1, 42];
    let radii = allocate_radii(&counts, 300.0, &config.allocation).unwrap();

    let reference = radii[1].powi(3) / counts[1] as f32;
    for (radius, count) in radii.iter().zip(counts) {
        let ratio = radius.powi(3) / count as f32;
        assert!(
            (ratio - reference).abs() / reference < 1e-3,
            "r^3 / count drifted: {} vs {}",
            ratio,
            reference
        );
    }
}

/// After placement at least (1 - p) of owned items are classified as owned
#[test]
fn test_ownership_stability_after_placement() {
    for permissiveness in [0.0, 0.1, 0.3] {
        let mut config = LayoutConfig::with_radius(200.0);
        config.ownership.permissiveness = permissiveness;
        config.pipeline.passes = vec!["place".to_string()];
        let runner = PipelineRunner::new(config.clone()).unwrap();
        let mut layout = clustered(&config, &[150, 60, 90], 0);

        runner.run(&mut layout, &mut NullObserver);

        let fraction = owned_fraction(&layout, permissiveness);
        assert!(
            fraction >= 1.0 - permissiveness,
            "p = {}: only {} owned",
            permissiveness,
            fraction
        );
    }
}

/// Clamping twice is the same as clamping once
#[test]
fn test_idempotent_clamp() {
    let sphere = BoundingSphere::new(50.0);
    let mut items: Vec<LayoutItem> = (0..200)
        .map(|i| {
            let t = i as f32;
            LayoutItem {
                position: Vec3::new(t.sin(), t.cos(), (t * 0.3).sin()) * (t * 0.6),
                placed: true,
                ..LayoutItem::new(format!("post_{}", i), Some(0))
            }
        })
        .collect();

    assert!(clamp_to_sphere(&mut items, &sphere) > 0);
    let once = items.clone();
    assert_eq!(clamp_to_sphere(&mut items, &sphere), 0);
    assert_eq!(items, once);
}

/// The equalizer never increases the number of empty in-sphere voxels
#[test]
fn test_density_improvement() {
    for seed in [1, 42, 7_000] {
        let mut config = LayoutConfig::with_radius(120.0);
        config.noise.seed = seed;
        config.density.grid_resolution = 10;
        let runner = PipelineRunner::new(config.clone()).unwrap();
        let mut layout = clustered(&config, &[300, 100, 50], 10);
        let mut observer = NullObserver;
        let mut stepper = runner.stepper(&mut layout, &mut observer);

        let mut before = None;
        loop {
            let empty = count_empty_voxels(&stepper.layout().items, &stepper.layout().sphere, 10);
            match stepper.step() {
                StepStatus::Ran(PassName::Equalize) => {
                    before = Some(empty);
                    let after =
                        count_empty_voxels(&stepper.layout().items, &stepper.layout().sphere, 10);
                    assert!(after <= empty, "seed {}: {} -> {}", seed, empty, after);
                }
                StepStatus::Finished => break,
                _ => {}
            }
        }
        assert!(before.is_some(), "equalize pass should have run");
    }
}

/// The final noise pass neither re-checks ownership nor refreshes flags
#[test]
fn test_final_noise_skips_ownership_revalidation() {
    let mut config = LayoutConfig::with_radius(100.0);
    config.ownership.permissiveness = 0.0;
    config.finish.amplitude_factor = 0.5;
    let anchors = vec![
        Anchor::new("a", Vec3::new(-20.0, 0.0, 0.0)),
        Anchor::new("b", Vec3::new(20.0, 0.0, 0.0)),
    ];
    let settled = cloud_records::ItemFlags::settled();
    let items = (0..60)
        .map(|i| LayoutItem {
            // Just inside a's side of the bisector
            position: Vec3::new(-0.05, i as f32 * 1.3 - 39.0, (i % 5) as f32),
            placed: true,
            flags: settled,
            ..LayoutItem::new(format!("post_{}", i), Some(0))
        })
        .collect();
    let mut layout = Layout::new(BoundingSphere::new(100.0), anchors, items, &config);

    break_regularity(&mut layout, &config);

    let classifier = OwnershipClassifier::new(&layout.anchors, 0.0);
    let crossed = layout
        .items
        .iter()
        .filter(|item| !classifier.owns(item.position, 0))
        .count();
    assert!(crossed > 0, "some items should drift across the border");
    assert!(layout.items.iter().all(|item| item.flags == settled));
    assert!(layout
        .items
        .iter()
        .all(|item| layout.sphere.contains(item.position)));
}
