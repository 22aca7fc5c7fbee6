//! Synthetic scenes for trying the engine without real data.

use cloud_records::{AnchorRecord, ItemRecord, Position3, Scene};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Share of items that name no known character.
const STRAY_RATE: f32 = 0.02;

/// Anchors are spread inside this fraction of the radius.
const ANCHOR_SPREAD: f32 = 0.6;

/// Builds a scene with `anchor_count` characters and `item_count` posts.
///
/// Post counts follow a Zipf-like skew, so the first characters own most
/// of the posts and the last ones only a handful.
pub fn generate_scene(seed: u64, anchor_count: usize, item_count: usize, radius: f32) -> Scene {
    let mut rng = SmallRng::seed_from_u64(seed);

    let anchors: Vec<AnchorRecord> = (0..anchor_count)
        .map(|i| {
            let name = format!("character_{:02}", i);
            AnchorRecord::new(
                format!("anchor_{:02}", i),
                name,
                random_in_ball(&mut rng, radius * ANCHOR_SPREAD),
            )
        })
        .collect();

    let weights: Vec<f32> = (0..anchor_count).map(|i| 1.0 / (i as f32 + 1.0)).collect();
    let items = (0..item_count)
        .map(|i| {
            let item = ItemRecord::new(format!("post_{:05}", i)).with_field("text", format!("post {}", i));
            if anchors.is_empty() || rng.gen::<f32>() < STRAY_RATE {
                return item.with_field("character", "unknown");
            }
            let owner = weighted_select(&mut rng, &weights);
            item.with_field("character", anchors[owner].owner_key.clone())
        })
        .collect();

    Scene { anchors, items }
}

fn weighted_select(rng: &mut SmallRng, weights: &[f32]) -> usize {
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return 0;
    }
    let r: f32 = rng.gen::<f32>() * total;
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if r < cumulative {
            return i;
        }
    }
    weights.len() - 1
}

fn random_in_ball(rng: &mut SmallRng, radius: f32) -> Position3 {
    loop {
        let p = Position3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if p.length() <= 1.0 {
            return Position3::new(p.x * radius, p.y * radius, p.z * radius);
        }
    }
}
