//! Post-cloud layout generator
//!
//! Lays out a scene of characters and posts inside a sphere and writes the
//! positioned records as JSON. Without `--scene` a synthetic scene is
//! generated from the seed.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloud_engine::{
    Layout, LayoutConfig, LayoutStats, PassName, PipelineRunner, TracingObserver,
};
use cloud_records::Scene;

mod scene;

/// Command line arguments for the generator
#[derive(Parser, Debug)]
#[command(name = "cloudgen")]
#[command(about = "Lay out posts in a volumetric cloud around their characters")]
struct Args {
    /// Random seed for reproducibility (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of characters in a generated scene
    #[arg(long, default_value_t = 6)]
    anchors: usize,

    /// Number of posts in a generated scene
    #[arg(long, default_value_t = 2000)]
    items: usize,

    /// Global sphere radius (overrides the config file)
    #[arg(long)]
    radius: Option<f32>,

    /// TOML layout configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON scene to lay out instead of a generated one
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Where to write the positioned scene
    #[arg(long, default_value = "output/cloud.json")]
    output: PathBuf,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = effective_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let mut scene = match &args.scene {
        Some(path) => {
            tracing::info!("Loading scene from {}", path.display());
            Scene::from_file(path)?
        }
        None => {
            tracing::info!(
                "Generating scene: {} anchors, {} items, seed {}",
                args.anchors,
                args.items,
                config.noise.seed
            );
            scene::generate_scene(config.noise.seed, args.anchors, args.items, config.sphere.radius)
        }
    };

    let runner = PipelineRunner::new(config.clone())?;
    let mut layout = Layout::from_records(&scene.anchors, &scene.items, &config);
    let report = runner.run(&mut layout, &mut TracingObserver);
    if report.ran(PassName::Place) {
        layout.write_back(&mut scene.items)?;
    }

    let stats = LayoutStats::collect(&layout, &config);
    stats.log_summary();
    for anchor in &stats.anchors {
        tracing::debug!(
            "  {}: {} items, radius {:.1}, {} owned",
            anchor.id,
            anchor.item_count,
            anchor.allocated_radius,
            anchor.owned
        );
    }
    if report.cancelled {
        tracing::warn!("Run was cancelled, output is partial");
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    scene.write_to_file(&args.output)?;
    tracing::info!(
        "Wrote {} items to {} ({} diagnostics)",
        scene.items.len(),
        args.output.display(),
        report.diagnostics.len()
    );

    Ok(())
}

/// Loads the config file if given and applies command line overrides.
fn effective_config(args: &Args) -> Result<LayoutConfig, cloud_engine::ConfigError> {
    let mut config = match &args.config {
        Some(path) => LayoutConfig::from_file(path)?,
        None => LayoutConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.noise.seed = seed;
    }
    if let Some(radius) = args.radius {
        config.sphere.radius = radius;
    }
    config.validate()?;
    Ok(config)
}
