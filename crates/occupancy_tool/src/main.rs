//! occ-tool: offline inspection and preprocessing of occupancy scenes.
//!
//! A scene is a metadata JSON file plus the binary payload it names in
//! `occupancy_file` (resolved next to the JSON).

mod pgm;

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use occupancy::{
    bake_bitset, bitset_metadata, count_above, decode, project, Axis, DecodedScene, Histogram,
    OccupancyMetadata, ProjectionMode, VolumeStats, DEFAULT_BAKE_THRESHOLD, DEFAULT_THRESHOLD,
};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "occ-tool")]
#[command(about = "Inspect, bake and project occupancy scenes", long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print geometry, warnings and value statistics
    Inspect {
        /// Scene metadata JSON
        scene: PathBuf,

        /// Payload path (defaults to `occupancy_file` next to the JSON)
        #[arg(long)]
        payload: Option<PathBuf>,

        /// Threshold for the occupied-voxel count
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f32,

        /// Histogram bins over [0, 1]
        #[arg(long, default_value = "10")]
        bins: usize,

        /// JSON output for scripting
        #[arg(long)]
        json: bool,
    },

    /// Bake a raw float scene into the packed bitset encoding
    Bake {
        scene: PathBuf,

        #[arg(long)]
        payload: Option<PathBuf>,

        /// Voxels strictly above this value are set
        #[arg(short, long, default_value_t = DEFAULT_BAKE_THRESHOLD)]
        threshold: f32,

        /// Output metadata JSON; the payload is written alongside with a `.bin` extension
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a bird's-eye projection as a PGM image
    Project {
        scene: PathBuf,

        #[arg(long)]
        payload: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "max")]
        mode: ModeArg,

        /// Layer index for `--mode slice` (defaults to the middle layer)
        #[arg(short, long)]
        z: Option<usize>,

        /// Zero cells at or below this value before writing
        #[arg(short, long)]
        threshold: Option<f32>,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Max,
    Mean,
    Slice,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    match args.command {
        Command::Inspect { scene, payload, threshold, bins, json } => {
            let scene = load_scene(&scene, payload.as_deref())?;
            inspect(&scene, threshold, bins, json)
        }
        Command::Bake { scene, payload, threshold, output } => {
            let scene = load_scene(&scene, payload.as_deref())?;
            bake(&scene, threshold, &output)
        }
        Command::Project { scene, payload, mode, z, threshold, output } => {
            let scene = load_scene(&scene, payload.as_deref())?;
            let mode = match mode {
                ModeArg::Max => ProjectionMode::Max,
                ModeArg::Mean => ProjectionMode::Mean,
                ModeArg::Slice => ProjectionMode::Slice(z.unwrap_or(scene.geometry.nz() / 2)),
            };
            write_projection(&scene, mode, threshold, &output)
        }
    }
}

fn load_scene(json_path: &Path, payload: Option<&Path>) -> Result<DecodedScene> {
    let text = fs::read_to_string(json_path)
        .with_context(|| format!("reading {}", json_path.display()))?;
    let metadata = OccupancyMetadata::from_json(&text)
        .with_context(|| format!("parsing {}", json_path.display()))?;

    let payload_path = match payload {
        Some(path) => path.to_path_buf(),
        None => {
            let Some(name) = metadata.occupancy_file.as_deref() else {
                bail!(
                    "{} has no occupancy_file; pass --payload",
                    json_path.display()
                );
            };
            json_path.parent().unwrap_or_else(|| Path::new(".")).join(name)
        }
    };
    let bytes = fs::read(&payload_path)
        .with_context(|| format!("reading {}", payload_path.display()))?;
    debug!(path = %payload_path.display(), bytes = bytes.len(), "loaded payload");

    let scene = decode(metadata, &bytes)?;
    info!(
        "Loaded {} ({}x{}x{}, {})",
        json_path.display(),
        scene.geometry.nx(),
        scene.geometry.ny(),
        scene.geometry.nz(),
        scene.metadata.encoding()?.as_str(),
    );
    Ok(scene)
}

fn inspect(scene: &DecodedScene, threshold: f32, bins: usize, json: bool) -> Result<()> {
    let geometry = &scene.geometry;
    let stats = VolumeStats::compute(&scene.volume, geometry);
    let occupied = count_above(&scene.volume, geometry, threshold);
    let histogram = Histogram::compute(&scene.volume, geometry, bins, 0.0, 1.0);
    let max_range = project(&scene.volume, geometry, ProjectionMode::Max)?.value_range();
    let mean_range = project(&scene.volume, geometry, ProjectionMode::Mean)?.value_range();

    if json {
        let report = serde_json::json!({
            "grid_shape": geometry.shape(),
            "bounds": geometry.bounds(),
            "voxel_size": geometry.voxel_sizes(),
            "encoding": scene.metadata.encoding()?.as_str(),
            "warnings": scene.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "stats": {
                "total": stats.total,
                "min": stats.min,
                "max": stats.max,
                "mean": stats.mean,
                "std": stats.std_dev,
                "nonzero": stats.nonzero,
                "above_threshold": occupied,
                "threshold": threshold,
            },
            "histogram": histogram.as_ref().map(|h| &h.counts),
            "projection_max_range": [max_range.0, max_range.1],
            "projection_mean_range": [mean_range.0, mean_range.1],
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let [nx, ny, nz] = geometry.shape();
    println!("Grid shape:   {nx} x {ny} x {nz} ({} voxels)", geometry.num_voxels());
    for axis in Axis::ALL {
        let [lo, hi] = geometry.axis_bounds(axis);
        println!(
            "{} bounds:     [{lo}, {hi}]  voxel {:.4}",
            axis.name(),
            geometry.voxel_size(axis)
        );
    }
    println!("Encoding:     {}", scene.metadata.encoding()?.as_str());
    for warning in &scene.warnings {
        println!("Warning:      {warning}");
    }
    println!("Range:        [{:.6}, {:.6}]", stats.min, stats.max);
    println!("Mean:         {:.6}", stats.mean);
    println!("Std:          {:.6}", stats.std_dev);
    println!(
        "Non-zero:     {} / {} ({:.2}%)",
        stats.nonzero,
        stats.total,
        100.0 * stats.nonzero_fraction()
    );
    println!("Above {threshold}:    {occupied}");
    println!("Max proj:     [{:.4}, {:.4}]", max_range.0, max_range.1);
    println!("Mean proj:    [{:.4}, {:.4}]", mean_range.0, mean_range.1);
    if let Some(histogram) = histogram {
        println!("Histogram ({} bins over [0, 1]):", histogram.counts.len());
        for (i, count) in histogram.counts.iter().enumerate() {
            let lo = histogram.lo + i as f32 * histogram.bin_width();
            println!("  {lo:>5.2}  {count}");
        }
    }
    Ok(())
}

fn bake(scene: &DecodedScene, threshold: f32, output: &Path) -> Result<()> {
    let Some(dense) = scene.volume.as_dense() else {
        bail!("scene is already bitset-encoded");
    };
    if !threshold.is_finite() {
        bail!("bake threshold must be finite, got {threshold}");
    }

    let bits = bake_bitset(dense, &scene.geometry, threshold);
    let bin_path = output.with_extension("bin");
    let bin_name = bin_path
        .file_name()
        .and_then(|name| name.to_str())
        .context("output path has no file name")?;
    let metadata = bitset_metadata(&scene.metadata, &bits, Some(bin_name));

    fs::write(&bin_path, bits.bytes())
        .with_context(|| format!("writing {}", bin_path.display()))?;
    fs::write(output, metadata.to_json_pretty()?)
        .with_context(|| format!("writing {}", output.display()))?;

    let raw_bytes = scene.geometry.num_voxels() * 4;
    info!(
        "Baked {} occupied voxels at t={threshold}: {} -> {} bytes ({:.1}x smaller)",
        bits.count_occupied(),
        raw_bytes,
        bits.bytes().len(),
        raw_bytes as f64 / bits.bytes().len().max(1) as f64,
    );
    info!("Wrote {} and {}", output.display(), bin_path.display());
    Ok(())
}

fn write_projection(
    scene: &DecodedScene,
    mode: ProjectionMode,
    threshold: Option<f32>,
    output: &Path,
) -> Result<()> {
    let mut map = project(&scene.volume, &scene.geometry, mode)?;
    if let Some(t) = threshold {
        map = map.thresholded(t);
    }
    let (lo, hi) = map.value_range();
    if hi <= 0.0 {
        warn!("projection is empty; writing a black image");
    }

    let file = fs::File::create(output)
        .with_context(|| format!("creating {}", output.display()))?;
    let mut out = BufWriter::new(file);
    pgm::write_projection(&mut out, &map, hi)?;
    info!(
        "Wrote {:?} projection {}x{} (range [{lo:.4}, {hi:.4}]) to {}",
        mode,
        map.width(),
        map.height(),
        output.display()
    );
    Ok(())
}
