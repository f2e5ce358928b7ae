//! rockly CLI: command-line interface for single-photo rock reconstruction.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use rockly::{PipelineConfig, Reconstruction, Reconstructor};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "rockly")]
#[command(about = "Turn one photograph of a rock or mineral sample into a textured depth mesh")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a mesh from an image and write it as JSON (and optionally OBJ).
    Reconstruct(CliReconstructArgs),

    /// Run the pipeline and print step, mesh size and quality metrics.
    Analyze(CliAnalyzeArgs),

    /// Print (or write) the default pipeline configuration as JSON.
    ConfigDump {
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the built-in depth backends.
    Backends,
}

#[derive(Debug, Clone, Args)]
struct CliConfigArgs {
    /// Pipeline config JSON; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Depth-to-world scale of the mesh z axis.
    #[arg(long)]
    scale_factor: Option<f32>,

    /// Depth backend to try, in rank order (repeatable). Replaces the configured list.
    #[arg(long = "backend")]
    backends: Vec<String>,
}

impl CliConfigArgs {
    fn to_config(&self) -> CliResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading config: {}", path.display());
                PipelineConfig::from_json_file(path)?
            }
            None => PipelineConfig::default(),
        };
        if let Some(scale) = self.scale_factor {
            config.mesh.scale_factor = scale;
        }
        if !self.backends.is_empty() {
            config.estimator.backends = self.backends.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Args)]
struct CliReconstructArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the reconstruction (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Also export the mesh as Wavefront OBJ.
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Write only summary, processing info and quality metrics (no mesh arrays).
    #[arg(long)]
    summary_only: bool,

    #[command(flatten)]
    config: CliConfigArgs,
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    #[command(flatten)]
    config: CliConfigArgs,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Reconstruct(args) => run_reconstruct(&args),
        Commands::Analyze(args) => run_analyze(&args),
        Commands::ConfigDump { out } => run_config_dump(out.as_deref()),
        Commands::Backends => run_backends(),
    }
}

fn reconstruct_image(image_path: &Path, config: PipelineConfig) -> CliResult<Reconstruction> {
    tracing::info!("Loading image: {}", image_path.display());
    let reconstructor = Reconstructor::from_config(config);
    let rec = reconstructor.reconstruct_path(image_path)?;
    let [w, h] = rec.model_data.metadata.original_dimensions;
    tracing::info!("Image size: {}x{}", w, h);
    Ok(rec)
}

// ── backends ───────────────────────────────────────────────────────────

fn run_backends() -> CliResult<()> {
    let defaults = PipelineConfig::default().estimator.backends;
    println!("rockly built-in depth backends");
    for name in rockly::estimator::builtin_backend_names() {
        let marker = if defaults.iter().any(|d| d == name) {
            " (default)"
        } else {
            ""
        };
        println!("  {}{}", name, marker);
    }
    Ok(())
}

// ── config-dump ────────────────────────────────────────────────────────

fn run_config_dump(out: Option<&Path>) -> CliResult<()> {
    let json = serde_json::to_string_pretty(&PipelineConfig::default())?;
    match out {
        Some(path) => {
            std::fs::write(path, &json)?;
            tracing::info!("Default config written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

// ── analyze ────────────────────────────────────────────────────────────

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    let config = args.config.to_config()?;
    let rec = reconstruct_image(&args.image, config)?;
    let m = &rec.quality_metrics;

    println!("rockly analysis of {}", args.image.display());
    println!("  depth backend:       {}", rec.processing_info.depth_estimation);
    println!("  device:              {}", rec.processing_info.device_used);
    println!("  adaptive step:       {}", rec.adaptive_step());
    println!("  vertices:            {}", rec.summary.vertex_count);
    println!("  faces:               {}", rec.summary.face_count);
    println!("  edge consistency:    {:.4}", m.edge_consistency);
    println!("  surface smoothness:  {:.4}", m.surface_smoothness);
    println!("  mineral definition:  {:.4}", m.mineral_definition);
    println!("  range utilization:   {:.4}", m.range_utilization);
    println!("  overall score:       {:.4}", m.overall_score);
    Ok(())
}

// ── reconstruct ────────────────────────────────────────────────────────

fn run_reconstruct(args: &CliReconstructArgs) -> CliResult<()> {
    let config = args.config.to_config()?;
    let rec = reconstruct_image(&args.image, config)?;

    tracing::info!(
        "Mesh: {} vertices, {} faces at step {} (quality {:.3})",
        rec.summary.vertex_count,
        rec.summary.face_count,
        rec.adaptive_step(),
        rec.quality_metrics.overall_score
    );

    let json = if args.summary_only {
        serde_json::to_string_pretty(&serde_json::json!({
            "summary": rec.summary,
            "processing_info": rec.processing_info,
            "quality_metrics": rec.quality_metrics,
        }))?
    } else {
        serde_json::to_string_pretty(&rec)?
    };
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());

    if let Some(obj_path) = &args.obj {
        rockly::save_obj(&rec.model_data, obj_path)?;
        tracing::info!("OBJ written to {}", obj_path.display());
    }

    Ok(())
}
