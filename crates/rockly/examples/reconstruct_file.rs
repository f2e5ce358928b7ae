use rockly::{PipelineConfig, Reconstructor};
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <image.jpg> [mesh.json] [mesh.obj] [config.json]",
            args[0]
        );
        std::process::exit(2);
    }

    let config = match args.get(4) {
        Some(path) => PipelineConfig::from_json_file(Path::new(path))?,
        None => PipelineConfig::default(),
    };
    let reconstructor = Reconstructor::from_config(config);
    let rec = reconstructor.reconstruct_path(Path::new(&args[1]))?;

    println!(
        "Mesh: {} vertices, {} faces (step {}), quality {:.3} via {}",
        rec.summary.vertex_count,
        rec.summary.face_count,
        rec.adaptive_step(),
        rec.quality_metrics.overall_score,
        rec.processing_info.depth_estimation
    );

    if let Some(out_path) = args.get(2) {
        let json = serde_json::to_string_pretty(&rec)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    if let Some(obj_path) = args.get(3) {
        rockly::save_obj(&rec.model_data, obj_path)?;
        println!("Wrote {obj_path}");
    }
    Ok(())
}
