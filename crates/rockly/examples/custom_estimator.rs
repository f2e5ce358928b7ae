use std::error::Error;
use std::sync::Arc;

use image::{Luma, RgbImage};
use rockly::{DepthField, EstimatorError, EstimatorHandle, Reconstructor};

/// Stand-in for a learned model: depth from inverted red channel.
fn red_channel_depth(image: &RgbImage) -> Result<DepthField, EstimatorError> {
    if image.width() == 0 || image.height() == 0 {
        return Err("empty image".into());
    }
    Ok(DepthField::from_fn(image.width(), image.height(), |x, y| {
        Luma([1.0 + (255 - image.get_pixel(x, y)[0]) as f32 / 255.0])
    }))
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image.jpg>", args[0]);
        std::process::exit(2);
    }

    let image = image::open(&args[1])?.to_rgb8();
    let handle = Arc::new(EstimatorHandle::preloaded(
        "red-channel",
        Arc::new(red_channel_depth),
    ));
    let mut reconstructor = Reconstructor::new(handle);
    reconstructor.config_mut().mesh.scale_factor = 0.25;

    let rec = reconstructor.reconstruct(&image)?;
    println!(
        "{} vertices, {} faces, bbox z {:.3}..{:.3}",
        rec.summary.vertex_count,
        rec.summary.face_count,
        rec.summary.bbox_min[2],
        rec.summary.bbox_max[2]
    );
    println!("{}", serde_json::to_string_pretty(&rec.quality_metrics)?);
    Ok(())
}
