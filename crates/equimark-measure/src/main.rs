//! Measure horse body segments from a photograph and its segmentation
//! mask, printing the results as JSON.

use std::path::PathBuf;

use clap::Parser;
use equimark_pipeline::{measure, measure_staged, MeasureConfig, RgbaImage, SilhouetteMask};
use image::Rgba;

/// Measure withers height, torso, neck, and hindlimb lengths (in
/// pixels) from a side-profile photograph and its segmentation mask.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Photograph path (PNG, JPEG, BMP, WebP).
    photo: PathBuf,

    /// Segmentation mask path. The alpha channel is the silhouette;
    /// for masks without an alpha channel, white pixels are treated as
    /// the subject.
    mask: PathBuf,

    /// Optional JSON file overriding the pipeline tuning constants.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Include intermediate landmarks (polygon, bounding box, probe
    /// lines) in the output.
    #[arg(long)]
    staged: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

/// Decode the mask into the alpha-keyed form the pipeline expects.
///
/// Masks exported with an alpha channel pass through unchanged. Opaque
/// formats (grayscale or RGB PNGs with a white subject on black) are
/// converted by keying alpha off full-white pixels.
fn load_mask(path: &PathBuf) -> Result<SilhouetteMask, Box<dyn std::error::Error>> {
    let decoded = image::open(path)?;
    let image = if decoded.color().has_alpha() {
        decoded.to_rgba8()
    } else {
        let rgb = decoded.to_rgb8();
        RgbaImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let p = rgb.get_pixel(x, y);
            if p[0] == 255 && p[1] == 255 && p[2] == 255 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([p[0], p[1], p[2], 0])
            }
        })
    };
    Ok(SilhouetteMask::new(image)?)
}

fn load_config(path: Option<&PathBuf>) -> Result<MeasureConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(MeasureConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_ref())?;

    eprintln!("Reading photograph from {}", args.photo.display());
    let photo: RgbaImage = image::open(&args.photo)?.to_rgba8();

    eprintln!("Reading mask from {}", args.mask.display());
    let mask = load_mask(&args.mask)?;

    eprintln!("Measuring...");
    let json = if args.staged {
        let staged = measure_staged(photo, mask, &config)?;
        if args.pretty {
            serde_json::to_string_pretty(&staged)?
        } else {
            serde_json::to_string(&staged)?
        }
    } else {
        let measurements = measure(photo, mask, &config)?;
        if args.pretty {
            serde_json::to_string_pretty(&measurements)?
        } else {
            serde_json::to_string(&measurements)?
        }
    };

    println!("{json}");
    Ok(())
}
