//! Label a single recorded frame.
//!
//! ```text
//! cargo run --example label_frame -- <config.json> <input> [debug.png]
//! ```
//!
//! `input` is an image for rgb sensors, a 16-bit PNG in millimeters for depth
//! sensors and a JSON `LaserScan` / `PointCloud` for lidars.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Instant,
};

use calib_labeler::{
    DepthImage, Frame, LabelerConfig, LaserScan, Modality, PointCloud, SensorData, SensorLabeler,
};
use image::{ImageReader, Luma};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;

    let mut args = env::args().skip(1);
    let (Some(config_path), Some(input_path)) = (args.next(), args.next()) else {
        eprintln!("usage: label_frame <config.json> <input> [debug.png]");
        std::process::exit(2);
    };
    let debug_path = args.next().map(PathBuf::from);

    let config = LabelerConfig::load_json(&config_path)?;
    let modality = config.sensor.modality;
    let data = load_data(modality, Path::new(&input_path))?;
    let labeler = SensorLabeler::new(config)?;

    let t0 = Instant::now();
    let out = labeler.process_frame(Frame::new(0.0, input_path.clone(), data))?;
    log::info!(
        "{input_path}: detected = {} in {:.1} ms",
        out.labels.detected,
        t0.elapsed().as_secs_f64() * 1e3
    );

    if let (Some(path), Some(debug)) = (debug_path, out.debug_image.as_ref()) {
        debug.save(&path)?;
        println!("wrote debug image to {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&out.labels)?);
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    tracing_log::LogTracer::init()?;
    calib_labeler::core::init_tracing(false);
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    calib_labeler::core::init_with_level(log::LevelFilter::Info)?;
    Ok(())
}

fn load_data(modality: Modality, path: &Path) -> Result<SensorData, Box<dyn std::error::Error>> {
    Ok(match modality {
        Modality::Rgb => SensorData::Image(ImageReader::open(path)?.decode()?.to_rgb8()),
        Modality::Depth => {
            let raw = ImageReader::open(path)?.decode()?.to_luma16();
            let depth = DepthImage::from_fn(raw.width(), raw.height(), |x, y| {
                Luma([raw.get_pixel(x, y)[0] as f32 / 1000.0])
            });
            SensorData::Depth(depth)
        }
        Modality::Lidar2d => {
            let scan: LaserScan = serde_json::from_str(&fs::read_to_string(path)?)?;
            SensorData::Scan(scan)
        }
        Modality::Lidar3d => {
            let cloud: PointCloud = serde_json::from_str(&fs::read_to_string(path)?)?;
            SensorData::Cloud(cloud)
        }
    })
}
