use anyhow::{Context, Result};
use collage_pro::{AspectRatio, BatchDriver, CollageRequest, Config, QualityPreset, SourceImage};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::time::Instant;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Synthetic gradient photo, encoded as JPEG like a typical upload
fn synthetic_photo(name: &str, width: u32, height: u32, tint: u8) -> Result<SourceImage> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            tint,
        ])
    });

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .with_context(|| format!("Failed to encode synthetic photo {}", name))?;
    Ok(SourceImage::new(name, bytes))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;

    println!("Preparing synthetic photos...");
    let hero = synthetic_photo("hero.jpg", 3024, 4032, 40)?;
    let gallery = (0..12)
        .map(|i| {
            let (w, h) = if i % 2 == 0 { (4032, 3024) } else { (1920, 1080) };
            synthetic_photo(&format!("gallery-{}.jpg", i + 1), w, h, (i * 20) as u8)
        })
        .collect::<Result<Vec<_>>>()?;

    let cases = [
        (config.aspect_ratio, config.quality),
        (AspectRatio::Landscape16x9, QualityPreset::TwoK),
        (AspectRatio::Portrait9x16, QualityPreset::FourK),
    ];

    println!(
        "{:<24} | {:<7} | {:<12} | {:<12}",
        "Aspect ratio", "Quality", "Total (ms)", "Avg KB"
    );
    println!("{:-<24}-+-{:-<7}-+-{:-<12}-+-{:-<12}", "", "", "", "");

    for (aspect_ratio, quality) in cases {
        let request = CollageRequest::new(hero.clone(), gallery.clone(), aspect_ratio, quality);
        let driver = BatchDriver::from_config(&config);

        let start = Instant::now();
        let collages = driver
            .generate_batch(&request, |_| {})
            .await
            .with_context(|| format!("Batch failed for {} at {}", aspect_ratio, quality))?;
        let elapsed = start.elapsed();

        let total_bytes: usize = collages
            .iter()
            .map(|c| c.artifact.encoded_bytes.len())
            .sum();
        let avg_kb = total_bytes as f64 / collages.len().max(1) as f64 / 1024.0;

        println!(
            "{:<24} | {:<7} | {:<12} | {:<12.1}",
            aspect_ratio.label(),
            quality,
            elapsed.as_millis(),
            avg_kb
        );
    }

    Ok(())
}
