//! Image Compositor Module
//!
//! Paints source photos into layout rectangles with "cover" semantics:
//! - Scale uniformly until the rectangle is fully covered
//! - Center the overflow and crop it away, never stretching the photo
//! - Keep every pixel write inside the target rectangle
//! - Stroke a white separating border on the rectangle's inner edge
//!
//! Also owns decoding of source bytes (honouring EXIF orientation) and the
//! final JPEG encode of the canvas.

use std::io::Cursor;

use exif::{In, Reader, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use log::debug;

use crate::collage_types::{CollageError, CollageResult, Rect, SourceImage};

/// JPEG quality factor for every collage, independent of the quality preset
pub const JPEG_QUALITY: u8 = 92;

pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BORDER_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

const MIN_BORDER_WIDTH: f64 = 2.0;
const BORDER_WIDTH_FACTOR: f64 = 0.005;

/// Placement of the scaled source image in canvas coordinates, before clipping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverTransform {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Compute where an `img_w` x `img_h` image lands so that it covers `rect`
pub fn cover_transform(img_w: u32, img_h: u32, rect: Rect) -> CoverTransform {
    let image_ratio = img_w as f64 / img_h as f64;
    let rect_ratio = rect.aspect_ratio();

    if image_ratio > rect_ratio {
        // Relatively wider: match heights, crop left and right
        let height = rect.h as f64;
        let width = height * image_ratio;
        CoverTransform {
            x: rect.x as f64 - (width - rect.w as f64) / 2.0,
            y: rect.y as f64,
            width,
            height,
        }
    } else {
        // Relatively taller: match widths, crop top and bottom
        let width = rect.w as f64;
        let height = width / image_ratio;
        CoverTransform {
            x: rect.x as f64,
            y: rect.y as f64 - (height - rect.h as f64) / 2.0,
            width,
            height,
        }
    }
}

/// Stroke width for a canvas of the given width
pub fn border_width(canvas_width: u32) -> f64 {
    MIN_BORDER_WIDTH.max(canvas_width as f64 * BORDER_WIDTH_FACTOR)
}

/// Source-pixel region that remains visible after clipping the transform to `rect`
fn visible_source_region(img_w: u32, img_h: u32, rect: Rect) -> (u32, u32, u32, u32) {
    let transform = cover_transform(img_w, img_h, rect);
    let scale = transform.width / img_w as f64;

    let src_x = ((rect.x as f64 - transform.x) / scale).round().max(0.0) as u32;
    let src_y = ((rect.y as f64 - transform.y) / scale).round().max(0.0) as u32;
    let src_x = src_x.min(img_w - 1);
    let src_y = src_y.min(img_h - 1);

    let src_w = ((rect.w as f64 / scale).round() as u32).clamp(1, img_w - src_x);
    let src_h = ((rect.h as f64 / scale).round() as u32).clamp(1, img_h - src_y);

    (src_x, src_y, src_w, src_h)
}

/// Render the part of `image` visible in `rect` as a tile of exactly `rect.w` x `rect.h`
pub fn render_cover_tile(image: &DynamicImage, rect: Rect) -> RgbaImage {
    let (src_x, src_y, src_w, src_h) = visible_source_region(image.width(), image.height(), rect);

    image
        .crop_imm(src_x, src_y, src_w, src_h)
        .resize_exact(rect.w, rect.h, FilterType::Triangle)
        .to_rgba8()
}

/// Copy a pre-rendered tile onto the canvas at the rectangle's origin
pub fn paint_tile(canvas: &mut RgbaImage, tile: &RgbaImage, rect: Rect) {
    image::imageops::replace(canvas, tile, rect.x as i64, rect.y as i64);
}

/// Paint a border band along the inside of `rect`.
///
/// A centered stroke of `line_width` would spill half its width into the
/// neighbouring rectangles; only the inner half is painted here, so adjacent
/// rectangles together still show the full width.
pub fn stroke_border(canvas: &mut RgbaImage, rect: Rect, line_width: f64) {
    let band = ((line_width / 2.0).round() as u32).max(1);
    let band_x = band.min(rect.w);
    let band_y = band.min(rect.h);

    for y in rect.y..rect.bottom() {
        let in_horizontal_band = y < rect.y + band_y || y >= rect.bottom() - band_y;
        if in_horizontal_band {
            for x in rect.x..rect.right() {
                canvas.put_pixel(x, y, BORDER_COLOR);
            }
        } else {
            for x in (rect.x..rect.x + band_x).chain(rect.right() - band_x..rect.right()) {
                canvas.put_pixel(x, y, BORDER_COLOR);
            }
        }
    }
}

/// Paint `image` into `rect` with cover fitting, then stroke its border
pub fn draw_cover(canvas: &mut RgbaImage, image: &DynamicImage, rect: Rect, line_width: f64) {
    let tile = render_cover_tile(image, rect);
    paint_tile(canvas, &tile, rect);
    stroke_border(canvas, rect, line_width);
}

/// Read the EXIF orientation tag, if the container carries one
pub fn read_exif_orientation(bytes: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(bytes);
    let exif = Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(Tag::Orientation, In::PRIMARY)?;

    match field.value {
        Value::Short(ref v) if !v.is_empty() => Some(v[0] as u32),
        _ => None,
    }
}

pub fn apply_orientation(img: DynamicImage, orientation: Option<u32>) -> DynamicImage {
    match orientation {
        Some(2) => img.fliph(),
        Some(3) => img.rotate180(),
        Some(4) => img.flipv(),
        Some(5) => img.fliph().rotate270(), // Transpose
        Some(6) => img.rotate90(),
        Some(7) => img.fliph().rotate90(), // Transverse
        Some(8) => img.rotate270(),
        _ => img, // 1 or None = no transformation needed
    }
}

/// Decode a source photo into an upright raster
pub fn decode_source(source: &SourceImage) -> CollageResult<DynamicImage> {
    let img = image::load_from_memory(source.bytes()).map_err(|e| CollageError::DecodeFailure {
        name: source.name().to_string(),
        source: e,
    })?;

    let orientation = read_exif_orientation(source.bytes());
    debug!(
        "Decoded {} ({}x{}, orientation {:?})",
        source.name(),
        img.width(),
        img.height(),
        orientation
    );

    Ok(apply_orientation(img, orientation))
}

/// Decode `source` and render its cover tile for `rect`; safe to run off the paint thread
pub fn prepare_tile(source: &SourceImage, rect: Rect) -> CollageResult<RgbaImage> {
    let img = decode_source(source)?;
    Ok(render_cover_tile(&img, rect))
}

/// Encode the finished canvas as JPEG at [`JPEG_QUALITY`]
pub fn encode_jpeg(canvas: RgbaImage) -> CollageResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), JPEG_QUALITY);
        encoder
            .encode_image(&rgb)
            .map_err(CollageError::EncodeFailure)?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb(color)))
    }

    #[test]
    fn test_cover_transform_wide_image_matches_height() {
        let rect = Rect::new(100, 50, 200, 200);
        let t = cover_transform(400, 200, rect);

        assert_eq!(t.height, 200.0);
        assert_eq!(t.width, 400.0);
        assert_eq!(t.x, 0.0);
        assert_eq!(t.y, 50.0);
    }

    #[test]
    fn test_cover_transform_tall_image_matches_width() {
        let rect = Rect::new(0, 0, 300, 100);
        let t = cover_transform(100, 200, rect);

        assert_eq!(t.width, 300.0);
        assert_eq!(t.height, 600.0);
        assert_eq!(t.x, 0.0);
        assert_eq!(t.y, -250.0);
    }

    #[test]
    fn test_cover_transform_preserves_aspect_and_covers_rect() {
        let images = [(640, 480), (480, 640), (1000, 1000), (4032, 3024), (31, 977)];
        let rects = [
            Rect::new(0, 0, 1024, 768),
            Rect::new(17, 33, 200, 900),
            Rect::new(500, 0, 1548, 300),
            Rect::new(0, 0, 1, 1),
        ];

        for &(img_w, img_h) in &images {
            for &rect in &rects {
                let t = cover_transform(img_w, img_h, rect);
                let source_ratio = img_w as f64 / img_h as f64;
                assert!((t.width / t.height - source_ratio).abs() < 1e-9);

                assert!(t.x <= rect.x as f64 + 1e-9);
                assert!(t.y <= rect.y as f64 + 1e-9);
                assert!(t.x + t.width >= rect.right() as f64 - 1e-9);
                assert!(t.y + t.height >= rect.bottom() as f64 - 1e-9);
            }
        }
    }

    #[test]
    fn test_draw_cover_stays_inside_rect() {
        let mut canvas = RgbaImage::from_pixel(100, 80, BACKGROUND);
        let rect = Rect::new(20, 10, 50, 40);
        let red = solid(300, 100, [255, 0, 0]);

        draw_cover(&mut canvas, &red, rect, 2.0);

        for (x, y, pixel) in canvas.enumerate_pixels() {
            if !rect.contains(x, y) {
                assert_eq!(*pixel, BACKGROUND, "pixel ({}, {}) painted outside", x, y);
            }
        }

        // One-pixel border band, red interior
        assert_eq!(*canvas.get_pixel(20, 10), BORDER_COLOR);
        assert_eq!(*canvas.get_pixel(69, 49), BORDER_COLOR);
        for y in 11..49 {
            for x in 21..69 {
                let pixel = canvas.get_pixel(x, y);
                assert!(pixel[0] > 250 && pixel[1] < 5, "({}, {}) = {:?}", x, y, pixel);
            }
        }
    }

    #[test]
    fn test_render_cover_tile_crops_centre() {
        // Left third blue, middle third green, right third blue
        let mut img = RgbImage::from_pixel(300, 100, image::Rgb([0, 0, 255]));
        for y in 0..100 {
            for x in 100..200 {
                img.put_pixel(x, y, image::Rgb([0, 255, 0]));
            }
        }

        let tile = render_cover_tile(&DynamicImage::ImageRgb8(img), Rect::new(0, 0, 100, 100));

        assert_eq!(tile.dimensions(), (100, 100));
        for x in [2, 50, 97] {
            let pixel = tile.get_pixel(x, 50);
            assert!(pixel[1] > 250 && pixel[2] < 5, "x = {}: {:?}", x, pixel);
        }
    }

    #[test]
    fn test_border_width_has_minimum() {
        assert_eq!(border_width(100), 2.0);
        assert!((border_width(2048) - 10.24).abs() < 1e-9);
        assert!((border_width(3840) - 19.2).abs() < 1e-9);
    }

    #[test]
    fn test_apply_orientation_rotates() {
        let img = solid(40, 20, [1, 2, 3]);
        assert_eq!(apply_orientation(img.clone(), Some(6)).width(), 20);
        assert_eq!(apply_orientation(img.clone(), Some(8)).height(), 40);
        assert_eq!(apply_orientation(img.clone(), Some(3)).width(), 40);
        assert_eq!(apply_orientation(img, None).width(), 40);
    }

    #[test]
    fn test_decode_source_reports_name_on_failure() {
        let broken = SourceImage::new("broken.jpg", b"not an image".to_vec());
        match decode_source(&broken) {
            Err(CollageError::DecodeFailure { name, .. }) => assert_eq!(name, "broken.jpg"),
            other => panic!("expected decode failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_decode_png_without_exif() {
        let mut bytes = Vec::new();
        solid(8, 4, [9, 9, 9])
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        assert_eq!(read_exif_orientation(&bytes), None);
        let decoded = decode_source(&SourceImage::new("a.png", bytes)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg() {
        let canvas = RgbaImage::from_pixel(64, 32, BACKGROUND);
        let bytes = encode_jpeg(canvas).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
    }
}
