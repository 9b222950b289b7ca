use std::sync::Arc;

use image::RgbaImage;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, Semaphore};

use crate::collage_types::{
    AspectRatio, CollageArtifact, CollageError, CollageResult, QualityPreset, Rect, SourceImage,
};
use crate::config::Config;
use crate::image_compositor::{self, BACKGROUND};
use crate::layout_partitioner;
use crate::slot_assigner;

/// Fewest images in one collage, hero included
pub const MIN_IMAGES_PER_COLLAGE: usize = 2;
/// Most images in one collage, hero included
pub const MAX_IMAGES_PER_COLLAGE: usize = 6;
pub const MIN_GALLERY_IMAGES: usize = 2;
pub const MAX_GALLERY_IMAGES: usize = 20;

/// Everything a caller hands over to generate collages
#[derive(Debug, Clone)]
pub struct CollageRequest {
    pub hero: Option<SourceImage>,
    pub gallery: Vec<SourceImage>,
    pub aspect_ratio: AspectRatio,
    pub quality: QualityPreset,
}

impl CollageRequest {
    pub fn new(
        hero: SourceImage,
        gallery: Vec<SourceImage>,
        aspect_ratio: AspectRatio,
        quality: QualityPreset,
    ) -> Self {
        Self {
            hero: Some(hero),
            gallery,
            aspect_ratio,
            quality,
        }
    }

    /// Check the inputs before any generation work starts
    pub fn validate(&self) -> CollageResult<&SourceImage> {
        let hero = self
            .hero
            .as_ref()
            .ok_or_else(|| CollageError::InvalidInput("A hero image is required".to_string()))?;

        if self.gallery.len() < MIN_GALLERY_IMAGES {
            return Err(CollageError::InvalidInput(format!(
                "At least {} gallery images are required, got {}",
                MIN_GALLERY_IMAGES,
                self.gallery.len()
            )));
        }
        if self.gallery.len() > MAX_GALLERY_IMAGES {
            return Err(CollageError::InvalidInput(format!(
                "At most {} gallery images are allowed, got {}",
                MAX_GALLERY_IMAGES,
                self.gallery.len()
            )));
        }

        Ok(hero)
    }
}

/// Per-instance dimensions and image count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollageSpec {
    pub width: u32,
    pub height: u32,
    pub image_count: usize,
}

/// Output pixel size: the preset fixes the long side, the ratio the short one
pub fn resolve_dimensions(aspect_ratio: AspectRatio, quality: QualityPreset) -> (u32, u32) {
    let long_side = quality.long_side();
    let (ratio_w, ratio_h) = aspect_ratio.components();

    if ratio_w >= ratio_h {
        let height = (long_side as f64 * ratio_h as f64 / ratio_w as f64).round() as u32;
        (long_side, height)
    } else {
        let width = (long_side as f64 * ratio_w as f64 / ratio_h as f64).round() as u32;
        (width, long_side)
    }
}

/// Inclusive bounds for how many images (hero included) one collage may hold
pub fn image_count_bounds(gallery_len: usize) -> (usize, usize) {
    let max = MAX_IMAGES_PER_COLLAGE.min(gallery_len + 1);
    (MIN_IMAGES_PER_COLLAGE, max.max(MIN_IMAGES_PER_COLLAGE))
}

/// Draw the image count and the gallery subset for one instance.
///
/// The subset keeps the order of the shuffle; slot assignment relies on it.
pub fn plan_instance<R: Rng + ?Sized>(
    request: &CollageRequest,
    rng: &mut R,
) -> CollageResult<(CollageSpec, Vec<SourceImage>)> {
    request.validate()?;

    let (width, height) = resolve_dimensions(request.aspect_ratio, request.quality);
    let (min_count, max_count) = image_count_bounds(request.gallery.len());
    let image_count = rng.random_range(min_count..=max_count);

    let mut shuffled = request.gallery.clone();
    shuffled.shuffle(rng);
    shuffled.truncate(image_count - 1);

    Ok((
        CollageSpec {
            width,
            height,
            image_count,
        },
        shuffled,
    ))
}

/// Builds one collage at a time; holds no state between calls
#[derive(Debug, Clone)]
pub struct CollageAssembler {
    decode_workers: usize,
}

impl Default for CollageAssembler {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl CollageAssembler {
    pub fn new(decode_workers: usize) -> Self {
        Self {
            decode_workers: decode_workers.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.decode_workers)
    }

    /// Generate one collage. The same request and seed always yield the same layout and selection.
    ///
    /// Fails as a whole if any assigned image cannot be decoded or the canvas
    /// cannot be encoded; no partial collage is returned.
    pub async fn assemble(
        &self,
        request: &CollageRequest,
        instance_seed: u64,
    ) -> CollageResult<CollageArtifact> {
        let hero = request.validate()?.clone();
        let mut rng = StdRng::seed_from_u64(instance_seed);

        let (spec, subset) = plan_instance(request, &mut rng)?;
        let layout =
            layout_partitioner::partition(spec.width, spec.height, spec.image_count, &mut rng)?;
        let assignment = slot_assigner::assign(&layout, &hero, &subset)?;

        debug!(
            "Assembling {}x{} collage with {} images, hero in slot {}",
            spec.width,
            spec.height,
            spec.image_count,
            assignment.hero_slot()
        );

        // Background must be complete before any tile lands on it
        let mut canvas = RgbaImage::from_pixel(spec.width, spec.height, BACKGROUND);
        let line_width = image_compositor::border_width(spec.width);

        let (tx, mut rx) = mpsc::channel::<(usize, CollageResult<RgbaImage>)>(layout.len());
        let semaphore = Arc::new(Semaphore::new(self.decode_workers));

        for (slot, image) in assignment.iter() {
            let rect = layout[slot];
            let image = image.clone();
            let tx = tx.clone();
            let semaphore = semaphore.clone();

            tokio::spawn(async move {
                let tile = match semaphore.acquire_owned().await {
                    Ok(_permit) => render_tile(image, rect).await,
                    Err(e) => Err(CollageError::TaskFailed(e.to_string())),
                };
                // Receiver only disappears when assembly already failed
                let _ = tx.send((slot, tile)).await;
            });
        }
        drop(tx);

        // Single owner of the canvas: tiles are painted one at a time as they arrive
        let mut painted = 0;
        while let Some((slot, tile)) = rx.recv().await {
            let tile = tile?;
            let rect = layout[slot];
            image_compositor::paint_tile(&mut canvas, &tile, rect);
            image_compositor::stroke_border(&mut canvas, rect, line_width);
            painted += 1;
        }

        if painted != layout.len() {
            return Err(CollageError::TaskFailed(format!(
                "Only {} of {} tiles were rendered",
                painted,
                layout.len()
            )));
        }

        let encoded_bytes = tokio::task::spawn_blocking(move || image_compositor::encode_jpeg(canvas))
            .await
            .map_err(|e| CollageError::TaskFailed(e.to_string()))??;

        let mut used_images = Vec::with_capacity(spec.image_count);
        used_images.push(hero);
        used_images.extend(subset);

        Ok(CollageArtifact {
            encoded_bytes,
            used_images,
            width: spec.width,
            height: spec.height,
            layout,
            hero_slot: assignment.hero_slot(),
        })
    }
}

async fn render_tile(image: SourceImage, rect: Rect) -> CollageResult<RgbaImage> {
    tokio::task::spawn_blocking(move || image_compositor::prepare_tile(&image, rect))
        .await
        .map_err(|e| CollageError::TaskFailed(e.to_string()))?
}
