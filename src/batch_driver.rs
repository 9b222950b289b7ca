use log::{error, info};
use rand::Rng;

use crate::collage_generator::{CollageAssembler, CollageRequest};
use crate::collage_types::{CollageArtifact, CollageError, CollageResult};
use crate::config::Config;

/// Collages produced per batch run
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Progress after an instance finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn fraction(&self) -> f64 {
        self.completed as f64 / self.total as f64
    }

    /// Percentage in `0..=100`, exact for totals that divide 100
    pub fn percent(&self) -> f64 {
        (self.completed * 100) as f64 / self.total as f64
    }
}

/// A collage with its display name, ready for download or packaging
#[derive(Debug, Clone)]
pub struct GeneratedCollage {
    pub name: String,
    pub artifact: CollageArtifact,
}

impl GeneratedCollage {
    pub fn new(instance: usize, artifact: CollageArtifact) -> Self {
        Self {
            name: collage_name(instance),
            artifact,
        }
    }

    /// File names and contents for exporting the collage with its sources
    pub fn export_entries(&self) -> Vec<(String, &[u8])> {
        let mut entries = Vec::with_capacity(self.artifact.used_images.len() + 1);
        entries.push((
            format!("RESULT_{}", self.name),
            self.artifact.encoded_bytes.as_slice(),
        ));
        for (idx, image) in self.artifact.used_images.iter().enumerate() {
            entries.push((format!("source_{}_{}", idx + 1, image.name()), image.bytes()));
        }
        entries
    }

    /// Archive name for the collage and its sources
    pub fn pack_name(&self) -> String {
        let stem = self.name.strip_suffix(".jpg").unwrap_or(&self.name);
        format!("Pack_{}.zip", stem)
    }
}

/// Display name for the 1-based instance number
pub fn collage_name(instance: usize) -> String {
    format!("Collage-{}.jpg", instance)
}

pub struct BatchDriver {
    assembler: CollageAssembler,
    batch_size: usize,
    base_seed: Option<u64>,
}

impl BatchDriver {
    pub fn new(assembler: CollageAssembler, batch_size: usize) -> Self {
        Self {
            assembler,
            batch_size: batch_size.max(1),
            base_seed: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(CollageAssembler::from_config(config), config.batch_size).with_seed(config.seed)
    }

    /// Fix the seed of the first instance; later instances use consecutive seeds
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Generate the full batch one instance at a time.
    ///
    /// `on_progress` runs after every finished instance. The first failing
    /// instance aborts the batch and nothing generated so far is returned.
    pub async fn generate_batch<F>(
        &self,
        request: &CollageRequest,
        mut on_progress: F,
    ) -> CollageResult<Vec<GeneratedCollage>>
    where
        F: FnMut(BatchProgress),
    {
        request.validate()?;

        let base_seed = self.base_seed.unwrap_or_else(|| rand::rng().random());
        info!(
            "Generating {} collages ({} at {}, {} gallery images)",
            self.batch_size,
            request.aspect_ratio.label(),
            request.quality,
            request.gallery.len()
        );

        let mut results = Vec::with_capacity(self.batch_size);
        for idx in 0..self.batch_size {
            // Let the caller's tasks observe progress between instances
            tokio::task::yield_now().await;

            let instance = idx + 1;
            let seed = base_seed.wrapping_add(idx as u64);

            let artifact = match self.assembler.assemble(request, seed).await {
                Ok(artifact) => artifact,
                Err(e) => {
                    error!(
                        "Collage {} of {} failed, aborting batch: {}",
                        instance, self.batch_size, e
                    );
                    return Err(CollageError::InstanceFailed {
                        instance,
                        source: Box::new(e),
                    });
                }
            };

            results.push(GeneratedCollage::new(instance, artifact));

            let progress = BatchProgress {
                completed: instance,
                total: self.batch_size,
            };
            info!(
                "Progress: {}/{} collages ({:.0}%)",
                progress.completed,
                progress.total,
                progress.percent()
            );
            on_progress(progress);
        }

        Ok(results)
    }
}
