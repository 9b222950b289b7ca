pub mod batch_driver;
pub mod collage_generator;
pub mod collage_types;
pub mod config;
pub mod image_compositor;
pub mod layout_partitioner;
pub mod slot_assigner;

pub use batch_driver::{BatchDriver, BatchProgress, GeneratedCollage};
pub use collage_generator::{CollageAssembler, CollageRequest};
pub use collage_types::{
    AspectRatio, CollageArtifact, CollageError, CollageResult, QualityPreset, Rect, SourceImage,
};
pub use config::Config;
