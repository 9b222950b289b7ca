use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Square,        // 1:1
    Portrait9x16,  // 9:16
    Landscape16x9, // 16:9
    Portrait3x4,   // 3:4
    Landscape4x3,  // 4:3
    SocialPost,    // 1200:628
    Story,         // 900:1600
}

/// Coarse shape of an aspect ratio, used for picking an icon or a default layout hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Square,
    Portrait,
    Landscape,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 7] = [
        AspectRatio::Square,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::SocialPost,
        AspectRatio::Story,
    ];

    /// Integer (width, height) components of the ratio
    pub fn components(self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Portrait9x16 => (9, 16),
            AspectRatio::Landscape16x9 => (16, 9),
            AspectRatio::Portrait3x4 => (3, 4),
            AspectRatio::Landscape4x3 => (4, 3),
            AspectRatio::SocialPost => (1200, 628),
            AspectRatio::Story => (900, 1600),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::SocialPost => "1200:628",
            AspectRatio::Story => "900:1600",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Square => "Square (1:1)",
            AspectRatio::Portrait9x16 => "Portrait (9:16)",
            AspectRatio::Landscape16x9 => "Landscape (16:9)",
            AspectRatio::Portrait3x4 => "Portrait (3:4)",
            AspectRatio::Landscape4x3 => "Landscape (4:3)",
            AspectRatio::SocialPost => "Social Post (1200x628)",
            AspectRatio::Story => "Story (900x1600)",
        }
    }

    pub fn orientation(self) -> Orientation {
        let (width, height) = self.components();
        match width.cmp(&height) {
            std::cmp::Ordering::Equal => Orientation::Square,
            std::cmp::Ordering::Less => Orientation::Portrait,
            std::cmp::Ordering::Greater => Orientation::Landscape,
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Square
    }
}

impl FromStr for AspectRatio {
    type Err = CollageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| CollageError::InvalidInput(format!("Unknown aspect ratio '{}'", s)))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityPreset {
    TwoK,  // 2048px
    FourK, // 3840px
}

impl QualityPreset {
    /// Pixel length of the output's longer side
    pub fn long_side(self) -> u32 {
        match self {
            QualityPreset::TwoK => 2048,
            QualityPreset::FourK => 3840,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::TwoK => "2K",
            QualityPreset::FourK => "4K",
        }
    }
}

impl Default for QualityPreset {
    fn default() -> Self {
        QualityPreset::TwoK
    }
}

impl FromStr for QualityPreset {
    type Err = CollageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2K" | "2k" => Ok(QualityPreset::TwoK),
            "4K" | "4k" => Ok(QualityPreset::FourK),
            other => Err(CollageError::InvalidInput(format!(
                "Unknown quality preset '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Axis-aligned pixel rectangle on the collage canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.w as f64 / self.h as f64
    }

    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

/// An encoded source photo as handed over by the caller.
///
/// Only the encoded bytes are held; decoding happens inside each collage
/// generation and the raster is dropped when that generation finishes.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::from(bytes.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One finished collage: the encoded JPEG plus what went into it
#[derive(Debug, Clone)]
pub struct CollageArtifact {
    pub encoded_bytes: Vec<u8>,
    /// Hero first, then the gallery subset in selection order
    pub used_images: Vec<SourceImage>,
    pub width: u32,
    pub height: u32,
    pub layout: Vec<Rect>,
    pub hero_slot: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CollageError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to decode image '{name}': {source}")]
    DecodeFailure {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to encode collage: {0}")]
    EncodeFailure(#[source] image::ImageError),
    #[error("Background task failed: {0}")]
    TaskFailed(String),
    #[error("Collage {instance} failed: {source}")]
    InstanceFailed {
        instance: usize,
        #[source]
        source: Box<CollageError>,
    },
}

pub type CollageResult<T> = Result<T, CollageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_round_trips_through_str() {
        for ratio in AspectRatio::ALL {
            assert_eq!(ratio.as_str().parse::<AspectRatio>().unwrap(), ratio);
            assert_eq!(format!("{}", ratio), ratio.as_str());
        }
        assert!(matches!(
            "5:4".parse::<AspectRatio>(),
            Err(CollageError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_aspect_ratio_labels_and_orientation() {
        assert_eq!(AspectRatio::SocialPost.label(), "Social Post (1200x628)");
        assert_eq!(AspectRatio::Story.label(), "Story (900x1600)");
        assert_eq!(AspectRatio::Square.orientation(), Orientation::Square);
        assert_eq!(AspectRatio::Portrait3x4.orientation(), Orientation::Portrait);
        assert_eq!(AspectRatio::Story.orientation(), Orientation::Portrait);
        assert_eq!(
            AspectRatio::SocialPost.orientation(),
            Orientation::Landscape
        );
    }

    #[test]
    fn test_quality_preset_long_side() {
        assert_eq!(QualityPreset::TwoK.long_side(), 2048);
        assert_eq!(QualityPreset::FourK.long_side(), 3840);
        assert_eq!("4K".parse::<QualityPreset>().unwrap(), QualityPreset::FourK);
        assert_eq!("2k".parse::<QualityPreset>().unwrap(), QualityPreset::TwoK);
        assert!("8K".parse::<QualityPreset>().is_err());
    }

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        let c = Rect::new(5, 5, 10, 10);

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
        assert_eq!(a.area(), 100);
        assert!(a.contains(9, 9));
        assert!(!a.contains(10, 0));
    }

    #[test]
    fn test_source_image_debug_hides_bytes() {
        let image = SourceImage::new("hero.jpg", vec![0u8; 4096]);
        let debug = format!("{:?}", image);
        assert!(debug.contains("hero.jpg"));
        assert!(debug.contains("4096"));
        assert_eq!(image.bytes().len(), 4096);
    }
}
