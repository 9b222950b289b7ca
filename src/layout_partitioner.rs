//! Randomized binary space partitioning of the collage canvas.
//!
//! The canvas starts as one rectangle. Each round the largest rectangle is
//! cut in two along one axis at a random point between 30% and 70% of its
//! extent, until the requested number of rectangles exists. The result tiles
//! the canvas exactly: no gaps, no overlaps.

use log::debug;
use rand::Rng;

use crate::collage_types::{CollageError, CollageResult, Rect};

/// Width/height ratios strictly inside this range count as "squarish" and get a random split axis
const SQUARISH_RANGE: (f64, f64) = (0.8, 1.2);

/// Fraction of the split axis given to the first child
const SPLIT_FRACTION_RANGE: (f64, f64) = (0.3, 0.7);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitAxis {
    /// Cut with a vertical line, dividing the width
    Vertical,
    /// Cut with a horizontal line, dividing the height
    Horizontal,
}

/// Index of the rectangle with the largest area, lowest index winning ties
pub fn largest_rect_index(rects: &[Rect]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (idx, rect) in rects.iter().enumerate() {
        let area = rect.area();
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((idx, area)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Split a `width` x `height` canvas into exactly `count` rectangles.
///
/// Split candidates are removed from their position and their two children
/// appended at the end, so the returned order reflects split history.
pub fn partition<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    count: usize,
    rng: &mut R,
) -> CollageResult<Vec<Rect>> {
    if width == 0 || height == 0 {
        return Err(CollageError::InvalidInput(format!(
            "Canvas must have positive dimensions, got {}x{}",
            width, height
        )));
    }
    if count == 0 {
        return Err(CollageError::InvalidInput(
            "Layout needs at least one rectangle".to_string(),
        ));
    }
    if count as u64 > width as u64 * height as u64 {
        return Err(CollageError::InvalidInput(format!(
            "Cannot fit {} rectangles into a {}x{} canvas",
            count, width, height
        )));
    }

    let mut rects = Vec::with_capacity(count);
    rects.push(Rect::new(0, 0, width, height));

    while rects.len() < count {
        let Some(idx) = largest_rect_index(&rects) else {
            break;
        };
        let candidate = rects.remove(idx);
        let axis = choose_axis(&candidate, rng);
        let fraction = rng.random_range(SPLIT_FRACTION_RANGE.0..=SPLIT_FRACTION_RANGE.1);
        let (first, second) = split(&candidate, axis, fraction);

        debug!(
            "Split {} {:?} at {:.2} into {} and {}",
            candidate, axis, fraction, first, second
        );

        rects.push(first);
        rects.push(second);
    }

    Ok(rects)
}

fn choose_axis<R: Rng + ?Sized>(rect: &Rect, rng: &mut R) -> SplitAxis {
    let ratio = rect.aspect_ratio();
    let squarish = ratio > SQUARISH_RANGE.0 && ratio < SQUARISH_RANGE.1;

    if squarish {
        if rng.random_bool(0.5) {
            SplitAxis::Vertical
        } else {
            SplitAxis::Horizontal
        }
    } else if rect.w > rect.h {
        SplitAxis::Vertical
    } else {
        SplitAxis::Horizontal
    }
}

/// First child gets the truncated share, second child the remainder.
///
/// The first share is kept within `1..extent` so neither child collapses on
/// very small rectangles.
fn split(rect: &Rect, axis: SplitAxis, fraction: f64) -> (Rect, Rect) {
    let extent = match axis {
        SplitAxis::Vertical => rect.w,
        SplitAxis::Horizontal => rect.h,
    };
    let max_first = extent.saturating_sub(1).max(1);
    let first = ((extent as f64 * fraction).floor() as u32).clamp(1, max_first);
    let second = extent - first;

    match axis {
        SplitAxis::Vertical => (
            Rect::new(rect.x, rect.y, first, rect.h),
            Rect::new(rect.x + first, rect.y, second, rect.h),
        ),
        SplitAxis::Horizontal => (
            Rect::new(rect.x, rect.y, rect.w, first),
            Rect::new(rect.x, rect.y + first, rect.w, second),
        ),
    }
}
