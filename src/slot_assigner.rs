use crate::collage_types::{CollageError, CollageResult, Rect, SourceImage};
use crate::layout_partitioner::largest_rect_index;

/// Image bound to each layout slot, indexed like the layout
#[derive(Debug, Clone)]
pub struct Assignment {
    slots: Vec<SourceImage>,
    hero_slot: usize,
}

impl Assignment {
    pub fn hero_slot(&self) -> usize {
        self.hero_slot
    }

    pub fn image_for(&self, slot: usize) -> Option<&SourceImage> {
        self.slots.get(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &SourceImage)> {
        self.slots.iter().enumerate()
    }
}

/// Put the hero into the largest rectangle and the gallery subset, in order,
/// into the remaining slots by ascending index.
pub fn assign(
    layout: &[Rect],
    hero: &SourceImage,
    gallery_subset: &[SourceImage],
) -> CollageResult<Assignment> {
    let hero_slot = largest_rect_index(layout).ok_or_else(|| {
        CollageError::InvalidInput("Cannot assign images to an empty layout".to_string())
    })?;

    if gallery_subset.len() != layout.len() - 1 {
        return Err(CollageError::InvalidInput(format!(
            "Layout has {} slots but {} gallery images were selected",
            layout.len(),
            gallery_subset.len()
        )));
    }

    let mut gallery = gallery_subset.iter();
    let mut slots = Vec::with_capacity(layout.len());
    for slot in 0..layout.len() {
        if slot == hero_slot {
            slots.push(hero.clone());
        } else if let Some(image) = gallery.next() {
            slots.push(image.clone());
        }
    }

    Ok(Assignment { slots, hero_slot })
}
