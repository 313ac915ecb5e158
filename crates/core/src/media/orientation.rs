//! EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::DynamicImage;

/// EXIF tag number of the orientation field.
pub const ORIENTATION_TAG: u16 = 274;

/// Clockwise rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// No rotation.
    None,
    /// 90 degrees clockwise.
    Cw90,
    /// 180 degrees.
    Cw180,
    /// 270 degrees clockwise.
    Cw270,
}

/// Rotation followed by an optional horizontal flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    /// Rotation applied first.
    pub rotation: Rotation,
    /// Mirror left-to-right after rotating.
    pub flip_horizontal: bool,
}

impl Transform {
    const fn new(rotation: Rotation, flip_horizontal: bool) -> Self {
        Self {
            rotation,
            flip_horizontal,
        }
    }

    /// Transform that makes an image with EXIF orientation `value` upright.
    ///
    /// Returns `None` for values outside 1-8.
    #[must_use]
    pub fn for_orientation(value: u32) -> Option<Self> {
        let transform = match value {
            1 => Self::new(Rotation::None, false),
            2 => Self::new(Rotation::None, true),
            3 => Self::new(Rotation::Cw180, false),
            4 => Self::new(Rotation::Cw180, true),
            5 => Self::new(Rotation::Cw90, true),
            6 => Self::new(Rotation::Cw90, false),
            7 => Self::new(Rotation::Cw270, true),
            8 => Self::new(Rotation::Cw270, false),
            _ => return None,
        };
        Some(transform)
    }

    /// Whether width and height trade places.
    #[must_use]
    pub fn swaps_dimensions(self) -> bool {
        matches!(self.rotation, Rotation::Cw90 | Rotation::Cw270)
    }

    /// Apply to a decoded image.
    #[must_use]
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        let rotated = match self.rotation {
            Rotation::None => image,
            Rotation::Cw90 => image.rotate90(),
            Rotation::Cw180 => image.rotate180(),
            Rotation::Cw270 => image.rotate270(),
        };
        if self.flip_horizontal {
            rotated.fliph()
        } else {
            rotated
        }
    }
}

/// EXIF orientation value embedded in encoded image bytes, if any.
#[must_use]
pub fn read_orientation(bytes: &[u8]) -> Option<u32> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    exif.get_field(Tag::Orientation, In::PRIMARY)?
        .value
        .get_uint(0)
}
