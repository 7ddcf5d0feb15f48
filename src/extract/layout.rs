//! Fixed proportional layout of the game overlay.
//!
//! All regions are expressed as fractions of a 3840x2160 reference capture,
//! so the layout scales with whatever resolution the frame was taken at.

use image::{Rgba, RgbaImage};

const REFERENCE_WIDTH: f32 = 3840.0;
const REFERENCE_HEIGHT: f32 = 2160.0;

/// A rectangle in relative coordinates (0.0 to 1.0) of the full frame.
#[derive(Clone, Copy, Debug)]
pub struct RelativeRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RelativeRect {
    const fn from_reference(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: x / REFERENCE_WIDTH,
            y: y / REFERENCE_HEIGHT,
            width: width / REFERENCE_WIDTH,
            height: height / REFERENCE_HEIGHT,
        }
    }

    /// Converts to absolute pixel coordinates for a frame of the given size.
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        PixelRect {
            x: (self.x * frame_width as f32) as u32,
            y: (self.y * frame_height as f32) as u32,
            width: (self.width * frame_width as f32) as u32,
            height: (self.height * frame_height as f32) as u32,
        }
    }
}

/// A rectangle in absolute pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The zone card at the top of the screen.
pub const ZONE_CARD: RelativeRect = RelativeRect::from_reference(524.0, 55.0, 814.0, 157.0);

/// Zone-name text field, positioned inside the zone card. The offsets scale
/// with the full frame but are applied relative to the card's origin.
pub const ZONE_NAME: RelativeRect = RelativeRect::from_reference(180.0, 19.0, 628.0, 79.0);

/// Portal-name text field inside the portal card.
pub const PORTAL_NAME: RelativeRect = RelativeRect::from_reference(120.0, 56.0, 578.0, 51.0);

/// Portal countdown field inside the portal card.
pub const PORTAL_TIME: RelativeRect = RelativeRect::from_reference(543.0, 166.0, 162.0, 47.0);

/// Size of the portal card itself (its position depends on the cursor).
pub const PORTAL_CARD_SIZE: (f32, f32) = (720.0 / REFERENCE_WIDTH, 225.0 / REFERENCE_HEIGHT);

/// Validation probe position as a fraction of the zone card's own size.
pub const VALIDATION_PROBE: (f32, f32) = (90.0 / 814.0, 90.0 / 157.0);

/// Expected colors at the validation probe, one per zone quality tier.
pub const VALIDATION_PALETTE: [[u8; 3]; 4] = [
    [61, 103, 156],
    [27, 28, 41],
    [255, 176, 1],
    [255, 2, 0],
];

/// Border color of the portal card's charge frame.
pub const CHARGE_BORDER_COLOR: [u8; 3] = [126, 116, 120];

/// Offset from the detected border corner to the portal card's top-left.
pub const CHARGE_BORDER_OFFSET: (f32, f32) = (20.0 / REFERENCE_WIDTH, 154.0 / REFERENCE_HEIGHT);

/// Crops a sub-region from an image, clamped to the image bounds.
pub fn crop(img: &RgbaImage, rect: PixelRect) -> RgbaImage {
    let (w, h) = img.dimensions();
    let x0 = rect.x.min(w.saturating_sub(1));
    let y0 = rect.y.min(h.saturating_sub(1));
    let rw = rect.width.min(w - x0);
    let rh = rect.height.min(h - y0);
    image::imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// True when every channel of the pixel is within one unit of the expected color.
pub fn matches_color(pixel: &Rgba<u8>, expected: [u8; 3]) -> bool {
    expected
        .iter()
        .enumerate()
        .all(|(i, &c)| (pixel[i] as i16 - c as i16).abs() <= 1)
}

/// Crops a field out of a parent card. The rect offsets are fractions of the
/// full frame (the overlay lays fields out at frame scale inside each card).
pub fn crop_field(
    card: &RgbaImage,
    field: RelativeRect,
    frame_width: u32,
    frame_height: u32,
) -> RgbaImage {
    crop(card, field.to_pixels(frame_width, frame_height))
}
