//! Region extraction from a full-frame capture.
//!
//! Validates that the frame shows the game overlay, crops the zone card at its
//! fixed position, then uses the cursor position to locate the portal card by
//! scanning for its charge-border color. Pure function of its inputs; retry
//! policy belongs to the caller.

pub mod layout;

use image::RgbaImage;

use crate::error::PipelineError;
use layout::{
    crop, crop_field, matches_color, PixelRect, CHARGE_BORDER_COLOR, CHARGE_BORDER_OFFSET,
    PORTAL_CARD_SIZE, PORTAL_NAME, PORTAL_TIME, VALIDATION_PALETTE, VALIDATION_PROBE, ZONE_CARD,
    ZONE_NAME,
};

/// One full-screen capture plus the cursor position at capture time.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    /// Screen coordinates of the cursor when the capture was taken.
    pub cursor: (u32, u32),
}

impl Frame {
    pub fn new(image: RgbaImage, cursor: (u32, u32)) -> Self {
        Self { image, cursor }
    }
}

/// The four crops produced from one valid frame.
pub struct Regions {
    pub zone_card: RgbaImage,
    pub zone_name: RgbaImage,
    pub portal_name: RgbaImage,
    pub portal_time: RgbaImage,
}

/// Extracts all overlay regions from a frame.
///
/// Fails with `InvalidFrame` when the validation probe inside the zone card
/// matches none of the expected colors, and with `PortalFrameNotFound` when no
/// charge-border pixel exists along the scan path from the cursor.
pub fn extract(frame: &Frame) -> Result<Regions, PipelineError> {
    let (width, height) = frame.image.dimensions();

    let zone_card = crop(&frame.image, ZONE_CARD.to_pixels(width, height));
    validate_zone_card(&zone_card)?;

    let portal_rect = locate_portal_card(frame)?;
    let portal_card = crop(&frame.image, portal_rect);

    let zone_name = crop_field(&zone_card, ZONE_NAME, width, height);
    let portal_name = crop_field(&portal_card, PORTAL_NAME, width, height);
    let portal_time = crop_field(&portal_card, PORTAL_TIME, width, height);

    Ok(Regions {
        zone_card,
        zone_name,
        portal_name,
        portal_time,
    })
}

/// Samples one pixel at a fixed fraction of the zone card and compares it
/// against the expected palette, within one unit per channel.
fn validate_zone_card(card: &RgbaImage) -> Result<(), PipelineError> {
    let (w, h) = card.dimensions();
    if w == 0 || h == 0 {
        return Err(PipelineError::InvalidFrame);
    }

    let px = ((VALIDATION_PROBE.0 * w as f32) as u32).min(w - 1);
    let py = ((VALIDATION_PROBE.1 * h as f32) as u32).min(h - 1);
    let pixel = card.get_pixel(px, py);

    if VALIDATION_PALETTE
        .iter()
        .any(|&expected| matches_color(pixel, expected))
    {
        Ok(())
    } else {
        Err(PipelineError::InvalidFrame)
    }
}

/// Locates the portal card from the cursor position.
///
/// The card sits adjacent to the cursor, growing toward the screen center and
/// upward. We step diagonally from the cursor until a pixel matches the
/// charge-border color, walk along the border to its far edge, then apply the
/// fixed proportional offset from that corner to the card's top-left.
fn locate_portal_card(frame: &Frame) -> Result<PixelRect, PipelineError> {
    let (width, height) = frame.image.dimensions();
    let (mx, my) = frame.cursor;
    let left_side = (mx as f32) / (width as f32) < 0.5;

    // Diagonal scan: x toward screen center, y upward, one pixel per step.
    let mut border: Option<(u32, u32)> = None;
    for step in 1.. {
        let x = if left_side {
            mx.checked_add(step).filter(|&x| x < width)
        } else {
            mx.checked_sub(step)
        };
        let y = my.checked_sub(step);
        let (Some(x), Some(y)) = (x, y) else { break };

        if matches_color(frame.image.get_pixel(x, y), CHARGE_BORDER_COLOR) {
            border = Some((x, y));
            break;
        }
    }

    let (mut bx, by) =
        border.ok_or(PipelineError::PortalFrameNotFound(mx, my))?;

    // Walk along the border toward the frame edge until the color runs out.
    if left_side {
        while bx > 0 && matches_color(frame.image.get_pixel(bx - 1, by), CHARGE_BORDER_COLOR) {
            bx -= 1;
        }
    } else {
        while bx + 1 < width && matches_color(frame.image.get_pixel(bx + 1, by), CHARGE_BORDER_COLOR)
        {
            bx += 1;
        }
    }

    let x_offset = (CHARGE_BORDER_OFFSET.0 * width as f32) as u32;
    let y_offset = (CHARGE_BORDER_OFFSET.1 * height as f32) as u32;
    let card_width = (PORTAL_CARD_SIZE.0 * width as f32) as u32;
    let card_height = (PORTAL_CARD_SIZE.1 * height as f32) as u32;

    // The detected corner is near the card's bottom-left (left half) or
    // bottom-right (right half, mirrored).
    let origin_x = if left_side {
        bx.saturating_sub(x_offset)
    } else {
        (bx + x_offset).saturating_sub(card_width)
    };
    let origin_y = by.saturating_sub(y_offset);

    Ok(PixelRect {
        x: origin_x,
        y: origin_y,
        width: card_width,
        height: card_height,
    })
}
