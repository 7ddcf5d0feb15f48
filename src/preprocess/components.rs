//! Connected-component filtering for timer crops.
//!
//! The countdown digits are uniform height, so any foreground blob whose
//! bounding box is noticeably shorter than the tallest one is stray noise
//! (specks of the charge border, compression artifacts) and gets dropped.

use image::{GrayImage, Luma};

/// Bounding box of one 4-connected foreground component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BoundingBox {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Removes foreground components shorter than 90% of the tallest one.
///
/// The image is rebuilt from black, compositing back the kept components'
/// bounding boxes at their original positions. Components under 2px in either
/// dimension never count as components at all.
pub fn remove_small_glyphs(img: &GrayImage) -> GrayImage {
    let boxes = find_bounding_boxes(img);
    let Some(max_height) = boxes.iter().map(|b| b.height).max() else {
        return img.clone();
    };

    let height_threshold = max_height as f32 * 0.9;
    let kept: Vec<BoundingBox> = boxes
        .into_iter()
        .filter(|b| b.height as f32 > height_threshold)
        .collect();

    let mut out = GrayImage::from_pixel(img.width(), img.height(), Luma([0]));
    for bbox in kept {
        for y in bbox.y..bbox.y + bbox.height {
            for x in bbox.x..bbox.x + bbox.width {
                out.put_pixel(x, y, *img.get_pixel(x, y));
            }
        }
    }
    out
}

/// Finds bounding boxes of all 4-connected foreground components.
fn find_bounding_boxes(img: &GrayImage) -> Vec<BoundingBox> {
    let (width, height) = img.dimensions();
    // Scratch copy: flood fill clears visited pixels as it goes.
    let mut scratch = img.as_raw().clone();
    let mut boxes = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if scratch[(y * width + x) as usize] < 128 {
                continue;
            }
            if let Some(bbox) = flood_fill(&mut scratch, width, height, x, y) {
                boxes.push(bbox);
            }
        }
    }

    boxes
}

/// Stack-based flood fill from one seed pixel. Returns None for components
/// smaller than 2px in either dimension.
fn flood_fill(
    scratch: &mut [u8],
    width: u32,
    height: u32,
    start_x: u32,
    start_y: u32,
) -> Option<BoundingBox> {
    let mut stack = vec![(start_x as i64, start_y as i64)];
    let (mut min_x, mut max_x) = (start_x, start_x);
    let (mut min_y, mut max_y) = (start_y, start_y);

    while let Some((x, y)) = stack.pop() {
        if x < 0 || x >= width as i64 || y < 0 || y >= height as i64 {
            continue;
        }
        let index = (y as u32 * width + x as u32) as usize;
        if scratch[index] < 128 {
            continue;
        }
        scratch[index] = 0;

        let (x, y) = (x as u32, y as u32);
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);

        stack.push((x as i64 + 1, y as i64));
        stack.push((x as i64 - 1, y as i64));
        stack.push((x as i64, y as i64 + 1));
        stack.push((x as i64, y as i64 - 1));
    }

    if max_x - min_x < 2 || max_y - min_y < 2 {
        return None;
    }
    Some(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paint_block(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, Luma([255]));
            }
        }
    }

    #[test]
    fn test_keeps_tall_components_drops_short_ones() {
        let mut img = GrayImage::from_pixel(40, 20, Luma([0]));
        paint_block(&mut img, 2, 2, 4, 12); // digit-sized
        paint_block(&mut img, 10, 2, 4, 12); // digit-sized
        paint_block(&mut img, 20, 10, 4, 4); // noise blob, too short

        let out = remove_small_glyphs(&img);

        assert_eq!(out.get_pixel(3, 5)[0], 255);
        assert_eq!(out.get_pixel(11, 5)[0], 255);
        assert_eq!(out.get_pixel(21, 11)[0], 0, "short blob should be removed");
    }

    #[test]
    fn test_tiny_specks_are_not_components() {
        // A single lone pixel must not become the tallest component and
        // cause everything else to be dropped.
        let mut img = GrayImage::from_pixel(20, 20, Luma([0]));
        img.put_pixel(15, 15, Luma([255]));
        paint_block(&mut img, 2, 2, 3, 8);

        let out = remove_small_glyphs(&img);
        assert_eq!(out.get_pixel(3, 4)[0], 255);
        assert_eq!(out.get_pixel(15, 15)[0], 0);
    }

    #[test]
    fn test_empty_image_passes_through() {
        let img = GrayImage::from_pixel(10, 10, Luma([0]));
        let out = remove_small_glyphs(&img);
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn test_uniform_height_digits_all_kept() {
        let mut img = GrayImage::from_pixel(30, 12, Luma([0]));
        for i in 0..4 {
            paint_block(&mut img, 2 + i * 7, 1, 4, 10);
        }
        let out = remove_small_glyphs(&img);
        for i in 0..4 {
            assert_eq!(out.get_pixel(3 + i * 7, 5)[0], 255);
        }
    }
}
