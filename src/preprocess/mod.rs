//! Image cleanup ahead of text recognition.
//!
//! Applied in order: grayscale conversion, contrast stretch, 3x3 median
//! filter, Otsu binarization, polarity normalization (text ends up white on a
//! black background). Timer crops additionally get a color-class scan up front
//! (run on the original color data) and a small-glyph removal pass at the end.

mod components;

use image::{GrayImage, Luma, RgbaImage};

pub use components::remove_small_glyphs;

/// Color class of the countdown text, detected before grayscale conversion.
/// Red countdowns tick in minutes/seconds, all others in hours/minutes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerColor {
    Red,
    Other,
}

/// A cleaned binary image plus optional timer metadata.
pub struct Preprocessed {
    pub image: GrayImage,
    pub timer_color: Option<TimerColor>,
}

/// Runs the full preprocessing pipeline over one cropped region.
pub fn preprocess(img: &RgbaImage, wants_timer_meta: bool) -> Preprocessed {
    let timer_color = wants_timer_meta.then(|| detect_timer_color(img));

    let mut gray = to_grayscale(img);
    stretch_contrast(&mut gray);
    let mut gray = median_filter(&gray);
    let threshold = otsu_threshold(&gray);
    binarize(&mut gray, threshold);
    normalize_polarity(&mut gray);

    let image = if wants_timer_meta {
        remove_small_glyphs(&gray)
    } else {
        gray
    };

    Preprocessed { image, timer_color }
}

/// Scans the original color image for strongly red pixels.
fn detect_timer_color(img: &RgbaImage) -> TimerColor {
    for pixel in img.pixels() {
        let (r, g, b) = (pixel[0], pixel[1], pixel[2]);
        if r > 200 && g < 100 && b < 100 {
            return TimerColor::Red;
        }
    }
    TimerColor::Other
}

/// ITU-R BT.601 luma conversion.
fn to_grayscale(img: &RgbaImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels() {
        let gray =
            0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32;
        out.put_pixel(x, y, Luma([gray as u8]));
    }
    out
}

/// Fixed-point contrast stretch at contrast level 128.
fn stretch_contrast(img: &mut GrayImage) {
    let factor = (259.0 * (128.0 + 255.0)) / (255.0 * (259.0 - 128.0));
    for pixel in img.pixels_mut() {
        let v = factor * (pixel[0] as f32 - 128.0) + 128.0;
        pixel[0] = v.clamp(0.0, 255.0) as u8;
    }
}

/// 3x3 median filter. Border pixels are left untouched.
fn median_filter(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut out = img.clone();
    if width < 3 || height < 3 {
        return out;
    }

    let mut window = [0u8; 9];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut i = 0;
            for ky in 0..3 {
                for kx in 0..3 {
                    window[i] = img.get_pixel(x + kx - 1, y + ky - 1)[0];
                    i += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, Luma([window[4]]));
        }
    }
    out
}

/// Otsu's method: the threshold maximizing between-class variance over the
/// luminance histogram. The first threshold attaining the maximum wins.
fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut histogram = [0u32; 256];
    for pixel in img.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total = (img.width() * img.height()) as f64;
    let sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0;
    let mut weight_background = 0.0;
    let mut max_variance = 0.0;
    let mut threshold = 0u8;

    for (i, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += i as f64 * count as f64;
        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum - sum_background) / weight_foreground;
        let between = weight_background
            * weight_foreground
            * (mean_background - mean_foreground)
            * (mean_background - mean_foreground);

        if between > max_variance {
            max_variance = between;
            threshold = i as u8;
        }
    }

    threshold
}

fn binarize(img: &mut GrayImage, threshold: u8) {
    for pixel in img.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
}

/// Ensures the convention is white text on a black background: if the corner
/// pixel is light the image is inverted.
fn normalize_polarity(img: &mut GrayImage) {
    if img.width() == 0 || img.height() == 0 {
        return;
    }
    if img.get_pixel(0, 0)[0] < 128 {
        return;
    }
    for pixel in img.pixels_mut() {
        pixel[0] = if pixel[0] < 128 { 255 } else { 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_detect_timer_color_red() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([30, 30, 30, 255]));
        img.put_pixel(2, 1, Rgba([220, 40, 40, 255]));
        assert_eq!(detect_timer_color(&img), TimerColor::Red);
    }

    #[test]
    fn test_detect_timer_color_other() {
        // Bright but not red enough (green channel too high).
        let img = RgbaImage::from_pixel(4, 4, Rgba([220, 150, 40, 255]));
        assert_eq!(detect_timer_color(&img), TimerColor::Other);
    }

    #[test]
    fn test_grayscale_weights() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([100, 150, 200, 255]));
        let gray = to_grayscale(&img);
        // 0.299*100 + 0.587*150 + 0.114*200 = 140.75
        assert_eq!(gray.get_pixel(0, 0)[0], 140);
    }

    #[test]
    fn test_contrast_stretch_clamps() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([255]));
        img.put_pixel(1, 0, Luma([0]));
        stretch_contrast(&mut img);
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_median_filter_removes_speck() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([0]));
        img.put_pixel(2, 2, Luma([255]));
        let filtered = median_filter(&img);
        assert_eq!(filtered.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn test_median_filter_leaves_border() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([0]));
        img.put_pixel(0, 0, Luma([255]));
        let filtered = median_filter(&img);
        assert_eq!(filtered.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_otsu_separates_two_classes() {
        let mut img = GrayImage::new(10, 1);
        for x in 0..5 {
            img.put_pixel(x, 0, Luma([40]));
        }
        for x in 5..10 {
            img.put_pixel(x, 0, Luma([200]));
        }
        let t = otsu_threshold(&img);
        assert!((40..200).contains(&t), "threshold {} out of range", t);
    }

    #[test]
    fn test_polarity_inverts_light_background() {
        let mut img = GrayImage::from_pixel(3, 1, Luma([255]));
        img.put_pixel(1, 0, Luma([0]));
        normalize_polarity(&mut img);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_binary_polarized_input_is_fixpoint() {
        // A black-background binary image passes stages 5-6 unchanged.
        let mut img = GrayImage::from_pixel(6, 3, Luma([0]));
        img.put_pixel(3, 1, Luma([255]));
        img.put_pixel(4, 1, Luma([255]));

        let mut out = img.clone();
        let t = otsu_threshold(&out);
        binarize(&mut out, t);
        normalize_polarity(&mut out);
        assert_eq!(img.as_raw(), out.as_raw());
    }

    #[test]
    fn test_preprocess_carries_timer_meta() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([230, 20, 20, 255]));
        let result = preprocess(&img, true);
        assert_eq!(result.timer_color, Some(TimerColor::Red));

        let result = preprocess(&img, false);
        assert!(result.timer_color.is_none());
    }
}
