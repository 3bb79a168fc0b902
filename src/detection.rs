//! Edge-contour watermark localization.
//!
//! Finds the most plausible watermark-shaped rectangle in an image:
//! 1. Luminance grayscale conversion
//! 2. Canny edge map with hysteresis thresholding
//! 3. External contour extraction
//! 4. Largest bounding rectangle under an area cap (watermarks are assumed
//!    to occupy a minority of the frame)

use image::{GrayImage, Luma, RgbaImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::point::Point;

use crate::geometry::Rect;

/// Canny hysteresis low threshold: weak edges above this survive when
/// connected to a strong edge.
pub const CANNY_LOW: f32 = 50.0;
/// Canny hysteresis high threshold: gradient magnitudes above this are edges.
pub const CANNY_HIGH: f32 = 200.0;
/// Candidates covering at least this fraction of the frame are rejected as
/// background or border artifacts.
pub const MAX_AREA_RATIO: f64 = 0.3;

/// Convert an RGBA image to grayscale.
///
/// Uses luminance formula: `0.299*R + 0.587*G + 0.114*B`.
#[must_use]
pub fn to_grayscale(image: &RgbaImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(gray.pixels_mut()) {
        let lum =
            0.299 * f32::from(src[0]) + 0.587 * f32::from(src[1]) + 0.114 * f32::from(src[2]);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            *dst = Luma([lum.round().clamp(0.0, 255.0) as u8]);
        }
    }
    gray
}

/// Locate the most plausible watermark rectangle in `image`.
///
/// Returns `None` when no contour qualifies (e.g. a blank uniform image, or
/// every contour spans too much of the frame). Ties on area keep the first
/// contour found in extraction order.
#[must_use]
pub fn detect_region(image: &RgbaImage) -> Option<Rect> {
    let gray = to_grayscale(image);
    let edge_map = canny(&gray, CANNY_LOW, CANNY_HIGH);
    let contours = find_contours::<i32>(&edge_map);

    let frame_area = u64::from(image.width()) * u64::from(image.height());
    #[allow(clippy::cast_precision_loss)]
    let area_cap = MAX_AREA_RATIO * frame_area as f64;

    let mut best: Option<Rect> = None;
    for contour in &contours {
        // Only outermost boundaries; nested contours are ignored.
        if contour.border_type != BorderType::Outer || contour.parent.is_some() {
            continue;
        }
        let Some(rect) = bounding_rect(&contour.points) else {
            continue;
        };
        #[allow(clippy::cast_precision_loss)]
        if rect.area() == 0 || rect.area() as f64 >= area_cap {
            continue;
        }
        if best.is_none_or(|b| rect.area() > b.area()) {
            best = Some(rect);
        }
    }
    best
}

/// Axis-aligned bounding rectangle of a contour's points.
#[allow(clippy::cast_sign_loss)]
fn bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}
