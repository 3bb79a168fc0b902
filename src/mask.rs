//! Reconstruction-mask construction.
//!
//! A mask is a single-channel grid matching the image dimensions: 0 keeps the
//! source pixel, 255 requests full reconstruction, and intermediate values
//! blend the two (see [`crate::inpaint::reconstruct`]).

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

use crate::geometry::Rect;

/// Mask value requesting full reconstruction of a pixel.
pub const MASK_FULL: u8 = 255;
/// Default padding applied around imprecise selections, in pixels.
pub const DEFAULT_PADDING: u32 = 5;
/// Feathering blur sigma; kernel support is roughly 5x5.
const FEATHER_SIGMA: f32 = 1.0;

/// Render candidate rectangles into a reconstruction mask of `width x height`.
///
/// Each rectangle's sub-grid is set to [`MASK_FULL`]; overlapping rectangles
/// combine via union. With `feather`, a small Gaussian blur softens the
/// mask's hard edges into a gradient so the reconstruction blends into its
/// surroundings without a visible seam.
#[must_use]
pub fn build_mask(width: u32, height: u32, rects: &[Rect], feather: bool) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for rect in rects {
        let Some(r) = rect.clamped(width, height) else {
            continue;
        };
        for y in r.y..r.y + r.height {
            for x in r.x..r.x + r.width {
                mask.put_pixel(x, y, Luma([MASK_FULL]));
            }
        }
    }
    if feather {
        gaussian_blur_f32(&mask, FEATHER_SIGMA)
    } else {
        mask
    }
}

/// Expand a selection by `padding` pixels on every side, clamped to the image
/// bounds, to compensate for imprecise manual or automatic selections.
#[must_use]
pub fn enhance_padding(rect: Rect, width: u32, height: u32, padding: u32) -> Rect {
    rect.padded(padding, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masked_count(mask: &GrayImage) -> u64 {
        mask.pixels().filter(|p| p[0] == MASK_FULL).count() as u64
    }

    #[test]
    fn mask_pixel_count_equals_rect_area() {
        let rect = Rect::new(10, 15, 50, 20);
        let mask = build_mask(100, 100, &[rect], false);
        assert_eq!(masked_count(&mask), rect.area());
    }

    #[test]
    fn overlapping_rects_union_without_double_counting() {
        let a = Rect::new(10, 10, 20, 20);
        let b = Rect::new(20, 20, 20, 20);
        let mask = build_mask(100, 100, &[a, b], false);
        // Union = 400 + 400 - 100 overlap.
        assert_eq!(masked_count(&mask), 700);
        assert!(masked_count(&mask) <= a.area() + b.area());
    }

    #[test]
    fn disjoint_rects_sum_exactly() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(50, 50, 10, 10);
        let mask = build_mask(100, 100, &[a, b], false);
        assert_eq!(masked_count(&mask), a.area() + b.area());
    }

    #[test]
    fn empty_rect_list_builds_zero_mask() {
        let mask = build_mask(40, 30, &[], false);
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn feathering_produces_intermediate_values_at_edges() {
        let rect = Rect::new(20, 20, 20, 20);
        let mask = build_mask(64, 64, &[rect], true);
        let has_intermediate = mask.pixels().any(|p| p[0] > 0 && p[0] < MASK_FULL);
        assert!(has_intermediate, "feathered mask should have a gradient edge");
        // Deep interior stays at full strength.
        assert_eq!(mask.get_pixel(30, 30)[0], MASK_FULL);
        // Far outside stays clear.
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn enhance_padding_respects_image_bounds() {
        let padded = enhance_padding(Rect::new(0, 0, 10, 10), 100, 100, DEFAULT_PADDING);
        assert_eq!(padded, Rect::new(0, 0, 15, 15));

        let padded = enhance_padding(Rect::new(40, 40, 20, 20), 100, 100, DEFAULT_PADDING);
        assert_eq!(padded, Rect::new(35, 35, 30, 30));
    }
}
