//! Diffusion-based region reconstruction.
//!
//! Given a source image and a reconstruction mask, every masked pixel is
//! assigned a replacement color by propagating known pixel values inward from
//! the mask boundary. Two strategies are available: front propagation in
//! distance order ([`InpaintMethod::FastMarching`], the default) and
//! iterative smoothness relaxation ([`InpaintMethod::FluidDynamics`]).

use std::collections::VecDeque;

use image::{GrayImage, RgbaImage};

use crate::error::{Error, Result};

/// Diffusion strategy for filling masked pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InpaintMethod {
    /// Process masked pixels in order of increasing distance from the known
    /// region, estimating each as a weighted average of already-assigned
    /// neighbors. Fast, good default for small regions.
    #[default]
    FastMarching,
    /// Relax masked pixels toward the mean of their neighbors until the
    /// region converges, respecting the boundary values. Smoother results on
    /// regions requiring directional continuation, at higher cost.
    FluidDynamics,
}

/// Relaxation convergence cutoff, in channel-value units.
const RELAX_EPSILON: f32 = 0.05;
/// Relaxation iteration cap.
const MAX_RELAX_ITERATIONS: usize = 2_000;

const NEIGHBORS_4: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const NEIGHBORS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Synthesize replacement values for every masked pixel of `image`.
///
/// Pixels where the mask is 255 are fully reconstructed; intermediate mask
/// values blend the reconstruction with the original proportionally, so a
/// feathered mask leaves no hard seam. The input buffer is never mutated; a
/// new buffer of identical dimensions and channel count is returned.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] when the mask dimensions do not match
/// the image dimensions. No partial output is produced.
pub fn reconstruct(image: &RgbaImage, mask: &GrayImage, method: InpaintMethod) -> Result<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(Error::DimensionMismatch {
            image_width: image.width(),
            image_height: image.height(),
            mask_width: mask.width(),
            mask_height: mask.height(),
        });
    }

    let unknown: Vec<bool> = mask.pixels().map(|p| p[0] > 0).collect();
    if !unknown.contains(&true) {
        return Ok(image.clone());
    }

    let w = image.width() as usize;
    let h = image.height() as usize;

    // Per-channel float working copies of the source pixels.
    let mut channels: [Vec<f32>; 4] = std::array::from_fn(|c| {
        image.pixels().map(|p| f32::from(p[c])).collect()
    });

    match method {
        InpaintMethod::FastMarching => propagate_front(&mut channels, &unknown, w, h),
        InpaintMethod::FluidDynamics => {
            // Seed the region by propagation, then relax to a smooth fill.
            propagate_front(&mut channels, &unknown, w, h);
            relax(&mut channels, &unknown, w, h);
        }
    }

    let mut out = image.clone();
    let weights = mask.as_raw();
    for (i, px) in out.pixels_mut().enumerate() {
        let weight = f32::from(weights[i]) / 255.0;
        if weight <= 0.0 {
            continue;
        }
        for (c, chan) in channels.iter().enumerate() {
            let blended = weight * chan[i] + (1.0 - weight) * f32::from(px[c]);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                px[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    Ok(out)
}

/// Fill unknown pixels by front propagation from the known region.
///
/// A multi-source BFS orders unknown pixels by increasing distance from the
/// boundary; each is assigned the weighted average of its already-assigned
/// 8-neighbors, where closer and earlier-assigned neighbors dominate.
/// Terminates once every reachable unknown pixel has a value; pixels with no
/// known pixel anywhere in the image keep their source values.
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn propagate_front(channels: &mut [Vec<f32>; 4], unknown: &[bool], w: usize, h: usize) {
    let mut dist = vec![u32::MAX; w * h];
    let mut assigned = vec![false; w * h];
    for (i, &u) in unknown.iter().enumerate() {
        if !u {
            dist[i] = 0;
            assigned[i] = true;
        }
    }

    let in_bounds = |x: i32, y: i32| -> Option<usize> {
        if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
            None
        } else {
            Some(y as usize * w + x as usize)
        }
    };

    // Seed the front: unknown pixels touching the known region.
    let mut queue: VecDeque<(i32, i32)> = VecDeque::new();
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            if !unknown[i] {
                continue;
            }
            let (xi, yi) = (x as i32, y as i32);
            let touches_known = NEIGHBORS_4
                .iter()
                .filter_map(|&(dx, dy)| in_bounds(xi + dx, yi + dy))
                .any(|ni| !unknown[ni]);
            if touches_known {
                dist[i] = 1;
                queue.push_back((xi, yi));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        let i = y as usize * w + x as usize;

        let mut weight_sum = 0.0_f32;
        let mut acc = [0.0_f32; 4];
        for &(dx, dy) in &NEIGHBORS_8 {
            let Some(ni) = in_bounds(x + dx, y + dy) else {
                continue;
            };
            if !assigned[ni] {
                continue;
            }
            let spatial = ((dx * dx + dy * dy) as f32).sqrt();
            let weight = 1.0 / (spatial * (1.0 + dist[ni] as f32));
            weight_sum += weight;
            for (c, chan) in channels.iter().enumerate() {
                acc[c] += weight * chan[ni];
            }
        }
        if weight_sum > 0.0 {
            for (c, chan) in channels.iter_mut().enumerate() {
                chan[i] = acc[c] / weight_sum;
            }
        }
        assigned[i] = true;

        for &(dx, dy) in &NEIGHBORS_4 {
            let Some(ni) = in_bounds(x + dx, y + dy) else {
                continue;
            };
            if unknown[ni] && dist[ni] == u32::MAX {
                dist[ni] = dist[i] + 1;
                queue.push_back((x + dx, y + dy));
            }
        }
    }
}

/// Jacobi relaxation of unknown pixels toward the mean of their 4-neighbors.
///
/// Boundary (known) values stay fixed; iteration stops when the largest
/// per-pixel change falls below [`RELAX_EPSILON`] or at the iteration cap.
fn relax(channels: &mut [Vec<f32>; 4], unknown: &[bool], w: usize, h: usize) {
    let cells: Vec<(usize, usize)> = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .filter(|&(x, y)| unknown[y * w + x])
        .collect();
    if cells.is_empty() {
        return;
    }

    let mut scratch = vec![0.0_f32; w * h];
    for chan in channels.iter_mut() {
        for _ in 0..MAX_RELAX_ITERATIONS {
            scratch.copy_from_slice(chan);
            let mut max_delta = 0.0_f32;
            for &(x, y) in &cells {
                let i = y * w + x;
                let mut sum = 0.0_f32;
                let mut count = 0.0_f32;
                if x > 0 {
                    sum += scratch[i - 1];
                    count += 1.0;
                }
                if x + 1 < w {
                    sum += scratch[i + 1];
                    count += 1.0;
                }
                if y > 0 {
                    sum += scratch[i - w];
                    count += 1.0;
                }
                if y + 1 < h {
                    sum += scratch[i + w];
                    count += 1.0;
                }
                if count == 0.0 {
                    continue;
                }
                let value = sum / count;
                max_delta = max_delta.max((value - chan[i]).abs());
                chan[i] = value;
            }
            if max_delta < RELAX_EPSILON {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::mask::build_mask;
    use image::Rgba;

    fn uniform_image(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = uniform_image(64, 48, 100);
        let mask = build_mask(64, 48, &[Rect::new(10, 10, 20, 10)], false);
        for method in [InpaintMethod::FastMarching, InpaintMethod::FluidDynamics] {
            let out = reconstruct(&img, &mask, method).unwrap();
            assert_eq!(out.dimensions(), img.dimensions());
        }
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let img = uniform_image(64, 48, 100);
        let mask = GrayImage::new(32, 48);
        let err = reconstruct(&img, &mask, InpaintMethod::FastMarching).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn empty_mask_returns_input_unchanged() {
        let img = uniform_image(32, 32, 77);
        let mask = GrayImage::new(32, 32);
        let out = reconstruct(&img, &mask, InpaintMethod::FastMarching).unwrap();
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn input_buffer_is_not_mutated() {
        let img = uniform_image(32, 32, 50);
        let before = img.clone();
        let mask = build_mask(32, 32, &[Rect::new(8, 8, 8, 8)], false);
        let _ = reconstruct(&img, &mask, InpaintMethod::FastMarching).unwrap();
        assert_eq!(img.as_raw(), before.as_raw());
    }

    #[test]
    fn masked_region_is_filled_from_surroundings() {
        // Gray frame with a white block; masking exactly the block should
        // pull the fill toward the surrounding gray.
        let mut img = uniform_image(40, 40, 100);
        for y in 10..20 {
            for x in 10..20 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let mask = build_mask(40, 40, &[Rect::new(10, 10, 10, 10)], false);

        for method in [InpaintMethod::FastMarching, InpaintMethod::FluidDynamics] {
            let out = reconstruct(&img, &mask, method).unwrap();
            for y in 10..20 {
                for x in 10..20 {
                    let v = out.get_pixel(x, y)[0];
                    assert!(
                        v < 130,
                        "({x},{y}) still bright ({v}) after {method:?} reconstruction"
                    );
                }
            }
            // Pixels outside the mask are untouched.
            assert_eq!(out.get_pixel(5, 5), img.get_pixel(5, 5));
        }
    }

    #[test]
    fn fluid_dynamics_converges_to_boundary_value_on_uniform_frame() {
        let img = uniform_image(30, 30, 200);
        let mask = build_mask(30, 30, &[Rect::new(5, 5, 20, 20)], false);
        let out = reconstruct(&img, &mask, InpaintMethod::FluidDynamics).unwrap();
        for y in 5..25 {
            for x in 5..25 {
                let v = out.get_pixel(x, y)[0];
                assert!(v.abs_diff(200) <= 1, "({x},{y}) = {v}");
            }
        }
    }

    #[test]
    fn feathered_mask_blends_with_original() {
        // A mask value of 128 should mix reconstruction and original roughly
        // half and half.
        let mut img = uniform_image(20, 20, 0);
        img.put_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(10, 10, image::Luma([128]));

        let out = reconstruct(&img, &mask, InpaintMethod::FastMarching).unwrap();
        let v = out.get_pixel(10, 10)[0];
        // Reconstruction from black surroundings is ~0; blend is ~50%.
        assert!(v > 100 && v < 155, "blended value {v}");
    }

    #[test]
    fn alpha_channel_is_preserved_for_opaque_images() {
        let img = uniform_image(24, 24, 60);
        let mask = build_mask(24, 24, &[Rect::new(6, 6, 10, 10)], false);
        let out = reconstruct(&img, &mask, InpaintMethod::FastMarching).unwrap();
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn fully_masked_image_keeps_source_values() {
        // No known pixels anywhere: nothing to propagate from.
        let img = uniform_image(16, 16, 90);
        let mask = build_mask(16, 16, &[Rect::new(0, 0, 16, 16)], false);
        let out = reconstruct(&img, &mask, InpaintMethod::FastMarching).unwrap();
        assert_eq!(out.as_raw(), img.as_raw());
    }
}
