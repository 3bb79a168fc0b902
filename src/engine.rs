//! Vision engine handle and region-reconstruction sequencing.
//!
//! [`VisionEngine`] is an explicit handle to the vision primitives with a
//! readiness gate: every detection or reconstruction call checks readiness
//! first and fails with [`Error::EngineNotReady`] rather than queuing. The
//! handle holds no per-invocation state, so concurrent invocations are
//! independent.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::detection;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::inpaint::{self, InpaintMethod};
use crate::mask::{self, DEFAULT_PADDING};

/// Precision factors at or above this leave the selected region unchanged.
const PRECISION_NEUTRAL: f32 = 0.9;

/// Operating mode for a reconstruction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Locate the watermark region automatically, then reconstruct it.
    Automatic,
    /// Reconstruct a caller-supplied region (padded before masking).
    Manual(Rect),
    /// Reconstruct a sequence of candidate regions, one pass per region,
    /// each pass's output feeding the next pass's input.
    Batch(Vec<Rect>),
}

/// Operating-mode name, for parsing caller requests into a [`Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// Automatic detection.
    Automatic,
    /// Manual region selection.
    Manual,
    /// Multi-region batch.
    Batch,
}

impl FromStr for ModeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" | "automatic" => Ok(Self::Automatic),
            "manual" => Ok(Self::Manual),
            "batch" => Ok(Self::Batch),
            other => Err(Error::UnknownMode(other.to_string())),
        }
    }
}

/// Options controlling reconstruction behavior.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Diffusion strategy used to fill masked pixels.
    pub method: InpaintMethod,
    /// Feather the mask edge to blend the reconstruction into its
    /// surroundings.
    pub feather: bool,
    /// Region precision factor. Values below 0.9 shrink the selected
    /// region's width and height by the factor (floored), trading coverage
    /// for fidelity at the margins.
    pub precision: f32,
    /// Padding in pixels applied around manual selections.
    pub padding: u32,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            method: InpaintMethod::FastMarching,
            feather: true,
            precision: 1.0,
            padding: DEFAULT_PADDING,
            verbose: false,
            quiet: false,
        }
    }
}

/// Output of a reconstruction pass.
#[derive(Debug)]
pub struct ReconstructionResult {
    /// The reconstructed pixel buffer.
    pub pixels: RgbaImage,
    /// Output width in pixels; always equals the input width.
    pub width: u32,
    /// Output height in pixels; always equals the input height.
    pub height: u32,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped (no watermark detected).
    pub skipped: bool,
    /// Human-readable status message.
    pub message: String,
}

/// Handle to the vision primitives used by the pipeline.
///
/// Create once with [`VisionEngine::new()`] and reuse across images; the
/// handle is `Sync` and invocations share no intermediate buffers. A handle
/// created with [`VisionEngine::deferred()`] rejects all work with
/// [`Error::EngineNotReady`] until [`VisionEngine::load()`] is called.
#[derive(Debug)]
pub struct VisionEngine {
    ready: AtomicBool,
}

impl Default for VisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionEngine {
    /// Create a ready engine. The vision primitives are linked in statically,
    /// so a freshly created engine can dispatch immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
        }
    }

    /// Create an engine whose readiness gate is still closed.
    #[must_use]
    pub fn deferred() -> Self {
        Self {
            ready: AtomicBool::new(false),
        }
    }

    /// Open the readiness gate.
    pub fn load(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Whether the engine accepts detection and reconstruction calls.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::EngineNotReady)
        }
    }

    /// Locate the watermark region in `image`.
    ///
    /// # Errors
    ///
    /// [`Error::EngineNotReady`] before [`VisionEngine::load()`];
    /// [`Error::NoWatermarkDetected`] when no region qualifies.
    pub fn detect(&self, image: &RgbaImage) -> Result<Rect> {
        self.ensure_ready()?;
        detection::detect_region(image).ok_or(Error::NoWatermarkDetected)
    }

    /// Run one reconstruction pass over `image` in the given mode.
    ///
    /// The input buffer is never mutated; the result holds a new buffer of
    /// identical dimensions. Failures return no image data.
    ///
    /// # Errors
    ///
    /// [`Error::EngineNotReady`] before the engine is loaded;
    /// [`Error::NoWatermarkDetected`] in automatic mode when detection finds
    /// nothing (callers may retry in manual mode — there is no silent
    /// fallback); [`Error::InvalidRegion`] when a supplied rectangle lies
    /// entirely outside the image bounds.
    pub fn run(
        &self,
        image: &RgbaImage,
        mode: &Mode,
        opts: &ProcessOptions,
    ) -> Result<ReconstructionResult> {
        self.ensure_ready()?;
        let pixels = match mode {
            Mode::Automatic => {
                let rect =
                    detection::detect_region(image).ok_or(Error::NoWatermarkDetected)?;
                reconstruct_single(image, rect, opts)?
            }
            Mode::Manual(rect) => {
                let padded =
                    mask::enhance_padding(*rect, image.width(), image.height(), opts.padding);
                reconstruct_single(image, padded, opts)?
            }
            // Sequential fold: each region is inpainted against the previous
            // pass's output, so later regions may draw on earlier
            // reconstructions. An empty sequence returns the input unchanged.
            Mode::Batch(rects) => rects.iter().try_fold(image.clone(), |current, rect| {
                let clamped = rect
                    .clamped(current.width(), current.height())
                    .ok_or_else(|| Error::InvalidRegion(*rect))?;
                let m = mask::build_mask(current.width(), current.height(), &[clamped], opts.feather);
                inpaint::reconstruct(&current, &m, opts.method)
            })?,
        };
        Ok(ReconstructionResult {
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        })
    }

    /// Reconstruct a single video frame.
    ///
    /// Frames are independent invocations: no tracking, temporal state, or
    /// cross-frame smoothing is maintained.
    ///
    /// # Errors
    ///
    /// Same as [`VisionEngine::run`].
    pub fn process_frame(
        &self,
        frame: &RgbaImage,
        mode: &Mode,
        opts: &ProcessOptions,
    ) -> Result<ReconstructionResult> {
        self.run(frame, mode, opts)
    }

    /// Process a single image file: load, reconstruct, save.
    ///
    /// A `NoWatermarkDetected` outcome in automatic mode is reported as a
    /// skip, not a failure, so callers can retry with a manual region.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        mode: &Mode,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            skipped: false,
            message: String::new(),
        };

        let rgba = match image::open(input) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let reconstruction = match self.run(&rgba, mode, opts) {
            Ok(r) => r,
            Err(Error::NoWatermarkDetected) => {
                result.skipped = true;
                result.success = true;
                result.message = "No watermark detected".to_string();
                return result;
            }
            Err(e) => {
                result.message = format!("Reconstruction failed: {e}");
                return result;
            }
        };

        if let Some(parent) = output.parent() {
            if !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&reconstruction.pixels, output) {
            Ok(()) => {
                result.success = true;
                result.message = "Watermark removed".to_string();
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Process all supported images in a directory in automatic mode.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// Returns a [`ProcessResult`] for each image found.
    ///
    /// # Panics
    ///
    /// Panics if any directory entry has no filename (should not happen for
    /// regular files).
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<_> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .filter(|e| is_supported_image(e.path().as_path()))
                .collect(),
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    skipped: false,
                    message: format!("Failed to read directory: {e}"),
                }];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult {
                    path: output_dir.to_path_buf(),
                    success: false,
                    skipped: false,
                    message: format!("Failed to create output directory: {e}"),
                }];
            }
        }

        let process_entry = |entry: &std::fs::DirEntry| {
            let input_path = entry.path();
            let filename = input_path.file_name().unwrap();
            let output_path = output_dir.join(filename);
            self.process_file(&input_path, &output_path, &Mode::Automatic, opts)
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(process_entry).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            entries.iter().map(process_entry).collect()
        }
    }
}

/// Apply precision scaling, clamp to bounds, build the mask, and inpaint.
fn reconstruct_single(image: &RgbaImage, rect: Rect, opts: &ProcessOptions) -> Result<RgbaImage> {
    let rect = if opts.precision < PRECISION_NEUTRAL {
        rect.scaled(opts.precision)
    } else {
        rect
    };
    let clamped = rect
        .clamped(image.width(), image.height())
        .ok_or_else(|| Error::InvalidRegion(rect))?;
    let m = mask::build_mask(image.width(), image.height(), &[clamped], opts.feather);
    inpaint::reconstruct(image, &m, opts.method)
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save an RGBA image with format-specific quality settings.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&rgb)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            img.save(path)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_restored.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_restored.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn uniform_image(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    #[test]
    fn mode_kind_parses_known_names() {
        assert_eq!("auto".parse::<ModeKind>().unwrap(), ModeKind::Automatic);
        assert_eq!(
            "automatic".parse::<ModeKind>().unwrap(),
            ModeKind::Automatic
        );
        assert_eq!("manual".parse::<ModeKind>().unwrap(), ModeKind::Manual);
        assert_eq!("batch".parse::<ModeKind>().unwrap(), ModeKind::Batch);
    }

    #[test]
    fn mode_kind_rejects_unknown_names() {
        let err = "turbo".parse::<ModeKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownMode(ref m) if m == "turbo"));
    }

    #[test]
    fn deferred_engine_rejects_all_dispatch() {
        let engine = VisionEngine::deferred();
        let img = uniform_image(32, 32, 100);

        let err = engine.detect(&img).unwrap_err();
        assert!(matches!(err, Error::EngineNotReady));

        let err = engine
            .run(&img, &Mode::Manual(Rect::new(4, 4, 8, 8)), &ProcessOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::EngineNotReady));
    }

    #[test]
    fn loading_opens_the_readiness_gate() {
        let engine = VisionEngine::deferred();
        assert!(!engine.is_ready());
        engine.load();
        assert!(engine.is_ready());

        let img = uniform_image(32, 32, 100);
        let result = engine
            .run(&img, &Mode::Manual(Rect::new(4, 4, 8, 8)), &ProcessOptions::default())
            .unwrap();
        assert_eq!((result.width, result.height), (32, 32));
    }

    #[test]
    fn manual_mode_outside_bounds_is_invalid_region() {
        let engine = VisionEngine::new();
        let img = uniform_image(32, 32, 100);
        let opts = ProcessOptions {
            padding: 0,
            ..ProcessOptions::default()
        };
        let err = engine
            .run(&img, &Mode::Manual(Rect::new(100, 100, 10, 10)), &opts)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRegion(_)));
    }

    #[test]
    fn empty_batch_returns_input_byte_for_byte() {
        let engine = VisionEngine::new();
        let img = uniform_image(24, 24, 137);
        let result = engine
            .run(&img, &Mode::Batch(Vec::new()), &ProcessOptions::default())
            .unwrap();
        assert_eq!(result.pixels.as_raw(), img.as_raw());
    }

    #[test]
    fn precision_below_threshold_shrinks_region() {
        let engine = VisionEngine::new();
        // Bright block on gray; manual rect covers the block exactly.
        let mut img = uniform_image(60, 60, 100);
        for y in 10..30 {
            for x in 10..50 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let opts = ProcessOptions {
            feather: false,
            precision: 0.5,
            padding: 0,
            ..ProcessOptions::default()
        };
        let result = engine
            .run(&img, &Mode::Manual(Rect::new(10, 10, 40, 20)), &opts)
            .unwrap();
        // Scaled region is 20x10 at (10,10); (45,25) is inside the original
        // selection but outside the shrunk one, so it keeps its value.
        assert_eq!(result.pixels.get_pixel(45, 25)[0], 255);
        // (11,11) is inside the shrunk region and gets reconstructed.
        assert!(result.pixels.get_pixel(11, 11)[0] < 255);
    }

    #[test]
    fn precision_at_or_above_threshold_is_neutral() {
        let engine = VisionEngine::new();
        let mut img = uniform_image(60, 60, 100);
        for y in 10..30 {
            for x in 10..50 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let opts = ProcessOptions {
            feather: false,
            precision: 0.95,
            padding: 0,
            ..ProcessOptions::default()
        };
        let result = engine
            .run(&img, &Mode::Manual(Rect::new(10, 10, 40, 20)), &opts)
            .unwrap();
        // Whole selection reconstructed, including its far corner.
        assert!(result.pixels.get_pixel(45, 25)[0] < 255);
    }

    #[test]
    fn default_output_path_appends_restored_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/photo_restored.jpg"));

        let p = default_output_path(Path::new("image.png"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "image_restored.png"
        );
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }
}
