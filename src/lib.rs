//! Locate rectangular watermark overlays in images and remove them by
//! reconstructing the occluded pixels from surrounding content.
//!
//! The pipeline is: edge-contour detection of the watermark's bounding
//! rectangle (or a caller-supplied region), mask construction, then diffusion
//! inpainting of the masked pixels. Three operating modes are supported —
//! automatic, manual, and multi-region batch — plus per-frame video
//! processing with no temporal state.
//!
//! # Quick Start
//!
//! ```no_run
//! use watermark_inpaint::{Mode, ProcessOptions, VisionEngine};
//!
//! let engine = VisionEngine::new();
//! let img = image::open("photo.png").unwrap().to_rgba8();
//! let result = engine.run(&img, &Mode::Automatic, &ProcessOptions::default()).unwrap();
//! result.pixels.save("restored.png").unwrap();
//! ```
//!
//! # Manual selection
//!
//! When automatic detection fails with
//! [`Error::NoWatermarkDetected`], callers retry with a manual region
//! (there is no silent fallback):
//!
//! ```no_run
//! use watermark_inpaint::{Mode, ProcessOptions, Rect, VisionEngine};
//!
//! let engine = VisionEngine::new();
//! let img = image::open("photo.png").unwrap().to_rgba8();
//! let region = Rect::new(40, 40, 120, 30);
//! let result = engine.run(&img, &Mode::Manual(region), &ProcessOptions::default()).unwrap();
//! ```

#![deny(missing_docs)]

pub mod detection;
mod engine;
pub mod error;
pub mod geometry;
pub mod inpaint;
pub mod mask;

pub use engine::{
    default_output_path, is_supported_image, save_image, Mode, ModeKind, ProcessOptions,
    ProcessResult, ReconstructionResult, VisionEngine,
};
pub use error::{Error, Result};
pub use geometry::Rect;
pub use inpaint::InpaintMethod;
