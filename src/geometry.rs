//! Rectangle arithmetic in image pixel coordinates.

/// An axis-aligned rectangle in image pixel coordinates.
///
/// This is the exchange type between detection, masking, and sequencing: a
/// detected, manually drawn, or batch candidate region is always normalized
/// to this shape before mask construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: u32,
    /// Y coordinate of the top-left corner.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and dimensions.
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in pixels.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether the rectangle covers no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersect with the image bounds `(img_w, img_h)`.
    ///
    /// Returns `None` when the rectangle lies entirely outside the image
    /// (empty intersection), otherwise the clipped rectangle with
    /// `x + width <= img_w` and `y + height <= img_h`.
    #[must_use]
    pub fn clamped(&self, img_w: u32, img_h: u32) -> Option<Self> {
        if self.x >= img_w || self.y >= img_h {
            return None;
        }
        let width = self.width.min(img_w - self.x);
        let height = self.height.min(img_h - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x: self.x,
            y: self.y,
            width,
            height,
        })
    }

    /// Expand by `padding` pixels on every side, clamped to the image bounds.
    ///
    /// Width and height each grow by at most `2 * padding`.
    #[must_use]
    pub fn padded(&self, padding: u32, img_w: u32, img_h: u32) -> Self {
        let x = self.x.saturating_sub(padding);
        let y = self.y.saturating_sub(padding);
        let right = (self.x.saturating_add(self.width))
            .saturating_add(padding)
            .min(img_w);
        let bottom = (self.y.saturating_add(self.height))
            .saturating_add(padding)
            .min(img_h);
        Self {
            x,
            y,
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        }
    }

    /// Scale width and height by `factor`, flooring to whole pixels.
    ///
    /// The top-left corner is unchanged.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (width, height) = (
            (self.width as f32 * factor).floor().max(0.0) as u32,
            (self.height as f32 * factor).floor().max(0.0) as u32,
        );
        Self {
            x: self.x,
            y: self.y,
            width,
            height,
        }
    }
}
