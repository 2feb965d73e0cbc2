//! Host-facing surface configuration.
//!
//! A [`SurfaceConfig`] is fixed for the lifetime of one surface build; handing
//! a different one to [`SignaturePad::reconfigure`](crate::SignaturePad::reconfigure)
//! rebuilds the backing store from scratch.

use tiny_skia::Color;

use crate::error::SigError;

/// Largest backing-store edge we accept (same as Chrome's canvas limit).
pub const MAX_DIMENSION: u32 = 32767;

/// Stroke width in logical pixels.
pub const LINE_WIDTH: f32 = 2.0;

/// Canvas fill applied at init and after every clear.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Background {
    /// No fill; untouched pixels stay at alpha 0.
    #[default]
    Transparent,
    Fill(Color)
}

impl Background {
    /// Parse `"transparent"` or any CSS color. Fully transparent colors
    /// collapse to [`Background::Transparent`].
    pub fn parse(input: &str) -> Result<Self, SigError> {
        if input.trim().eq_ignore_ascii_case("transparent") {
            return Ok(Self::Transparent);
        }
        let color = parse_color(input)?;
        if color.alpha() == 0.0 {
            Ok(Self::Transparent)
        } else {
            Ok(Self::Fill(color))
        }
    }

    pub fn fill_color(&self) -> Option<Color> {
        match self {
            Self::Transparent => None,
            Self::Fill(color) => Some(*color)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConfig {
    pub pen_color:          Color,
    pub background:         Background,
    /// Logical (CSS pixel) width.
    pub width:              u32,
    /// Logical (CSS pixel) height.
    pub height:             u32,
    pub device_pixel_ratio: f32
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            pen_color:          Color::BLACK,
            background:         Background::Transparent,
            width:              400,
            height:             200,
            device_pixel_ratio: 1.0
        }
    }
}

impl SurfaceConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set the pen from a CSS color string, e.g. `"#1a237e"` or `"navy"`.
    pub fn with_pen_color(mut self, css: &str) -> Result<Self, SigError> {
        self.pen_color = parse_color(css)?;
        Ok(self)
    }

    /// Set the background from `"transparent"` or a CSS color string.
    pub fn with_background(mut self, css: &str) -> Result<Self, SigError> {
        self.background = Background::parse(css)?;
        Ok(self)
    }

    pub fn with_device_pixel_ratio(mut self, dpr: f32) -> Self {
        self.device_pixel_ratio = dpr;
        self
    }

    /// Backing-store size in device pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            scale_edge(self.width, self.device_pixel_ratio),
            scale_edge(self.height, self.device_pixel_ratio)
        )
    }

    pub fn validate(&self) -> Result<(), SigError> {
        let dpr = self.device_pixel_ratio;
        if !dpr.is_finite() || dpr <= 0.0 {
            return Err(SigError::InvalidPixelRatio(dpr));
        }
        let (pw, ph) = self.physical_size();
        if self.width == 0 || self.height == 0 || pw > MAX_DIMENSION || ph > MAX_DIMENSION {
            return Err(SigError::InvalidDimensions {
                width:  self.width,
                height: self.height
            });
        }
        Ok(())
    }
}

fn scale_edge(edge: u32, dpr: f32) -> u32 {
    let scaled = (edge as f64 * dpr as f64).round();
    if scaled < 1.0 {
        1
    } else if scaled > u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Parse a CSS color string into a tiny_skia::Color.
pub fn parse_color(input: &str) -> Result<Color, SigError> {
    let parsed = csscolorparser::parse(input).map_err(|e| SigError::InvalidColor {
        input:  input.to_string(),
        reason: e.to_string()
    })?;
    let [r, g, b, a] = parsed.to_array();
    Color::from_rgba(r, g, b, a).ok_or_else(|| SigError::InvalidColor {
        input:  input.to_string(),
        reason: "component out of range".into()
    })
}
