//! Raster <-> encoded image conversion.
//!
//! Encoded images travel as base64 data URLs, the same thing a browser's
//! `canvas.toDataURL()` produces, so downstream collaborators (uploads, PDF
//! embedding) can treat them as an opaque blob plus a mime type.

use std::fmt;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use tiny_skia::{ColorU8, Pixmap};

use crate::{
    config::Background,
    error::SigError,
    raster::Raster
};

/// Padding (device pixels) added around the ink box when trimming.
pub const DEFAULT_TRIM_PADDING: u32 = 10;

/// Browser default for `image/jpeg` when no quality is given.
pub const DEFAULT_JPEG_QUALITY: f64 = 0.92;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg
}

impl ImageFormat {
    /// Unknown or missing types fall back to PNG, as `toDataURL` does.
    pub fn from_mime(mime: Option<&str>) -> Self {
        match mime.map(|m| m.trim().to_ascii_lowercase()) {
            Some(m) if m == "image/jpeg" || m == "image/jpg" => Self::Jpeg,
            _ => Self::Png
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg"
        }
    }
}

/// A decoded `data:` URL: mime type plus raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime:  String,
    bytes: Vec<u8>
}

impl DataUrl {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes
        }
    }

    /// Parse `data:<mime>;base64,<payload>`. Non-base64 payloads are rejected;
    /// images are binary.
    pub fn parse(input: &str) -> Result<Self, SigError> {
        let rest = input
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| SigError::MalformedDataUrl("missing data: scheme".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| SigError::MalformedDataUrl("missing ',' separator".into()))?;

        let mut parts = header.split(';');
        let mime = parts
            .next()
            .filter(|m| !m.is_empty())
            .unwrap_or("application/octet-stream")
            .to_string();
        if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
            return Err(SigError::MalformedDataUrl("payload is not base64".into()));
        }

        let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
        Ok(Self { mime, bytes })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

impl fmt::Debug for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUrl")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Encode `raster` in `format`. `quality` only affects JPEG.
pub fn encode(raster: &Raster, format: ImageFormat, quality: Option<f64>) -> Result<Vec<u8>, SigError> {
    match format {
        ImageFormat::Png => raster
            .pixmap()
            .encode_png()
            .map_err(|e| SigError::Encode(e.to_string())),
        ImageFormat::Jpeg => encode_jpeg(raster, quality)
    }
}

fn encode_jpeg(raster: &Raster, quality: Option<f64>) -> Result<Vec<u8>, SigError> {
    let q = quality
        .filter(|q| (0.0..=1.0).contains(q))
        .unwrap_or(DEFAULT_JPEG_QUALITY);
    let q = (q * 100.0).round().clamp(1.0, 100.0) as u8;

    // JPEG has no alpha; transparent pixels demultiply to black, like a
    // browser canvas export.
    let mut rgb = Vec::with_capacity(raster.width() as usize * raster.height() as usize * 3);
    for px in raster.pixmap().pixels() {
        let c = px.demultiply();
        rgb.extend_from_slice(&[c.red(), c.green(), c.blue()]);
    }
    let img = image::RgbImage::from_raw(raster.width(), raster.height(), rgb)
        .ok_or_else(|| SigError::Encode("rgb buffer size mismatch".into()))?;

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, q).encode_image(&img)?;
    Ok(out)
}

/// `exportFull`: the entire raster, drawn or not.
pub fn export_full(raster: &Raster, mime: Option<&str>, quality: Option<f64>) -> Result<DataUrl, SigError> {
    let format = ImageFormat::from_mime(mime);
    let bytes = encode(raster, format, quality)?;
    Ok(DataUrl::new(format.mime(), bytes))
}

/// Crop `raster` to its ink plus `padding`, clamped to the raster. A raster
/// without any ink collapses to a 1x1 transparent placeholder.
pub fn trim_raster(raster: &Raster, background: &Background, padding: u32) -> Result<Raster, SigError> {
    let Some(ink) = raster.ink_bounds() else {
        return Raster::new(1, 1);
    };
    let bounds = ink.expand(padding, raster.width(), raster.height());
    log::debug!(
        "trim: ink {:?} -> {}x{} at ({}, {})",
        ink,
        bounds.width(),
        bounds.height(),
        bounds.min_x,
        bounds.min_y
    );
    raster.crop(bounds, background)
}

/// Decode PNG or JPEG bytes into a premultiplied raster.
pub fn decode_bytes(bytes: &[u8]) -> Result<Raster, SigError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(SigError::InvalidDimensions { width, height })?;
    for (src, dst) in rgba.pixels().zip(pixmap.pixels_mut()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(Raster::from_pixmap(pixmap))
}

pub fn decode_data_url(input: &str) -> Result<Raster, SigError> {
    let url = DataUrl::parse(input)?;
    decode_bytes(url.bytes())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tiny_skia::{Color, Paint, Rect, Transform};

    use super::*;

    fn red_block() -> Raster {
        let mut raster = Raster::new(20, 10).unwrap();
        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 0, 0, 255);
        paint.anti_alias = false;
        raster.pixmap_mut().fill_rect(
            Rect::from_xywh(4.0, 2.0, 3.0, 3.0).unwrap(),
            &paint,
            Transform::identity(),
            None
        );
        raster
    }

    #[test]
    fn mime_fallback_is_png() {
        assert_eq!(ImageFormat::from_mime(None), ImageFormat::Png);
        assert_eq!(ImageFormat::from_mime(Some("image/webp")), ImageFormat::Png);
        assert_eq!(ImageFormat::from_mime(Some("IMAGE/JPEG")), ImageFormat::Jpeg);
    }

    #[test]
    fn data_url_parse_and_display() {
        let url = DataUrl::parse("data:text/plain;base64,SGVsbG8=").unwrap();
        assert_eq!(url.mime(), "text/plain");
        assert_eq!(url.bytes(), b"Hello");
        assert_eq!(url.to_string(), "data:text/plain;base64,SGVsbG8=");
    }

    #[test]
    fn data_url_rejects_garbage() {
        assert!(matches!(
            DataUrl::parse("http://example.com/a.png"),
            Err(SigError::MalformedDataUrl(_))
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png,abc"),
            Err(SigError::MalformedDataUrl(_))
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png;base64,%%%"),
            Err(SigError::Base64(_))
        ));
    }

    #[test]
    fn png_export_round_trips_through_decode() {
        let raster = red_block();
        let url = export_full(&raster, None, None).unwrap();
        assert_eq!(url.mime(), "image/png");

        let decoded = decode_data_url(&url.to_string()).unwrap();
        assert_eq!(decoded, raster);
    }

    #[test]
    fn jpeg_export_keeps_dimensions() {
        let raster = red_block();
        let url = export_full(&raster, Some("image/jpeg"), Some(0.5)).unwrap();
        assert_eq!(url.mime(), "image/jpeg");

        let decoded = decode_bytes(url.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
        assert_eq!(decoded.alpha_at(0, 0), Some(255));
    }

    #[test]
    fn trim_of_blank_raster_is_placeholder() {
        let raster = Raster::new(30, 30).unwrap();
        let trimmed = trim_raster(&raster, &Background::Transparent, DEFAULT_TRIM_PADDING).unwrap();
        assert_eq!((trimmed.width(), trimmed.height()), (1, 1));
        assert_eq!(trimmed.alpha_at(0, 0), Some(0));
    }

    #[test]
    fn trim_pads_and_clamps() {
        let raster = red_block();
        // ink spans x 4..=6, y 2..=4
        let trimmed = trim_raster(&raster, &Background::Transparent, 3).unwrap();
        assert_eq!((trimmed.width(), trimmed.height()), (9, 8));
        assert_eq!(trimmed.rgba_at(3, 2), Some([255, 0, 0, 255]));

        let trimmed = trim_raster(&raster, &Background::Fill(Color::WHITE), 100).unwrap();
        assert_eq!((trimmed.width(), trimmed.height()), (20, 10));
    }

    #[test]
    fn decode_rejects_non_images() {
        let url = DataUrl::new("image/png", b"definitely not a png".to_vec()).to_string();
        assert!(matches!(decode_data_url(&url), Err(SigError::Image(_))));
    }
}
