use std::fmt;

use tiny_skia::{Color, IntRect, Pixmap};

use crate::{config::Background, error::SigError, image_io};

/// Owned RGBA raster (premultiplied, device pixels).
///
/// This is what the surface hands out for `getRawCanvas` / `getTrimmedImage`.
/// Hosts get a snapshot; the live backing store never leaves the pad.
#[derive(Clone, PartialEq)]
pub struct Raster {
    pixmap: Pixmap
}

/// Inclusive pixel bounds of everything with non-zero alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32
}

impl InkBounds {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Grow by `padding` on each side, clamped to `[0, width) x [0, height)`.
    pub fn expand(&self, padding: u32, width: u32, height: u32) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(padding),
            min_y: self.min_y.saturating_sub(padding),
            max_x: self.max_x.saturating_add(padding).min(width.saturating_sub(1)),
            max_y: self.max_y.saturating_add(padding).min(height.saturating_sub(1))
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Result<Self, SigError> {
        let pixmap = Pixmap::new(width, height).ok_or(SigError::InvalidDimensions { width, height })?;
        Ok(Self { pixmap })
    }

    pub(crate) fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.pixmap.pixel(x, y).map(|p| p.alpha())
    }

    /// Straight (non-premultiplied) RGBA of one pixel.
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap.pixel(x, y).map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
    }

    /// Straight RGBA bytes for `region`, row-major; the layout `ImageData`
    /// and the image codecs expect. Parts of `region` outside the raster are
    /// left transparent.
    pub fn rgba_region(&self, region: IntRect) -> Vec<u8> {
        let width = region.width();
        let height = region.height();
        let mut data = vec![0u8; width as usize * height as usize * 4];
        for dy in 0..height {
            for dx in 0..width {
                let src_x = region.x() + dx as i32;
                let src_y = region.y() + dy as i32;
                if src_x < 0 || src_y < 0 {
                    continue;
                }
                if let Some(rgba) = self.rgba_at(src_x as u32, src_y as u32) {
                    let idx = (dy as usize * width as usize + dx as usize) * 4;
                    data[idx..idx + 4].copy_from_slice(&rgba);
                }
            }
        }
        data
    }

    pub fn full_rect(&self) -> Option<IntRect> {
        IntRect::from_xywh(0, 0, self.width(), self.height())
    }

    /// Wipe to alpha 0, then apply `background` if it is a fill.
    pub fn paint_background(&mut self, background: &Background) {
        match background.fill_color() {
            Some(color) => self.pixmap.fill(color),
            None => self.pixmap.fill(Color::TRANSPARENT)
        }
    }

    /// Bounding box of all pixels with alpha > 0, `None` for a blank raster.
    pub fn ink_bounds(&self) -> Option<InkBounds> {
        let width = self.width() as usize;
        let mut min_x = self.width() as i64;
        let mut min_y = self.height() as i64;
        let mut max_x = -1i64;
        let mut max_y = -1i64;

        for (idx, px) in self.pixmap.pixels().iter().enumerate() {
            if px.alpha() == 0 {
                continue;
            }
            let x = (idx % width) as i64;
            let y = (idx / width) as i64;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if min_x > max_x {
            return None;
        }
        Some(InkBounds {
            min_x: min_x as u32,
            min_y: min_y as u32,
            max_x: max_x as u32,
            max_y: max_y as u32
        })
    }

    /// Copy `bounds` out of this raster into a new one placed at the origin.
    /// The source pixels replace the destination (`putImageData` semantics).
    pub fn crop(&self, bounds: InkBounds, background: &Background) -> Result<Self, SigError> {
        let mut out = Self::new(bounds.width(), bounds.height())?;
        out.paint_background(background);

        let src_stride = self.width() as usize * 4;
        let dst_stride = out.width() as usize * 4;
        let src = self.pixmap.data();
        let dst = out.pixmap.data_mut();
        for row in 0..bounds.height() as usize {
            let src_start = (bounds.min_y as usize + row) * src_stride + bounds.min_x as usize * 4;
            let dst_start = row * dst_stride;
            dst[dst_start..dst_start + dst_stride]
                .copy_from_slice(&src[src_start..src_start + dst_stride]);
        }
        Ok(out)
    }

    /// Encode the whole raster as a data URL (`canvas.toDataURL`).
    pub fn to_data_url(&self, mime: Option<&str>, quality: Option<f64>) -> Result<String, SigError> {
        image_io::export_full(self, mime, quality).map(|url| url.to_string())
    }

    pub fn to_png_bytes(&self) -> Result<Vec<u8>, SigError> {
        image_io::encode(self, image_io::ImageFormat::Png, None)
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tiny_skia::{Paint, Rect, Transform};

    use super::*;

    fn with_square(w: u32, h: u32, x: f32, y: f32, size: f32) -> Raster {
        let mut raster = Raster::new(w, h).unwrap();
        let mut paint = Paint::default();
        paint.set_color_rgba8(200, 10, 10, 255);
        paint.anti_alias = false;
        raster.pixmap_mut().fill_rect(
            Rect::from_xywh(x, y, size, size).unwrap(),
            &paint,
            Transform::identity(),
            None
        );
        raster
    }

    #[test]
    fn blank_raster_has_no_ink() {
        let raster = Raster::new(32, 16).unwrap();
        assert_eq!(raster.ink_bounds(), None);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            Raster::new(0, 5),
            Err(SigError::InvalidDimensions { width: 0, height: 5 })
        ));
    }

    #[test]
    fn ink_bounds_track_drawn_pixels() {
        let raster = with_square(50, 40, 10.0, 5.0, 4.0);
        assert_eq!(
            raster.ink_bounds(),
            Some(InkBounds {
                min_x: 10,
                min_y: 5,
                max_x: 13,
                max_y: 8
            })
        );
    }

    #[test]
    fn expand_clamps_to_edges() {
        let bounds = InkBounds {
            min_x: 3,
            min_y: 30,
            max_x: 45,
            max_y: 35
        };
        assert_eq!(
            bounds.expand(10, 50, 40),
            InkBounds {
                min_x: 0,
                min_y: 20,
                max_x: 49,
                max_y: 39
            }
        );
    }

    #[test]
    fn crop_copies_region_to_origin() {
        let raster = with_square(50, 40, 10.0, 5.0, 4.0);
        let bounds = raster.ink_bounds().unwrap().expand(2, 50, 40);
        let cropped = raster.crop(bounds, &Background::Transparent).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (8, 8));
        assert_eq!(cropped.alpha_at(0, 0), Some(0));
        assert_eq!(cropped.rgba_at(2, 2), Some([200, 10, 10, 255]));
        assert_eq!(cropped.rgba_at(5, 5), Some([200, 10, 10, 255]));
        assert_eq!(cropped.alpha_at(6, 6), Some(0));
    }

    #[test]
    fn opaque_background_counts_as_ink() {
        let mut raster = Raster::new(8, 8).unwrap();
        raster.paint_background(&Background::Fill(Color::WHITE));
        assert_eq!(
            raster.ink_bounds(),
            Some(InkBounds {
                min_x: 0,
                min_y: 0,
                max_x: 7,
                max_y: 7
            })
        );
        raster.paint_background(&Background::Transparent);
        assert_eq!(raster.ink_bounds(), None);
    }

    #[test]
    fn rgba_region_reads_straight_alpha() {
        let raster = with_square(4, 4, 1.0, 1.0, 2.0);
        let region = IntRect::from_xywh(1, 1, 2, 1).unwrap();
        assert_eq!(raster.rgba_region(region), vec![200, 10, 10, 255, 200, 10, 10, 255]);
    }
}
