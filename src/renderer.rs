use tiny_skia::{
    Color, FillRule, IntRect, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform
};

use crate::{config::LINE_WIDTH, input::Point};

/// Draws pen segments in logical coordinates onto a device-pixel backing store.
#[derive(Debug, Clone)]
pub struct StrokeRenderer {
    paint:     Paint<'static>,
    stroke:    Stroke,
    transform: Transform,
    scale:     f32
}

impl StrokeRenderer {
    pub fn new(pen: Color, device_pixel_ratio: f32) -> Self {
        let mut paint = Paint::default();
        paint.set_color(pen);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: LINE_WIDTH,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        Self {
            paint,
            stroke,
            transform: Transform::from_scale(device_pixel_ratio, device_pixel_ratio),
            scale: device_pixel_ratio
        }
    }

    /// Stroke `from -> to`. A zero-length segment becomes a round dot one pen
    /// width across. Returns the device-pixel region that may have changed.
    pub fn draw_segment(&self, pixmap: &mut Pixmap, from: Point, to: Point) -> Option<IntRect> {
        if from == to {
            let path = PathBuilder::from_circle(from.x, from.y, LINE_WIDTH / 2.0)?;
            pixmap.fill_path(&path, &self.paint, FillRule::Winding, self.transform, None);
        } else {
            let mut pb = PathBuilder::new();
            pb.move_to(from.x, from.y);
            pb.line_to(to.x, to.y);
            let path = pb.finish()?;
            pixmap.stroke_path(&path, &self.paint, &self.stroke, self.transform, None);
        }
        self.damage(pixmap, from, to)
    }

    fn damage(&self, pixmap: &Pixmap, from: Point, to: Point) -> Option<IntRect> {
        // half the pen plus a pixel of antialiasing fringe
        let reach = LINE_WIDTH / 2.0 + 1.0;
        let left = ((from.x.min(to.x) - reach) * self.scale).floor().max(0.0);
        let top = ((from.y.min(to.y) - reach) * self.scale).floor().max(0.0);
        let right = ((from.x.max(to.x) + reach) * self.scale)
            .ceil()
            .min(pixmap.width() as f32);
        let bottom = ((from.y.max(to.y) + reach) * self.scale)
            .ceil()
            .min(pixmap.height() as f32);
        if right <= left || bottom <= top {
            return None;
        }
        IntRect::from_ltrb(left as i32, top as i32, right as i32, bottom as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;

    fn black_pen(dpr: f32) -> StrokeRenderer {
        StrokeRenderer::new(Color::BLACK, dpr)
    }

    #[test]
    fn segment_marks_pixels_along_path() {
        let mut raster = Raster::new(40, 20).unwrap();
        black_pen(1.0).draw_segment(raster.pixmap_mut(), Point::new(5.0, 10.0), Point::new(35.0, 10.0));

        assert_eq!(raster.alpha_at(20, 10), Some(255));
        assert_eq!(raster.alpha_at(20, 2), Some(0));
        assert_eq!(raster.alpha_at(0, 10), Some(0));
    }

    #[test]
    fn zero_length_segment_draws_a_dot() {
        let mut raster = Raster::new(20, 20).unwrap();
        let p = Point::new(10.0, 10.0);
        let damage = black_pen(1.0).draw_segment(raster.pixmap_mut(), p, p);

        assert!(damage.is_some());
        let ink = raster.ink_bounds().expect("dot should leave ink");
        assert!(ink.contains(10, 10) || ink.contains(9, 9));
        assert!(ink.width() <= 4 && ink.height() <= 4);
    }

    #[test]
    fn pixel_ratio_scales_coordinates_and_width() {
        let mut raster = Raster::new(80, 40).unwrap();
        black_pen(2.0).draw_segment(raster.pixmap_mut(), Point::new(5.0, 10.0), Point::new(35.0, 10.0));

        let ink = raster.ink_bounds().unwrap();
        // logical y=10 lands on device row 20, pen is 4 device px wide
        assert!(ink.contains(40, 20));
        assert!(ink.height() >= 4);
        assert!(ink.max_x >= 70);
    }

    #[test]
    fn redraw_leaves_footprint_unchanged() {
        let pen = black_pen(1.0);
        let (a, b) = (Point::new(3.0, 3.0), Point::new(17.0, 12.0));

        let mut once = Raster::new(20, 16).unwrap();
        pen.draw_segment(once.pixmap_mut(), a, b);
        let mut twice = once.clone();
        pen.draw_segment(twice.pixmap_mut(), a, b);

        assert_eq!(once.ink_bounds(), twice.ink_bounds());
    }

    #[test]
    fn damage_covers_the_ink() {
        let mut raster = Raster::new(50, 50).unwrap();
        let damage = black_pen(1.0)
            .draw_segment(raster.pixmap_mut(), Point::new(10.0, 12.0), Point::new(30.0, 40.0))
            .unwrap();
        let ink = raster.ink_bounds().unwrap();

        assert!(damage.left() as u32 <= ink.min_x);
        assert!(damage.top() as u32 <= ink.min_y);
        assert!(damage.right() as u32 > ink.max_x);
        assert!(damage.bottom() as u32 > ink.max_y);
    }
}
