use std::{cell::RefCell, rc::Rc};

use tiny_skia::{IntRect, PixmapPaint, Transform};

use crate::{
    config::SurfaceConfig,
    error::SigError,
    image_io::{self, DEFAULT_TRIM_PADDING},
    input::{CaptureMachine, PointerSample, SourceId, Transition},
    raster::Raster,
    renderer::StrokeRenderer
};

/// Something that shows the backing raster to the user, e.g. a DOM canvas.
pub trait Presenter {
    /// Copy `damage` (or the whole raster when `None`) to the display.
    fn present(&self, raster: &Raster, damage: Option<IntRect>);

    /// The surface was rebuilt with `config`; resize whatever is displayed.
    fn reconfigure(&self, _config: &SurfaceConfig) {}
}

/// Host notifications for stroke start/end.
///
/// Hooks run with the pad borrow released, so they may read or clear the pad
/// through a [`SignatureController`](crate::SignatureController).
#[derive(Clone, Default)]
pub struct StrokeHooks {
    pub on_begin: Option<Rc<dyn Fn()>>,
    pub on_end:   Option<Rc<dyn Fn()>>
}

impl StrokeHooks {
    /// Apply `event` to a shared pad, then notify for the resulting
    /// transition. `None` if the pad is already borrowed.
    pub fn run(
        &self,
        pad: &RefCell<SignaturePad>,
        event: impl FnOnce(&mut SignaturePad) -> Transition
    ) -> Option<Transition> {
        let transition = match pad.try_borrow_mut() {
            Ok(mut pad) => event(&mut *pad),
            Err(_) => {
                log::warn!("input dropped, signature pad busy");
                return None;
            }
        };
        let hook = match transition {
            Transition::Began(_) => self.on_begin.as_ref(),
            Transition::Ended => self.on_end.as_ref(),
            Transition::Segment { .. } | Transition::Ignored => None
        };
        if let Some(hook) = hook {
            hook();
        }
        Some(transition)
    }
}

/// Encapsulates drawing logic and export of signature.
pub struct SignaturePad {
    config:    SurfaceConfig,
    raster:    Raster,
    renderer:  StrokeRenderer,
    capture:   CaptureMachine,
    has_ink:   bool,
    presenter: Option<Box<dyn Presenter>>
}

impl SignaturePad {
    /// Build a blank surface for `config`.
    pub fn new(config: SurfaceConfig) -> Result<Self, SigError> {
        let (raster, renderer) = build_surface(&config)?;
        Ok(Self {
            config,
            raster,
            renderer,
            capture: CaptureMachine::new(),
            has_ink: false,
            presenter: None
        })
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn set_presenter(&mut self, presenter: Box<dyn Presenter>) {
        presenter.reconfigure(&self.config);
        presenter.present(&self.raster, None);
        self.presenter = Some(presenter);
    }

    /// Rebuild the surface if `config` differs from the current one.
    ///
    /// A rebuild always starts from a blank backing store: prior ink is
    /// discarded and a stroke in progress is dropped.
    pub fn reconfigure(&mut self, config: SurfaceConfig) -> Result<(), SigError> {
        if config == self.config {
            return Ok(());
        }
        let (raster, renderer) = build_surface(&config)?;
        log::debug!(
            "surface rebuilt: {}x{} @ {}x",
            config.width,
            config.height,
            config.device_pixel_ratio
        );
        self.config = config;
        self.raster = raster;
        self.renderer = renderer;
        self.capture.reset();
        self.has_ink = false;
        if let Some(p) = &self.presenter {
            p.reconfigure(&self.config);
            p.present(&self.raster, None);
        }
        Ok(())
    }

    /// Handle pointer down: start drawing.
    pub fn pointer_down(&mut self, sample: PointerSample) -> Transition {
        self.capture.start(sample)
    }

    /// Handle pointer move: draw if active.
    pub fn pointer_move(&mut self, sample: PointerSample) -> Transition {
        let transition = self.capture.advance(sample);
        if let Transition::Segment { from, to } = transition {
            let damage = self.renderer.draw_segment(self.raster.pixmap_mut(), from, to);
            self.has_ink = true;
            if let (Some(p), Some(rect)) = (&self.presenter, damage) {
                p.present(&self.raster, Some(rect));
            }
        }
        transition
    }

    /// Handle pointer up/cancel: stop drawing if the active contact is
    /// among `lifted`.
    pub fn pointer_up(&mut self, lifted: &[SourceId]) -> Transition {
        self.capture.stop(lifted)
    }

    pub fn is_drawing(&self) -> bool {
        self.capture.is_drawing()
    }

    pub fn active_touch(&self) -> Option<i32> {
        self.capture.active_touch()
    }

    /// Touch-move should `preventDefault` while this is true.
    pub fn locks_scroll(&self) -> bool {
        self.capture.locks_scroll()
    }

    /// Clear the canvas.
    pub fn clear(&mut self) {
        self.raster.paint_background(&self.config.background);
        self.has_ink = false;
        self.present_all();
    }

    /// Is pad empty (nothing drawn)?
    pub fn is_empty(&self) -> bool {
        !self.has_ink
    }

    /// Crop to the ink plus 10px padding. A pad with nothing drawn yields a
    /// 1x1 placeholder without looking at the pixels.
    pub fn get_trimmed_image(&self) -> Result<Raster, SigError> {
        if !self.has_ink {
            return Raster::new(1, 1);
        }
        image_io::trim_raster(&self.raster, &self.config.background, DEFAULT_TRIM_PADDING)
    }

    /// The full backing raster, read-only.
    pub fn get_raw_canvas(&self) -> &Raster {
        &self.raster
    }

    /// Export the whole raster as a data URL. `mime` defaults to PNG.
    pub fn to_data_url(&self, mime: Option<&str>, quality: Option<f64>) -> Result<String, SigError> {
        self.raster.to_data_url(mime, quality)
    }

    /// Export raw PNG bytes of the full raster (without data URL).
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, SigError> {
        self.raster.to_png_bytes()
    }

    /// What a "Save" button wants: the trimmed signature as a PNG data URL.
    pub fn signature_data_url(&self) -> Result<String, SigError> {
        if self.is_empty() {
            return Err(SigError::EmptySignature);
        }
        self.get_trimmed_image()?.to_data_url(None, None)
    }

    /// Restore a previously exported image. Decode failures are logged and
    /// leave the pad as it was.
    pub fn load_from_data_url(&mut self, data_url: &str) {
        match image_io::decode_data_url(data_url) {
            Ok(image) => self.load_raster(&image),
            Err(e) => log::warn!("signature restore failed: {e}")
        }
    }

    /// Clear, then draw `image` at the origin at its natural device-pixel size.
    pub fn load_raster(&mut self, image: &Raster) {
        self.raster.paint_background(&self.config.background);
        self.raster.pixmap_mut().draw_pixmap(
            0,
            0,
            image.pixmap().as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None
        );
        self.has_ink = true;
        self.present_all();
    }

    fn present_all(&self) {
        if let Some(p) = &self.presenter {
            p.present(&self.raster, None);
        }
    }
}

fn build_surface(config: &SurfaceConfig) -> Result<(Raster, StrokeRenderer), SigError> {
    config.validate()?;
    let (width, height) = config.physical_size();
    let mut raster = Raster::new(width, height)?;
    raster.paint_background(&config.background);
    let renderer = StrokeRenderer::new(config.pen_color, config.device_pixel_ratio);
    Ok((raster, renderer))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tiny_skia::{Color, Paint, Rect};

    use super::*;
    use crate::config::Background;

    fn pad() -> SignaturePad {
        SignaturePad::new(SurfaceConfig::new(100, 60)).unwrap()
    }

    fn scribble(pad: &mut SignaturePad) {
        pad.pointer_down(PointerSample::mouse(20.0, 20.0));
        pad.pointer_move(PointerSample::mouse(40.0, 30.0));
        pad.pointer_move(PointerSample::mouse(60.0, 25.0));
        pad.pointer_up(&[SourceId::Mouse]);
    }

    #[derive(Default)]
    struct Recorder {
        frames: RefCell<Vec<Option<IntRect>>>,
        resizes: RefCell<u32>
    }

    struct Shared(Rc<Recorder>);

    impl Presenter for Shared {
        fn present(&self, _raster: &Raster, damage: Option<IntRect>) {
            self.0.frames.borrow_mut().push(damage);
        }

        fn reconfigure(&self, _config: &SurfaceConfig) {
            *self.0.resizes.borrow_mut() += 1;
        }
    }

    #[test]
    fn new_pad_is_empty() {
        let pad = pad();
        assert!(pad.is_empty());
        assert!(!pad.is_drawing());
        assert_eq!(pad.get_raw_canvas().ink_bounds(), None);
    }

    #[test]
    fn down_alone_does_not_ink() {
        let mut pad = pad();
        pad.pointer_down(PointerSample::mouse(10.0, 10.0));
        pad.pointer_up(&[SourceId::Mouse]);
        assert!(pad.is_empty());
    }

    #[test]
    fn callbacks_fire_once_per_stroke() {
        let begins = Rc::new(RefCell::new(0));
        let ends = Rc::new(RefCell::new(0));
        let hooks = {
            let begins = Rc::clone(&begins);
            let ends = Rc::clone(&ends);
            StrokeHooks {
                on_begin: Some(Rc::new(move || *begins.borrow_mut() += 1)),
                on_end:   Some(Rc::new(move || *ends.borrow_mut() += 1))
            }
        };
        let pad = RefCell::new(pad());

        hooks.run(&pad, |p| p.pointer_down(PointerSample::mouse(20.0, 20.0)));
        hooks.run(&pad, |p| p.pointer_move(PointerSample::mouse(40.0, 30.0)));
        assert_eq!(hooks.run(&pad, |p| p.pointer_up(&[SourceId::Mouse])), Some(Transition::Ended));
        assert_eq!(hooks.run(&pad, |p| p.pointer_up(&[SourceId::Mouse])), Some(Transition::Ignored));

        assert_eq!(*begins.borrow(), 1);
        assert_eq!(*ends.borrow(), 1);
    }

    #[test]
    fn busy_pad_drops_input() {
        let hooks = StrokeHooks::default();
        let pad = RefCell::new(pad());
        let _held = pad.borrow();
        assert_eq!(hooks.run(&pad, |p| p.pointer_down(PointerSample::mouse(1.0, 1.0))), None);
    }

    #[test]
    fn trimmed_image_skips_scan_when_empty() {
        let mut pad = pad();
        // paint behind the pad's back; has_ink stays false
        let mut paint = Paint::default();
        paint.set_color(Color::BLACK);
        pad.raster.pixmap_mut().fill_rect(
            Rect::from_xywh(10.0, 10.0, 20.0, 20.0).unwrap(),
            &paint,
            Transform::identity(),
            None
        );

        let trimmed = pad.get_trimmed_image().unwrap();
        assert_eq!((trimmed.width(), trimmed.height()), (1, 1));
    }

    #[test]
    fn clear_restores_background() {
        let mut pad = SignaturePad::new(
            SurfaceConfig::new(40, 40)
                .with_background("#ffffff")
                .unwrap()
        )
        .unwrap();
        scribble(&mut pad);
        pad.clear();

        assert!(pad.is_empty());
        assert_eq!(pad.get_raw_canvas().rgba_at(30, 25), Some([255, 255, 255, 255]));
    }

    #[test]
    fn signature_data_url_requires_ink() {
        let mut pad = pad();
        assert!(matches!(pad.signature_data_url(), Err(SigError::EmptySignature)));

        scribble(&mut pad);
        let url = pad.signature_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn reconfigure_is_destructive_only_on_change() {
        let mut pad = pad();
        scribble(&mut pad);

        pad.reconfigure(SurfaceConfig::new(100, 60)).unwrap();
        assert!(!pad.is_empty());

        pad.pointer_down(PointerSample::mouse(5.0, 5.0));
        pad.reconfigure(SurfaceConfig::new(100, 60).with_device_pixel_ratio(2.0))
            .unwrap();
        assert!(pad.is_empty());
        assert!(!pad.is_drawing());
        assert_eq!(pad.get_raw_canvas().width(), 200);
        assert_eq!(pad.get_raw_canvas().ink_bounds(), None);
    }

    #[test]
    fn reconfigure_rejects_bad_config_and_keeps_ink() {
        let mut pad = pad();
        scribble(&mut pad);
        assert!(pad.reconfigure(SurfaceConfig::new(0, 60)).is_err());
        assert!(!pad.is_empty());
        assert_eq!(pad.config().width, 100);
    }

    #[test]
    fn load_failure_leaves_pad_untouched() {
        let mut pad = pad();
        scribble(&mut pad);
        let before = pad.get_raw_canvas().clone();

        pad.load_from_data_url("data:image/png;base64,AAAA");
        pad.load_from_data_url("not a data url");

        assert!(!pad.is_empty());
        assert_eq!(pad.get_raw_canvas(), &before);
    }

    #[test]
    fn presenter_sees_every_mutation() {
        let rec = Rc::new(Recorder::default());
        let mut pad = pad();
        pad.set_presenter(Box::new(Shared(Rc::clone(&rec))));
        assert_eq!(*rec.resizes.borrow(), 1);
        assert_eq!(rec.frames.borrow().as_slice(), &[None]);

        scribble(&mut pad);
        assert_eq!(rec.frames.borrow().len(), 3);
        assert!(rec.frames.borrow()[1].is_some());

        pad.clear();
        assert_eq!(rec.frames.borrow().last(), Some(&None));

        pad.reconfigure(SurfaceConfig::new(10, 10)).unwrap();
        assert_eq!(*rec.resizes.borrow(), 2);
    }

    #[test]
    fn background_fill_applies_at_init() {
        let cfg = SurfaceConfig {
            background: Background::Fill(Color::from_rgba8(0, 0, 255, 255)),
            ..SurfaceConfig::new(8, 8)
        };
        let pad = SignaturePad::new(cfg).unwrap();
        assert_eq!(pad.get_raw_canvas().rgba_at(0, 0), Some([0, 0, 255, 255]));
        assert!(pad.is_empty());
    }
}
