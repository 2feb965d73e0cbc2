// src/ui_common.rs
// feature = "web"

use std::{cell::RefCell, rc::Rc};

use tiny_skia::IntRect;
use wasm_bindgen::{closure::Closure, Clamped, JsCast};
use web_sys::{
    AddEventListenerOptions, CanvasRenderingContext2d, Document, Event, HtmlCanvasElement,
    ImageData, PointerEvent, Touch, TouchEvent, TouchList, Window
};

use crate::{
    config::SurfaceConfig,
    controller::SignatureController,
    error::SigError,
    input::{BoundingRect, RawInput, TouchPoint},
    raster::Raster,
    signature_core::{Presenter, SignaturePad, StrokeHooks}
};

/// Install the console logger and panic hook. Safe to call more than once.
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
}

/// Paints the pad's raster into a 2D `<canvas>`.
pub struct CanvasPresenter {
    canvas: HtmlCanvasElement,
    ctx:    CanvasRenderingContext2d
}

impl CanvasPresenter {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, SigError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|_| SigError::NoContext2d)?
            .ok_or(SigError::NoContext2d)?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SigError::NoContext2d)?;
        Ok(Self { canvas, ctx })
    }
}

impl Presenter for CanvasPresenter {
    fn present(&self, raster: &Raster, damage: Option<IntRect>) {
        let Some(region) = damage.or_else(|| raster.full_rect()) else {
            return;
        };
        let data = raster.rgba_region(region);
        let image = match ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(data.as_slice()),
            region.width(),
            region.height()
        ) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("ImageData rejected: {e:?}");
                return;
            }
        };
        if let Err(e) = self
            .ctx
            .put_image_data(&image, region.x() as f64, region.y() as f64)
        {
            log::warn!("putImageData failed: {e:?}");
        }
    }

    fn reconfigure(&self, config: &SurfaceConfig) {
        let (width, height) = config.physical_size();
        // Backing store in device pixels, layout box in CSS pixels.
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{}px", config.width));
        let _ = style.set_property("height", &format!("{}px", config.height));
        let _ = style.set_property("touch-action", "none");
    }
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    Start,
    Move,
    Stop
}

const POINTER_EVENTS: [(&str, Phase); 5] = [
    ("pointerdown", Phase::Start),
    ("pointermove", Phase::Move),
    ("pointerup", Phase::Stop),
    ("pointerleave", Phase::Stop),
    ("pointerout", Phase::Stop)
];

const TOUCH_EVENTS: [(&str, Phase); 4] = [
    ("touchstart", Phase::Start),
    ("touchmove", Phase::Move),
    ("touchend", Phase::Stop),
    ("touchcancel", Phase::Stop)
];

/// What every listener closure shares.
struct Wiring {
    canvas: HtmlCanvasElement,
    pad:    Rc<RefCell<SignaturePad>>,
    hooks:  StrokeHooks
}

impl Wiring {
    fn dispatch(&self, phase: Phase, event: &Event) {
        let rect = self.canvas.get_bounding_client_rect();
        let bounds = BoundingRect {
            left: rect.left(),
            top:  rect.top()
        };

        let (active, locks_scroll) = self
            .pad
            .try_borrow()
            .map(|pad| (pad.active_touch(), pad.locks_scroll()))
            .unwrap_or((None, false));

        // Stops carry every released contact; starts and moves one sample.
        let (sample, lifted) = if let Some(pe) = event.dyn_ref::<PointerEvent>() {
            // touch contacts arrive through the touch listeners
            if pe.pointer_type() == "touch" {
                return;
            }
            let raw = RawInput::Mouse {
                client_x: pe.client_x() as f64,
                client_y: pe.client_y() as f64
            };
            (raw.normalize(bounds), raw.lifted())
        } else if let Some(te) = event.dyn_ref::<TouchEvent>() {
            if matches!(phase, Phase::Move) && locks_scroll {
                event.prevent_default();
            }
            let changed = touch_points(&te.changed_touches());
            let touches = touch_points(&te.touches());
            let raw = RawInput::Touch {
                changed: &changed,
                touches: &touches
            };
            (raw.normalize_for(bounds, active), raw.lifted())
        } else {
            return;
        };

        // Pad borrow is released before hooks run; they may call back into a controller.
        match phase {
            Phase::Start => {
                if let Some(sample) = sample {
                    self.hooks.run(&self.pad, |pad| pad.pointer_down(sample));
                }
            }
            Phase::Move => {
                if let Some(sample) = sample {
                    self.hooks.run(&self.pad, |pad| pad.pointer_move(sample));
                }
            }
            Phase::Stop => {
                if !lifted.is_empty() {
                    self.hooks.run(&self.pad, |pad| pad.pointer_up(&lifted));
                }
            }
        }
    }
}

fn touch_points(list: &TouchList) -> Vec<TouchPoint> {
    (0..list.length()).filter_map(|i| list.get(i)).map(touch_point).collect()
}

fn touch_point(t: Touch) -> TouchPoint {
    TouchPoint {
        identifier: t.identifier(),
        client_x:   t.client_x() as f64,
        client_y:   t.client_y() as f64
    }
}

type Listener = (&'static str, Closure<dyn FnMut(Event)>);

/// RAII handle that owns the SignaturePad and its JS listeners.
/// On drop, listeners are removed.
pub struct SignatureHandle {
    canvas:    HtmlCanvasElement,
    pad:       Rc<RefCell<SignaturePad>>,
    listeners: Vec<Listener>
}

impl SignatureHandle {
    /// Initialize on a given canvas element.
    pub fn mount(
        canvas: HtmlCanvasElement,
        config: SurfaceConfig,
        hooks: StrokeHooks
    ) -> Result<Self, SigError> {
        let mut pad = SignaturePad::new(config)?;
        pad.set_presenter(Box::new(CanvasPresenter::new(canvas.clone())?));
        let pad = Rc::new(RefCell::new(pad));

        let wiring = Rc::new(Wiring {
            canvas: canvas.clone(),
            pad: Rc::clone(&pad),
            hooks
        });

        // Listeners registered so far are removed by Drop if a later one fails.
        let mut handle = Self {
            canvas,
            pad,
            listeners: Vec::with_capacity(POINTER_EVENTS.len() + TOUCH_EVENTS.len())
        };
        for (name, phase) in POINTER_EVENTS.into_iter().chain(TOUCH_EVENTS) {
            handle.listen(name, phase, &wiring)?;
        }
        log::debug!("signature surface mounted with {} listeners", handle.listeners.len());
        Ok(handle)
    }

    fn listen(&mut self, name: &'static str, phase: Phase, wiring: &Rc<Wiring>) -> Result<(), SigError> {
        let wiring = Rc::clone(wiring);
        let cb = Closure::wrap(Box::new(move |e: Event| wiring.dispatch(phase, &e)) as Box<dyn FnMut(_)>);

        // touchmove has to be non-passive or preventDefault is ignored
        let opts = AddEventListenerOptions::new();
        opts.set_passive(false);
        self.canvas
            .add_event_listener_with_callback_and_add_event_listener_options(
                name,
                cb.as_ref().unchecked_ref(),
                &opts
            )
            .map_err(|_| SigError::OpFailed(format!("addEventListener({name})")))?;
        self.listeners.push((name, cb));
        Ok(())
    }

    pub fn controller(&self) -> SignatureController {
        SignatureController::new(&self.pad)
    }

    pub fn reconfigure(&self, config: SurfaceConfig) -> Result<(), SigError> {
        self.pad.borrow_mut().reconfigure(config)
    }

    pub fn clear(&self) {
        self.controller().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.controller().is_empty()
    }

    pub fn to_data_url(&self, mime: Option<&str>, quality: Option<f64>) -> Result<String, SigError> {
        self.controller().to_data_url(mime, quality)
    }

    /// Restore asynchronously; returns before the image is applied.
    pub fn load_from_data_url(&self, data_url: impl Into<String>) {
        wasm_bindgen_futures::spawn_local(self.controller().load_from_data_url(data_url));
    }
}

impl Drop for SignatureHandle {
    fn drop(&mut self) {
        for (name, cb) in self.listeners.drain(..) {
            let _ = self
                .canvas
                .remove_event_listener_with_callback(name, cb.as_ref().unchecked_ref());
        }
    }
}

/// DOM helpers. Stateless. All state lives in `SignatureHandle`.
pub struct DomBindings;

impl DomBindings {
    fn window() -> Result<Window, SigError> {
        web_sys::window().ok_or(SigError::DomUnavailable)
    }

    /// `window.devicePixelRatio`, 1.0 without a window.
    pub fn device_pixel_ratio() -> f32 {
        web_sys::window()
            .map(|w| w.device_pixel_ratio() as f32)
            .filter(|dpr| dpr.is_finite() && *dpr > 0.0)
            .unwrap_or(1.0)
    }

    /// Initialize by canvas id and return a RAII handle.
    pub fn init_by_canvas_id(
        canvas_id: &str,
        config: SurfaceConfig,
        hooks: StrokeHooks
    ) -> Result<SignatureHandle, SigError> {
        let document: Document = Self::window()?.document().ok_or(SigError::DomUnavailable)?;
        let el = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| SigError::ElementNotFound(canvas_id.to_string()))?;
        let canvas: HtmlCanvasElement = el
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| SigError::ElementNotFound(canvas_id.to_string()))?;

        SignatureHandle::mount(canvas, config, hooks)
    }
}
