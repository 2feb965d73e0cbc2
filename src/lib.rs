//! Freehand signature capture.
//!
//! [`SignaturePad`] turns pointer and touch samples into pen strokes on an
//! RGBA raster, and exports the result as a full or trimmed PNG/JPEG data
//! URL. The core is platform-free; the `web` feature wires it to a DOM
//! `<canvas>` and the `yew` feature wraps that in a component.

mod config;
mod controller;
mod error;
mod image_io;
mod input;
mod raster;
mod renderer;
mod signature_core;

#[cfg(feature = "web")]
mod ui_common;

#[cfg(feature = "yew")]
mod yew;

pub use config::{parse_color, Background, SurfaceConfig, LINE_WIDTH, MAX_DIMENSION};
pub use controller::SignatureController;
pub use error::SigError;
pub use image_io::{
    decode_bytes, decode_data_url, export_full, trim_raster, DataUrl, ImageFormat,
    DEFAULT_JPEG_QUALITY, DEFAULT_TRIM_PADDING
};
pub use input::{
    BoundingRect, CaptureMachine, CaptureState, Point, PointerSample, RawInput, SourceId,
    TouchPoint, Transition
};
pub use raster::{InkBounds, Raster};
pub use renderer::StrokeRenderer;
pub use signature_core::{Presenter, SignaturePad, StrokeHooks};
#[cfg(feature = "web")]
pub use ui_common::{init_logging, CanvasPresenter, DomBindings, SignatureHandle};

#[cfg(feature = "yew")]
pub use crate::yew::{SignaturePadYew, SignatureProps};
