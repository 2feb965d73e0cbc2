//! The imperative handle hosts keep around (`ref.current` in a web UI).
//!
//! A controller never owns the pad. Once the owner drops it (the surface was
//! unmounted) every call degrades to a harmless default instead of failing
//! loudly inside the host's event handler.

use std::{
    cell::RefCell,
    future::Future,
    rc::{Rc, Weak}
};

use crate::{error::SigError, image_io, raster::Raster, signature_core::SignaturePad};

#[derive(Clone)]
pub struct SignatureController {
    pad: Weak<RefCell<SignaturePad>>
}

impl SignatureController {
    pub fn new(pad: &Rc<RefCell<SignaturePad>>) -> Self {
        Self {
            pad: Rc::downgrade(pad)
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.pad.strong_count() > 0
    }

    fn with_pad<R>(&self, f: impl FnOnce(&SignaturePad) -> R) -> Option<R> {
        let pad = self.pad.upgrade()?;
        let guard = pad.try_borrow().ok().or_else(|| {
            log::warn!("signature pad busy, read skipped");
            None
        })?;
        Some(f(&*guard))
    }

    fn with_pad_mut<R>(&self, f: impl FnOnce(&mut SignaturePad) -> R) -> Option<R> {
        let pad = self.pad.upgrade()?;
        let mut guard = pad.try_borrow_mut().ok().or_else(|| {
            log::warn!("signature pad busy, update skipped");
            None
        })?;
        Some(f(&mut *guard))
    }

    pub fn clear(&self) {
        self.with_pad_mut(SignaturePad::clear);
    }

    /// An unmounted surface has nothing drawn on it.
    pub fn is_empty(&self) -> bool {
        self.with_pad(SignaturePad::is_empty).unwrap_or(true)
    }

    pub fn get_trimmed_image(&self) -> Option<Raster> {
        self.with_pad(|pad| pad.get_trimmed_image())?
            .map_err(|e| log::warn!("trim failed: {e}"))
            .ok()
    }

    /// Snapshot of the full backing raster.
    pub fn get_raw_canvas(&self) -> Option<Raster> {
        self.with_pad(|pad| pad.get_raw_canvas().clone())
    }

    pub fn to_data_url(&self, mime: Option<&str>, quality: Option<f64>) -> Result<String, SigError> {
        self.with_pad(|pad| pad.to_data_url(mime, quality))
            .unwrap_or(Err(SigError::Unmounted))
    }

    pub fn signature_data_url(&self) -> Result<String, SigError> {
        self.with_pad(SignaturePad::signature_data_url)
            .unwrap_or(Err(SigError::Unmounted))
    }

    /// Restore `data_url` into the pad.
    ///
    /// Nothing happens until the returned future is polled; state reads are
    /// only meaningful after it completes. Decode errors are logged. If the
    /// surface went away in the meantime the result is dropped.
    pub fn load_from_data_url(&self, data_url: impl Into<String>) -> impl Future<Output = ()> + 'static {
        let pad = self.pad.clone();
        let data_url = data_url.into();
        async move {
            let image = match image_io::decode_data_url(&data_url) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("signature restore failed: {e}");
                    return;
                }
            };
            let controller = SignatureController { pad };
            if controller.with_pad_mut(|p| p.load_raster(&image)).is_none() {
                log::debug!("signature restore dropped, surface gone");
            }
        }
    }
}

impl PartialEq for SignatureController {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.pad, &other.pad)
    }
}
