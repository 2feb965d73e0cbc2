// src/yew.rs
// feature = "yew"

use std::{cell::RefCell, rc::Rc};

use web_sys::HtmlCanvasElement;
use yew::{
    function_component, html, use_effect_with, use_mut_ref, use_node_ref, AttrValue, Callback,
    Classes, Html, Properties
};

use crate::{
    config::SurfaceConfig,
    controller::SignatureController,
    error::SigError,
    signature_core::StrokeHooks,
    ui_common::{DomBindings, SignatureHandle}
};

/// Props mirror the surface configuration a host can set.
#[derive(Properties, PartialEq, Clone)]
pub struct SignatureProps {
    /// Any CSS color.
    #[prop_or(AttrValue::Static("#000000"))]
    pub pen_color: AttrValue,

    /// `"transparent"` or any CSS color.
    #[prop_or(AttrValue::Static("transparent"))]
    pub background_color: AttrValue,

    /// Canvas width/height in CSS pixels
    #[prop_or(400)]
    pub width:  u32,
    #[prop_or(200)]
    pub height: u32,

    #[prop_or_default]
    pub on_begin: Option<Callback<()>>,
    #[prop_or_default]
    pub on_end:   Option<Callback<()>>,

    /// Receives the imperative handle every time the surface is (re)built.
    #[prop_or_default]
    pub on_ready: Option<Callback<SignatureController>>,

    #[prop_or_default]
    pub class: Classes
}

#[derive(Default)]
struct LatestCallbacks {
    on_begin: Option<Callback<()>>,
    on_end:   Option<Callback<()>>
}

#[function_component(SignaturePadYew)]
pub fn signature_pad_yew(props: &SignatureProps) -> Html {
    let canvas_ref = use_node_ref();

    // Callbacks change identity on every parent render; read the latest ones
    // through a cell instead of rebuilding the surface.
    let latest = use_mut_ref(LatestCallbacks::default);
    {
        let mut latest = latest.borrow_mut();
        latest.on_begin = props.on_begin.clone();
        latest.on_end = props.on_end.clone();
    }

    {
        let canvas_ref = canvas_ref.clone();
        let on_ready = props.on_ready.clone();
        let deps = (
            props.pen_color.clone(),
            props.background_color.clone(),
            props.width,
            props.height
        );

        // Any config change tears the surface down and mounts a fresh one.
        use_effect_with(deps, move |(pen, background, width, height)| {
            let handle = canvas_ref.cast::<HtmlCanvasElement>().and_then(|canvas| {
                let mounted = build_config(pen, background, *width, *height)
                    .and_then(|config| SignatureHandle::mount(canvas, config, hooks(&latest)));
                match mounted {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        log::warn!("signature pad not mounted: {e}");
                        None
                    }
                }
            });

            if let (Some(handle), Some(cb)) = (handle.as_ref(), on_ready.as_ref()) {
                cb.emit(handle.controller());
            }

            move || drop(handle)
        });
    }

    html! {
        <canvas ref={canvas_ref} class={props.class.clone()} />
    }
}

fn build_config(pen: &str, background: &str, width: u32, height: u32) -> Result<SurfaceConfig, SigError> {
    Ok(SurfaceConfig::new(width, height)
        .with_pen_color(pen)?
        .with_background(background)?
        .with_device_pixel_ratio(DomBindings::device_pixel_ratio()))
}

fn hooks(latest: &Rc<RefCell<LatestCallbacks>>) -> StrokeHooks {
    let begin = Rc::clone(latest);
    let end = Rc::clone(latest);
    StrokeHooks {
        on_begin: Some(Rc::new(move || {
            let cb = begin.borrow().on_begin.clone();
            if let Some(cb) = cb {
                cb.emit(());
            }
        })),
        on_end:   Some(Rc::new(move || {
            let cb = end.borrow().on_end.clone();
            if let Some(cb) = cb {
                cb.emit(());
            }
        }))
    }
}
