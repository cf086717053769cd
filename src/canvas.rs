// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Canvas collaborator: where the GPU context comes from and what the
//! default framebuffer looks like.
//!
//! - `HostCanvas` wraps a glow context made by the host application
//!   (glutin / winit / sdl), native targets only
//! - `WebCanvas` creates an `HtmlCanvasElement` or `OffscreenCanvas` and
//!   asks it for `webgl2`, wasm only
//! - `SoftCanvas` (in `gl::soft`) runs on the CPU

use crate::{error::Result, gl::GlBackend};

pub trait Canvas {
    type Gl: GlBackend;

    /// Obtain the GPU context, `GpuUnavailable` when there is none.
    fn context(&mut self) -> Result<Self::Gl>;

    /// drawing buffer size in device pixels
    fn size(&self) -> (u32, u32);

    fn set_size(&mut self, width: u32, height: u32);

    /// device pixels per logical pixel
    fn pixel_ratio(&self) -> f64 {
        1.0
    }

    fn is_offscreen(&self) -> bool;
}

#[cfg(native)]
pub use host::HostCanvas;

#[cfg(native)]
mod host {
    use super::Canvas;
    use crate::error::{RasterError, Result};

    /// A glow context owned by the host, e.g. built with
    /// `glow::Context::from_loader_function` after making a glutin
    /// context current. The default framebuffer belongs to the host window,
    /// so `set_size` only records the size.
    pub struct HostCanvas {
        gl: Option<glow::Context>,
        width: u32,
        height: u32,
        offscreen: bool,
    }

    impl HostCanvas {
        pub fn new(gl: glow::Context, width: u32, height: u32, offscreen: bool) -> Self {
            Self {
                gl: Some(gl),
                width,
                height,
                offscreen,
            }
        }
    }

    impl Canvas for HostCanvas {
        type Gl = glow::Context;

        fn context(&mut self) -> Result<glow::Context> {
            self.gl.take().ok_or_else(|| {
                RasterError::GpuUnavailable("host context already handed out".to_string())
            })
        }

        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn set_size(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }

        fn is_offscreen(&self) -> bool {
            self.offscreen
        }
    }
}

#[cfg(wasm)]
pub use web::WebCanvas;

#[cfg(wasm)]
mod web {
    use super::Canvas;
    use crate::error::{RasterError, Result};
    use log::info;
    use wasm_bindgen::{JsCast, JsValue};

    enum Element {
        Visible(web_sys::HtmlCanvasElement),
        Offscreen(web_sys::OffscreenCanvas),
    }

    pub struct WebCanvas {
        element: Element,
    }

    fn unavailable(e: JsValue) -> RasterError {
        RasterError::GpuUnavailable(format!("{:?}", e))
    }

    impl WebCanvas {
        pub fn create(width: u32, height: u32, offscreen: bool) -> Result<Self> {
            let element = if offscreen {
                Element::Offscreen(web_sys::OffscreenCanvas::new(width, height).map_err(unavailable)?)
            } else {
                let document = web_sys::window()
                    .and_then(|w| w.document())
                    .ok_or_else(|| RasterError::GpuUnavailable("no document".to_string()))?;
                let canvas = document
                    .create_element("canvas")
                    .map_err(unavailable)?
                    .dyn_into::<web_sys::HtmlCanvasElement>()
                    .map_err(|e| unavailable(e.into()))?;
                Element::Visible(canvas)
            };
            let mut c = Self { element };
            c.set_size(width, height);
            Ok(c)
        }

        /// the visible canvas element, for the host to attach to the page
        pub fn element(&self) -> Option<&web_sys::HtmlCanvasElement> {
            match &self.element {
                Element::Visible(c) => Some(c),
                Element::Offscreen(_) => None,
            }
        }
    }

    impl Canvas for WebCanvas {
        type Gl = glow::Context;

        fn context(&mut self) -> Result<glow::Context> {
            let options = js_sys::Object::new();
            js_sys::Reflect::set(&options, &"premultipliedAlpha".into(), &false.into())
                .map_err(unavailable)?;
            let raw = match &self.element {
                Element::Visible(c) => c.get_context_with_context_options("webgl2", &options),
                Element::Offscreen(c) => c.get_context_with_context_options("webgl2", &options),
            }
            .map_err(unavailable)?
            .ok_or_else(|| RasterError::GpuUnavailable("webgl2 not supported".to_string()))?;
            let webgl2 = raw
                .dyn_into::<web_sys::WebGl2RenderingContext>()
                .map_err(|e| unavailable(e.into()))?;
            info!("webgl2 context created");
            Ok(glow::Context::from_webgl2_context(webgl2))
        }

        fn size(&self) -> (u32, u32) {
            match &self.element {
                Element::Visible(c) => (c.width(), c.height()),
                Element::Offscreen(c) => (c.width(), c.height()),
            }
        }

        fn set_size(&mut self, width: u32, height: u32) {
            let ratio = self.pixel_ratio();
            match &self.element {
                Element::Visible(c) => {
                    c.set_width(width);
                    c.set_height(height);
                    let style = c.style();
                    let _ = style.set_property("width", &format!("{}px", width as f64 / ratio));
                    let _ = style.set_property("height", &format!("{}px", height as f64 / ratio));
                }
                Element::Offscreen(c) => {
                    c.set_width(width);
                    c.set_height(height);
                }
            }
        }

        fn pixel_ratio(&self) -> f64 {
            match self.element {
                Element::Visible(_) => web_sys::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0),
                Element::Offscreen(_) => 1.0,
            }
        }

        fn is_offscreen(&self) -> bool {
            matches!(self.element, Element::Offscreen(_))
        }
    }
}
