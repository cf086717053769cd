// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! RasterGL chains shader-based image processing nodes over WebGL2 /
//! OpenGL ES 3.
//!
//! A node renders one fragment shader over a full-screen quad, onto the
//! canvas or into a texture. That texture can be sampled by another node,
//! which pulls the upstream node up to date before drawing. The crate keeps
//! the GPU bookkeeping in one place:
//! - texture units are taken from a per-context pool and given back when
//!   the last sampler lets go of a texture
//! - uniforms are uploaded only when they changed
//! - output textures and framebuffers are allocated lazily
//! - readback works as bytes, uint32, bit-cast floats or PNG
//!
//! ```no_run
//! use raster_gl::{
//!     gl::soft::{SoftCanvas, SoftGl},
//!     NodeOptions, RasterContext, RasterContextOptions, ShaderSourceOptions,
//! };
//!
//! # fn main() -> raster_gl::Result<()> {
//! let gl = SoftGl::new(1, 1);
//! let mut ctx = RasterContext::new(SoftCanvas::new(&gl), RasterContextOptions::default())?;
//! let id = ctx.create_node(NodeOptions::default())?;
//! let mut node = ctx.node(id)?;
//! node.set_shader_source(ShaderSourceOptions::default())?;
//! node.render()?;
//! let png = node.png_bytes()?;
//! # let _ = png;
//! ctx.free();
//! # Ok(())
//! # }
//! ```
//!
//! Native hosts wrap their own `glow::Context` in `canvas::HostCanvas`,
//! browsers use `canvas::WebCanvas`, tests and headless tools run on
//! `gl::soft` (feature `soft`).

pub mod canvas;
pub mod config;
pub mod context;
pub mod error;
pub mod gl;
pub mod glsl;
pub mod image_io;
pub mod kernel;
pub mod log;
pub mod node;
pub mod texture;

pub use context::{RasterContext, RasterContextOptions};
pub use error::{RasterError, Result};
pub use node::{
    readback::{ImageData, PixelData},
    uniform::{TextureInput, UniformType, UniformValue},
    Node, NodeId, NodeOptions, ShaderSourceOptions,
};
pub use texture::{BitDepth, Texture, TextureId, TextureOptions};
