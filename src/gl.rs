// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! # GPU Backend Module
//!
//! Every GPU command raster_gl issues goes through the [`GlBackend`] trait.
//! It is a deliberately small, safe mirror of the WebGL2 / OpenGL ES 3 calls
//! a processing node needs: textures, shaders, uniforms, one vertex buffer,
//! framebuffers, a triangle-strip draw and pixel readback.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     RasterContext                        │
//! │   ┌────────────┐   ┌────────────┐   ┌────────────────┐   │
//! │   │  Texture   │   │ Processing │   │  TextureUnit   │   │
//! │   │   arena    │   │ Node arena │   │   Allocator    │   │
//! │   └─────┬──────┘   └─────┬──────┘   └────────────────┘   │
//! │         └────────┬───────┘                               │
//! │                  ▼                                       │
//! │        ┌───────────────────┐                             │
//! │        │  impl GlBackend   │                             │
//! │        └───┬───────────┬───┘                             │
//! └────────────┼───────────┼─────────────────────────────────┘
//!              ▼           ▼
//!      glow::Context     SoftGl
//!   (native GL, WebGL2)  (CPU, tests / headless)
//! ```
//!
//! ## Modules
//! - **`glow_backend`**: `GlBackend` for `glow::Context`
//! - **`soft`**: CPU emulation with call recording, behind the `soft` feature
//! - **`shader`**: shader compile and program link helpers
//! - **`shader_source`**: default GLSL sources and the full-screen quad
//! - **`texture_unit`**: the texture unit pool

use std::fmt;

pub mod glow_backend;
pub mod shader;
pub mod shader_source;
#[cfg(any(test, feature = "soft"))]
pub mod soft;
pub mod texture_unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderKind::Vertex => write!(f, "vertex"),
            ShaderKind::Fragment => write!(f, "fragment"),
        }
    }
}

/// Texel layouts a texture can be allocated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelFormat {
    /// RGB / UNSIGNED_BYTE, 3 bytes per pixel
    Rgb8,
    /// RGBA / UNSIGNED_BYTE, 4 bytes per pixel
    Rgba8,
    /// RGBA32UI / RGBA_INTEGER / UNSIGNED_INT, 16 bytes per pixel
    Rgba32Ui,
}

impl TexelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TexelFormat::Rgb8 => 3,
            TexelFormat::Rgba8 => 4,
            TexelFormat::Rgba32Ui => 16,
        }
    }

    /// UNPACK_ALIGNMENT that keeps tightly packed rows intact
    pub fn unpack_alignment(self) -> i32 {
        match self {
            TexelFormat::Rgb8 => 1,
            TexelFormat::Rgba8 | TexelFormat::Rgba32Ui => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

/// The GPU context seam.
///
/// Methods take `&self` like `glow::HasContext`; implementations keep their
/// own interior state. Texture calls act on the TEXTURE_2D target of the
/// active unit, buffer calls on ARRAY_BUFFER, framebuffer calls on
/// FRAMEBUFFER with COLOR_ATTACHMENT0.
pub trait GlBackend {
    type Texture: Copy + PartialEq + fmt::Debug;
    type Framebuffer: Copy + PartialEq + fmt::Debug;
    type Program: Copy + PartialEq + fmt::Debug;
    type Shader: Copy + PartialEq + fmt::Debug;
    type Buffer: Copy + fmt::Debug;
    type VertexArray: Copy + fmt::Debug;
    type UniformLocation: Clone + fmt::Debug;

    // textures
    fn create_texture(&self) -> Result<Self::Texture, String>;
    fn delete_texture(&self, texture: Self::Texture);
    /// select texture unit `unit` (0 based, not GL_TEXTURE0 based)
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, texture: Option<Self::Texture>);
    fn set_unpack_alignment(&self, alignment: i32);
    fn tex_image_2d(&self, width: u32, height: u32, format: TexelFormat, pixels: Option<&[u8]>);
    /// min/mag filter plus CLAMP_TO_EDGE on both axes
    fn set_texture_sampling(&self, filter: Filter);

    // shaders and programs
    fn create_shader(&self, kind: ShaderKind) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);
    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;

    // uniforms, written to the program in use
    fn uniform_1_i32(&self, location: Option<&Self::UniformLocation>, x: i32);
    fn uniform_2_i32(&self, location: Option<&Self::UniformLocation>, x: i32, y: i32);
    fn uniform_3_i32(&self, location: Option<&Self::UniformLocation>, x: i32, y: i32, z: i32);
    fn uniform_4_i32(
        &self,
        location: Option<&Self::UniformLocation>,
        x: i32,
        y: i32,
        z: i32,
        w: i32,
    );
    fn uniform_1_f32(&self, location: Option<&Self::UniformLocation>, x: f32);
    fn uniform_2_f32(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32);
    fn uniform_3_f32(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32, z: f32);
    fn uniform_4_f32(
        &self,
        location: Option<&Self::UniformLocation>,
        x: f32,
        y: f32,
        z: f32,
        w: f32,
    );
    fn uniform_1_i32_slice(&self, location: Option<&Self::UniformLocation>, values: &[i32]);
    fn uniform_1_f32_slice(&self, location: Option<&Self::UniformLocation>, values: &[f32]);

    // geometry
    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    fn array_buffer_data(&self, data: &[u8]);
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);

    // framebuffers
    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String>;
    fn bind_framebuffer(&self, framebuffer: Option<Self::Framebuffer>);
    fn framebuffer_texture_2d(&self, texture: Option<Self::Texture>);
    fn framebuffer_complete(&self) -> bool;
    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer);

    // drawing and readback
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear_color_buffer(&self);
    fn draw_triangle_strip(&self, first: i32, count: i32);
    /// RGBA / UNSIGNED_BYTE from the bound target, rows bottom to top
    fn read_pixels_u8(&self, width: u32, height: u32, out: &mut [u8]);
    /// RGBA_INTEGER / UNSIGNED_INT from the bound target, rows bottom to top
    fn read_pixels_u32(&self, width: u32, height: u32, out: &mut [u32]);
}
