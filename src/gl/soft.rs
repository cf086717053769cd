// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! # Software GL
//!
//! A CPU implementation of [`GlBackend`] for tests and headless hosts.
//!
//! It keeps real object lifecycles (textures, shaders, programs, buffers,
//! framebuffers), texture units, viewport and clear state, and a default
//! framebuffer standing in for the canvas. GLSL is not executed: a fragment
//! source can be paired with a CPU kernel through
//! [`SoftGl::register_fragment`], and every draw then runs that kernel once
//! per covered pixel. Programs without a kernel draw nothing.
//!
//! Diagnostics follow two GLSL rules that need no compiler:
//! - a `#error` directive fails compilation with its message
//! - a fragment `in` with no matching vertex `out` fails linking
//!
//! Every state-changing call is appended to a log ([`GlCall`]) so tests can
//! count uniform uploads, binds and draws.

use super::{Filter, GlBackend, ShaderKind, TexelFormat};
use crate::{canvas::Canvas, error::RasterError, error::Result};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

/// CPU stand-in for a fragment shader.
pub type FragmentKernel = Rc<dyn Fn(&Fragment<'_>) -> [f32; 4]>;

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateTexture(u32),
    DeleteTexture(u32),
    BindTexture { unit: u32, texture: Option<u32> },
    TexImage { width: u32, height: u32, format: TexelFormat },
    UseProgram(Option<u32>),
    /// uniform upload, by uniform name
    Uniform(String),
    BindFramebuffer(Option<u32>),
    Viewport(i32, i32, i32, i32),
    Clear,
    Draw,
    ReadPixels { width: u32, height: u32 },
}

#[derive(Debug, Clone)]
struct SoftTexture {
    width: u32,
    height: u32,
    integer: bool,
    // rows bottom to top, RGBA; 0..=255 for byte formats, raw bits otherwise
    texels: Vec<[u32; 4]>,
}

impl SoftTexture {
    fn blank(width: u32, height: u32, integer: bool) -> Self {
        Self {
            width,
            height,
            integer,
            texels: vec![[0; 4]; (width * height) as usize],
        }
    }

    fn texel(&self, x: u32, y: u32) -> [u32; 4] {
        if x < self.width && y < self.height {
            self.texels[(y * self.width + x) as usize]
        } else {
            [0; 4]
        }
    }

    fn encode(&self, color: [f32; 4]) -> [u32; 4] {
        if self.integer {
            color.map(f32::to_bits)
        } else {
            color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u32)
        }
    }
}

struct SoftShader {
    kind: ShaderKind,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Clone)]
enum UniformData {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

#[derive(Default)]
struct SoftProgram {
    shaders: Vec<u32>,
    linked: bool,
    log: String,
    // location == index
    uniforms: Vec<String>,
    attributes: Vec<String>,
    values: HashMap<u32, UniformData>,
    kernel: Option<FragmentKernel>,
}

impl SoftProgram {
    fn value(&self, name: &str) -> Option<&UniformData> {
        let loc = self.uniforms.iter().position(|n| n == name)?;
        self.values.get(&(loc as u32))
    }
}

struct SoftState {
    next_id: u32,
    textures: HashMap<u32, SoftTexture>,
    shaders: HashMap<u32, SoftShader>,
    programs: HashMap<u32, SoftProgram>,
    framebuffers: HashMap<u32, Option<u32>>,
    buffers: HashMap<u32, Vec<u8>>,
    vertex_arrays: HashSet<u32>,
    active_unit: u32,
    unit_textures: HashMap<u32, u32>,
    unpack_alignment: i32,
    program: Option<u32>,
    framebuffer: Option<u32>,
    array_buffer: Option<u32>,
    viewport: [i32; 4],
    clear_color: [f32; 4],
    canvas: SoftTexture,
    kernels: HashMap<String, FragmentKernel>,
    calls: Vec<GlCall>,
}

impl SoftState {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn target(&self) -> Option<&SoftTexture> {
        match self.framebuffer {
            None => Some(&self.canvas),
            Some(fb) => {
                let tex = (*self.framebuffers.get(&fb)?)?;
                self.textures.get(&tex)
            }
        }
    }

    fn target_mut(&mut self) -> Option<&mut SoftTexture> {
        match self.framebuffer {
            None => Some(&mut self.canvas),
            Some(fb) => {
                let tex = (*self.framebuffers.get(&fb)?)?;
                self.textures.get_mut(&tex)
            }
        }
    }

    fn bound_texture(&self) -> Option<u32> {
        self.unit_textures.get(&self.active_unit).copied()
    }

    fn set_uniform(&mut self, location: Option<&u32>, data: UniformData) {
        let (Some(&loc), Some(program)) = (location, self.program) else {
            return;
        };
        let Some(p) = self.programs.get_mut(&program) else {
            return;
        };
        let name = p.uniforms.get(loc as usize).cloned().unwrap_or_default();
        p.values.insert(loc, data);
        self.calls.push(GlCall::Uniform(name));
    }
}

/// Per-pixel view handed to a [`FragmentKernel`].
pub struct Fragment<'a> {
    uv: [f32; 2],
    state: &'a SoftState,
    program: &'a SoftProgram,
}

impl Fragment<'_> {
    /// interpolated `uv` of the default vertex shader, (0,0) bottom left
    pub fn uv(&self) -> [f32; 2] {
        self.uv
    }

    /// all components of a uniform as floats, empty when unset
    pub fn floats(&self, name: &str) -> Vec<f32> {
        match self.program.value(name) {
            Some(UniformData::Float(v)) => v.clone(),
            Some(UniformData::Int(v)) => v.iter().map(|i| *i as f32).collect(),
            None => vec![],
        }
    }

    pub fn float(&self, name: &str) -> f32 {
        self.floats(name).first().copied().unwrap_or(0.0)
    }

    pub fn int(&self, name: &str) -> i32 {
        match self.program.value(name) {
            Some(UniformData::Int(v)) => v.first().copied().unwrap_or(0),
            Some(UniformData::Float(v)) => v.first().map(|f| *f as i32).unwrap_or(0),
            None => 0,
        }
    }

    pub fn boolean(&self, name: &str) -> bool {
        self.int(name) != 0
    }

    /// nearest-texel lookup through the unit stored in sampler `name`;
    /// byte textures come back normalized, integer textures as plain values
    pub fn texture(&self, name: &str, uv: [f32; 2]) -> [f32; 4] {
        let unit = self.int(name) as u32;
        let Some(tex) = self
            .state
            .unit_textures
            .get(&unit)
            .and_then(|t| self.state.textures.get(t))
        else {
            return [0.0; 4];
        };
        let x = ((uv[0] * tex.width as f32) as u32).min(tex.width.saturating_sub(1));
        let y = ((uv[1] * tex.height as f32) as u32).min(tex.height.saturating_sub(1));
        let texel = tex.texel(x, y);
        if tex.integer {
            texel.map(|c| c as f32)
        } else {
            texel.map(|c| c as f32 / 255.0)
        }
    }
}

/// Shared handle to one emulated context. Clones see the same state.
#[derive(Clone)]
pub struct SoftGl {
    state: Rc<RefCell<SoftState>>,
}

impl SoftGl {
    pub fn new(width: u32, height: u32) -> Self {
        let state = SoftState {
            next_id: 0,
            textures: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            framebuffers: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashSet::new(),
            active_unit: 0,
            unit_textures: HashMap::new(),
            unpack_alignment: 4,
            program: None,
            framebuffer: None,
            array_buffer: None,
            viewport: [0, 0, width as i32, height as i32],
            clear_color: [0.0; 4],
            canvas: SoftTexture::blank(width, height, false),
            kernels: HashMap::new(),
            calls: vec![],
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Run `kernel` for every pixel drawn by programs whose fragment stage
    /// was compiled from `fragment_source`. Takes effect at link time.
    pub fn register_fragment<F>(&self, fragment_source: &str, kernel: F)
    where
        F: Fn(&Fragment<'_>) -> [f32; 4] + 'static,
    {
        self.state
            .borrow_mut()
            .kernels
            .insert(fragment_source.trim().to_string(), Rc::new(kernel));
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// names of uniforms uploaded since the last `clear_calls`
    pub fn uniform_uploads(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                GlCall::Uniform(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &GlCall) -> usize {
        self.state.borrow().calls.iter().filter(|c| *c == call).count()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    pub fn live_buffers(&self) -> usize {
        let st = self.state.borrow();
        st.buffers.len() + st.vertex_arrays.len()
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        let st = self.state.borrow();
        (st.canvas.width, st.canvas.height)
    }

    /// Resize the default framebuffer; like a canvas, its contents reset.
    pub fn resize_canvas(&self, width: u32, height: u32) {
        let mut st = self.state.borrow_mut();
        if (st.canvas.width, st.canvas.height) != (width, height) {
            st.canvas = SoftTexture::blank(width, height, false);
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut SoftState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }
}

fn uniform_names(source: &str) -> impl Iterator<Item = String> + '_ {
    source.lines().filter_map(|line| {
        let decl = line.trim().strip_prefix("uniform ")?;
        let last = decl.trim_end_matches(';').split_whitespace().last()?;
        Some(last.split('[').next().unwrap_or(last).to_string())
    })
}

// (type, name) of `in`/`out` declarations
fn interface(source: &str, keyword: &str) -> Vec<(String, String)> {
    source
        .lines()
        .filter_map(|line| {
            let mut line = line.trim();
            if line.starts_with("layout") {
                line = line.split_once(')').map(|(_, rest)| rest.trim()).unwrap_or(line);
            }
            let line = line
                .strip_prefix("flat ")
                .or_else(|| line.strip_prefix("smooth "))
                .unwrap_or(line);
            let decl = line.strip_prefix(keyword)?.strip_prefix(' ')?;
            let mut parts = decl.trim_end_matches(';').split_whitespace();
            let ty = parts.next()?.to_string();
            let name = parts.next()?.to_string();
            Some((ty, name))
        })
        .collect()
}

fn compile_log(source: &str) -> Option<String> {
    source.lines().enumerate().find_map(|(i, line)| {
        let msg = line.trim_start().strip_prefix("#error")?;
        Some(format!("ERROR: 0:{}: '#error' : {}", i + 1, msg.trim()))
    })
}

fn unpack(format: TexelFormat, width: u32, height: u32, alignment: i32, data: &[u8]) -> Vec<[u32; 4]> {
    let bpp = format.bytes_per_pixel();
    let align = alignment.max(1) as usize;
    let row = width as usize * bpp;
    let stride = row.div_ceil(align) * align;
    let mut texels = Vec::with_capacity((width * height) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let at = y * stride + x * bpp;
            let px = data.get(at..at + bpp).unwrap_or(&[]);
            let texel = match (format, px.len() == bpp) {
                (_, false) => [0; 4],
                (TexelFormat::Rgb8, true) => [px[0] as u32, px[1] as u32, px[2] as u32, 255],
                (TexelFormat::Rgba8, true) => [px[0] as u32, px[1] as u32, px[2] as u32, px[3] as u32],
                (TexelFormat::Rgba32Ui, true) => {
                    let c = |i: usize| u32::from_ne_bytes([px[i], px[i + 1], px[i + 2], px[i + 3]]);
                    [c(0), c(4), c(8), c(12)]
                }
            };
            texels.push(texel);
        }
    }
    texels
}

impl GlBackend for SoftGl {
    type Texture = u32;
    type Framebuffer = u32;
    type Program = u32;
    type Shader = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type UniformLocation = u32;

    fn create_texture(&self) -> std::result::Result<u32, String> {
        self.with(|st| {
            let id = st.next();
            st.textures.insert(id, SoftTexture::blank(0, 0, false));
            st.calls.push(GlCall::CreateTexture(id));
            Ok(id)
        })
    }

    fn delete_texture(&self, texture: u32) {
        self.with(|st| {
            st.textures.remove(&texture);
            st.unit_textures.retain(|_, t| *t != texture);
            for attachment in st.framebuffers.values_mut() {
                if *attachment == Some(texture) {
                    *attachment = None;
                }
            }
            st.calls.push(GlCall::DeleteTexture(texture));
        })
    }

    fn active_texture(&self, unit: u32) {
        self.with(|st| st.active_unit = unit)
    }

    fn bind_texture(&self, texture: Option<u32>) {
        self.with(|st| {
            let unit = st.active_unit;
            match texture {
                Some(t) => st.unit_textures.insert(unit, t),
                None => st.unit_textures.remove(&unit),
            };
            st.calls.push(GlCall::BindTexture { unit, texture });
        })
    }

    fn set_unpack_alignment(&self, alignment: i32) {
        self.with(|st| st.unpack_alignment = alignment)
    }

    fn tex_image_2d(&self, width: u32, height: u32, format: TexelFormat, pixels: Option<&[u8]>) {
        self.with(|st| {
            st.calls.push(GlCall::TexImage { width, height, format });
            let Some(id) = st.bound_texture() else {
                return;
            };
            let mut tex = SoftTexture::blank(width, height, format == TexelFormat::Rgba32Ui);
            if let Some(data) = pixels {
                tex.texels = unpack(format, width, height, st.unpack_alignment, data);
            }
            st.textures.insert(id, tex);
        })
    }

    fn set_texture_sampling(&self, _filter: Filter) {}

    fn create_shader(&self, kind: ShaderKind) -> std::result::Result<u32, String> {
        self.with(|st| {
            let id = st.next();
            st.shaders.insert(
                id,
                SoftShader {
                    kind,
                    source: String::new(),
                    compiled: false,
                    log: String::new(),
                },
            );
            Ok(id)
        })
    }

    fn shader_source(&self, shader: u32, source: &str) {
        self.with(|st| {
            if let Some(s) = st.shaders.get_mut(&shader) {
                s.source = source.to_string();
            }
        })
    }

    fn compile_shader(&self, shader: u32) {
        self.with(|st| {
            if let Some(s) = st.shaders.get_mut(&shader) {
                match compile_log(&s.source) {
                    Some(log) => {
                        s.compiled = false;
                        s.log = log;
                    }
                    None => {
                        s.compiled = true;
                        s.log.clear();
                    }
                }
            }
        })
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.with(|st| st.shaders.get(&shader).map(|s| s.compiled).unwrap_or(false))
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.with(|st| st.shaders.get(&shader).map(|s| s.log.clone()).unwrap_or_default())
    }

    fn delete_shader(&self, shader: u32) {
        self.with(|st| {
            st.shaders.remove(&shader);
        })
    }

    fn create_program(&self) -> std::result::Result<u32, String> {
        self.with(|st| {
            let id = st.next();
            st.programs.insert(id, SoftProgram::default());
            Ok(id)
        })
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.with(|st| {
            if let Some(p) = st.programs.get_mut(&program) {
                p.shaders.push(shader);
            }
        })
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        self.with(|st| {
            if let Some(p) = st.programs.get_mut(&program) {
                p.shaders.retain(|s| *s != shader);
            }
        })
    }

    fn link_program(&self, program: u32) {
        self.with(|st| {
            let Some(p) = st.programs.get(&program) else {
                return;
            };
            let stage = |kind| {
                p.shaders
                    .iter()
                    .filter_map(|s| st.shaders.get(s))
                    .find(|s| s.kind == kind && s.compiled)
            };
            let result = match (stage(ShaderKind::Vertex), stage(ShaderKind::Fragment)) {
                (Some(vs), Some(fs)) => {
                    let outs = interface(&vs.source, "out");
                    match interface(&fs.source, "in").into_iter().find(|v| !outs.contains(v)) {
                        Some((_, name)) => Err(format!(
                            "ERROR: Varying `{}` consumed by fragment shader but not written by vertex shader",
                            name
                        )),
                        None => {
                            let mut uniforms: Vec<String> = vec![];
                            for name in uniform_names(&vs.source).chain(uniform_names(&fs.source)) {
                                if !uniforms.contains(&name) {
                                    uniforms.push(name);
                                }
                            }
                            let attributes =
                                interface(&vs.source, "in").into_iter().map(|(_, n)| n).collect();
                            let kernel = st.kernels.get(fs.source.trim()).cloned();
                            Ok((uniforms, attributes, kernel))
                        }
                    }
                }
                _ => Err("ERROR: program needs a compiled vertex and fragment shader".to_string()),
            };
            if let Some(p) = st.programs.get_mut(&program) {
                match result {
                    Ok((uniforms, attributes, kernel)) => {
                        p.linked = true;
                        p.log.clear();
                        p.uniforms = uniforms;
                        p.attributes = attributes;
                        p.values.clear();
                        p.kernel = kernel;
                    }
                    Err(log) => {
                        p.linked = false;
                        p.log = log;
                    }
                }
            }
        })
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.with(|st| st.programs.get(&program).map(|p| p.linked).unwrap_or(false))
    }

    fn program_info_log(&self, program: u32) -> String {
        self.with(|st| st.programs.get(&program).map(|p| p.log.clone()).unwrap_or_default())
    }

    fn delete_program(&self, program: u32) {
        self.with(|st| {
            st.programs.remove(&program);
            if st.program == Some(program) {
                st.program = None;
            }
        })
    }

    fn use_program(&self, program: Option<u32>) {
        self.with(|st| {
            st.program = program;
            st.calls.push(GlCall::UseProgram(program));
        })
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        self.with(|st| {
            let p = st.programs.get(&program).filter(|p| p.linked)?;
            p.uniforms.iter().position(|n| n == name).map(|i| i as u32)
        })
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        self.with(|st| {
            let p = st.programs.get(&program).filter(|p| p.linked)?;
            p.attributes.iter().position(|n| n == name).map(|i| i as u32)
        })
    }

    fn uniform_1_i32(&self, location: Option<&u32>, x: i32) {
        self.with(|st| st.set_uniform(location, UniformData::Int(vec![x])))
    }

    fn uniform_2_i32(&self, location: Option<&u32>, x: i32, y: i32) {
        self.with(|st| st.set_uniform(location, UniformData::Int(vec![x, y])))
    }

    fn uniform_3_i32(&self, location: Option<&u32>, x: i32, y: i32, z: i32) {
        self.with(|st| st.set_uniform(location, UniformData::Int(vec![x, y, z])))
    }

    fn uniform_4_i32(&self, location: Option<&u32>, x: i32, y: i32, z: i32, w: i32) {
        self.with(|st| st.set_uniform(location, UniformData::Int(vec![x, y, z, w])))
    }

    fn uniform_1_f32(&self, location: Option<&u32>, x: f32) {
        self.with(|st| st.set_uniform(location, UniformData::Float(vec![x])))
    }

    fn uniform_2_f32(&self, location: Option<&u32>, x: f32, y: f32) {
        self.with(|st| st.set_uniform(location, UniformData::Float(vec![x, y])))
    }

    fn uniform_3_f32(&self, location: Option<&u32>, x: f32, y: f32, z: f32) {
        self.with(|st| st.set_uniform(location, UniformData::Float(vec![x, y, z])))
    }

    fn uniform_4_f32(&self, location: Option<&u32>, x: f32, y: f32, z: f32, w: f32) {
        self.with(|st| st.set_uniform(location, UniformData::Float(vec![x, y, z, w])))
    }

    fn uniform_1_i32_slice(&self, location: Option<&u32>, values: &[i32]) {
        self.with(|st| st.set_uniform(location, UniformData::Int(values.to_vec())))
    }

    fn uniform_1_f32_slice(&self, location: Option<&u32>, values: &[f32]) {
        self.with(|st| st.set_uniform(location, UniformData::Float(values.to_vec())))
    }

    fn create_vertex_array(&self) -> std::result::Result<u32, String> {
        self.with(|st| {
            let id = st.next();
            st.vertex_arrays.insert(id);
            Ok(id)
        })
    }

    fn bind_vertex_array(&self, _vertex_array: Option<u32>) {}

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.with(|st| {
            st.vertex_arrays.remove(&vertex_array);
        })
    }

    fn create_buffer(&self) -> std::result::Result<u32, String> {
        self.with(|st| {
            let id = st.next();
            st.buffers.insert(id, vec![]);
            Ok(id)
        })
    }

    fn bind_array_buffer(&self, buffer: Option<u32>) {
        self.with(|st| st.array_buffer = buffer)
    }

    fn array_buffer_data(&self, data: &[u8]) {
        self.with(|st| {
            if let Some(b) = st.array_buffer.and_then(|b| st.buffers.get_mut(&b)) {
                *b = data.to_vec();
            }
        })
    }

    fn delete_buffer(&self, buffer: u32) {
        self.with(|st| {
            st.buffers.remove(&buffer);
            if st.array_buffer == Some(buffer) {
                st.array_buffer = None;
            }
        })
    }

    fn enable_vertex_attrib_array(&self, _index: u32) {}

    fn vertex_attrib_pointer_f32(&self, _index: u32, _size: i32, _stride: i32, _offset: i32) {}

    fn create_framebuffer(&self) -> std::result::Result<u32, String> {
        self.with(|st| {
            let id = st.next();
            st.framebuffers.insert(id, None);
            Ok(id)
        })
    }

    fn bind_framebuffer(&self, framebuffer: Option<u32>) {
        self.with(|st| {
            st.framebuffer = framebuffer;
            st.calls.push(GlCall::BindFramebuffer(framebuffer));
        })
    }

    fn framebuffer_texture_2d(&self, texture: Option<u32>) {
        self.with(|st| {
            if let Some(slot) = st.framebuffer.and_then(|fb| st.framebuffers.get_mut(&fb)) {
                *slot = texture;
            }
        })
    }

    fn framebuffer_complete(&self) -> bool {
        self.with(|st| {
            st.framebuffer.is_some()
                && st.target().map(|t| t.width > 0 && t.height > 0).unwrap_or(false)
        })
    }

    fn delete_framebuffer(&self, framebuffer: u32) {
        self.with(|st| {
            st.framebuffers.remove(&framebuffer);
            if st.framebuffer == Some(framebuffer) {
                st.framebuffer = None;
            }
        })
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.with(|st| {
            st.viewport = [x, y, width, height];
            st.calls.push(GlCall::Viewport(x, y, width, height));
        })
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.with(|st| st.clear_color = [r, g, b, a])
    }

    fn clear_color_buffer(&self) {
        self.with(|st| {
            st.calls.push(GlCall::Clear);
            let color = st.clear_color;
            if let Some(target) = st.target_mut() {
                let texel = target.encode(color);
                target.texels.fill(texel);
            }
        })
    }

    fn draw_triangle_strip(&self, _first: i32, _count: i32) {
        self.with(|st| {
            st.calls.push(GlCall::Draw);
            let Some(program) = st.program.and_then(|p| st.programs.get(&p)) else {
                return;
            };
            let Some(kernel) = program.kernel.clone() else {
                return;
            };
            let Some(target) = st.target() else {
                return;
            };
            let [x0, y0, vw, vh] = st.viewport;
            let (tw, th) = (target.width as i32, target.height as i32);
            let mut shaded = vec![];
            for py in 0..vh {
                for px in 0..vw {
                    let (x, y) = (x0 + px, y0 + py);
                    if x < 0 || y < 0 || x >= tw || y >= th {
                        continue;
                    }
                    let frag = Fragment {
                        uv: [(px as f32 + 0.5) / vw as f32, (py as f32 + 0.5) / vh as f32],
                        state: st,
                        program,
                    };
                    shaded.push(((y * tw + x) as usize, kernel(&frag)));
                }
            }
            if let Some(target) = st.target_mut() {
                for (i, color) in shaded {
                    target.texels[i] = target.encode(color);
                }
            }
        })
    }

    fn read_pixels_u8(&self, width: u32, height: u32, out: &mut [u8]) {
        self.with(|st| {
            st.calls.push(GlCall::ReadPixels { width, height });
            let Some(target) = st.target() else {
                return;
            };
            for y in 0..height {
                for x in 0..width {
                    let i = ((y * width + x) * 4) as usize;
                    let texel = target.texel(x, y);
                    for c in 0..4 {
                        if let Some(o) = out.get_mut(i + c) {
                            *o = texel[c].min(255) as u8;
                        }
                    }
                }
            }
        })
    }

    fn read_pixels_u32(&self, width: u32, height: u32, out: &mut [u32]) {
        self.with(|st| {
            st.calls.push(GlCall::ReadPixels { width, height });
            let Some(target) = st.target() else {
                return;
            };
            for y in 0..height {
                for x in 0..width {
                    let i = ((y * width + x) * 4) as usize;
                    let texel = target.texel(x, y);
                    for c in 0..4 {
                        if let Some(o) = out.get_mut(i + c) {
                            *o = texel[c];
                        }
                    }
                }
            }
        })
    }
}

/// Canvas over a [`SoftGl`]; the default framebuffer follows `set_size`.
pub struct SoftCanvas {
    gl: Option<SoftGl>,
    offscreen: bool,
    pixel_ratio: f64,
}

impl SoftCanvas {
    pub fn new(gl: &SoftGl) -> Self {
        Self {
            gl: Some(gl.clone()),
            offscreen: false,
            pixel_ratio: 1.0,
        }
    }

    /// a canvas whose context request always fails
    pub fn without_gpu() -> Self {
        Self {
            gl: None,
            offscreen: false,
            pixel_ratio: 1.0,
        }
    }

    pub fn offscreen(mut self, offscreen: bool) -> Self {
        self.offscreen = offscreen;
        self
    }

    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }
}

impl Canvas for SoftCanvas {
    type Gl = SoftGl;

    fn context(&mut self) -> Result<SoftGl> {
        self.gl
            .clone()
            .ok_or_else(|| RasterError::GpuUnavailable("no soft gl attached".to_string()))
    }

    fn size(&self) -> (u32, u32) {
        self.gl.as_ref().map(|g| g.canvas_size()).unwrap_or((0, 0))
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if let Some(gl) = &self.gl {
            gl.resize_canvas(width, height);
        }
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn is_offscreen(&self) -> bool {
        self.offscreen
    }
}
