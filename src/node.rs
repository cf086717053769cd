// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! # Processing Node
//!
//! A node is one fragment shader drawn over a full-screen quad, either onto
//! the canvas or into an output texture other nodes can sample.
//!
//! ```text
//!   set_shader_source ──► NoProgram ─► Invalid ─► Valid
//!                                                  │
//!   set_uniform_* / set_output_size ──► OutputStale ◄──┐
//!                                          │ render    │
//!                                          ▼           │
//!                                      OutputFresh ────┘
//! ```
//!
//! Render order, every call:
//! 1. no-op without a valid program
//! 2. resolve node-sourced samplers (pulls upstream nodes)
//! 3. activate the program, bind the quad (created once)
//! 4. (re)allocate the output texture when needed
//! 5. bind the target and viewport
//! 6. upload dirty uniforms, bind sampler textures
//! 7. clear (skipped for uint32 outputs) and draw 4 vertices
//!
//! Node state lives in the `RasterContext` arena; `Node` is a short-lived
//! handle borrowing the context.

use crate::{
    canvas::Canvas,
    context::{create_texture, scaled_size, RasterContext},
    error::{RasterError, Result},
    gl::{
        shader::{compile_shader, create_program},
        shader_source::{
            DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER, POSITION_ATTRIBUTE, QUAD_VERTICES,
        },
        Filter, GlBackend, ShaderKind, TexelFormat,
    },
    texture::{BitDepth, TextureId},
};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

pub mod readback;
pub mod uniform;

use uniform::{BindingValue, TextureInput, UniformBinding};

/// Stable handle of a node inside its `RasterContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOptions {
    pub render_to_texture: bool,
    /// keep one output texture across renders instead of a fresh one each time
    pub reuse_output_texture: bool,
    /// output size, the context size when absent
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// RGBA32UI output, only with `render_to_texture`
    pub uint32: bool,
    pub clear_color: [f32; 4],
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            render_to_texture: false,
            reuse_output_texture: true,
            width: None,
            height: None,
            uint32: false,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderSourceOptions {
    pub vertex: Option<String>,
    pub fragment: Option<String>,
    /// fail `set_shader_source` on the first diagnostic
    pub throw_on_error: bool,
}

impl Default for ShaderSourceOptions {
    fn default() -> Self {
        Self {
            vertex: None,
            fragment: None,
            throw_on_error: true,
        }
    }
}

impl ShaderSourceOptions {
    /// default vertex stage with the given fragment stage
    pub fn fragment(source: &str) -> Self {
        Self {
            fragment: Some(source.to_string()),
            ..Default::default()
        }
    }

    pub fn with_vertex(mut self, source: &str) -> Self {
        self.vertex = Some(source.to_string());
        self
    }

    /// record diagnostics instead of failing
    pub fn lenient(mut self) -> Self {
        self.throw_on_error = false;
        self
    }
}

enum ProgramState<G: GlBackend> {
    NoProgram,
    Invalid {
        vertex: Option<String>,
        fragment: Option<String>,
        link: Option<String>,
    },
    Valid {
        vertex: G::Shader,
        fragment: G::Shader,
        program: G::Program,
    },
}

struct Quad<G: GlBackend> {
    vertex_array: G::VertexArray,
    buffer: G::Buffer,
    // program the attribute pointer was set up for
    program: Option<G::Program>,
}

struct Offscreen<G: GlBackend> {
    framebuffer: G::Framebuffer,
    texture: Option<TextureId>,
}

pub struct ProcessingNode<G: GlBackend> {
    width: u32,
    height: u32,
    render_to_texture: bool,
    reuse_output_texture: bool,
    uint32: bool,
    clear_color: [f32; 4],
    output_stale: bool,
    program: ProgramState<G>,
    uniforms: BTreeMap<String, UniformBinding<G>>,
    quad: Option<Quad<G>>,
    offscreen: Option<Offscreen<G>>,
    rendering: bool,
    freed: bool,
}

impl<G: GlBackend> ProcessingNode<G> {
    pub(crate) fn new(options: &NodeOptions, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            render_to_texture: options.render_to_texture,
            reuse_output_texture: options.reuse_output_texture,
            uint32: options.uint32,
            clear_color: options.clear_color,
            output_stale: true,
            program: ProgramState::NoProgram,
            uniforms: BTreeMap::new(),
            quad: None,
            offscreen: None,
            rendering: false,
            freed: false,
        }
    }

    pub(crate) fn is_freed(&self) -> bool {
        self.freed
    }

    pub(crate) fn is_program_valid(&self) -> bool {
        matches!(self.program, ProgramState::Valid { .. })
    }

    fn program(&self) -> Option<G::Program> {
        match self.program {
            ProgramState::Valid { program, .. } => Some(program),
            _ => None,
        }
    }

    pub(crate) fn current_output(&self) -> Option<TextureId> {
        self.offscreen.as_ref().and_then(|o| o.texture)
    }

    // framebuffer this node draws into, None for the canvas
    fn framebuffer(&self) -> Option<G::Framebuffer> {
        if self.render_to_texture {
            self.offscreen.as_ref().map(|o| o.framebuffer)
        } else {
            None
        }
    }
}

/// Mutable view of one live node.
pub struct Node<'a, C: Canvas> {
    ctx: &'a mut RasterContext<C>,
    id: NodeId,
}

impl<'a, C: Canvas> Node<'a, C> {
    pub(crate) fn new(ctx: &'a mut RasterContext<C>, id: NodeId) -> Self {
        Self { ctx, id }
    }

    fn state(&self) -> &ProcessingNode<C::Gl> {
        &self.ctx.nodes[self.id.0]
    }

    fn state_mut(&mut self) -> &mut ProcessingNode<C::Gl> {
        &mut self.ctx.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.state().width
    }

    pub fn height(&self) -> u32 {
        self.state().height
    }

    pub fn is_render_to_texture(&self) -> bool {
        self.state().render_to_texture
    }

    pub fn is_uint32(&self) -> bool {
        self.state().uint32
    }

    pub fn does_output_need_update(&self) -> bool {
        self.state().output_stale
    }

    pub fn is_program_valid(&self) -> bool {
        self.state().is_program_valid()
    }

    pub fn vertex_shader_error(&self) -> Option<&str> {
        match &self.state().program {
            ProgramState::Invalid { vertex, .. } => vertex.as_deref(),
            _ => None,
        }
    }

    pub fn fragment_shader_error(&self) -> Option<&str> {
        match &self.state().program {
            ProgramState::Invalid { fragment, .. } => fragment.as_deref(),
            _ => None,
        }
    }

    pub fn program_error(&self) -> Option<&str> {
        match &self.state().program {
            ProgramState::Invalid { link, .. } => link.as_deref(),
            _ => None,
        }
    }

    /// Output texture as of the last render, without rendering.
    pub fn current_output(&self) -> Option<TextureId> {
        self.state().current_output()
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        let node = self.state_mut();
        node.clear_color = color;
        node.output_stale = true;
    }

    pub fn set_output_size(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidConfiguration(format!(
                "node output size {}x{}",
                width, height
            )));
        }
        let node = self.state_mut();
        node.width = width;
        node.height = height;
        node.output_stale = true;
        Ok(())
    }

    pub fn set_render_to_texture(&mut self, render_to_texture: bool) -> Result<()> {
        if !render_to_texture && self.state().uint32 {
            return Err(RasterError::InvalidConfiguration(
                "a node can only output uint32 when rendering to texture".to_string(),
            ));
        }
        let node = self.state_mut();
        node.render_to_texture = render_to_texture;
        node.output_stale = true;
        Ok(())
    }

    /// Compile and link a new program, dropping the previous one first.
    ///
    /// Omitted stages fall back to `DEFAULT_VERTEX_SHADER` /
    /// `DEFAULT_FRAGMENT_SHADER`. With `throw_on_error` the first diagnostic
    /// (vertex, then fragment, then link) is returned; otherwise the node is
    /// left without a valid program and the diagnostics can be queried.
    pub fn set_shader_source(&mut self, options: ShaderSourceOptions) -> Result<()> {
        self.reset_program();
        let id = self.id;
        let ctx = &mut *self.ctx;
        let gl = &ctx.gl;
        let vs_source = options.vertex.as_deref().unwrap_or(DEFAULT_VERTEX_SHADER);
        let fs_source = options.fragment.as_deref().unwrap_or(DEFAULT_FRAGMENT_SHADER);

        let vertex = compile_shader(gl, ShaderKind::Vertex, vs_source);
        let fragment = compile_shader(gl, ShaderKind::Fragment, fs_source);
        let program = match (vertex, fragment) {
            (Ok(vs), Ok(fs)) => match create_program(gl, vs, fs) {
                Ok(program) => ProgramState::Valid {
                    vertex: vs,
                    fragment: fs,
                    program,
                },
                Err(log) => {
                    gl.delete_shader(vs);
                    gl.delete_shader(fs);
                    ProgramState::Invalid {
                        vertex: None,
                        fragment: None,
                        link: Some(log),
                    }
                }
            },
            (vertex, fragment) => {
                for shader in [&vertex, &fragment].into_iter().flatten() {
                    gl.delete_shader(*shader);
                }
                ProgramState::Invalid {
                    vertex: vertex.err(),
                    fragment: fragment.err(),
                    link: None,
                }
            }
        };

        let node = &mut ctx.nodes[id.0];
        node.output_stale = true;
        node.program = program;
        match &node.program {
            ProgramState::Valid { program, .. } => {
                ctx.state.use_program(&ctx.gl, Some(*program));
                info!("{} program linked", id);
                Ok(())
            }
            ProgramState::Invalid {
                vertex,
                fragment,
                link,
            } => {
                warn!("{} program is not valid", id);
                if !options.throw_on_error {
                    return Ok(());
                }
                if let Some(log) = vertex {
                    return Err(RasterError::ShaderCompile {
                        stage: ShaderKind::Vertex,
                        log: log.clone(),
                    });
                }
                if let Some(log) = fragment {
                    return Err(RasterError::ShaderCompile {
                        stage: ShaderKind::Fragment,
                        log: log.clone(),
                    });
                }
                match link {
                    Some(log) => Err(RasterError::ShaderLink(log.clone())),
                    None => Ok(()),
                }
            }
            ProgramState::NoProgram => Ok(()),
        }
    }

    /// Delete program and shaders, clear diagnostics. Bindings keep their
    /// values and are uploaded again to the next program.
    pub fn reset_program(&mut self) {
        let ctx = &mut *self.ctx;
        let node = &mut ctx.nodes[self.id.0];
        if let ProgramState::Valid {
            vertex,
            fragment,
            program,
        } = node.program
        {
            if ctx.state.program == Some(program) {
                ctx.state.use_program(&ctx.gl, None);
            }
            ctx.gl.detach_shader(program, vertex);
            ctx.gl.detach_shader(program, fragment);
            ctx.gl.delete_shader(vertex);
            ctx.gl.delete_shader(fragment);
            ctx.gl.delete_program(program);
        }
        node.program = ProgramState::NoProgram;
        for binding in node.uniforms.values_mut() {
            binding.reset_location();
        }
        if let Some(quad) = node.quad.as_mut() {
            quad.program = None;
        }
    }

    /// Draw once. A no-op without a valid program.
    pub fn render(&mut self) -> Result<()> {
        self.ctx.render_node(self.id)
    }

    /// Texture holding this node's current output, rendering first when
    /// stale. A canvas-mode node has no output texture: its canvas pixels
    /// are read back into a new texture instead.
    pub fn output_texture(&mut self) -> Result<TextureId> {
        self.ctx.output_texture_of(self.id)
    }

    /// Release every GPU resource of the node and its usage records.
    pub fn free(self) {
        let id = self.id;
        let ctx = self.ctx;
        let node = &mut ctx.nodes[id.0];
        for (name, binding) in node.uniforms.iter() {
            if let Some(t) = binding.value.sampled_texture().and_then(|t| ctx.textures.get_mut(t.0)) {
                t.remove_usage_record(id, name, &mut ctx.units);
            }
        }
        node.uniforms.clear();
        if let Some(offscreen) = node.offscreen.take() {
            ctx.state.bind_target(&ctx.gl, Some(offscreen.framebuffer));
            ctx.gl.framebuffer_texture_2d(None);
            ctx.state.bind_target(&ctx.gl, None);
            ctx.gl.delete_framebuffer(offscreen.framebuffer);
            if let Some(t) = offscreen.texture.and_then(|t| ctx.textures.get_mut(t.0)) {
                t.free(&ctx.gl, &mut ctx.units);
            }
        }
        if let Some(quad) = node.quad.take() {
            ctx.gl.bind_vertex_array(None);
            ctx.gl.delete_buffer(quad.buffer);
            ctx.gl.delete_vertex_array(quad.vertex_array);
        }
        Node::new(&mut *ctx, id).reset_program();
        ctx.nodes[id.0].freed = true;
        debug!("{} freed", id);
    }
}

impl<C: Canvas> RasterContext<C> {
    pub(crate) fn render_node(&mut self, id: NodeId) -> Result<()> {
        let node = &mut self.nodes[id.0];
        if !node.is_program_valid() {
            return Ok(());
        }
        if node.rendering {
            return Err(RasterError::DependencyCycle(id));
        }
        node.rendering = true;
        let result = self.render_pass(id);
        self.nodes[id.0].rendering = false;
        result
    }

    fn render_pass(&mut self, id: NodeId) -> Result<()> {
        self.resolve_samplers(id)?;
        let Some(program) = self.nodes[id.0].program() else {
            return Ok(());
        };
        self.state.use_program(&self.gl, Some(program));
        self.bind_quad(id, program)?;
        self.ensure_offscreen(id)?;
        self.bind_output(id);

        let ctx = &mut *self;
        let node = &mut ctx.nodes[id.0];
        for (name, binding) in node.uniforms.iter_mut() {
            binding.upload(&ctx.gl, program, name, &mut ctx.textures, &mut ctx.units)?;
        }
        if !node.uint32 {
            let [r, g, b, a] = node.clear_color;
            ctx.gl.clear_color(r, g, b, a);
            ctx.gl.clear_color_buffer();
        }
        ctx.gl.draw_triangle_strip(0, 4);
        if !node.render_to_texture {
            ctx.canvas_owner = Some(id);
        }
        Ok(())
    }

    /// Pull node-sourced samplers up to date and move usage records when
    /// the upstream output texture changed.
    ///
    /// A canvas-mode upstream is sampled through a readback snapshot, taken
    /// again only when the upstream is stale. The replaced snapshot is freed
    /// once nothing samples it.
    fn resolve_samplers(&mut self, id: NodeId) -> Result<()> {
        let sources: Vec<(String, NodeId)> = self.nodes[id.0]
            .uniforms
            .iter()
            .filter_map(|(name, b)| match b.value {
                BindingValue::Sampler {
                    source: TextureInput::Node(n),
                    ..
                } => Some((name.clone(), n)),
                _ => None,
            })
            .collect();
        for (name, upstream) in sources {
            let snapshot = upstream != id
                && self
                    .nodes
                    .get(upstream.0)
                    .is_some_and(|n| !n.render_to_texture);
            let texture = if upstream == id {
                // previous output, never re-rendered from inside its own pass
                self.nodes[id.0].current_output()
            } else {
                let node = self
                    .nodes
                    .get(upstream.0)
                    .ok_or_else(|| RasterError::UnknownHandle(upstream.to_string()))?;
                if node.is_freed() {
                    return Err(RasterError::UseAfterFree(upstream.to_string()));
                }
                if !node.is_program_valid() {
                    continue;
                }
                if snapshot && !node.output_stale && self.has_live_sampler(id, &name) {
                    continue;
                }
                Some(self.output_texture_of(upstream)?)
            };
            let Some(texture) = texture else {
                continue;
            };
            let replaced = self.rebind_sampler(id, &name, texture);
            if snapshot {
                if let Some(t) = replaced.and_then(|t| self.textures.get_mut(t.0)) {
                    if t.usage_records().is_empty() {
                        t.free(&self.gl, &mut self.units);
                    }
                }
            }
        }
        Ok(())
    }

    fn has_live_sampler(&self, id: NodeId, name: &str) -> bool {
        self.nodes[id.0]
            .uniforms
            .get(name)
            .and_then(|b| b.value.sampled_texture())
            .and_then(|t| self.textures.get(t.0))
            .is_some_and(|t| !t.is_freed())
    }

    /// Point a sampler at `new`, returning the texture it sampled before.
    fn rebind_sampler(&mut self, id: NodeId, name: &str, new: TextureId) -> Option<TextureId> {
        let binding = self.nodes[id.0].uniforms.get_mut(name)?;
        let BindingValue::Sampler { texture, .. } = &mut binding.value else {
            return None;
        };
        if *texture == Some(new) {
            return None;
        }
        let old = texture.replace(new);
        binding.needs_upload = true;
        if let Some(t) = old.and_then(|t| self.textures.get_mut(t.0)) {
            t.remove_usage_record(id, name, &mut self.units);
        }
        if let Some(t) = self.textures.get_mut(new.0) {
            t.add_usage_record(id, name);
        }
        old
    }

    pub(crate) fn output_texture_of(&mut self, id: NodeId) -> Result<TextureId> {
        let node = self
            .nodes
            .get(id.0)
            .ok_or_else(|| RasterError::UnknownHandle(id.to_string()))?;
        if node.is_freed() {
            return Err(RasterError::UseAfterFree(id.to_string()));
        }
        if !node.render_to_texture {
            // the canvas is shared, it may hold another node's frame
            if node.output_stale || self.canvas_owner != Some(id) {
                self.render_node(id)?;
            }
            warn!("{} renders to the canvas, its output is read back into a new texture", id);
            return self.texture_from_canvas();
        }
        let live = node
            .current_output()
            .and_then(|t| self.textures.get(t.0))
            .map(|t| !t.is_freed())
            .unwrap_or(false);
        if node.output_stale || !live {
            self.render_node(id)?;
        }
        self.nodes[id.0].current_output().ok_or_else(|| {
            RasterError::InvalidConfiguration(format!("{} has no valid program to render", id))
        })
    }

    fn texture_from_canvas(&mut self) -> Result<TextureId> {
        let (width, height) = self.canvas.size();
        self.state.bind_target(&self.gl, None);
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        self.gl.read_pixels_u8(width, height, &mut pixels);
        create_texture(
            &self.gl,
            &mut self.textures,
            width,
            height,
            TexelFormat::Rgba8,
            Some(&pixels),
            Filter::Linear,
            BitDepth::Eight,
        )
    }

    fn bind_quad(&mut self, id: NodeId, program: <C::Gl as GlBackend>::Program) -> Result<()> {
        let gl = &self.gl;
        let node = &mut self.nodes[id.0];
        if node.quad.is_none() {
            let vertex_array = gl.create_vertex_array().map_err(RasterError::Gl)?;
            let buffer = gl.create_buffer().map_err(RasterError::Gl)?;
            gl.bind_vertex_array(Some(vertex_array));
            gl.bind_array_buffer(Some(buffer));
            gl.array_buffer_data(bytemuck::cast_slice(&QUAD_VERTICES));
            node.quad = Some(Quad {
                vertex_array,
                buffer,
                program: None,
            });
        }
        let Some(quad) = node.quad.as_mut() else {
            return Ok(());
        };
        gl.bind_vertex_array(Some(quad.vertex_array));
        if quad.program != Some(program) {
            gl.bind_array_buffer(Some(quad.buffer));
            if let Some(location) = gl.attrib_location(program, POSITION_ATTRIBUTE) {
                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_pointer_f32(location, 2, 0, 0);
            }
            quad.program = Some(program);
        }
        Ok(())
    }

    /// Allocate the output texture when rendering to texture and there is
    /// no usable one, or every render when outputs are not reused. A
    /// texture of the wrong size or freed elsewhere is not usable.
    fn ensure_offscreen(&mut self, id: NodeId) -> Result<()> {
        let node = &self.nodes[id.0];
        if !node.render_to_texture {
            return Ok(());
        }
        let (width, height) = (node.width, node.height);
        let usable = node
            .current_output()
            .and_then(|t| self.textures.get(t.0))
            .map(|t| !t.is_freed() && t.width() == width && t.height() == height)
            .unwrap_or(false);
        if usable && node.reuse_output_texture {
            return Ok(());
        }
        let (format, filter, depth) = if node.uint32 {
            (TexelFormat::Rgba32Ui, Filter::Nearest, BitDepth::ThirtyTwo)
        } else {
            (TexelFormat::Rgba8, Filter::Linear, BitDepth::Eight)
        };
        let existing = node.offscreen.as_ref().map(|o| o.framebuffer);

        let texture = create_texture(&self.gl, &mut self.textures, width, height, format, None, filter, depth)?;
        let framebuffer = match existing {
            Some(fb) => fb,
            None => self.gl.create_framebuffer().map_err(RasterError::Gl)?,
        };
        self.state.bind_target(&self.gl, Some(framebuffer));
        self.gl.framebuffer_texture_2d(Some(self.textures[texture.0].texture()?));
        if !self.gl.framebuffer_complete() {
            error!("{}: framebuffer is not complete", id);
        }
        let node = &mut self.nodes[id.0];
        node.offscreen = Some(Offscreen {
            framebuffer,
            texture: Some(texture),
        });
        node.output_stale = true;
        debug!("{} output is now {}", id, texture);
        Ok(())
    }

    fn bind_output(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        let framebuffer = node.framebuffer();
        let (width, height) = match framebuffer {
            Some(_) => (node.width, node.height),
            None => {
                let size = scaled_size(node.width, node.height, self.canvas.pixel_ratio());
                if self.canvas.size() != size {
                    self.canvas.set_size(size.0, size.1);
                }
                size
            }
        };
        if node.output_stale || !self.state.is_bound(framebuffer) {
            self.state.bind_target(&self.gl, framebuffer);
        }
        node.output_stale = false;
        self.state.viewport(&self.gl, width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::RasterContextOptions,
        gl::soft::{GlCall, SoftCanvas, SoftGl},
    };

    fn context(gl: &SoftGl) -> RasterContext<SoftCanvas> {
        RasterContext::new(
            SoftCanvas::new(gl),
            RasterContextOptions {
                width: 4,
                height: 4,
            },
        )
        .unwrap()
    }

    #[test]
    fn render_without_program_is_noop() {
        let gl = SoftGl::new(1, 1);
        let mut ctx = context(&gl);
        let id = ctx.create_node(NodeOptions::default()).unwrap();
        gl.clear_calls();
        ctx.node(id).unwrap().render().unwrap();
        assert_eq!(gl.count(&GlCall::Draw), 0);
    }

    #[test]
    fn default_sources_link_and_activate() {
        let gl = SoftGl::new(1, 1);
        let mut ctx = context(&gl);
        let id = ctx.create_node(NodeOptions::default()).unwrap();
        let mut node = ctx.node(id).unwrap();
        node.set_shader_source(ShaderSourceOptions::default()).unwrap();
        assert!(node.is_program_valid());
        assert!(gl
            .calls()
            .iter()
            .any(|c| matches!(c, GlCall::UseProgram(Some(_)))));
    }

    #[test]
    fn reset_keeps_no_gl_objects() {
        let gl = SoftGl::new(1, 1);
        let mut ctx = context(&gl);
        let id = ctx.create_node(NodeOptions::default()).unwrap();
        let mut node = ctx.node(id).unwrap();
        node.set_shader_source(ShaderSourceOptions::default()).unwrap();
        node.set_shader_source(ShaderSourceOptions::default()).unwrap();
        assert_eq!(gl.live_programs(), 1);
        assert_eq!(gl.live_shaders(), 2);
        node.reset_program();
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_shaders(), 0);
        assert!(!node.is_program_valid());
    }

    #[test]
    fn quad_is_created_once() {
        let gl = SoftGl::new(1, 1);
        let mut ctx = context(&gl);
        let id = ctx.create_node(NodeOptions::default()).unwrap();
        let mut node = ctx.node(id).unwrap();
        node.set_shader_source(ShaderSourceOptions::default()).unwrap();
        node.render().unwrap();
        node.render().unwrap();
        assert_eq!(gl.live_buffers(), 2);
    }

    #[test]
    fn output_size_and_mode_mark_stale() {
        let gl = SoftGl::new(1, 1);
        let mut ctx = context(&gl);
        let id = ctx
            .create_node(NodeOptions {
                render_to_texture: true,
                ..Default::default()
            })
            .unwrap();
        let mut node = ctx.node(id).unwrap();
        node.set_shader_source(ShaderSourceOptions::default()).unwrap();
        node.render().unwrap();
        assert!(!node.does_output_need_update());
        node.set_output_size(2, 2).unwrap();
        assert!(node.does_output_need_update());
        assert!(node.set_output_size(0, 2).is_err());
        node.render().unwrap();
        node.set_render_to_texture(false).unwrap();
        assert!(node.does_output_need_update());
    }

    #[test]
    fn resized_output_gets_new_texture() {
        let gl = SoftGl::new(1, 1);
        let mut ctx = context(&gl);
        let id = ctx
            .create_node(NodeOptions {
                render_to_texture: true,
                ..Default::default()
            })
            .unwrap();
        let mut node = ctx.node(id).unwrap();
        node.set_shader_source(ShaderSourceOptions::default()).unwrap();
        let first = node.output_texture().unwrap();
        node.set_output_size(2, 3).unwrap();
        let second = node.output_texture().unwrap();
        assert_ne!(first, second);
        let t = ctx.texture(second).unwrap();
        assert_eq!((t.width(), t.height()), (2, 3));
    }

    #[test]
    fn freed_node_is_unreachable() {
        let gl = SoftGl::new(1, 1);
        let mut ctx = context(&gl);
        let id = ctx
            .create_node(NodeOptions {
                render_to_texture: true,
                ..Default::default()
            })
            .unwrap();
        let mut node = ctx.node(id).unwrap();
        node.set_shader_source(ShaderSourceOptions::default()).unwrap();
        node.render().unwrap();
        node.free();
        assert!(matches!(ctx.node(id), Err(RasterError::UseAfterFree(_))));
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_framebuffers(), 0);
        assert_eq!(gl.live_textures(), 0);
        assert_eq!(gl.live_buffers(), 0);
        assert!(ctx.node_ids().is_empty());
    }
}
