// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! RasterContext owns the canvas and its GPU context, and is the arena every
//! texture and processing node lives in. Textures and nodes are addressed by
//! `TextureId` / `NodeId`; nothing holds a pointer back to the context.
//!
//! GPU resources are only released through `free_texture`, `Node::free`
//! or the bulk `free`. Dropping the context does not touch the GPU.

use crate::{
    canvas::Canvas,
    error::{RasterError, Result},
    gl::{
        texture_unit::{TextureUnitAllocator, UPLOAD_UNIT},
        Filter, GlBackend, TexelFormat,
    },
    image_io::{decode_image, ImageFetcher},
    node::{Node, NodeId, NodeOptions, ProcessingNode},
    texture::{flip_rows, BitDepth, Texture, TextureId, TextureOptions},
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: u32 = 512;
pub const DEFAULT_HEIGHT: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterContextOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for RasterContextOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// What the GPU currently has bound, as far as this context knows.
pub(crate) struct GlState<G: GlBackend> {
    pub program: Option<G::Program>,
    // None: unknown
    pub target: Option<Option<G::Framebuffer>>,
    pub viewport: Option<[i32; 4]>,
}

impl<G: GlBackend> GlState<G> {
    fn new() -> Self {
        Self {
            program: None,
            target: None,
            viewport: None,
        }
    }

    pub fn use_program(&mut self, gl: &G, program: Option<G::Program>) {
        if self.program != program {
            gl.use_program(program);
            self.program = program;
        }
    }

    pub fn bind_target(&mut self, gl: &G, framebuffer: Option<G::Framebuffer>) {
        gl.bind_framebuffer(framebuffer);
        self.target = Some(framebuffer);
    }

    pub fn is_bound(&self, framebuffer: Option<G::Framebuffer>) -> bool {
        self.target == Some(framebuffer)
    }

    pub fn viewport(&mut self, gl: &G, width: u32, height: u32) {
        let vp = [0, 0, width as i32, height as i32];
        if self.viewport != Some(vp) {
            gl.viewport(vp[0], vp[1], vp[2], vp[3]);
            self.viewport = Some(vp);
        }
    }
}

pub struct RasterContext<C: Canvas> {
    pub(crate) canvas: C,
    pub(crate) gl: C::Gl,
    width: u32,
    height: u32,
    pub(crate) units: TextureUnitAllocator,
    pub(crate) textures: Vec<Texture<C::Gl>>,
    pub(crate) nodes: Vec<ProcessingNode<C::Gl>>,
    pub(crate) state: GlState<C::Gl>,
    // node whose frame the canvas holds
    pub(crate) canvas_owner: Option<NodeId>,
}

/// Allocate and fill a texture through the scratch unit, and register it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn create_texture<G: GlBackend>(
    gl: &G,
    textures: &mut Vec<Texture<G>>,
    width: u32,
    height: u32,
    format: TexelFormat,
    pixels: Option<&[u8]>,
    filter: Filter,
    bit_depth: BitDepth,
) -> Result<TextureId> {
    let texture = gl.create_texture().map_err(RasterError::Gl)?;
    gl.active_texture(UPLOAD_UNIT);
    gl.bind_texture(Some(texture));
    gl.set_unpack_alignment(format.unpack_alignment());
    gl.tex_image_2d(width, height, format, pixels);
    gl.set_texture_sampling(filter);
    gl.bind_texture(None);
    let id = TextureId(textures.len());
    textures.push(Texture::new(texture, width, height, bit_depth));
    debug!("{} allocated {}x{} {:?}", id, width, height, format);
    Ok(id)
}

impl<C: Canvas> RasterContext<C> {
    pub fn new(mut canvas: C, options: RasterContextOptions) -> Result<Self> {
        canvas.set_size(options.width, options.height);
        let gl = canvas.context()?;
        info!(
            "raster context {}x{} (offscreen: {})",
            options.width,
            options.height,
            canvas.is_offscreen()
        );
        Ok(Self {
            canvas,
            gl,
            width: options.width,
            height: options.height,
            units: TextureUnitAllocator::new(),
            textures: vec![],
            nodes: vec![],
            state: GlState::new(),
            canvas_owner: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_offscreen(&self) -> bool {
        self.canvas.is_offscreen()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn gl(&self) -> &C::Gl {
        &self.gl
    }

    pub fn texture_units(&self) -> &TextureUnitAllocator {
        &self.units
    }

    pub fn texture(&self, id: TextureId) -> Result<&Texture<C::Gl>> {
        self.textures
            .get(id.0)
            .ok_or_else(|| RasterError::UnknownHandle(id.to_string()))
    }

    /// every texture ever registered, freed ones included
    pub fn textures(&self) -> impl Iterator<Item = (TextureId, &Texture<C::Gl>)> {
        self.textures.iter().enumerate().map(|(i, t)| (TextureId(i), t))
    }

    /// ids of nodes that have not been freed
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.is_freed())
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// `fromData`: tightly packed RGB or RGBA bytes, first row on top.
    pub fn texture_from_data(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        options: TextureOptions,
    ) -> Result<TextureId> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidImage { width, height });
        }
        let pixels = width as usize * height as usize;
        let format = match data.len() {
            n if n == pixels * 3 => TexelFormat::Rgb8,
            n if n == pixels * 4 => TexelFormat::Rgba8,
            len => {
                return Err(RasterError::InvalidPixelLayout { len, width, height });
            }
        };
        self.upload(data, width, height, format, options)
    }

    /// `fromImageSource`
    pub fn texture_from_image(
        &mut self,
        image: &image::RgbaImage,
        options: TextureOptions,
    ) -> Result<TextureId> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidImage { width, height });
        }
        self.upload(image.as_raw(), width, height, TexelFormat::Rgba8, options)
    }

    /// `fromURL`: fetch, decode, upload.
    pub fn texture_from_url(
        &mut self,
        url: &str,
        fetcher: &dyn ImageFetcher,
        options: TextureOptions,
    ) -> Result<TextureId> {
        let bytes = fetcher.fetch(url)?;
        let image = decode_image(&bytes)?;
        self.texture_from_image(&image, options)
    }

    fn upload(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        format: TexelFormat,
        options: TextureOptions,
    ) -> Result<TextureId> {
        let filter = if options.bilinear {
            Filter::Linear
        } else {
            Filter::Nearest
        };
        if options.vertical_flip {
            let mut rows = data.to_vec();
            flip_rows(&mut rows, width as usize * format.bytes_per_pixel());
            create_texture(&self.gl, &mut self.textures, width, height, format, Some(&rows), filter, BitDepth::Eight)
        } else {
            create_texture(&self.gl, &mut self.textures, width, height, format, Some(data), filter, BitDepth::Eight)
        }
    }

    /// Idempotent; later access to the texture fails with `UseAfterFree`.
    pub fn free_texture(&mut self, id: TextureId) -> Result<()> {
        let texture = self
            .textures
            .get_mut(id.0)
            .ok_or_else(|| RasterError::UnknownHandle(id.to_string()))?;
        texture.free(&self.gl, &mut self.units);
        Ok(())
    }

    pub fn create_node(&mut self, options: NodeOptions) -> Result<NodeId> {
        if options.uint32 && !options.render_to_texture {
            return Err(RasterError::InvalidConfiguration(
                "a node can only output uint32 when rendering to texture".to_string(),
            ));
        }
        let width = options.width.unwrap_or(self.width);
        let height = options.height.unwrap_or(self.height);
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidConfiguration(format!(
                "node output size {}x{}",
                width, height
            )));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(ProcessingNode::new(&options, width, height));
        if !options.render_to_texture {
            let (w, h) = scaled_size(width, height, self.canvas.pixel_ratio());
            self.canvas.set_size(w, h);
        }
        debug!("{} created {}x{}", id, width, height);
        Ok(id)
    }

    /// Handle to a live node.
    pub fn node(&mut self, id: NodeId) -> Result<Node<'_, C>> {
        match self.nodes.get(id.0) {
            None => Err(RasterError::UnknownHandle(id.to_string())),
            Some(n) if n.is_freed() => Err(RasterError::UseAfterFree(id.to_string())),
            Some(_) => Ok(Node::new(self, id)),
        }
    }

    /// Release every GPU resource: nodes first, then textures.
    pub fn free(&mut self) {
        for id in self.node_ids() {
            if let Ok(node) = self.node(id) {
                node.free();
            }
        }
        for texture in self.textures.iter_mut() {
            texture.free(&self.gl, &mut self.units);
        }
        self.state.use_program(&self.gl, None);
        info!("raster context freed");
    }
}

/// drawing buffer size for a logical size
pub(crate) fn scaled_size(width: u32, height: u32, pixel_ratio: f64) -> (u32, u32) {
    (
        (width as f64 * pixel_ratio).round() as u32,
        (height as f64 * pixel_ratio).round() as u32,
    )
}
