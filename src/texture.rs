// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Textures living in a `RasterContext` arena.
//!
//! A texture owns one GPU handle and, while somebody samples it, one texture
//! unit. Sampling nodes register a usage record `(node, uniform)`; dropping
//! the last record gives the unit back to the pool but keeps the texels.
//! `free` is the only way the GPU handle goes away.

use crate::{
    error::{RasterError, Result},
    gl::{texture_unit::TextureUnitAllocator, GlBackend},
    node::NodeId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle of a texture inside its `RasterContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) usize);

impl TextureId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture #{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
    ThirtyTwo,
}

impl BitDepth {
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
            BitDepth::ThirtyTwo => 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureOptions {
    /// flip rows at upload so the first image row lands at the top (v = 1)
    pub vertical_flip: bool,
    /// LINEAR filtering, NEAREST otherwise
    pub bilinear: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            vertical_flip: true,
            bilinear: true,
        }
    }
}

/// A node sampling this texture through one of its uniforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub node: NodeId,
    pub uniform: String,
}

#[derive(Debug)]
enum Handle<T> {
    Live(T),
    Freed,
}

pub struct Texture<G: GlBackend> {
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    handle: Handle<G::Texture>,
    unit: Option<u32>,
    usage: Vec<UsageRecord>,
}

impl<G: GlBackend> Texture<G> {
    pub(crate) fn new(texture: G::Texture, width: u32, height: u32, bit_depth: BitDepth) -> Self {
        Self {
            width,
            height,
            bit_depth,
            handle: Handle::Live(texture),
            unit: None,
            usage: vec![],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    pub fn is_freed(&self) -> bool {
        matches!(self.handle, Handle::Freed)
    }

    /// GPU handle, `UseAfterFree` once freed.
    pub fn texture(&self) -> Result<G::Texture> {
        match self.handle {
            Handle::Live(t) => Ok(t),
            Handle::Freed => Err(RasterError::UseAfterFree("texture".to_string())),
        }
    }

    /// Unit held right now, without allocating.
    pub fn current_unit(&self) -> Option<u32> {
        self.unit
    }

    /// Unit of this texture, taken from the pool on first access.
    pub fn texture_unit(&mut self, units: &mut TextureUnitAllocator) -> Result<u32> {
        self.texture()?;
        match self.unit {
            Some(u) => Ok(u),
            None => {
                let u = units.acquire()?;
                self.unit = Some(u);
                Ok(u)
            }
        }
    }

    /// Give the unit back; the texels stay.
    pub fn rest(&mut self, units: &mut TextureUnitAllocator) {
        if let Some(u) = self.unit.take() {
            units.release(u);
        }
    }

    pub fn usage_records(&self) -> &[UsageRecord] {
        &self.usage
    }

    pub fn add_usage_record(&mut self, node: NodeId, uniform: &str) {
        if !self.usage.iter().any(|r| r.node == node && r.uniform == uniform) {
            self.usage.push(UsageRecord {
                node,
                uniform: uniform.to_string(),
            });
        }
    }

    /// Drop one record; the last one out rests the texture.
    pub fn remove_usage_record(
        &mut self,
        node: NodeId,
        uniform: &str,
        units: &mut TextureUnitAllocator,
    ) {
        self.usage.retain(|r| !(r.node == node && r.uniform == uniform));
        if self.usage.is_empty() {
            self.rest(units);
        }
    }

    pub(crate) fn free(&mut self, gl: &G, units: &mut TextureUnitAllocator) {
        let Handle::Live(texture) = self.handle else {
            return;
        };
        if let Some(u) = self.unit {
            gl.active_texture(u);
            gl.bind_texture(None);
        }
        gl.delete_texture(texture);
        self.rest(units);
        self.handle = Handle::Freed;
    }
}

/// Reverse row order of a tightly packed image in place.
pub(crate) fn flip_rows(data: &mut [u8], row_bytes: usize) {
    if row_bytes == 0 {
        return;
    }
    let rows = data.len() / row_bytes;
    for y in 0..rows / 2 {
        let (top, bottom) = data.split_at_mut((rows - 1 - y) * row_bytes);
        top[y * row_bytes..(y + 1) * row_bytes].swap_with_slice(&mut bottom[..row_bytes]);
    }
}
