// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Error taxonomy shared by every raster_gl operation.
//!
//! Build-time failures (shader compile/link, context creation, malformed
//! input) surface here. Uniform type mismatches never do: they are logged
//! and skipped, see `node::uniform`.

use crate::{gl::ShaderKind, node::NodeId};

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    /// every texture unit of the pool is held by a live texture
    #[error("all {slots} texture units are in use")]
    ResourceExhausted { slots: usize },

    #[error("invalid image: {width}x{height}")]
    InvalidImage { width: u32, height: u32 },

    #[error("{len} bytes cannot be laid out as {width}x{height} RGB or RGBA pixels")]
    InvalidPixelLayout { len: usize, width: u32, height: u32 },

    #[error("fetching {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("image decode failed: {0}")]
    DecodeFailed(String),

    #[error("{stage} shader compile error: {log}")]
    ShaderCompile { stage: ShaderKind, log: String },

    #[error("program link error: {0}")]
    ShaderLink(String),

    /// operating on a texture or node after `free()`
    #[error("{0} used after free")]
    UseAfterFree(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("gpu context unavailable: {0}")]
    GpuUnavailable(String),

    #[error("gl object creation failed: {0}")]
    Gl(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown handle: {0}")]
    UnknownHandle(String),

    #[error("dependency cycle through {0}")]
    DependencyCycle(NodeId),

    #[error("png encode failed: {0}")]
    EncodeFailed(String),

    #[error("log init failed: {0}")]
    LogInit(String),
}
