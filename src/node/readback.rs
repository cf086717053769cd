// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Pixel readback of a node's render target.

use super::Node;
use crate::{
    canvas::Canvas,
    error::{RasterError, Result},
    gl::GlBackend,
    image_io::encode_png,
    texture::flip_rows,
};

/// Raw RGBA readback, rows bottom to top as GL returns them.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    U32(Vec<u32>),
    /// uint32 texels reinterpreted bit for bit
    F32(Vec<f32>),
}

impl PixelData {
    /// number of channel values
    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U32(v) => v.len(),
            PixelData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// RGBA bytes, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl<C: Canvas> Node<'_, C> {
    // output size when rendering to texture, canvas drawing buffer otherwise
    fn target_size(&self) -> (u32, u32) {
        let node = self.state();
        if node.render_to_texture {
            (node.width, node.height)
        } else {
            self.ctx.canvas.size()
        }
    }

    /// Read the node's target as it is now, without rendering.
    ///
    /// uint32 nodes read RGBA_INTEGER texels, as `F32` when `as_float`;
    /// 8 bit nodes always read bytes.
    pub fn pixel_data(&mut self, as_float: bool) -> Result<PixelData> {
        let (width, height) = self.target_size();
        let framebuffer = self.state().framebuffer();
        let ctx = &mut *self.ctx;
        if !ctx.state.is_bound(framebuffer) {
            ctx.state.bind_target(&ctx.gl, framebuffer);
        }
        let len = width as usize * height as usize * 4;
        if self.state().uint32 {
            let mut data = vec![0u32; len];
            self.ctx.gl.read_pixels_u32(width, height, &mut data);
            if as_float {
                Ok(PixelData::F32(bytemuck::cast_slice(&data[..]).to_vec()))
            } else {
                Ok(PixelData::U32(data))
            }
        } else {
            let mut data = vec![0u8; len];
            self.ctx.gl.read_pixels_u8(width, height, &mut data);
            Ok(PixelData::U8(data))
        }
    }

    /// `ImageData` of an 8 bit node; uint32 payloads are not colors.
    pub fn image_data(&mut self) -> Result<ImageData> {
        if self.state().uint32 {
            return Err(RasterError::UnsupportedFormat(format!(
                "{} outputs uint32 data, not an image",
                self.id
            )));
        }
        let (width, height) = self.target_size();
        let PixelData::U8(mut data) = self.pixel_data(false)? else {
            return Err(RasterError::UnsupportedFormat(self.id.to_string()));
        };
        flip_rows(&mut data, width as usize * 4);
        Ok(ImageData {
            width,
            height,
            data,
        })
    }

    pub fn rgba_image(&mut self) -> Result<image::RgbaImage> {
        let img = self.image_data()?;
        image::RgbaImage::from_raw(img.width, img.height, img.data)
            .ok_or_else(|| RasterError::EncodeFailed("pixel buffer size mismatch".to_string()))
    }

    /// PNG file bytes of the current output.
    pub fn png_bytes(&mut self) -> Result<Vec<u8>> {
        let img = self.image_data()?;
        encode_png(img.width, img.height, &img.data)
    }
}
