// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Option documents in TOML.
//!
//! Every option struct (`RasterContextOptions`, `NodeOptions`,
//! `TextureOptions`, `ShaderSourceOptions`) fills missing keys with its
//! defaults, so a pipeline description only lists what differs:
//!
//! ```toml
//! render_to_texture = true
//! width = 256
//! height = 256
//! ```

use crate::error::{RasterError, Result};
use serde::de::DeserializeOwned;

pub fn load_options<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).map_err(|e| RasterError::InvalidConfiguration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::RasterContextOptions,
        node::{NodeOptions, ShaderSourceOptions},
        texture::TextureOptions,
    };

    #[test]
    fn missing_keys_take_defaults() {
        let node: NodeOptions = load_options("render_to_texture = true\nwidth = 256\n").unwrap();
        assert!(node.render_to_texture);
        assert!(node.reuse_output_texture);
        assert_eq!(node.width, Some(256));
        assert_eq!(node.height, None);
        assert_eq!(node.clear_color, [0.0, 0.0, 0.0, 1.0]);

        let ctx: RasterContextOptions = load_options("").unwrap();
        assert_eq!((ctx.width, ctx.height), (512, 512));

        let tex: TextureOptions = load_options("bilinear = false").unwrap();
        assert!(tex.vertical_flip && !tex.bilinear);
    }

    #[test]
    fn shader_sources_from_toml() {
        let opts: ShaderSourceOptions =
            load_options("fragment = '''\nvoid main() {}\n'''\nthrow_on_error = false\n").unwrap();
        assert_eq!(opts.fragment.as_deref(), Some("void main() {}\n"));
        assert!(opts.vertex.is_none());
        assert!(!opts.throw_on_error);
    }

    #[test]
    fn malformed_document_is_configuration_error() {
        let r: Result<NodeOptions> = load_options("width = \"wide\"");
        assert!(matches!(r, Err(RasterError::InvalidConfiguration(_))));
    }
}
