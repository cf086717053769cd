// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! GLSL snippets for elevation tiles in the Terrarium encoding, where
//! `elevation = r * 256 + g + b / 256 - 32768` with 8 bit channels.

/// `float terrariumToElevation(vec4 color)`
pub const TERRARIUM_TO_ELEVATION: &str = "float terrariumToElevation(vec4 color) {
  return (color.r * 255.0 * 256.0 + color.g * 255.0 + color.b * 255.0 / 256.0) - 32768.0;
}";

/// `vec4 elevationToTerrarium(float elevation)`
pub const ELEVATION_TO_TERRARIUM: &str = "vec4 elevationToTerrarium(float elevation) {
  float e = elevation + 32768.0;
  float r = floor(e / 256.0);
  float g = floor(e - r * 256.0);
  float b = (e - r * 256.0 - g) * 256.0;
  return vec4(r / 255.0, g / 255.0, b / 255.0, 1.0);
}";

/// CPU twin of `terrariumToElevation`.
pub fn terrarium_to_elevation(rgb: [u8; 3]) -> f32 {
    let [r, g, b] = rgb.map(f32::from);
    r * 256.0 + g + b / 256.0 - 32768.0
}

/// CPU twin of `elevationToTerrarium`.
pub fn elevation_to_terrarium(elevation: f32) -> [u8; 3] {
    let e = elevation + 32768.0;
    let r = (e / 256.0).floor();
    let g = (e - r * 256.0).floor();
    let b = (e - r * 256.0 - g) * 256.0;
    [r, g, b].map(|c| c.clamp(0.0, 255.0) as u8)
}

/// One direction of a separable Gaussian blur over a Terrarium tile.
///
/// Uniforms: `sampler2D u_tile`, `float u_kernel[kernel_len]` (see
/// `kernel::build_gaussian_kernel`) and `vec2 u_direction`, (1, 0) for the
/// horizontal pass and (0, 1) for the vertical one.
pub fn separable_blur_fragment(kernel_len: usize) -> String {
    let len = kernel_len.max(1);
    format!(
        "#version 300 es
precision highp float;

in vec2 uv;
out vec4 fragColor;

uniform sampler2D u_tile;
uniform float u_kernel[{len}];
uniform vec2 u_direction;

{to_elevation}

{to_terrarium}

void main() {{
  vec2 texel = u_direction / vec2(textureSize(u_tile, 0));
  float sum = 0.0;
  for (int i = 0; i < {len}; i++) {{
    vec2 position = uv + float(i - {half}) * texel;
    sum += u_kernel[i] * terrariumToElevation(texture(u_tile, position));
  }}
  fragColor = elevationToTerrarium(sum);
}}",
        len = len,
        half = len / 2,
        to_elevation = TERRARIUM_TO_ELEVATION,
        to_terrarium = ELEVATION_TO_TERRARIUM,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terrarium_codec_matches() {
        for elevation in [-32768.0, -10.5, 0.0, 8848.25, 1234.0] {
            let rgb = elevation_to_terrarium(elevation);
            assert!((terrarium_to_elevation(rgb) - elevation).abs() < 1.0 / 256.0 + 1e-3);
        }
    }

    #[test]
    fn blur_declares_kernel_length() {
        let src = separable_blur_fragment(7);
        assert!(src.contains("uniform float u_kernel[7];"));
        assert!(src.contains("float(i - 3)"));
        assert!(src.contains("float terrariumToElevation(vec4 color)"));
        assert!(src.starts_with("#version 300 es"));
    }
}
