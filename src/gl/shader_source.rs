// RasterGL
// copyright zipxing@hotmail.com 2022~2025

// pass-through full-screen quad, exposes `uv` in [0, 1]
pub const DEFAULT_VERTEX_SHADER: &str = "#version 300 es
precision highp float;

in vec2 a_position;
out vec4 position;
out vec2 uv;

void main() {
  position = vec4(a_position, 0.0, 1.0);
  gl_Position = position;
  uv = position.xy / 2. + 0.5;
}";

// uv visualization
pub const DEFAULT_FRAGMENT_SHADER: &str = "#version 300 es
precision highp float;

in vec2 uv;
out vec4 fragColor;

void main() {
  fragColor = vec4(uv.x, uv.y, 1. - uv.x * uv.y, 1.);
}";

/// vertex attribute the quad is bound to
pub const POSITION_ATTRIBUTE: &str = "a_position";

/// full-screen quad drawn as a TRIANGLE_STRIP of 4 vertices
pub const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
