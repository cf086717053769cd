// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Shader compile and program link helpers.
//!
//! These never panic and never log on failure: the info log is returned to
//! the caller, who decides whether it is fatal (see
//! `ShaderSourceOptions::throw_on_error`).

use super::{GlBackend, ShaderKind};
use log::debug;

/// Compile one stage. On failure the shader object is deleted and the
/// driver's info log is returned.
pub fn compile_shader<G: GlBackend>(
    gl: &G,
    kind: ShaderKind,
    source: &str,
) -> Result<G::Shader, String> {
    let shader = gl.create_shader(kind)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if gl.shader_compile_status(shader) {
        debug!("{} shader compiled", kind);
        Ok(shader)
    } else {
        let log = gl.shader_info_log(shader);
        gl.delete_shader(shader);
        Err(log)
    }
}

/// Link a program from two compiled stages. The stages stay attached and
/// are not deleted; their owner releases them.
pub fn create_program<G: GlBackend>(
    gl: &G,
    vertex: G::Shader,
    fragment: G::Shader,
) -> Result<G::Program, String> {
    let program = gl.create_program()?;
    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    if gl.program_link_status(program) {
        Ok(program)
    } else {
        let log = gl.program_info_log(program);
        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);
        gl.delete_program(program);
        Err(log)
    }
}

/// Compile both stages only to collect their diagnostics, for live editors
/// that want feedback without touching a node.
pub fn shader_compile_errors<G: GlBackend>(
    gl: &G,
    vertex_source: &str,
    fragment_source: &str,
) -> (Option<String>, Option<String>) {
    let check = |kind: ShaderKind, source: &str| match compile_shader(gl, kind, source) {
        Ok(shader) => {
            gl.delete_shader(shader);
            None
        }
        Err(log) => Some(log),
    };
    let vertex = check(ShaderKind::Vertex, vertex_source);
    let fragment = check(ShaderKind::Fragment, fragment_source);
    (vertex, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{
        shader_source::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER},
        soft::SoftGl,
    };

    #[test]
    fn compiles_and_links_default_sources() {
        let gl = SoftGl::new(4, 4);
        let vs = compile_shader(&gl, ShaderKind::Vertex, DEFAULT_VERTEX_SHADER).unwrap();
        let fs = compile_shader(&gl, ShaderKind::Fragment, DEFAULT_FRAGMENT_SHADER).unwrap();
        assert!(create_program(&gl, vs, fs).is_ok());
    }

    #[test]
    fn compile_failure_returns_log_and_deletes_shader() {
        let gl = SoftGl::new(4, 4);
        let err = compile_shader(&gl, ShaderKind::Fragment, "#version 300 es\n#error broken\n")
            .unwrap_err();
        assert!(err.contains("broken"));
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn link_failure_on_unmatched_varying() {
        let gl = SoftGl::new(4, 4);
        let vs = compile_shader(&gl, ShaderKind::Vertex, DEFAULT_VERTEX_SHADER).unwrap();
        let fs = compile_shader(
            &gl,
            ShaderKind::Fragment,
            "#version 300 es\nprecision highp float;\nin vec3 normal;\nout vec4 c;\nvoid main() { c = vec4(normal, 1.); }",
        )
        .unwrap();
        let err = create_program(&gl, vs, fs).unwrap_err();
        assert!(err.contains("normal"));
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn compile_errors_reports_each_stage() {
        let gl = SoftGl::new(4, 4);
        let (v, f) = shader_compile_errors(&gl, DEFAULT_VERTEX_SHADER, "#error nope");
        assert!(v.is_none());
        assert!(f.unwrap().contains("nope"));
        assert_eq!(gl.live_shaders(), 0);
    }
}
