use raster_gl::{
    gl::{
        shader::shader_compile_errors,
        shader_source::DEFAULT_VERTEX_SHADER,
        soft::{GlCall, SoftCanvas, SoftGl},
        ShaderKind,
    },
    glsl::separable_blur_fragment,
    kernel::{build_gaussian_kernel_from_radius, CentralMass},
    NodeOptions, RasterContext, RasterContextOptions, RasterError, ShaderSourceOptions,
    UniformType,
};

const BROKEN_FS: &str = "#version 300 es
precision highp float;
#error missing semicolon
out vec4 fragColor;
void main() { fragColor = vec4(1.); }";

const BROKEN_VS: &str = "#version 300 es
#error bad vertex
in vec2 a_position;
void main() { gl_Position = vec4(a_position, 0., 1.); }";

const UNLINKED_FS: &str = "#version 300 es
precision highp float;
in vec3 normal;
out vec4 fragColor;
void main() { fragColor = vec4(normal, 1.); }";

fn context(gl: &SoftGl) -> RasterContext<SoftCanvas> {
    RasterContext::new(
        SoftCanvas::new(gl),
        RasterContextOptions {
            width: 2,
            height: 2,
        },
    )
    .expect("soft context")
}

#[test]
fn test_throw_mode_reports_first_error() {
    let gl = SoftGl::new(1, 1);
    let mut ctx = context(&gl);
    let id = ctx.create_node(NodeOptions::default()).unwrap();
    let mut node = ctx.node(id).unwrap();

    match node.set_shader_source(ShaderSourceOptions::fragment(BROKEN_FS)) {
        Err(RasterError::ShaderCompile { stage, log }) => {
            assert_eq!(stage, ShaderKind::Fragment);
            assert!(log.contains("missing semicolon"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!node.is_program_valid());

    // vertex stage is checked before the fragment stage
    match node.set_shader_source(ShaderSourceOptions::fragment(BROKEN_FS).with_vertex(BROKEN_VS)) {
        Err(RasterError::ShaderCompile { stage, .. }) => assert_eq!(stage, ShaderKind::Vertex),
        other => panic!("unexpected {:?}", other),
    }

    assert!(matches!(
        node.set_shader_source(ShaderSourceOptions::fragment(UNLINKED_FS)),
        Err(RasterError::ShaderLink(_))
    ));
    assert_eq!(gl.live_programs(), 0);
    assert_eq!(gl.live_shaders(), 0);
}

#[test]
fn test_lenient_mode_keeps_diagnostics() {
    let gl = SoftGl::new(1, 1);
    let mut ctx = context(&gl);
    let id = ctx.create_node(NodeOptions::default()).unwrap();
    let mut node = ctx.node(id).unwrap();

    node.set_shader_source(ShaderSourceOptions::fragment(BROKEN_FS).with_vertex(BROKEN_VS).lenient())
        .unwrap();
    assert!(!node.is_program_valid());
    assert!(node.vertex_shader_error().unwrap().contains("bad vertex"));
    assert!(node.fragment_shader_error().unwrap().contains("missing semicolon"));
    assert!(node.program_error().is_none());

    node.set_shader_source(ShaderSourceOptions::fragment(UNLINKED_FS).lenient())
        .unwrap();
    assert!(node.vertex_shader_error().is_none());
    assert!(node.fragment_shader_error().is_none());
    assert!(node.program_error().unwrap().contains("normal"));

    // an invalid node renders nothing
    gl.clear_calls();
    node.render().unwrap();
    assert_eq!(gl.count(&GlCall::Draw), 0);

    node.set_shader_source(ShaderSourceOptions::default()).unwrap();
    assert!(node.is_program_valid());
    assert!(node.program_error().is_none());
}

#[test]
fn test_compile_errors_without_node() {
    let gl = SoftGl::new(1, 1);
    let (vertex, fragment) = shader_compile_errors(&gl, DEFAULT_VERTEX_SHADER, BROKEN_FS);
    assert!(vertex.is_none());
    assert!(fragment.is_some());
    assert_eq!(gl.live_shaders(), 0);
}

#[test]
fn test_separable_blur_pass_links() {
    let gl = SoftGl::new(1, 1);
    let mut ctx = context(&gl);
    let kernel = build_gaussian_kernel_from_radius(3, CentralMass::P999);
    let source = separable_blur_fragment(kernel.len());
    let id = ctx
        .create_node(NodeOptions {
            render_to_texture: true,
            ..Default::default()
        })
        .unwrap();
    let mut node = ctx.node(id).unwrap();
    node.set_shader_source(ShaderSourceOptions::fragment(&source)).unwrap();
    node.set_uniform_number_array("u_kernel", &kernel, UniformType::Float);
    node.set_uniform_vector2("u_direction", [1.0, 0.0], UniformType::Float);
    gl.clear_calls();
    node.render().unwrap();
    let mut uploads = gl.uniform_uploads();
    uploads.sort();
    assert_eq!(uploads, vec!["u_direction", "u_kernel"]);
}
