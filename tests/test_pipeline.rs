use raster_gl::{
    gl::soft::{GlCall, SoftCanvas, SoftGl},
    NodeOptions, PixelData, RasterContext, RasterContextOptions, RasterError, ShaderSourceOptions,
    TextureOptions, UniformType,
};

const COLOR_FS: &str = "#version 300 es
precision highp float;
in vec2 uv;
out vec4 fragColor;
uniform float u_red;
uniform float u_green;
uniform float u_blue;
void main() {
  fragColor = vec4(u_red / 255., u_green / 255., u_blue / 255., 1.);
}";

const GRAY_FS: &str = "#version 300 es
precision highp float;
in vec2 uv;
out vec4 fragColor;
void main() {
  fragColor = vec4(0.4, 0.4, 0.4, 1.);
}";

const INVERT_FS: &str = "#version 300 es
precision highp float;
in vec2 uv;
out vec4 fragColor;
uniform sampler2D u_input;
void main() {
  vec4 c = texture(u_input, uv);
  fragColor = vec4(1. - c.rgb, 1.);
}";

const COPY_FS: &str = "#version 300 es
precision highp float;
in vec2 uv;
out vec4 fragColor;
uniform sampler2D u_src;
void main() {
  fragColor = texture(u_src, uv);
}";

const PAYLOAD_FS: &str = "#version 300 es
precision highp float;
precision highp usampler2D;
in vec2 uv;
out uvec4 fragColor;
void main() {
  fragColor = floatBitsToUint(vec4(1.5, -2., 0.25, 42.));
}";

fn soft_gl() -> SoftGl {
    let gl = SoftGl::new(1, 1);
    gl.register_fragment(COLOR_FS, |f| {
        [
            f.float("u_red") / 255.0,
            f.float("u_green") / 255.0,
            f.float("u_blue") / 255.0,
            1.0,
        ]
    });
    gl.register_fragment(GRAY_FS, |_| [0.4, 0.4, 0.4, 1.0]);
    gl.register_fragment(INVERT_FS, |f| {
        let c = f.texture("u_input", f.uv());
        [1.0 - c[0], 1.0 - c[1], 1.0 - c[2], 1.0]
    });
    gl.register_fragment(COPY_FS, |f| f.texture("u_src", f.uv()));
    gl.register_fragment(PAYLOAD_FS, |_| [1.5, -2.0, 0.25, 42.0]);
    gl
}

fn context(gl: &SoftGl, width: u32, height: u32) -> RasterContext<SoftCanvas> {
    RasterContext::new(SoftCanvas::new(gl), RasterContextOptions { width, height })
        .expect("soft context")
}

fn bytes(data: PixelData) -> Vec<u8> {
    match data {
        PixelData::U8(v) => v,
        other => panic!("expected bytes, got {:?}", other),
    }
}

#[test]
fn test_uniform_color() {
    let gl = soft_gl();
    let mut ctx = context(&gl, 4, 3);
    let id = ctx.create_node(NodeOptions::default()).unwrap();
    let mut node = ctx.node(id).unwrap();
    node.set_shader_source(ShaderSourceOptions::fragment(COLOR_FS)).unwrap();
    node.set_uniform_number("u_red", 150.0, UniformType::Float);
    node.set_uniform_number("u_green", 90.0, UniformType::Float);
    node.set_uniform_number("u_blue", 30.0, UniformType::Float);
    node.render().unwrap();

    let px = bytes(node.pixel_data(false).unwrap());
    assert_eq!(px.len(), 4 * 3 * 4);
    for p in px.chunks(4) {
        assert_eq!(p, &[150, 90, 30, 255]);
    }
}

#[test]
fn test_gray_chain_inverted() {
    let gl = soft_gl();
    let mut ctx = context(&gl, 4, 4);
    let a = ctx
        .create_node(NodeOptions {
            render_to_texture: true,
            ..Default::default()
        })
        .unwrap();
    let b = ctx.create_node(NodeOptions::default()).unwrap();
    ctx.node(a)
        .unwrap()
        .set_shader_source(ShaderSourceOptions::fragment(GRAY_FS))
        .unwrap();

    let mut node_b = ctx.node(b).unwrap();
    node_b.set_shader_source(ShaderSourceOptions::fragment(INVERT_FS)).unwrap();
    node_b.set_uniform_texture_2d("u_input", a).unwrap();
    node_b.render().unwrap();
    let inverted = bytes(node_b.pixel_data(false).unwrap());

    let gray = bytes(ctx.node(a).unwrap().pixel_data(false).unwrap());
    assert_eq!(gray.len(), inverted.len());
    for (g, i) in gray.chunks(4).zip(inverted.chunks(4)) {
        assert_eq!(g, &[102, 102, 102, 255]);
        assert_eq!(&i[..3], &[255 - g[0], 255 - g[1], 255 - g[2]]);
    }
}

#[test]
fn test_canvas_upstream_across_renders() {
    let gl = soft_gl();
    let mut ctx = context(&gl, 2, 2);
    let a = ctx.create_node(NodeOptions::default()).unwrap();
    let b = ctx.create_node(NodeOptions::default()).unwrap();
    ctx.node(a)
        .unwrap()
        .set_shader_source(ShaderSourceOptions::fragment(GRAY_FS))
        .unwrap();
    let mut node_b = ctx.node(b).unwrap();
    node_b.set_shader_source(ShaderSourceOptions::fragment(INVERT_FS)).unwrap();
    node_b.set_uniform_texture_2d("u_input", a).unwrap();
    let live = |ctx: &RasterContext<SoftCanvas>| ctx.textures().filter(|(_, t)| !t.is_freed()).count();
    assert_eq!(live(&ctx), 1);

    for _ in 0..5 {
        let mut node_b = ctx.node(b).unwrap();
        node_b.render().unwrap();
        assert_eq!(&bytes(node_b.pixel_data(false).unwrap())[..4], &[153, 153, 153, 255]);
    }
    assert_eq!(live(&ctx), 1);

    // a stale upstream is drawn again and its old snapshot released
    ctx.node(a).unwrap().set_clear_color([1.0, 0.0, 0.0, 1.0]);
    let mut node_b = ctx.node(b).unwrap();
    node_b.render().unwrap();
    assert_eq!(&bytes(node_b.pixel_data(false).unwrap())[..4], &[153, 153, 153, 255]);
    assert_eq!(live(&ctx), 1);
    assert_eq!(gl.live_textures(), 1);
}

#[test]
fn test_upstream_rerenders_on_pull() {
    let gl = soft_gl();
    let mut ctx = context(&gl, 2, 2);
    let a = ctx
        .create_node(NodeOptions {
            render_to_texture: true,
            ..Default::default()
        })
        .unwrap();
    let b = ctx.create_node(NodeOptions::default()).unwrap();
    let mut node_a = ctx.node(a).unwrap();
    node_a.set_shader_source(ShaderSourceOptions::fragment(COLOR_FS)).unwrap();
    node_a.set_uniform_number("u_red", 255.0, UniformType::Float);
    let mut node_b = ctx.node(b).unwrap();
    node_b.set_shader_source(ShaderSourceOptions::fragment(COPY_FS)).unwrap();
    node_b.set_uniform_texture_2d("u_src", a).unwrap();
    node_b.render().unwrap();
    assert_eq!(&bytes(node_b.pixel_data(false).unwrap())[..4], &[255, 0, 0, 255]);

    // changing A only marks it stale, B pulls it on its next render
    ctx.node(a).unwrap().set_uniform_number("u_green", 255.0, UniformType::Float);
    assert!(ctx.node(a).unwrap().does_output_need_update());
    let mut node_b = ctx.node(b).unwrap();
    node_b.render().unwrap();
    assert_eq!(&bytes(node_b.pixel_data(false).unwrap())[..4], &[255, 255, 0, 255]);
    assert!(!ctx.node(a).unwrap().does_output_need_update());
}

#[test]
fn test_vertical_flip_on_upload() {
    let gl = soft_gl();
    let mut ctx = context(&gl, 1, 2);
    // top row red, bottom row blue
    let rows = [255, 0, 0, 255, 0, 0, 255, 255];
    for flip in [true, false] {
        let tex = ctx
            .texture_from_data(
                &rows,
                1,
                2,
                TextureOptions {
                    vertical_flip: flip,
                    bilinear: false,
                },
            )
            .unwrap();
        let id = ctx.create_node(NodeOptions::default()).unwrap();
        let mut node = ctx.node(id).unwrap();
        node.set_shader_source(ShaderSourceOptions::fragment(COPY_FS)).unwrap();
        node.set_uniform_texture_2d("u_src", tex).unwrap();
        node.render().unwrap();
        let image = node.image_data().unwrap();
        assert_eq!((image.width, image.height), (1, 2));
        if flip {
            assert_eq!(image.data, rows.to_vec());
        } else {
            assert_eq!(&image.data[..4], &rows[4..]);
        }
    }
}

#[test]
fn test_uint32_payload_readback() {
    let gl = soft_gl();
    let mut ctx = context(&gl, 2, 2);
    let id = ctx
        .create_node(NodeOptions {
            render_to_texture: true,
            uint32: true,
            ..Default::default()
        })
        .unwrap();
    let mut node = ctx.node(id).unwrap();
    node.set_shader_source(ShaderSourceOptions::fragment(PAYLOAD_FS)).unwrap();
    gl.clear_calls();
    node.render().unwrap();
    assert_eq!(gl.count(&GlCall::Clear), 0);

    match node.pixel_data(true).unwrap() {
        PixelData::F32(v) => {
            assert_eq!(v.len(), 2 * 2 * 4);
            assert_eq!(&v[..4], &[1.5, -2.0, 0.25, 42.0]);
        }
        other => panic!("expected floats, got {:?}", other),
    }
    match node.pixel_data(false).unwrap() {
        PixelData::U32(v) => assert_eq!(v[0], 1.5f32.to_bits()),
        other => panic!("expected u32, got {:?}", other),
    }
    assert!(matches!(node.image_data(), Err(RasterError::UnsupportedFormat(_))));
    assert!(matches!(node.png_bytes(), Err(RasterError::UnsupportedFormat(_))));
}

#[test]
fn test_png_export() {
    let gl = soft_gl();
    let mut ctx = context(&gl, 3, 2);
    let id = ctx.create_node(NodeOptions::default()).unwrap();
    let mut node = ctx.node(id).unwrap();
    node.set_shader_source(ShaderSourceOptions::fragment(GRAY_FS)).unwrap();
    node.render().unwrap();
    let png = node.png_bytes().unwrap();
    let decoded = raster_gl::image_io::decode_image(&png).unwrap();
    assert_eq!(decoded.dimensions(), (3, 2));
    assert_eq!(decoded.get_pixel(2, 1).0, [102, 102, 102, 255]);
    let img = node.rgba_image().unwrap();
    assert_eq!(img.dimensions(), (3, 2));
}

#[test]
fn test_canvas_node_output_is_read_back() {
    let gl = soft_gl();
    let mut ctx = context(&gl, 2, 2);
    let id = ctx.create_node(NodeOptions::default()).unwrap();
    let mut node = ctx.node(id).unwrap();
    node.set_shader_source(ShaderSourceOptions::fragment(GRAY_FS)).unwrap();
    let tex = node.output_texture().unwrap();
    let texture = ctx.texture(tex).unwrap();
    assert_eq!((texture.width(), texture.height()), (2, 2));
    assert!(gl
        .calls()
        .iter()
        .any(|c| *c == GlCall::ReadPixels { width: 2, height: 2 }));
}

#[test]
fn test_dependency_cycle() {
    let gl = soft_gl();
    let mut ctx = context(&gl, 2, 2);
    let rtt = NodeOptions {
        render_to_texture: true,
        ..Default::default()
    };
    let a = ctx.create_node(rtt.clone()).unwrap();
    let b = ctx.create_node(rtt).unwrap();
    for id in [a, b] {
        ctx.node(id)
            .unwrap()
            .set_shader_source(ShaderSourceOptions::fragment(INVERT_FS))
            .unwrap();
    }
    ctx.node(b).unwrap().set_uniform_texture_2d("u_input", a).unwrap();
    ctx.node(a).unwrap().set_uniform_texture_2d("u_input", b).unwrap();

    // both stale: rendering A pulls B, which pulls A again
    ctx.node(b).unwrap().set_clear_color([0.0, 0.0, 0.0, 1.0]);
    let err = ctx.node(a).unwrap().render();
    assert_eq!(err, Err(RasterError::DependencyCycle(a)));

    // nothing is left flagged as rendering
    ctx.node(b).unwrap().set_uniform_texture_2d("u_input", raster_gl::TextureInput::Node(b)).unwrap();
    ctx.node(a).unwrap().render().unwrap();
}
