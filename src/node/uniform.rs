// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Uniform values and their per-node binding records.
//!
//! A binding holds the last well-formed value set for a name, its lazily
//! resolved location and a dirty flag. Only dirty bindings are uploaded on
//! render, except samplers, whose texture is bound to its unit every render.

use super::Node;
use crate::{
    canvas::Canvas,
    error::{RasterError, Result},
    gl::{texture_unit::TextureUnitAllocator, GlBackend},
    node::NodeId,
    texture::{Texture, TextureId},
};
use log::{debug, warn};
use serde_json::Value;

/// Numeric subtype a value is uploaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniformType {
    Bool,
    Int,
    #[default]
    Float,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    BoolArray(Vec<bool>),
    Int(i32),
    IntArray(Vec<i32>),
    Float(f32),
    FloatArray(Vec<f32>),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
}

impl UniformValue {
    /// Scalar forced to `ty`; a boolean subtype is not a number.
    pub fn number(value: f32, ty: UniformType) -> Option<Self> {
        match ty {
            UniformType::Float => Some(UniformValue::Float(value)),
            UniformType::Int => Some(UniformValue::Int(value as i32)),
            UniformType::Bool => None,
        }
    }

    pub fn numbers(values: &[f32], ty: UniformType) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        match ty {
            UniformType::Float => Some(UniformValue::FloatArray(values.to_vec())),
            UniformType::Int => Some(UniformValue::IntArray(
                values.iter().map(|v| *v as i32).collect(),
            )),
            UniformType::Bool => None,
        }
    }

    /// vec2 / vec3 / vec4 from 2, 3 or 4 components
    pub fn vector(values: &[f32], ty: UniformType) -> Option<Self> {
        let i = |n: usize| values[n] as i32;
        match (values.len(), ty) {
            (_, UniformType::Bool) => None,
            (2, UniformType::Float) => Some(UniformValue::Vec2([values[0], values[1]])),
            (3, UniformType::Float) => Some(UniformValue::Vec3([values[0], values[1], values[2]])),
            (4, UniformType::Float) => Some(UniformValue::Vec4([
                values[0], values[1], values[2], values[3],
            ])),
            (2, UniformType::Int) => Some(UniformValue::IVec2([i(0), i(1)])),
            (3, UniformType::Int) => Some(UniformValue::IVec3([i(0), i(1), i(2)])),
            (4, UniformType::Int) => Some(UniformValue::IVec4([i(0), i(1), i(2), i(3)])),
            _ => None,
        }
    }

    /// arrays must not be empty
    pub fn is_well_formed(&self) -> bool {
        match self {
            UniformValue::BoolArray(v) => !v.is_empty(),
            UniformValue::IntArray(v) => !v.is_empty(),
            UniformValue::FloatArray(v) => !v.is_empty(),
            _ => true,
        }
    }

    pub(crate) fn upload<G: GlBackend>(&self, gl: &G, location: Option<&G::UniformLocation>) {
        match self {
            UniformValue::Bool(b) => gl.uniform_1_i32(location, *b as i32),
            UniformValue::BoolArray(v) => {
                let ints: Vec<i32> = v.iter().map(|b| *b as i32).collect();
                gl.uniform_1_i32_slice(location, &ints);
            }
            UniformValue::Int(x) => gl.uniform_1_i32(location, *x),
            UniformValue::IntArray(v) => gl.uniform_1_i32_slice(location, v),
            UniformValue::Float(x) => gl.uniform_1_f32(location, *x),
            UniformValue::FloatArray(v) => gl.uniform_1_f32_slice(location, v),
            UniformValue::Vec2([x, y]) => gl.uniform_2_f32(location, *x, *y),
            UniformValue::Vec3([x, y, z]) => gl.uniform_3_f32(location, *x, *y, *z),
            UniformValue::Vec4([x, y, z, w]) => gl.uniform_4_f32(location, *x, *y, *z, *w),
            UniformValue::IVec2([x, y]) => gl.uniform_2_i32(location, *x, *y),
            UniformValue::IVec3([x, y, z]) => gl.uniform_3_i32(location, *x, *y, *z),
            UniformValue::IVec4([x, y, z, w]) => gl.uniform_4_i32(location, *x, *y, *z, *w),
        }
    }
}

/// Where a sampler gets its texture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureInput {
    Texture(TextureId),
    /// output of another node, pulled on demand
    Node(NodeId),
}

impl From<TextureId> for TextureInput {
    fn from(id: TextureId) -> Self {
        TextureInput::Texture(id)
    }
}

impl From<NodeId> for TextureInput {
    fn from(id: NodeId) -> Self {
        TextureInput::Node(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BindingValue {
    Value(UniformValue),
    Sampler {
        source: TextureInput,
        // None until the upstream node has an output
        texture: Option<TextureId>,
        // unit last uploaded to the sampler uniform
        unit: Option<u32>,
    },
}

impl BindingValue {
    pub fn sampled_texture(&self) -> Option<TextureId> {
        match self {
            BindingValue::Sampler { texture, .. } => *texture,
            BindingValue::Value(_) => None,
        }
    }
}

enum Location<L> {
    Unresolved,
    Resolved(Option<L>),
}

pub(crate) struct UniformBinding<G: GlBackend> {
    pub value: BindingValue,
    location: Location<G::UniformLocation>,
    pub needs_upload: bool,
}

impl<G: GlBackend> UniformBinding<G> {
    pub fn new(value: BindingValue) -> Self {
        Self {
            value,
            location: Location::Unresolved,
            needs_upload: true,
        }
    }

    /// Replace the value, returning the texture the old one sampled.
    pub fn set(&mut self, value: BindingValue) -> Option<TextureId> {
        let old = self.value.sampled_texture();
        self.value = value;
        self.needs_upload = true;
        old
    }

    /// after a program reset
    pub fn reset_location(&mut self) {
        self.location = Location::Unresolved;
        self.needs_upload = true;
        if let BindingValue::Sampler { unit, .. } = &mut self.value {
            *unit = None;
        }
    }

    pub fn upload(
        &mut self,
        gl: &G,
        program: G::Program,
        name: &str,
        textures: &mut [Texture<G>],
        units: &mut TextureUnitAllocator,
    ) -> Result<()> {
        if let Location::Unresolved = self.location {
            self.location = Location::Resolved(gl.uniform_location(program, name));
        }
        let Location::Resolved(location) = &self.location else {
            return Ok(());
        };
        match &mut self.value {
            BindingValue::Value(v) => {
                if self.needs_upload {
                    v.upload(gl, location.as_ref());
                }
            }
            BindingValue::Sampler {
                texture: Some(id),
                unit,
                ..
            } => {
                let texture = textures
                    .get_mut(id.0)
                    .ok_or_else(|| RasterError::UnknownHandle(id.to_string()))?;
                let u = texture.texture_unit(units)?;
                gl.active_texture(u);
                gl.bind_texture(Some(texture.texture()?));
                if self.needs_upload || *unit != Some(u) {
                    gl.uniform_1_i32(location.as_ref(), u as i32);
                    *unit = Some(u);
                }
            }
            // stays dirty until the upstream node has an output
            BindingValue::Sampler { texture: None, .. } => return Ok(()),
        }
        self.needs_upload = false;
        Ok(())
    }
}

impl<C: Canvas> Node<'_, C> {
    fn bind_value(&mut self, name: &str, value: Option<UniformValue>) {
        let id = self.id;
        let ctx = &mut *self.ctx;
        let node = &mut ctx.nodes[id.0];
        node.output_stale = true;
        let Some(value) = value.filter(UniformValue::is_well_formed) else {
            warn!("{}: uniform {} type mismatch", id, name);
            return;
        };
        let old = match node.uniforms.get_mut(name) {
            Some(binding) => binding.set(BindingValue::Value(value)),
            None => {
                node.uniforms
                    .insert(name.to_string(), UniformBinding::new(BindingValue::Value(value)));
                None
            }
        };
        if let Some(t) = old.and_then(|t| ctx.textures.get_mut(t.0)) {
            t.remove_usage_record(id, name, &mut ctx.units);
        }
    }

    /// Typed entry point; every other setter ends up here.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.bind_value(name, Some(value));
    }

    pub fn set_uniform_boolean(&mut self, name: &str, value: bool) {
        self.bind_value(name, Some(UniformValue::Bool(value)));
    }

    pub fn set_uniform_boolean_array(&mut self, name: &str, values: &[bool]) {
        self.bind_value(name, Some(UniformValue::BoolArray(values.to_vec())));
    }

    pub fn set_uniform_number(&mut self, name: &str, value: f32, ty: UniformType) {
        self.bind_value(name, UniformValue::number(value, ty));
    }

    pub fn set_uniform_number_array(&mut self, name: &str, values: &[f32], ty: UniformType) {
        self.bind_value(name, UniformValue::numbers(values, ty));
    }

    pub fn set_uniform_vector2(&mut self, name: &str, value: [f32; 2], ty: UniformType) {
        self.bind_value(name, UniformValue::vector(&value, ty));
    }

    pub fn set_uniform_vector3(&mut self, name: &str, value: [f32; 3], ty: UniformType) {
        self.bind_value(name, UniformValue::vector(&value, ty));
    }

    pub fn set_uniform_vector4(&mut self, name: &str, value: [f32; 4], ty: UniformType) {
        self.bind_value(name, UniformValue::vector(&value, ty));
    }

    /// 0..=255 channels, uploaded as vec3 in 0..=1
    pub fn set_uniform_rgb(&mut self, name: &str, rgb: [f32; 3]) {
        let v = rgb.map(|c| c / 255.0);
        self.bind_value(name, Some(UniformValue::Vec3(v)));
    }

    /// like `set_uniform_rgb`, alpha is passed through unchanged
    pub fn set_uniform_rgba(&mut self, name: &str, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba;
        self.bind_value(
            name,
            Some(UniformValue::Vec4([r / 255.0, g / 255.0, b / 255.0, a])),
        );
    }

    /// Sample a texture, or the output of a node, through `name`.
    ///
    /// A node input is pulled right away when its program is valid, which
    /// may render it. The texture's unit is claimed here, so pool
    /// exhaustion is reported by this call rather than by `render`.
    pub fn set_uniform_texture_2d(&mut self, name: &str, input: impl Into<TextureInput>) -> Result<()> {
        let input = input.into();
        let id = self.id;
        let texture = match input {
            TextureInput::Texture(t) => Some(t),
            TextureInput::Node(n) if n == id => self.ctx.nodes[id.0].current_output(),
            TextureInput::Node(n) => {
                let upstream = self
                    .ctx
                    .nodes
                    .get(n.0)
                    .ok_or_else(|| RasterError::UnknownHandle(n.to_string()))?;
                if upstream.is_freed() {
                    return Err(RasterError::UseAfterFree(n.to_string()));
                }
                if upstream.is_program_valid() {
                    Some(self.ctx.output_texture_of(n)?)
                } else {
                    debug!("{}: {} has no program yet, {} left unbound", id, n, name);
                    None
                }
            }
        };
        let ctx = &mut *self.ctx;
        // the replaced texture lets go of its unit before the new one claims
        let replaced = ctx.nodes[id.0]
            .uniforms
            .get(name)
            .and_then(|b| b.value.sampled_texture())
            .filter(|old| Some(*old) != texture);
        if let Some(t) = replaced.and_then(|t| ctx.textures.get_mut(t.0)) {
            t.remove_usage_record(id, name, &mut ctx.units);
        }
        if let Some(t) = texture {
            let claimed = ctx
                .textures
                .get_mut(t.0)
                .ok_or_else(|| RasterError::UnknownHandle(t.to_string()))
                .and_then(|tex| tex.texture_unit(&mut ctx.units));
            if let Err(e) = claimed {
                // the previous binding stays as it was
                if let Some(t) = replaced.and_then(|t| ctx.textures.get_mut(t.0)) {
                    if t.texture_unit(&mut ctx.units).is_ok() {
                        t.add_usage_record(id, name);
                    }
                }
                return Err(e);
            }
        }
        let node = &mut ctx.nodes[id.0];
        node.output_stale = true;
        let sampler = BindingValue::Sampler {
            source: input,
            texture,
            unit: None,
        };
        match node.uniforms.get_mut(name) {
            Some(binding) => {
                binding.set(sampler);
            }
            None => {
                node.uniforms.insert(name.to_string(), UniformBinding::new(sampler));
            }
        }
        if let Some(t) = texture {
            ctx.textures[t.0].add_usage_record(id, name);
        }
        Ok(())
    }

    /// Arrays of samplers are not supported; this only warns.
    pub fn set_uniform_texture_array(&mut self, name: &str, _inputs: &[TextureInput]) {
        warn!("{}: arrays of textures are not supported ({})", self.id, name);
    }

    /// Loose boundary for untyped values, e.g. parsed from a JSON document.
    ///
    /// Booleans and boolean arrays bind as booleans, numbers as scalars,
    /// arrays of 2, 3 or 4 numbers as vectors and other number arrays as
    /// arrays, all forced to `ty`. Returns false, with a warning, for
    /// anything else.
    pub fn try_set_uniform(&mut self, name: &str, value: &Value, ty: UniformType) -> bool {
        let numbers = |items: &[Value]| -> Option<Vec<f32>> {
            items.iter().map(|v| v.as_f64().map(|f| f as f32)).collect()
        };
        let parsed = match value {
            Value::Bool(b) => Some(UniformValue::Bool(*b)),
            Value::Number(n) => n.as_f64().and_then(|v| UniformValue::number(v as f32, ty)),
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_boolean) => Some(
                UniformValue::BoolArray(items.iter().filter_map(Value::as_bool).collect()),
            ),
            Value::Array(items) => numbers(items).and_then(|v| match v.len() {
                2..=4 => UniformValue::vector(&v, ty),
                _ => UniformValue::numbers(&v, ty),
            }),
            _ => None,
        };
        match parsed {
            Some(v) => {
                self.bind_value(name, Some(v));
                true
            }
            None => {
                warn!("{}: uniform {} type mismatch ({})", self.id, name, value);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{
        shader::{compile_shader, create_program},
        shader_source::DEFAULT_VERTEX_SHADER,
        soft::SoftGl,
        ShaderKind,
    };

    #[test]
    fn constructors_reject_bad_shapes() {
        assert_eq!(UniformValue::number(2.5, UniformType::Int), Some(UniformValue::Int(2)));
        assert_eq!(UniformValue::number(1.0, UniformType::Bool), None);
        assert_eq!(UniformValue::numbers(&[], UniformType::Float), None);
        assert_eq!(
            UniformValue::vector(&[1.0, 2.0, 3.0, 4.0], UniformType::Float),
            Some(UniformValue::Vec4([1.0, 2.0, 3.0, 4.0]))
        );
        assert_eq!(UniformValue::vector(&[1.0; 5], UniformType::Float), None);
        assert_eq!(UniformValue::vector(&[1.0], UniformType::Float), None);
        assert!(!UniformValue::IntArray(vec![]).is_well_formed());
    }

    #[test]
    fn binding_uploads_once_until_dirty() {
        let gl = SoftGl::new(1, 1);
        let vs = compile_shader(&gl, ShaderKind::Vertex, DEFAULT_VERTEX_SHADER).unwrap();
        let fs = compile_shader(
            &gl,
            ShaderKind::Fragment,
            "#version 300 es\nprecision highp float;\nuniform vec4 u_color;\nout vec4 c;\nvoid main() { c = u_color; }",
        )
        .unwrap();
        let program = create_program(&gl, vs, fs).unwrap();
        gl.use_program(Some(program));
        gl.clear_calls();

        let mut units = TextureUnitAllocator::new();
        let mut binding: UniformBinding<SoftGl> =
            UniformBinding::new(BindingValue::Value(UniformValue::Vec4([1.0; 4])));
        binding.upload(&gl, program, "u_color", &mut [], &mut units).unwrap();
        binding.upload(&gl, program, "u_color", &mut [], &mut units).unwrap();
        assert_eq!(gl.uniform_uploads(), vec!["u_color"]);

        binding.reset_location();
        binding.upload(&gl, program, "u_color", &mut [], &mut units).unwrap();
        assert_eq!(gl.uniform_uploads().len(), 2);
    }

    #[test]
    fn set_reports_previous_sampler() {
        let mut binding: UniformBinding<SoftGl> = UniformBinding::new(BindingValue::Sampler {
            source: TextureInput::Texture(TextureId(3)),
            texture: Some(TextureId(3)),
            unit: None,
        });
        let old = binding.set(BindingValue::Value(UniformValue::Float(1.0)));
        assert_eq!(old, Some(TextureId(3)));
        assert!(binding.needs_upload);
    }
}
