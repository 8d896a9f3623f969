//! Uniform schemas and per-program uniform storage.
//!
//! A schema is an ordered list of named, typed fields laid out with WGSL
//! uniform-address-space rules. Storage is a flat `f32` block that can be
//! handed to `queue.write_buffer` as bytes.

use crate::error::{FxError, FxResult};
use fnv::FnvHashMap;
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformType {
    F32,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    pub fn wgsl_name(self) -> &'static str {
        match self {
            UniformType::F32 => "f32",
            UniformType::Vec2 => "vec2<f32>",
            UniformType::Vec3 => "vec3<f32>",
            UniformType::Vec4 => "vec4<f32>",
            UniformType::Mat4 => "mat4x4<f32>",
        }
    }

    /// Parse a WGSL type name, accepting the `vec2f` style aliases.
    pub fn from_wgsl(name: &str) -> Option<Self> {
        match name.trim() {
            "f32" => Some(UniformType::F32),
            "vec2<f32>" | "vec2f" => Some(UniformType::Vec2),
            "vec3<f32>" | "vec3f" => Some(UniformType::Vec3),
            "vec4<f32>" | "vec4f" => Some(UniformType::Vec4),
            "mat4x4<f32>" | "mat4x4f" => Some(UniformType::Mat4),
            _ => None,
        }
    }

    /// Byte alignment in the uniform address space.
    pub fn align(self) -> usize {
        match self {
            UniformType::F32 => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 | UniformType::Vec4 | UniformType::Mat4 => 16,
        }
    }

    /// Byte size (vec3 is 12 bytes; the next field may pack into its tail).
    pub fn size(self) -> usize {
        match self {
            UniformType::F32 => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat4 => 64,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    F32(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::F32(_) => UniformType::F32,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    fn write(&self, out: &mut [f32]) {
        match self {
            UniformValue::F32(v) => out[0] = *v,
            UniformValue::Vec2(v) => out[..2].copy_from_slice(&v.to_array()),
            UniformValue::Vec3(v) => out[..3].copy_from_slice(&v.to_array()),
            UniformValue::Vec4(v) => out[..4].copy_from_slice(&v.to_array()),
            UniformValue::Mat4(m) => out[..16].copy_from_slice(&m.to_cols_array()),
        }
    }

    fn read(ty: UniformType, src: &[f32]) -> Self {
        match ty {
            UniformType::F32 => UniformValue::F32(src[0]),
            UniformType::Vec2 => UniformValue::Vec2(Vec2::from_slice(src)),
            UniformType::Vec3 => UniformValue::Vec3(Vec3::from_slice(src)),
            UniformType::Vec4 => UniformValue::Vec4(Vec4::from_slice(src)),
            UniformType::Mat4 => UniformValue::Mat4(Mat4::from_cols_slice(&src[..16])),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::F32(v)
    }
}
impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}
impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}
impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}
impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

#[derive(Clone, Debug)]
pub struct UniformField {
    pub name: &'static str,
    pub ty: UniformType,
    pub default: UniformValue,
    /// Byte offset inside the block.
    pub offset: usize,
}

/// Immutable, ordered uniform layout for one program recipe.
#[derive(Clone, Debug)]
pub struct UniformSchema {
    fields: Vec<UniformField>,
    index: FnvHashMap<&'static str, usize>,
    size: usize,
}

#[derive(Default)]
pub struct SchemaBuilder {
    entries: Vec<(&'static str, UniformValue)>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: &'static str, default: impl Into<UniformValue>) -> Self {
        self.entries.push((name, default.into()));
        self
    }

    pub fn build(self) -> FxResult<UniformSchema> {
        let mut fields = Vec::with_capacity(self.entries.len());
        let mut index = FnvHashMap::default();
        let mut cursor = 0usize;
        let mut max_align = 16usize;
        for (name, default) in self.entries {
            let ty = default.ty();
            if index.contains_key(name) {
                return Err(FxError::ShaderValidation {
                    program: String::from("<schema>"),
                    reason: format!("duplicate uniform `{}`", name),
                });
            }
            let align = ty.align();
            max_align = max_align.max(align);
            cursor = cursor.next_multiple_of(align);
            index.insert(name, fields.len());
            fields.push(UniformField {
                name,
                ty,
                default,
                offset: cursor,
            });
            cursor += ty.size();
        }
        let size = cursor.next_multiple_of(max_align).max(16);
        Ok(UniformSchema {
            fields,
            index,
            size,
        })
    }
}

impl UniformSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Block size in bytes, padded to 16.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Uniform values owned by exactly one program instance.
#[derive(Clone, Debug)]
pub struct UniformStorage {
    program: &'static str,
    schema: Rc<UniformSchema>,
    data: Vec<f32>,
    dirty: bool,
}

impl UniformStorage {
    pub fn new(program: &'static str, schema: Rc<UniformSchema>) -> Self {
        let mut storage = Self {
            program,
            data: vec![0.0; schema.size() / 4],
            schema,
            dirty: true,
        };
        storage.reset_defaults();
        storage
    }

    pub fn schema(&self) -> &UniformSchema {
        &self.schema
    }

    pub fn reset_defaults(&mut self) {
        let schema = Rc::clone(&self.schema);
        for f in schema.fields() {
            let at = f.offset / 4;
            f.default.write(&mut self.data[at..]);
        }
        self.dirty = true;
    }

    /// Type-checked write of one field.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> FxResult<()> {
        let value = value.into();
        let Some(field) = self.schema.field(name) else {
            return Err(FxError::UnknownUniform {
                program: self.program.to_string(),
                name: name.to_string(),
            });
        };
        if field.ty != value.ty() {
            return Err(FxError::UniformTypeMismatch {
                name: name.to_string(),
                expected: field.ty.wgsl_name(),
                found: value.ty().wgsl_name(),
            });
        }
        let at = field.offset / 4;
        value.write(&mut self.data[at..]);
        self.dirty = true;
        Ok(())
    }

    /// Write a field only if this program declares it with a matching type.
    ///
    /// Used for the shared frame uniforms (`time`, `pointer`, ...), which not
    /// every effect consumes.
    pub fn set_if_declared(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        let value = value.into();
        match self.schema.field(name) {
            Some(f) if f.ty == value.ty() => {
                let at = f.offset / 4;
                value.write(&mut self.data[at..]);
                self.dirty = true;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        let f = self.schema.field(name)?;
        let at = f.offset / 4;
        Some(UniformValue::read(f.ty, &self.data[at..]))
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// True when values changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
