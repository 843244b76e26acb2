//! Ordered uniform blocks and their GPU byte layout.

use crate::texture::TextureSource;
use glam::{Vec2, Vec3, Vec4};

/// A single uniform value.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// `f32`.
    Float(f32),
    /// `i32`.
    Int(i32),
    /// `bool`, stored as `u32`.
    Bool(bool),
    /// `vec2<f32>`.
    Vec2(Vec2),
    /// `vec3<f32>`.
    Vec3(Vec3),
    /// `vec4<f32>`.
    Vec4(Vec4),
    /// Float array, laid out as `array<vec4<f32>, N>`.
    FloatArray(Vec<f32>),
    /// Sampled texture. `None` binds a 1x1 white texture.
    Texture(Option<TextureSource>),
}

impl UniformValue {
    /// Whether the value is bound as a texture/sampler pair rather than
    /// packed into the uniform buffer.
    #[inline]
    pub fn is_texture(&self) -> bool {
        matches!(self, UniformValue::Texture(_))
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<f64> for UniformValue {
    fn from(v: f64) -> Self {
        UniformValue::Float(v as f32)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
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

impl From<TextureSource> for UniformValue {
    fn from(v: TextureSource) -> Self {
        UniformValue::Texture(Some(v))
    }
}

/// An ordered set of named uniforms.
///
/// Declaration order is the binding order: non-texture values are packed
/// into binding 0 in order, and the k-th texture is bound at `1 + 2k`
/// (texture) and `2 + 2k` (sampler).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms {
    entries: Vec<(String, UniformValue)>,
}

impl Uniforms {
    /// Create an empty uniform block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style declaration.
    pub fn with(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder-style declaration of an unbound texture slot.
    pub fn with_texture_slot(mut self, name: &str) -> Self {
        self.set(name, UniformValue::Texture(None));
        self
    }

    /// Set a uniform, replacing an existing value or declaring a new one.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Point a texture uniform at a source, or unbind it with `None`.
    pub fn set_texture(&mut self, name: &str, texture: Option<TextureSource>) {
        self.set(name, UniformValue::Texture(texture));
    }

    /// Get a uniform by name.
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether a uniform is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Float value of a uniform.
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name) {
            Some(UniformValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Integer value of a uniform.
    pub fn int(&self, name: &str) -> Option<i32> {
        match self.get(name) {
            Some(UniformValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Vec2 value of a uniform.
    pub fn vec2(&self, name: &str) -> Option<Vec2> {
        match self.get(name) {
            Some(UniformValue::Vec2(v)) => Some(*v),
            _ => None,
        }
    }

    /// Texture bound to a uniform, if any.
    pub fn texture(&self, name: &str) -> Option<&TextureSource> {
        match self.get(name) {
            Some(UniformValue::Texture(t)) => t.as_ref(),
            _ => None,
        }
    }

    /// Number of declared uniforms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no uniform is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all uniforms in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Texture slots in binding order.
    pub fn textures(&self) -> impl Iterator<Item = (&str, Option<&TextureSource>)> {
        self.entries.iter().filter_map(|(n, v)| match v {
            UniformValue::Texture(t) => Some((n.as_str(), t.as_ref())),
            _ => None,
        })
    }

    /// Pack the non-texture uniforms with WGSL uniform-buffer alignment.
    ///
    /// The result is padded to a multiple of 16 bytes and is never empty.
    pub fn pack(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();

        for (_, value) in &self.entries {
            match value {
                UniformValue::Float(v) => {
                    align_to(&mut bytes, 4);
                    bytes.extend_from_slice(bytemuck::bytes_of(v));
                }
                UniformValue::Int(v) => {
                    align_to(&mut bytes, 4);
                    bytes.extend_from_slice(bytemuck::bytes_of(v));
                }
                UniformValue::Bool(v) => {
                    align_to(&mut bytes, 4);
                    bytes.extend_from_slice(bytemuck::bytes_of(&(*v as u32)));
                }
                UniformValue::Vec2(v) => {
                    align_to(&mut bytes, 8);
                    bytes.extend_from_slice(bytemuck::cast_slice(&v.to_array()));
                }
                UniformValue::Vec3(v) => {
                    align_to(&mut bytes, 16);
                    bytes.extend_from_slice(bytemuck::cast_slice(&v.to_array()));
                }
                UniformValue::Vec4(v) => {
                    align_to(&mut bytes, 16);
                    bytes.extend_from_slice(bytemuck::cast_slice(&v.to_array()));
                }
                UniformValue::FloatArray(values) => {
                    align_to(&mut bytes, 16);
                    for chunk in values.chunks(4) {
                        let mut lane = [0.0f32; 4];
                        lane[..chunk.len()].copy_from_slice(chunk);
                        bytes.extend_from_slice(bytemuck::cast_slice(&lane));
                    }
                }
                UniformValue::Texture(_) => {}
            }
        }

        if bytes.is_empty() {
            bytes.resize(16, 0);
        }
        align_to(&mut bytes, 16);
        bytes
    }
}

fn align_to(bytes: &mut Vec<u8>, alignment: usize) {
    let rem = bytes.len() % alignment;
    if rem != 0 {
        bytes.resize(bytes.len() + alignment - rem, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Id;

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut u = Uniforms::new().with("a", 1.0).with("b", 2.0);
        u.set("a", 3.0);
        assert_eq!(u.len(), 2);
        assert_eq!(u.float("a"), Some(3.0));
        assert_eq!(u.iter().next().map(|(n, _)| n), Some("a"));
    }

    #[test]
    fn test_textures_are_not_packed() {
        let id = Id::new();
        let u = Uniforms::new()
            .with_texture_slot("tDiffuse")
            .with("opacity", 0.5)
            .with("tOther", TextureSource::RenderTarget(id));
        let packed = u.pack();
        assert_eq!(packed.len(), 16);
        assert_eq!(floats(&packed)[0], 0.5);

        let slots: Vec<_> = u.textures().collect();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0], ("tDiffuse", None));
        assert_eq!(u.texture("tOther"), Some(&TextureSource::RenderTarget(id)));
    }

    #[test]
    fn test_vec2_and_array_alignment() {
        let u = Uniforms::new()
            .with("increment", Vec2::new(1.0, 2.0))
            .with("kernel", UniformValue::FloatArray(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
        let f = floats(&u.pack());
        // vec2 at 0, array starts at 16 with two vec4 lanes
        assert_eq!(f.len(), 12);
        assert_eq!(&f[0..2], &[1.0, 2.0]);
        assert_eq!(&f[4..9], &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(&f[9..12], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scalar_then_vec3() {
        let u = Uniforms::new().with("x", 1.0).with("color", Vec3::ONE);
        let f = floats(&u.pack());
        assert_eq!(f.len(), 8);
        assert_eq!(f[0], 1.0);
        assert_eq!(&f[4..7], &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_empty_block_is_padded() {
        assert_eq!(Uniforms::new().with_texture_slot("t").pack(), vec![0u8; 16]);
    }
}
