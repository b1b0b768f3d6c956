//! Flat, renderer-ready model resources produced by the importer.

use bytemuck::{Pod, Zeroable};

use crate::scene::TextureRole;
use crate::texture::TextureData;

/// Interleaved vertex as uploaded to the render engine. Normal is zero
/// when the source mesh has no normal channel; uv defaults to (0,0) when
/// UV channel 0 is absent.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Named reference from a mesh into the model's texture sequence.
/// Several meshes may reference the same index; that is the dedup
/// invariant, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureRef {
    pub role: TextureRole,
    /// Slot index within the role, in the material's declaration order.
    pub slot: u32,
    /// Position in [`Model::textures`].
    pub index: usize,
}

impl TextureRef {
    /// Display name as consumed by materials, e.g. `texture_diffuse0`.
    pub fn name(&self) -> String {
        format!("{}{}", self.role.prefix(), self.slot)
    }
}

/// One flattened mesh: vertices in source order, triangle indices, and
/// the texture references resolved from its material. Immutable once the
/// importer has produced it.
#[derive(Clone, Debug, Default)]
pub struct MeshResource {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub texture_refs: Vec<TextureRef>,
}

impl MeshResource {
    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Root aggregate handed to the caller: flattened meshes plus the
/// deduplicated decoded textures they reference by index.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub meshes: Vec<MeshResource>,
    pub textures: Vec<TextureData>,
}

impl Model {
    /// Check that every texture reference lands inside the texture
    /// sequence and every index inside its mesh's vertex sequence.
    pub fn check_references(&self) -> bool {
        self.meshes.iter().all(|mesh| {
            mesh.texture_refs
                .iter()
                .all(|r| r.index < self.textures.len())
                && mesh
                    .indices
                    .iter()
                    .all(|&i| (i as usize) < mesh.vertices.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_ref_display_name() {
        let r = TextureRef {
            role: TextureRole::Normal,
            slot: 1,
            index: 4,
        };
        assert_eq!(r.name(), "texture_normal1");
    }

    #[test]
    fn reference_check_catches_out_of_range() {
        let mut model = Model::default();
        model.meshes.push(MeshResource {
            vertices: vec![Vertex::default()],
            indices: vec![0],
            texture_refs: vec![TextureRef {
                role: TextureRole::Diffuse,
                slot: 0,
                index: 0,
            }],
        });
        assert!(!model.check_references(), "no texture at index 0");

        model.textures.push(TextureData::placeholder());
        assert!(model.check_references());

        model.meshes[0].indices.push(7);
        assert!(!model.check_references(), "vertex index 7 out of range");
    }
}
