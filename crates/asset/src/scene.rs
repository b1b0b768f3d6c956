//! Parsed-scene data model: an owned, arena-indexed node tree plus mesh
//! channels and material texture declarations, as produced by a format
//! backend. The importer only ever sees this representation.

use std::path::Path;

use crate::error::{ImportError, ImportResult};

/// Post-process steps requested from a format backend. Backends honor the
/// steps their format can express and treat the rest as no-ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostProcess {
    /// Split polygonal faces into triangle fans.
    Triangulate,
    /// Generate averaged vertex normals when the file declares none.
    GenSmoothNormals,
    /// Flip the V texture axis (`v -> 1 - v`).
    FlipUvs,
    /// Accepted for contract compatibility; the vertex layout carries no
    /// tangent channel, so both backends ignore it.
    CalcTangentSpace,
}

/// Semantic texture role within a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureRole {
    /// Fixed query order: diffuse, specular, normal, height.
    pub const ALL: [TextureRole; 4] = [
        TextureRole::Diffuse,
        TextureRole::Specular,
        TextureRole::Normal,
        TextureRole::Height,
    ];

    /// Display prefix; a slot index is appended to form the reference
    /// name seen by materials (e.g. `texture_normal1`).
    pub fn prefix(self) -> &'static str {
        match self {
            TextureRole::Diffuse => "texture_diffuse",
            TextureRole::Specular => "texture_specular",
            TextureRole::Normal => "texture_normal",
            TextureRole::Height => "texture_height",
        }
    }

    fn ordinal(self) -> usize {
        match self {
            TextureRole::Diffuse => 0,
            TextureRole::Specular => 1,
            TextureRole::Normal => 2,
            TextureRole::Height => 3,
        }
    }
}

/// One face as declared by the source; three indices once triangulated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Face(pub Vec<u32>);

/// Vertex channels of one source mesh. `positions` is mandatory; absent
/// channels stay `None` so the extractor can apply its documented defaults.
#[derive(Clone, Debug, Default)]
pub struct SceneMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub faces: Vec<Face>,
    pub material_id: Option<usize>,
}

/// Declared texture paths per role, in declaration order. Paths are kept
/// verbatim as authored; resolution against the asset directory happens
/// at decode time.
#[derive(Clone, Debug, Default)]
pub struct SceneMaterial {
    pub name: String,
    texture_paths: [Vec<String>; 4],
}

impl SceneMaterial {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            texture_paths: Default::default(),
        }
    }

    pub fn declare(&mut self, role: TextureRole, path: impl Into<String>) {
        self.texture_paths[role.ordinal()].push(path.into());
    }

    pub fn declared(&self, role: TextureRole) -> &[String] {
        &self.texture_paths[role.ordinal()]
    }
}

/// Scene-graph node: zero or more mesh references plus child node ids.
#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: String,
    pub mesh_ids: Vec<usize>,
    pub children: Vec<usize>,
}

/// Owned scene graph over dense arenas. Node children are indices into
/// `nodes`, so traversal needs no recursion over borrowed library state.
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
    pub root: usize,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
}

impl SceneGraph {
    /// Check the cross-arena index invariants. A violation is the
    /// "incomplete scene" condition: the graph must not be traversed.
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("scene has no root node".into());
        }
        if self.root >= self.nodes.len() {
            return Err(format!(
                "root node id {} out of range ({} nodes)",
                self.root,
                self.nodes.len()
            ));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if child >= self.nodes.len() {
                    return Err(format!("node {id} references missing child {child}"));
                }
            }
            for &mesh in &node.mesh_ids {
                if mesh >= self.meshes.len() {
                    return Err(format!("node {id} references missing mesh {mesh}"));
                }
            }
        }
        for (id, mesh) in self.meshes.iter().enumerate() {
            if let Some(mat) = mesh.material_id {
                if mat >= self.materials.len() {
                    return Err(format!("mesh {id} references missing material {mat}"));
                }
            }
        }
        Ok(())
    }
}

/// Format backend: parse an asset file into a [`SceneGraph`], applying the
/// requested post-process steps where the format allows.
pub trait SceneParser {
    fn parse(&self, path: &Path, steps: &[PostProcess]) -> ImportResult<SceneGraph>;
}

impl<T: SceneParser + ?Sized> SceneParser for Box<T> {
    fn parse(&self, path: &Path, steps: &[PostProcess]) -> ImportResult<SceneGraph> {
        (**self).parse(path, steps)
    }
}

/// Pick a backend from the file extension.
pub fn parser_for(path: &Path) -> ImportResult<Box<dyn SceneParser>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| ImportError::parse(path, "path has no file extension"))?;

    match ext.as_str() {
        "obj" => Ok(Box::new(crate::obj::ObjParser)),
        "gltf" | "glb" => Ok(Box::new(crate::gltf::GltfParser)),
        other => Err(ImportError::parse(
            path,
            format!("unsupported asset format '{other}'"),
        )),
    }
}

/// Area-weighted smooth normals from triangle faces. Faces that are not
/// triangles or reference out-of-range vertices are skipped; the caller
/// validates those separately.
pub fn generate_smooth_normals(positions: &[[f32; 3]], faces: &[Face]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0f32; 3]; positions.len()];

    for face in faces {
        let [a, b, c] = match face.0.as_slice() {
            &[a, b, c] => [a as usize, b as usize, c as usize],
            _ => continue,
        };
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = positions[a];
        let pb = positions[b];
        let pc = positions[c];
        let e1 = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let e2 = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];
        // Unnormalized cross product; the magnitude carries the area weight.
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        for idx in [a, b, c] {
            normals[idx][0] += n[0];
            normals[idx][1] += n[1];
            normals[idx][2] += n[2];
        }
    }

    for n in &mut normals {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > 1e-12 {
            n[0] /= len;
            n[1] /= len;
            n[2] /= len;
        }
    }
    normals
}
