//! Model importer: drives a format backend with the fixed post-process
//! configuration, flattens the node tree depth-first into mesh resources,
//! and decodes each distinct declared texture path exactly once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ImportError, ImportResult};
use crate::model::{MeshResource, Model, TextureRef, Vertex};
use crate::scene::{self, PostProcess, SceneGraph, SceneMesh, SceneParser, TextureRole};
use crate::texture::{self, TextureData};

/// Fixed post-process configuration passed to every backend.
pub const POST_PROCESS: [PostProcess; 4] = [
    PostProcess::Triangulate,
    PostProcess::GenSmoothNormals,
    PostProcess::FlipUvs,
    PostProcess::CalcTangentSpace,
];

/// Import service over one format backend. Construct it explicitly and
/// keep it wherever imports happen; it holds no cross-import state.
pub struct Importer<P: SceneParser> {
    parser: P,
}

impl<P: SceneParser> Importer<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    /// Import one asset file into a flat, renderer-ready [`Model`].
    ///
    /// Blocking and synchronous; returns only when every mesh is
    /// flattened and every referenced texture decoded (or replaced by
    /// the placeholder). Texture paths resolve against the asset's
    /// parent directory, never the process working directory.
    pub fn load_model(&self, path: &Path) -> ImportResult<Model> {
        let scene = self.parser.parse(path, &POST_PROCESS)?;
        scene
            .validate()
            .map_err(|reason| ImportError::parse(path, reason))?;

        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut model = Model::default();
        // Declared path -> texture index, scoped to this import only.
        let mut seen_paths: HashMap<String, usize> = HashMap::new();

        // Depth-first pre-order over the owned arena: meshes of a node
        // first, then its children in listed order. Children are pushed
        // in reverse so the first child is processed first.
        let mut visited = vec![false; scene.nodes.len()];
        let mut stack = vec![scene.root];
        while let Some(node_id) = stack.pop() {
            if visited[node_id] {
                return Err(ImportError::Integrity(format!(
                    "node {node_id} reached twice; node graph is not a tree"
                )));
            }
            visited[node_id] = true;

            let node = &scene.nodes[node_id];
            for &mesh_id in &node.mesh_ids {
                let mesh = extract_mesh(
                    &scene.meshes[mesh_id],
                    &scene,
                    &base_dir,
                    &mut model.textures,
                    &mut seen_paths,
                )?;
                model.meshes.push(mesh);
            }
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }

        log::info!(
            "imported {}: {} meshes, {} textures",
            path.display(),
            model.meshes.len(),
            model.textures.len()
        );
        debug_assert!(model.check_references());
        Ok(model)
    }
}

/// Import using the backend selected from the file extension.
pub fn load_model(path: &Path) -> ImportResult<Model> {
    Importer::new(scene::parser_for(path)?).load_model(path)
}

/// Flatten one source mesh: vertices in source order with documented
/// defaults for absent channels, triangle indices, and texture references
/// resolved through the dedup table.
fn extract_mesh(
    mesh: &SceneMesh,
    scene: &SceneGraph,
    base_dir: &Path,
    textures: &mut Vec<TextureData>,
    seen_paths: &mut HashMap<String, usize>,
) -> ImportResult<MeshResource> {
    let vertex_count = mesh.positions.len();
    if let Some(normals) = &mesh.normals {
        if normals.len() != vertex_count {
            return Err(ImportError::Integrity(format!(
                "normal channel length {} != vertex count {vertex_count}",
                normals.len()
            )));
        }
    }
    if let Some(uvs) = &mesh.uvs {
        if uvs.len() != vertex_count {
            return Err(ImportError::Integrity(format!(
                "uv channel length {} != vertex count {vertex_count}",
                uvs.len()
            )));
        }
    }

    let mut vertices = Vec::with_capacity(vertex_count);
    for i in 0..vertex_count {
        vertices.push(Vertex::new(
            mesh.positions[i],
            mesh.normals.as_ref().map_or([0.0; 3], |n| n[i]),
            mesh.uvs.as_ref().map_or([0.0; 2], |uv| uv[i]),
        ));
    }

    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
    for face in &mesh.faces {
        if face.0.len() != 3 {
            return Err(ImportError::Integrity(format!(
                "face with {} indices after triangulation",
                face.0.len()
            )));
        }
        for &index in &face.0 {
            if index as usize >= vertex_count {
                return Err(ImportError::Integrity(format!(
                    "face index {index} out of range ({vertex_count} vertices)"
                )));
            }
            indices.push(index);
        }
    }

    let mut texture_refs = Vec::new();
    if let Some(material_id) = mesh.material_id {
        let material = &scene.materials[material_id];
        for role in TextureRole::ALL {
            for (slot, declared) in material.declared(role).iter().enumerate() {
                let index = resolve_texture(declared, base_dir, textures, seen_paths);
                texture_refs.push(TextureRef {
                    role,
                    slot: slot as u32,
                    index,
                });
            }
        }
    }

    Ok(MeshResource {
        vertices,
        indices,
        texture_refs,
    })
}

/// Look the declared path up in the dedup table; decode and append on a
/// miss. Matching is on the literal declared string, so two spellings of
/// the same file are two textures (consistent with how paths are authored
/// within a single asset).
fn resolve_texture(
    declared: &str,
    base_dir: &Path,
    textures: &mut Vec<TextureData>,
    seen_paths: &mut HashMap<String, usize>,
) -> usize {
    if let Some(&index) = seen_paths.get(declared) {
        return index;
    }

    let resolved: PathBuf = base_dir.join(declared);
    let data = match texture::decode_file(&resolved) {
        Ok(data) => data,
        Err(err) => {
            // Non-fatal: the slot stays addressable via the placeholder.
            log::warn!("{err}; substituting placeholder");
            TextureData::placeholder()
        }
    };

    let index = textures.len();
    textures.push(data);
    seen_paths.insert(declared.to_string(), index);
    index
}
