//! glTF 2.0 backend. The document's node array maps directly onto the
//! scene-graph arena (glTF children are already indices); each triangle
//! primitive of a referenced mesh becomes one scene mesh.

use std::fs;
use std::path::Path;

use crate::error::{ImportError, ImportResult};
use crate::scene::{
    Face, PostProcess, SceneGraph, SceneMaterial, SceneMesh, SceneNode, SceneParser,
    TextureRole, generate_smooth_normals,
};

pub struct GltfParser;

impl SceneParser for GltfParser {
    fn parse(&self, path: &Path, steps: &[PostProcess]) -> ImportResult<SceneGraph> {
        let gltf = ::gltf::Gltf::open(path)
            .map_err(|e| ImportError::parse(path, format!("failed to open glTF: {e}")))?;
        let base_dir = path.parent().unwrap_or(Path::new("."));

        let buffers = load_buffers(&gltf, base_dir, path)?;
        let flip_uvs = steps.contains(&PostProcess::FlipUvs);
        let gen_normals = steps.contains(&PostProcess::GenSmoothNormals);

        let mut scene = SceneGraph::default();

        // Materials: URI texture sources only; embedded buffer views have
        // no on-disk path for the dedup table to key on.
        for material in gltf.materials() {
            let mut out = SceneMaterial::named(
                material.name().unwrap_or("material").to_string(),
            );
            let pbr = material.pbr_metallic_roughness();
            if let Some(info) = pbr.base_color_texture() {
                declare_texture(&mut out, TextureRole::Diffuse, info.texture(), path);
            }
            if let Some(normal) = material.normal_texture() {
                declare_texture(&mut out, TextureRole::Normal, normal.texture(), path);
            }
            scene.materials.push(out);
        }

        // Meshes: one SceneMesh per primitive; remember which scene-mesh
        // ids every glTF mesh expanded into for the node pass below.
        let mut primitive_ids: Vec<Vec<usize>> = Vec::new();
        for mesh in gltf.meshes() {
            let mut ids = Vec::new();
            for primitive in mesh.primitives() {
                ids.push(scene.meshes.len());
                scene.meshes.push(read_primitive(
                    &primitive,
                    &buffers,
                    path,
                    flip_uvs,
                    gen_normals,
                )?);
            }
            primitive_ids.push(ids);
        }

        // Nodes: arena slot i == document node i, plus a synthetic root.
        for node in gltf.nodes() {
            let mesh_ids = node
                .mesh()
                .map(|m| primitive_ids[m.index()].clone())
                .unwrap_or_default();
            scene.nodes.push(SceneNode {
                name: node
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("node{}", node.index())),
                mesh_ids,
                children: node.children().map(|c| c.index()).collect(),
            });
        }

        let doc_scene = gltf
            .default_scene()
            .or_else(|| gltf.scenes().next())
            .ok_or_else(|| ImportError::parse(path, "glTF document has no scene"))?;
        let root = scene.nodes.len();
        scene.nodes.push(SceneNode {
            name: "root".to_string(),
            mesh_ids: Vec::new(),
            children: doc_scene.nodes().map(|n| n.index()).collect(),
        });
        scene.root = root;

        Ok(scene)
    }
}

fn load_buffers(gltf: &::gltf::Gltf, base_dir: &Path, origin: &Path) -> ImportResult<Vec<Vec<u8>>> {
    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            ::gltf::buffer::Source::Bin => gltf
                .blob
                .as_ref()
                .cloned()
                .ok_or_else(|| ImportError::parse(origin, "GLB binary chunk missing"))?,
            ::gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    return Err(ImportError::parse(
                        origin,
                        "embedded data: buffer URIs are not supported",
                    ));
                }
                let buf_path = base_dir.join(uri);
                fs::read(&buf_path).map_err(|e| {
                    ImportError::parse(
                        origin,
                        format!("failed to read buffer '{}': {e}", buf_path.display()),
                    )
                })?
            }
        };
        buffers.push(data);
    }
    Ok(buffers)
}

fn declare_texture(
    material: &mut SceneMaterial,
    role: TextureRole,
    texture: ::gltf::Texture<'_>,
    origin: &Path,
) {
    match texture.source().source() {
        ::gltf::image::Source::Uri { uri, .. } => material.declare(role, uri),
        ::gltf::image::Source::View { .. } => {
            log::warn!(
                "{}: embedded texture for {:?} role skipped (no file path to key on)",
                origin.display(),
                role
            );
        }
    }
}

fn read_primitive(
    primitive: &::gltf::Primitive<'_>,
    buffers: &[Vec<u8>],
    origin: &Path,
    flip_uvs: bool,
    gen_normals: bool,
) -> ImportResult<SceneMesh> {
    if primitive.mode() != ::gltf::mesh::Mode::Triangles {
        return Err(ImportError::parse(
            origin,
            format!("unsupported primitive mode {:?}", primitive.mode()),
        ));
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| ImportError::parse(origin, "glTF primitive is missing positions"))?
        .collect();

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|tc| {
        tc.into_f32()
            .map(|[u, v]| [u, if flip_uvs { 1.0 - v } else { v }])
            .collect()
    });

    let indices: Vec<u32> = match reader.read_indices() {
        Some(read) => read.into_u32().collect(),
        // Non-indexed geometry: vertices are consumed in order.
        None => (0..positions.len() as u32).collect(),
    };
    if indices.len() % 3 != 0 {
        return Err(ImportError::parse(
            origin,
            format!("triangle index count {} not divisible by 3", indices.len()),
        ));
    }
    let faces: Vec<Face> = indices
        .chunks_exact(3)
        .map(|tri| Face(tri.to_vec()))
        .collect();

    let normals = match normals {
        Some(n) => Some(n),
        None if gen_normals => Some(generate_smooth_normals(&positions, &faces)),
        None => None,
    };

    Ok(SceneMesh {
        positions,
        normals,
        uvs,
        faces,
        material_id: primitive.material().index(),
    })
}
