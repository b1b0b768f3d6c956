//! OBJ/MTL backend. Produces a scene graph with one node and one mesh per
//! object/material group, a synthetic root, and materials carrying the
//! texture paths declared by the MTL library.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{ImportError, ImportResult};
use crate::scene::{
    Face, PostProcess, SceneGraph, SceneMaterial, SceneMesh, SceneNode, SceneParser,
    TextureRole, generate_smooth_normals,
};

pub struct ObjParser;

impl SceneParser for ObjParser {
    fn parse(&self, path: &Path, steps: &[PostProcess]) -> ImportResult<SceneGraph> {
        let file = File::open(path)
            .map_err(|e| ImportError::parse(path, format!("failed to open OBJ file: {e}")))?;
        parse_obj(BufReader::new(file), steps, path.parent(), path)
    }
}

/// Parse OBJ source that has no backing file. `mtllib` directives are
/// skipped because there is no directory to resolve them against.
pub fn parse_obj_str(contents: &str, steps: &[PostProcess]) -> ImportResult<SceneGraph> {
    parse_obj(
        io::Cursor::new(contents),
        steps,
        None,
        Path::new("<inline>.obj"),
    )
}

/// Per-group mesh under construction. Vertices are deduplicated on the
/// (position, uv, normal) index triple, the way indexed formats expect.
struct MeshBuilder {
    name: String,
    material: Option<String>,
    unique: HashMap<(usize, Option<usize>, Option<usize>), u32>,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    any_normals: bool,
    any_uvs: bool,
    faces: Vec<Face>,
}

impl MeshBuilder {
    fn new(name: String, material: Option<String>) -> Self {
        Self {
            name,
            material,
            unique: HashMap::new(),
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            any_normals: false,
            any_uvs: false,
            faces: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

fn parse_obj<R: BufRead>(
    reader: R,
    steps: &[PostProcess],
    base_dir: Option<&Path>,
    origin: &Path,
) -> ImportResult<SceneGraph> {
    let triangulate = steps.contains(&PostProcess::Triangulate);
    let flip_uvs = steps.contains(&PostProcess::FlipUvs);
    let gen_normals = steps.contains(&PostProcess::GenSmoothNormals);

    // Global attribute pools; faces index into these, groups own copies.
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut materials: Vec<SceneMaterial> = Vec::new();
    let mut material_index: HashMap<String, usize> = HashMap::new();

    let mut finished: Vec<MeshBuilder> = Vec::new();
    let mut object_name = String::from("default");
    // usemtl state persists across o/g boundaries until changed.
    let mut active_material: Option<String> = None;
    let mut current = MeshBuilder::new(object_name.clone(), None);

    let perr = |line_no: usize, reason: String| {
        ImportError::parse(origin, format!("line {}: {}", line_no + 1, reason))
    };

    for (line_no, line) in reader.lines().enumerate() {
        let line =
            line.map_err(|e| perr(line_no, format!("failed to read line: {e}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let tag = match parts.next() {
            Some(tag) => tag,
            None => continue,
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), "x coordinate").map_err(|r| perr(line_no, r))?;
                let y = parse_f32(parts.next(), "y coordinate").map_err(|r| perr(line_no, r))?;
                let z = parse_f32(parts.next(), "z coordinate").map_err(|r| perr(line_no, r))?;
                positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), "u coordinate").map_err(|r| perr(line_no, r))?;
                let v = parse_f32(parts.next(), "v coordinate").map_err(|r| perr(line_no, r))?;
                texcoords.push([u, if flip_uvs { 1.0 - v } else { v }]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), "nx coordinate").map_err(|r| perr(line_no, r))?;
                let ny = parse_f32(parts.next(), "ny coordinate").map_err(|r| perr(line_no, r))?;
                let nz = parse_f32(parts.next(), "nz coordinate").map_err(|r| perr(line_no, r))?;
                normals.push([nx, ny, nz]);
            }
            "o" | "g" => {
                if !current.is_empty() {
                    finished.push(current);
                }
                object_name = parts.next().unwrap_or("default").to_string();
                current = MeshBuilder::new(object_name.clone(), active_material.clone());
            }
            "usemtl" => {
                let name = parts
                    .next()
                    .ok_or_else(|| perr(line_no, "usemtl without a material name".into()))?
                    .to_string();
                active_material = Some(name.clone());
                if !current.is_empty() && current.material.as_deref() != Some(name.as_str()) {
                    finished.push(current);
                    current = MeshBuilder::new(object_name.clone(), Some(name));
                } else {
                    current.material = Some(name);
                }
            }
            "mtllib" => match base_dir {
                Some(dir) => {
                    for lib in parts {
                        load_mtl_library(
                            &dir.join(lib),
                            &mut materials,
                            &mut material_index,
                        );
                    }
                }
                None => {
                    log::warn!("ignoring mtllib in OBJ source without a base directory");
                }
            },
            "f" => {
                let mut face_indices: Vec<u32> = Vec::new();
                for token in parts {
                    let (vi, vti, vni) = parse_face_vertex(
                        token,
                        positions.len(),
                        texcoords.len(),
                        normals.len(),
                    )
                    .map_err(|r| perr(line_no, r))?;

                    let key = (vi, vti, vni);
                    let index = match current.unique.get(&key) {
                        Some(&idx) => idx,
                        None => {
                            let idx = u32::try_from(current.positions.len()).map_err(|_| {
                                perr(line_no, format!("too many vertices in group (>{})", u32::MAX))
                            })?;
                            current.positions.push(positions[vi]);
                            current
                                .uvs
                                .push(vti.and_then(|i| texcoords.get(i).copied()).unwrap_or([0.0; 2]));
                            current
                                .normals
                                .push(vni.and_then(|i| normals.get(i).copied()).unwrap_or([0.0; 3]));
                            current.any_uvs |= vti.is_some();
                            current.any_normals |= vni.is_some();
                            current.unique.insert(key, idx);
                            idx
                        }
                    };
                    face_indices.push(index);
                }

                if face_indices.len() < 3 {
                    log::warn!(
                        "{}: skipping degenerate face with {} vertices on line {}",
                        origin.display(),
                        face_indices.len(),
                        line_no + 1
                    );
                    continue;
                }
                if triangulate {
                    // Triangulate fan
                    for tri in 1..(face_indices.len() - 1) {
                        current.faces.push(Face(vec![
                            face_indices[0],
                            face_indices[tri],
                            face_indices[tri + 1],
                        ]));
                    }
                } else {
                    current.faces.push(Face(face_indices));
                }
            }
            _ => {
                // Ignore other directives (s/mtl options/etc.)
            }
        }
    }

    if !current.is_empty() {
        finished.push(current);
    }
    if finished.is_empty() {
        return Err(ImportError::parse(origin, "OBJ contained no faces"));
    }

    Ok(build_scene(finished, materials, material_index, origin, gen_normals))
}

fn build_scene(
    groups: Vec<MeshBuilder>,
    materials: Vec<SceneMaterial>,
    material_index: HashMap<String, usize>,
    origin: &Path,
    gen_normals: bool,
) -> SceneGraph {
    let mut scene = SceneGraph {
        materials,
        ..Default::default()
    };

    let root_name = origin
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scene")
        .to_string();
    scene.nodes.push(SceneNode {
        name: root_name,
        mesh_ids: Vec::new(),
        children: Vec::new(),
    });

    for group in groups {
        let material_id = match &group.material {
            Some(name) => {
                let id = material_index.get(name).copied();
                if id.is_none() {
                    log::warn!(
                        "{}: material '{}' not found in any mtllib",
                        origin.display(),
                        name
                    );
                }
                id
            }
            None => None,
        };

        let normals = if group.any_normals {
            Some(group.normals)
        } else if gen_normals {
            Some(generate_smooth_normals(&group.positions, &group.faces))
        } else {
            None
        };

        let mesh_id = scene.meshes.len();
        scene.meshes.push(SceneMesh {
            uvs: group.any_uvs.then_some(group.uvs),
            positions: group.positions,
            normals,
            faces: group.faces,
            material_id,
        });

        let node_id = scene.nodes.len();
        scene.nodes.push(SceneNode {
            name: group.name,
            mesh_ids: vec![mesh_id],
            children: Vec::new(),
        });
        scene.nodes[0].children.push(node_id);
    }

    scene
}

/// Read one MTL library into the material table. A missing or malformed
/// library is reported and skipped; meshes that referenced it end up
/// without a material, which the importer tolerates.
fn load_mtl_library(
    path: &Path,
    materials: &mut Vec<SceneMaterial>,
    material_index: &mut HashMap<String, usize>,
) {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log::warn!("failed to open MTL library {}: {e}", path.display());
            return;
        }
    };
    parse_mtl(BufReader::new(file), materials, material_index);
}

fn parse_mtl<R: BufRead>(
    reader: R,
    materials: &mut Vec<SceneMaterial>,
    material_index: &mut HashMap<String, usize>,
) {
    let mut current: Option<usize> = None;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("failed to read MTL line: {e}");
                return;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let tag = match parts.next() {
            Some(tag) => tag.to_ascii_lowercase(),
            None => continue,
        };

        if tag == "newmtl" {
            let name = parts.next().unwrap_or("default").to_string();
            let id = *material_index.entry(name.clone()).or_insert_with(|| {
                materials.push(SceneMaterial::named(name));
                materials.len() - 1
            });
            current = Some(id);
            continue;
        }

        let role = match tag.as_str() {
            "map_kd" => Some(TextureRole::Diffuse),
            "map_ks" => Some(TextureRole::Specular),
            "map_bump" | "bump" | "norm" => Some(TextureRole::Normal),
            "disp" | "map_disp" => Some(TextureRole::Height),
            _ => None,
        };
        let Some(role) = role else { continue };

        // Map statements may carry option tokens (-bm 0.5 ...); the
        // texture path is the last argument token.
        let Some(file) = parts.last() else {
            log::warn!("MTL {tag} statement without a file argument; ignoring");
            continue;
        };
        match current {
            Some(id) => materials[id].declare(role, file),
            None => log::warn!("MTL texture declaration before any newmtl; ignoring"),
        }
    }
}

fn parse_f32(value: Option<&str>, what: &str) -> Result<f32, String> {
    let token = value.ok_or_else(|| format!("missing {what}"))?;
    token
        .parse::<f32>()
        .map_err(|e| format!("failed to parse {what}: {e}"))
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
) -> Result<(usize, Option<usize>, Option<usize>), String> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .ok_or_else(|| format!("malformed face element '{token}'"))?;
    let pos_idx = resolve_index(pos, pos_count)?;

    let tex_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count)?),
        _ => None,
    };

    let norm_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count)?),
        _ => None,
    };

    Ok((pos_idx, tex_idx, norm_idx))
}

/// OBJ indices are 1-based; negative values count back from the end.
fn resolve_index(token: &str, len: usize) -> Result<usize, String> {
    let raw = token
        .parse::<i64>()
        .map_err(|e| format!("invalid index '{token}': {e}"))?;
    if raw == 0 {
        return Err("OBJ indices are 1-based; found 0".into());
    }

    let idx = if raw > 0 {
        raw - 1
    } else {
        len as i64 + raw
    };

    if idx < 0 || idx as usize >= len {
        return Err(format!("index {raw} resolved out of bounds (len={len})"));
    }
    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::POST_PROCESS;

    const TRIANGLE: &str = r#"
        v 0.0 0.0 0.0
        v 1.0 0.0 0.0
        v 0.0 1.0 0.0
        vn 0.0 0.0 1.0
        vt 0.0 0.0
        vt 1.0 0.0
        vt 0.0 1.0
        f 1/1/1 2/2/1 3/3/1
    "#;

    #[test]
    fn parse_simple_triangle() {
        let scene = parse_obj_str(TRIANGLE, &POST_PROCESS).expect("parse triangle");
        assert_eq!(scene.meshes.len(), 1);
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.faces, vec![Face(vec![0, 1, 2])]);
        assert!(mesh.normals.is_some());
        assert!(mesh.uvs.is_some());
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn quad_becomes_two_triangles_under_triangulate() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 1 1 0
            v 0 1 0
            f 1 2 3 4
        "#;
        let scene = parse_obj_str(src, &[PostProcess::Triangulate]).expect("parse quad");
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.faces[0], Face(vec![0, 1, 2]));
        assert_eq!(mesh.faces[1], Face(vec![0, 2, 3]));

        let raw = parse_obj_str(src, &[]).expect("parse without triangulation");
        assert_eq!(raw.meshes[0].faces.len(), 1);
        assert_eq!(raw.meshes[0].faces[0].0.len(), 4);
    }

    #[test]
    fn flip_uvs_inverts_v_axis() {
        let scene = parse_obj_str(TRIANGLE, &[PostProcess::FlipUvs]).expect("parse");
        let uvs = scene.meshes[0].uvs.as_ref().expect("uvs present");
        // vt 0.0 0.0 -> v flipped to 1.0
        assert!((uvs[0][1] - 1.0).abs() < 1e-6);

        let plain = parse_obj_str(TRIANGLE, &[]).expect("parse");
        assert!((plain.meshes[0].uvs.as_ref().unwrap()[0][1]).abs() < 1e-6);
    }

    #[test]
    fn smooth_normals_generated_only_when_requested() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 1 0 -1
            f 1 2 3
        "#;
        let with = parse_obj_str(src, &[PostProcess::Triangulate, PostProcess::GenSmoothNormals])
            .expect("parse");
        let normals = with.meshes[0].normals.as_ref().expect("generated normals");
        assert!((normals[0][1] - 1.0).abs() < 1e-6, "flat face points up");

        let without = parse_obj_str(src, &[PostProcess::Triangulate]).expect("parse");
        assert!(without.meshes[0].normals.is_none());
    }

    #[test]
    fn objects_become_sibling_nodes_in_listed_order() {
        let src = r#"
            o first
            v 0 0 0
            v 1 0 0
            v 0 1 0
            f 1 2 3
            o second
            v 0 0 1
            v 1 0 1
            v 0 1 1
            f 4 5 6
        "#;
        let scene = parse_obj_str(src, &POST_PROCESS).expect("parse");
        assert_eq!(scene.meshes.len(), 2);
        let root = &scene.nodes[scene.root];
        assert_eq!(root.children.len(), 2);
        assert_eq!(scene.nodes[root.children[0]].name, "first");
        assert_eq!(scene.nodes[root.children[1]].name, "second");
        assert_eq!(scene.nodes[root.children[0]].mesh_ids, vec![0]);
        assert_eq!(scene.nodes[root.children[1]].mesh_ids, vec![1]);
    }

    #[test]
    fn usemtl_change_splits_the_group() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            usemtl a
            f 1 2 3
            usemtl b
            f 1 2 3
        "#;
        let scene = parse_obj_str(src, &POST_PROCESS).expect("parse");
        assert_eq!(scene.meshes.len(), 2);
        // No mtllib was resolvable, so both meshes stay without materials.
        assert!(scene.meshes.iter().all(|m| m.material_id.is_none()));
    }

    #[test]
    fn negative_indices_resolve_from_the_end() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            f -3 -2 -1
        "#;
        let scene = parse_obj_str(src, &POST_PROCESS).expect("parse");
        assert_eq!(scene.meshes[0].faces[0], Face(vec![0, 1, 2]));
    }

    #[test]
    fn empty_source_is_a_parse_error() {
        let err = parse_obj_str("# nothing here\n", &POST_PROCESS).unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
    }

    #[test]
    fn mtl_statements_map_to_texture_roles() {
        let src = r#"
            newmtl painted
            Kd 0.8 0.8 0.8
            map_Kd diffuse.png
            map_Ks specular.png
            map_Bump -bm 0.5 normal.png
            disp height.png
        "#;
        let mut materials = Vec::new();
        let mut index = HashMap::new();
        parse_mtl(io::Cursor::new(src), &mut materials, &mut index);

        assert_eq!(materials.len(), 1);
        let mat = &materials[0];
        assert_eq!(mat.name, "painted");
        assert_eq!(mat.declared(TextureRole::Diffuse), ["diffuse.png"]);
        assert_eq!(mat.declared(TextureRole::Specular), ["specular.png"]);
        assert_eq!(mat.declared(TextureRole::Normal), ["normal.png"]);
        assert_eq!(mat.declared(TextureRole::Height), ["height.png"]);
    }

    #[test]
    fn mtl_map_without_argument_declares_nothing() {
        let src = "newmtl broken\nmap_Kd\nmap_Ks specular.png\n";
        let mut materials = Vec::new();
        let mut index = HashMap::new();
        parse_mtl(io::Cursor::new(src), &mut materials, &mut index);

        assert_eq!(materials.len(), 1);
        assert!(materials[0].declared(TextureRole::Diffuse).is_empty());
        assert_eq!(
            materials[0].declared(TextureRole::Specular),
            ["specular.png"]
        );
    }

    #[test]
    fn obj_with_mtllib_resolves_material_ids() {
        let dir = std::env::temp_dir().join(format!("asset-obj-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        std::fs::write(
            dir.join("cube.mtl"),
            "newmtl wood\nmap_Kd wood.png\n",
        )
        .expect("write mtl");
        std::fs::write(
            dir.join("cube.obj"),
            "mtllib cube.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl wood\nf 1 2 3\n",
        )
        .expect("write obj");

        let scene = ObjParser
            .parse(&dir.join("cube.obj"), &POST_PROCESS)
            .expect("parse obj with mtl");
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.meshes[0].material_id, Some(0));
        assert_eq!(
            scene.materials[0].declared(TextureRole::Diffuse),
            ["wood.png"]
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = ObjParser
            .parse(Path::new("/no/such/dir/model.obj"), &POST_PROCESS)
            .unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
    }
}
