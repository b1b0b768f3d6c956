//! Scene assembler: consumes an imported model, uploads its resources to
//! a render engine, and registers one positioned instance per mesh.

use asset::Model;
use corelib::transform::Transform;

use crate::{Instance, InstanceId, Material, RenderEngine, RenderError, ShaderId, TextureId};

/// Upload the model's textures and meshes and register an instance per
/// mesh, all under one shader and one world transform.
///
/// The model is consumed: each pixel buffer moves into the engine exactly
/// once. A failed texture upload keeps its position as `None` so texture
/// references stay positional; any instance that needs it is skipped. An
/// out-of-range texture reference is a fatal integrity error and aborts
/// assembly. Other per-mesh engine failures skip that instance only.
pub fn assemble_model<E: RenderEngine>(
    engine: &mut E,
    model: Model,
    shader: ShaderId,
    transform: &Transform,
) -> Result<Vec<InstanceId>, RenderError> {
    let texture_count = model.textures.len();

    let mut texture_handles: Vec<Option<TextureId>> = Vec::with_capacity(texture_count);
    for (position, texture) in model.textures.into_iter().enumerate() {
        match engine.load_texture(texture) {
            Ok(id) => texture_handles.push(Some(id)),
            Err(err) => {
                log::error!("texture {position} upload failed: {err}");
                texture_handles.push(None);
            }
        }
    }

    let matrix = transform.matrix();
    let mut instances = Vec::with_capacity(model.meshes.len());

    'meshes: for (position, mesh) in model.meshes.iter().enumerate() {
        let mut textures = Vec::with_capacity(mesh.texture_refs.len());
        for reference in &mesh.texture_refs {
            let slot = texture_handles.get(reference.index).ok_or_else(|| {
                RenderError::Integrity(format!(
                    "texture reference {} out of range ({texture_count} textures uploaded)",
                    reference.index
                ))
            })?;
            match slot {
                Some(id) => textures.push((reference.name(), *id)),
                None => {
                    log::error!(
                        "mesh {position}: texture {} failed to upload; skipping instance",
                        reference.index
                    );
                    continue 'meshes;
                }
            }
        }

        let mesh_id = match engine.load_mesh(&mesh.vertices, &mesh.indices) {
            Ok(id) => id,
            Err(err) => {
                log::error!("mesh {position} upload failed: {err}; skipping instance");
                continue;
            }
        };

        let instance = Instance {
            mesh: mesh_id,
            material: Material { shader, textures },
            transform: matrix,
        };
        match engine.add_instance(instance) {
            Ok(id) => instances.push(id),
            Err(err) => {
                log::error!("mesh {position}: instance registration failed: {err}");
            }
        }
    }

    log::info!(
        "assembled {} of {} meshes into instances",
        instances.len(),
        model.meshes.len()
    );
    Ok(instances)
}
