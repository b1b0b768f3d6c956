//! Headless render engine: stores uploads in CPU-side tables behind
//! counter-allocated handles and reports draw statistics through the log.
//! Backs the assembler tests and the demo binary.

use asset::{TextureData, Vertex};
use corelib::{Mat4, camera::Camera, light::PointLight};

use crate::{Instance, InstanceId, MeshId, RenderEngine, RenderError, ShaderId, TextureId};

/// Texture metadata retained after upload. The pixel buffer itself is
/// consumed on upload, matching the one-time hand-off contract.
#[derive(Clone, Copy, Debug)]
pub struct StoredTexture {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub byte_len: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct StoredMesh {
    pub vertex_count: usize,
    pub index_count: usize,
}

#[derive(Default)]
pub struct HeadlessRenderer {
    textures: Vec<StoredTexture>,
    meshes: Vec<StoredMesh>,
    shaders: Vec<(String, String)>,
    instances: Vec<Instance>,
    camera: Option<Camera>,
    lights: Vec<PointLight>,
    frames_drawn: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, id: TextureId) -> Option<&StoredTexture> {
        self.textures.get(id.0 as usize)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&StoredMesh> {
        self.meshes.get(id.0 as usize)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

impl RenderEngine for HeadlessRenderer {
    fn load_texture(&mut self, texture: TextureData) -> Result<TextureId, RenderError> {
        if !texture.is_valid() {
            return Err(RenderError::resource(
                "texture",
                format!(
                    "pixel buffer of {} bytes does not match {}x{}x{}",
                    texture.pixels.len(),
                    texture.width,
                    texture.height,
                    texture.channels
                ),
            ));
        }
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(StoredTexture {
            width: texture.width,
            height: texture.height,
            channels: texture.channels,
            byte_len: texture.pixels.len(),
        });
        // texture.pixels dropped here: the hand-off consumed the buffer.
        Ok(id)
    }

    fn load_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<MeshId, RenderError> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(RenderError::resource("mesh", "empty vertex or index buffer"));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(RenderError::resource(
                "mesh",
                format!("index {bad} out of range ({} vertices)", vertices.len()),
            ));
        }
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(StoredMesh {
            vertex_count: vertices.len(),
            index_count: indices.len(),
        });
        Ok(id)
    }

    fn load_shader(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ShaderId, RenderError> {
        if vertex_src.is_empty() || fragment_src.is_empty() {
            return Err(RenderError::resource("shader", "empty shader source"));
        }
        let id = ShaderId(self.shaders.len() as u32);
        self.shaders
            .push((vertex_src.to_string(), fragment_src.to_string()));
        Ok(id)
    }

    fn add_instance(&mut self, instance: Instance) -> Result<InstanceId, RenderError> {
        if self.mesh(instance.mesh).is_none() {
            return Err(RenderError::resource(
                "instance",
                format!("unknown mesh handle {:?}", instance.mesh),
            ));
        }
        for (name, texture) in &instance.material.textures {
            if self.texture(*texture).is_none() {
                return Err(RenderError::resource(
                    "instance",
                    format!("unknown texture handle {texture:?} bound as '{name}'"),
                ));
            }
        }
        let id = InstanceId(self.instances.len() as u32);
        self.instances.push(instance);
        Ok(id)
    }

    fn set_transform(&mut self, instance: InstanceId, matrix: Mat4) -> Result<(), RenderError> {
        let slot = self
            .instances
            .get_mut(instance.0 as usize)
            .ok_or_else(|| {
                RenderError::resource("transform", format!("unknown instance {instance:?}"))
            })?;
        slot.transform = matrix;
        Ok(())
    }

    fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    fn add_point_light(&mut self, light: PointLight) {
        self.lights.push(light);
    }

    fn draw_scene(&mut self) {
        self.frames_drawn += 1;
        log::info!(
            "frame {}: {} instances, {} meshes, {} textures, {} lights",
            self.frames_drawn,
            self.instances.len(),
            self.meshes.len(),
            self.textures.len(),
            self.lights.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Material;

    fn triangle() -> (Vec<Vertex>, Vec<u32>) {
        (
            vec![
                Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
                Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
                Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn handles_are_positional() {
        let mut engine = HeadlessRenderer::new();
        let a = engine.load_texture(TextureData::placeholder()).unwrap();
        let b = engine.load_texture(TextureData::placeholder()).unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.texture(a).unwrap().width, 1);
    }

    #[test]
    fn invalid_texture_is_rejected() {
        let mut engine = HeadlessRenderer::new();
        let broken = TextureData::new(vec![1, 2, 3], 2, 2, 4);
        assert!(matches!(
            engine.load_texture(broken),
            Err(RenderError::Resource { .. })
        ));
    }

    #[test]
    fn mesh_with_out_of_range_index_is_rejected() {
        let mut engine = HeadlessRenderer::new();
        let (vertices, _) = triangle();
        assert!(matches!(
            engine.load_mesh(&vertices, &[0, 1, 9]),
            Err(RenderError::Resource { .. })
        ));
    }

    #[test]
    fn instance_requires_known_handles() {
        let mut engine = HeadlessRenderer::new();
        let (vertices, indices) = triangle();
        let mesh = engine.load_mesh(&vertices, &indices).unwrap();
        let shader = engine.load_shader("vs", "fs").unwrap();

        let err = engine.add_instance(Instance {
            mesh,
            material: Material {
                shader,
                textures: vec![("texture_diffuse0".into(), TextureId(9))],
            },
            transform: Mat4::IDENTITY,
        });
        assert!(matches!(err, Err(RenderError::Resource { .. })));
    }

    #[test]
    fn set_transform_updates_the_instance() {
        let mut engine = HeadlessRenderer::new();
        let (vertices, indices) = triangle();
        let mesh = engine.load_mesh(&vertices, &indices).unwrap();
        let shader = engine.load_shader("vs", "fs").unwrap();
        let id = engine
            .add_instance(Instance {
                mesh,
                material: Material {
                    shader,
                    textures: vec![],
                },
                transform: Mat4::IDENTITY,
            })
            .unwrap();

        let moved = Mat4::from_translation(corelib::vec3(1.0, 2.0, 3.0));
        engine.set_transform(id, moved).unwrap();
        assert_eq!(engine.instances()[0].transform, moved);

        assert!(engine.set_transform(InstanceId(5), moved).is_err());
    }
}
