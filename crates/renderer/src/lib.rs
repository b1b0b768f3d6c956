//! Rendering-engine collaborator surface: opaque resource handles, the
//! `RenderEngine` trait consumed by the scene assembler, and the material/
//! instance descriptions bound to registered meshes.

pub mod assembler;
pub mod headless;

use asset::{TextureData, Vertex};
use corelib::{Mat4, camera::Camera, light::PointLight};
use thiserror::Error;

/// Handle for an engine-side texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Handle for an engine-side mesh (vertex + index buffer pair).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// Handle for a compiled shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// Handle for a registered instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u32);

#[derive(Debug, Error)]
pub enum RenderError {
    /// The engine rejected a resource creation or registration request.
    #[error("render engine rejected {what}: {reason}")]
    Resource { what: &'static str, reason: String },

    /// An assembly invariant was violated (e.g. a texture reference
    /// outside the uploaded handle range). Never tolerated silently.
    #[error("assembly integrity violated: {0}")]
    Integrity(String),
}

impl RenderError {
    pub fn resource(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Resource {
            what,
            reason: reason.into(),
        }
    }
}

/// Shader bound to named texture handles. The names follow the importer's
/// reference naming (`texture_diffuse0`, `texture_normal1`, ...).
#[derive(Clone, Debug)]
pub struct Material {
    pub shader: ShaderId,
    pub textures: Vec<(String, TextureId)>,
}

/// One renderable: a mesh, its material, and a world transform.
#[derive(Clone, Debug)]
pub struct Instance {
    pub mesh: MeshId,
    pub material: Material,
    pub transform: Mat4,
}

/// Operations the rendering engine exposes to this layer. Pixel buffers
/// move into the engine on upload; there is no way to hand one off twice.
pub trait RenderEngine {
    fn load_texture(&mut self, texture: TextureData) -> Result<TextureId, RenderError>;
    fn load_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> Result<MeshId, RenderError>;
    fn load_shader(&mut self, vertex_src: &str, fragment_src: &str)
    -> Result<ShaderId, RenderError>;
    fn add_instance(&mut self, instance: Instance) -> Result<InstanceId, RenderError>;
    fn set_transform(&mut self, instance: InstanceId, matrix: Mat4) -> Result<(), RenderError>;
    fn set_camera(&mut self, camera: Camera);
    fn add_point_light(&mut self, light: PointLight);
    /// Draw one frame with everything registered so far.
    fn draw_scene(&mut self);
}
