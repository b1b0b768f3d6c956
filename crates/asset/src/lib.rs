//! Model import pipeline: parses a hierarchical asset file into a scene
//! graph, flattens it into per-mesh vertex/index buffers, and decodes the
//! referenced textures exactly once per distinct declared path.

pub mod error;
pub mod gltf;
pub mod import;
pub mod model;
pub mod obj;
pub mod scene;
pub mod texture;

pub use error::{ImportError, ImportResult};
pub use import::{Importer, load_model};
pub use model::{MeshResource, Model, TextureRef, Vertex};
pub use scene::{PostProcess, SceneGraph, SceneParser, TextureRole};
pub use texture::TextureData;
