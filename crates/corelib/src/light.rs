use crate::Vec3;

/// Point light: position + linear RGB color + scalar intensity.
#[derive(Clone, Copy, Debug)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl PointLight {
    #[inline]
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            color,
            intensity,
        }
    }

    /// White light, the common default for viewer-style scenes.
    #[inline]
    pub fn white(position: Vec3, intensity: f32) -> Self {
        Self::new(position, Vec3::ONE, intensity)
    }
}
