//! Global view state shared by every renderable: camera and model transform.

use corelib::camera::Camera;
use corelib::transform::Transform;
use corelib::{Mat4, Segment};

#[derive(Clone, Copy, Debug, Default)]
pub struct World {
    pub camera: Camera,
    pub model: Transform,
}

impl World {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            model: Transform::identity(),
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.camera.view()
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model.matrix()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.camera.proj()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.camera.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// World-space pick segment under a window position.
    pub fn pick_segment(&self, x: f32, y: f32, width: u32, height: u32) -> Segment {
        self.camera.screen_ray(x, y, width as f32, height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn aspect_follows_window_and_survives_zero_height() {
        let mut world = World::default();
        world.set_aspect(800, 400);
        assert_relative_eq!(world.camera.aspect, 2.0);
        world.set_aspect(800, 0);
        assert!(world.camera.aspect.is_finite());
    }

    #[test]
    fn identity_model_by_default() {
        assert_eq!(World::default().model_matrix(), Mat4::IDENTITY);
    }
}
