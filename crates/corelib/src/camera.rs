use crate::{Mat4, Vec3, vec3};
use crate::geometry::Segment;

/// Perspective camera (right-handed, wgpu depth range).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Projection with z in [0, 1], which is what wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    /// Unproject a window position (pixels, origin top-left) into a world-space
    /// segment running from the near plane to the far plane.
    pub fn screen_ray(&self, x: f32, y: f32, width: f32, height: f32) -> Segment {
        let ndc_x = 2.0 * x / width.max(1.0) - 1.0;
        let ndc_y = 1.0 - 2.0 * y / height.max(1.0);
        let inv = self.proj_view().inverse();
        let start = inv.project_point3(vec3(ndc_x, ndc_y, 0.0));
        let end = inv.project_point3(vec3(ndc_x, ndc_y, 1.0));
        Segment::new(start, end)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective(
            vec3(0.0, 0.0, 4.0),
            Vec3::ZERO,
            Vec3::Y,
            60f32.to_radians(),
            0.1,
            100.0,
            16.0 / 9.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn center_ray_points_at_target() {
        let cam = Camera::default();
        let seg = cam.screen_ray(640.0, 360.0, 1280.0, 720.0);
        let dir = seg.direction().normalize();
        assert_relative_eq!(dir.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(dir.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(dir.z, -1.0, epsilon = 1e-4);
        // Starts on the near plane in front of the eye.
        assert_relative_eq!(seg.start.z, 4.0 - cam.z_near, epsilon = 1e-3);
    }

    #[test]
    fn top_left_ray_goes_up_and_left() {
        let cam = Camera::default();
        let seg = cam.screen_ray(0.0, 0.0, 1280.0, 720.0);
        let dir = seg.direction();
        assert!(dir.x < 0.0);
        assert!(dir.y > 0.0);
    }

    #[test]
    fn projection_uses_zero_to_one_depth() {
        let cam = Camera::default();
        let near = cam.proj_view().project_point3(vec3(0.0, 0.0, 4.0 - cam.z_near));
        let far = cam.proj_view().project_point3(vec3(0.0, 0.0, 4.0 - cam.z_far));
        assert_relative_eq!(near.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn degenerate_aspect_stays_finite() {
        let cam = Camera {
            aspect: 0.0,
            ..Camera::default()
        };
        assert!(cam.proj_view().to_cols_array().iter().all(|f| f.is_finite()));
    }
}
