use crate::{EulerRot, Mat4, Quat, Vec3};

/// Model transform with non-uniform scale (Euler XYZ).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians (XYZ order).
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_euler,
            scale,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        )
    }

    /// Build matrix = T * R * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3;
    use approx::assert_relative_eq;

    #[test]
    fn default_is_the_identity() {
        assert_eq!(Transform::default(), Transform::identity());
        assert_eq!(Transform::default().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn points_are_scaled_then_rotated_then_moved() {
        let t = Transform::from_trs(
            vec3(10.0, 0.0, 0.0),
            vec3(0.0, 90f32.to_radians(), 0.0),
            vec3(2.0, 1.0, 1.0),
        );
        // +X scaled to 2, turned onto -Z by the yaw, then shifted along X.
        let p = t.matrix().transform_point3(Vec3::X);
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn inverse_matrix_maps_world_back_to_model_space() {
        let t = Transform::from_trs(vec3(1.0, -2.0, 3.0), vec3(0.3, 0.2, 0.1), vec3(1.5, 0.5, 2.0));
        let local = vec3(0.25, 0.5, -0.75);
        let world = t.matrix().transform_point3(local);
        let back = t.matrix().inverse().transform_point3(world);
        assert_relative_eq!(back.x, local.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, local.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, local.z, epsilon = 1e-5);
    }

    #[test]
    fn translation_only_keeps_orientation() {
        let t = Transform::from_translation(vec3(2.5, 0.0, 0.0));
        assert_eq!(t.rotation(), Quat::IDENTITY);
        assert_eq!(t.matrix().transform_vector3(Vec3::Y), Vec3::Y);
    }
}
