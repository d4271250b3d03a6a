//! Picking geometry: line segments, bounding spheres, intersection tests.
//!
//! Intersection results are parametric: `t = 0` is the segment start and
//! `t = 1` its end, so callers can compare hits from different objects
//! without normalizing directions.

use thiserror::Error;

use crate::{Mat4, Vec3, Vec4};

const EPSILON: f32 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("bounding sphere radius must be finite and non-negative, got {0}")]
    InvalidRadius(f32),
    #[error("bounding sphere center is not finite: {0}")]
    InvalidCenter(Vec3),
}

/// Finite line segment, typically a pick ray clipped to the view frustum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: Vec3,
    pub end: Vec3,
}

impl Segment {
    #[inline]
    pub const fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.end - self.start
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.direction().length()
    }

    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.start + self.direction() * t
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.direction().length_squared() < EPSILON * EPSILON
    }

    /// Segment expressed in another space (e.g. world to model via the inverse model matrix).
    #[inline]
    pub fn transformed(&self, m: &Mat4) -> Self {
        Self::new(m.transform_point3(self.start), m.transform_point3(self.end))
    }

    /// Parameter of the point on the segment closest to `p`, clamped to [0, 1].
    pub fn closest_t(&self, p: Vec3) -> f32 {
        let d = self.direction();
        let len_sq = d.length_squared();
        if len_sq < EPSILON * EPSILON {
            return 0.0;
        }
        ((p - self.start).dot(d) / len_sq).clamp(0.0, 1.0)
    }
}

/// Sphere enclosing an object; `Vec4` form is `xyz = center`, `w = radius`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Result<Self, GeometryError> {
        if !center.is_finite() {
            return Err(GeometryError::InvalidCenter(center));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(GeometryError::InvalidRadius(radius));
        }
        Ok(Self { center, radius })
    }

    pub fn from_vec4(v: Vec4) -> Result<Self, GeometryError> {
        Self::new(v.truncate(), v.w)
    }

    #[inline]
    pub fn to_vec4(&self) -> Vec4 {
        self.center.extend(self.radius)
    }

    /// Ritter's approximate bounding sphere. At most a few percent larger than
    /// the minimal sphere; an empty input yields the zero sphere.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
        I::IntoIter: Clone,
    {
        let iter = points.into_iter();
        let Some(first) = iter.clone().next() else {
            return Self::default();
        };

        let farthest_from = |from: Vec3| {
            iter.clone()
                .fold((from, 0.0f32), |(best, best_d), p| {
                    let d = p.distance_squared(from);
                    if d > best_d { (p, d) } else { (best, best_d) }
                })
                .0
        };

        let a = farthest_from(first);
        let b = farthest_from(a);
        let mut center = (a + b) * 0.5;
        let mut radius = a.distance(b) * 0.5;

        for p in iter {
            let d = p.distance(center);
            if d > radius {
                let new_radius = (radius + d) * 0.5;
                center += (p - center) * ((new_radius - radius) / d);
                radius = new_radius;
            }
        }

        Self { center, radius }
    }

    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.distance(self.center) <= self.radius + 1e-4 * self.radius.max(1.0)
    }

    /// `true` if any point of the segment lies inside the sphere.
    pub fn intersects_segment(&self, seg: &Segment) -> bool {
        let closest = seg.point_at(seg.closest_t(self.center));
        closest.distance_squared(self.center) <= self.radius * self.radius
    }
}

/// Segment/triangle intersection (Möller–Trumbore). Returns the parametric
/// distance along `seg` in [0, 1], or `None` on a miss. Both windings hit.
pub fn intersect_triangle(seg: &Segment, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    let dir = seg.direction();
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = dir.cross(edge2);
    let a = edge1.dot(h);

    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = seg.start - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Nearest hit of `seg` against an indexed triangle list.
pub fn intersect_triangles(seg: &Segment, positions: &[Vec3], indices: &[u32]) -> Option<f32> {
    if seg.is_degenerate() {
        return None;
    }
    indices
        .chunks_exact(3)
        .filter_map(|tri| {
            let v0 = *positions.get(tri[0] as usize)?;
            let v1 = *positions.get(tri[1] as usize)?;
            let v2 = *positions.get(tri[2] as usize)?;
            intersect_triangle(seg, v0, v1, v2)
        })
        .min_by(f32::total_cmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3;
    use approx::assert_relative_eq;

    fn unit_triangle() -> (Vec3, Vec3, Vec3) {
        (vec3(-1.0, -1.0, 0.0), vec3(1.0, -1.0, 0.0), vec3(0.0, 1.0, 0.0))
    }

    #[test]
    fn segment_through_triangle_hits_at_midpoint() {
        let (a, b, c) = unit_triangle();
        let seg = Segment::new(vec3(0.0, 0.0, 1.0), vec3(0.0, 0.0, -1.0));
        let t = intersect_triangle(&seg, a, b, c).expect("hit");
        assert_relative_eq!(t, 0.5, epsilon = 1e-6);
        assert_relative_eq!(seg.point_at(t).z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn back_face_is_hit_too() {
        let (a, b, c) = unit_triangle();
        let seg = Segment::new(vec3(0.0, 0.0, -1.0), vec3(0.0, 0.0, 1.0));
        assert!(intersect_triangle(&seg, a, b, c).is_some());
    }

    #[test]
    fn segment_stopping_short_misses() {
        let (a, b, c) = unit_triangle();
        let seg = Segment::new(vec3(0.0, 0.0, 3.0), vec3(0.0, 0.0, 1.0));
        assert_eq!(intersect_triangle(&seg, a, b, c), None);
    }

    #[test]
    fn segment_beside_triangle_misses() {
        let (a, b, c) = unit_triangle();
        let seg = Segment::new(vec3(5.0, 0.0, 1.0), vec3(5.0, 0.0, -1.0));
        assert_eq!(intersect_triangle(&seg, a, b, c), None);
    }

    #[test]
    fn nearest_of_two_triangles_wins() {
        let positions = vec![
            vec3(-1.0, -1.0, 0.0),
            vec3(1.0, -1.0, 0.0),
            vec3(0.0, 1.0, 0.0),
            vec3(-1.0, -1.0, 0.5),
            vec3(1.0, -1.0, 0.5),
            vec3(0.0, 1.0, 0.5),
        ];
        let indices = [0, 1, 2, 3, 4, 5];
        let seg = Segment::new(vec3(0.0, 0.0, 1.0), vec3(0.0, 0.0, -1.0));
        let t = intersect_triangles(&seg, &positions, &indices).expect("hit");
        assert_relative_eq!(t, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_segment_never_hits() {
        let positions = vec![vec3(-1.0, -1.0, 0.0), vec3(1.0, -1.0, 0.0), vec3(0.0, 1.0, 0.0)];
        let seg = Segment::new(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(intersect_triangles(&seg, &positions, &[0, 1, 2]), None);
    }

    #[test]
    fn ritter_sphere_contains_all_points() {
        let points = [
            vec3(1.0, 0.0, 0.0),
            vec3(-1.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
            vec3(0.0, -1.0, 0.0),
            vec3(0.0, 0.0, 1.0),
            vec3(0.0, 0.0, -1.0),
            vec3(0.7, 0.7, 0.1),
            vec3(3.0, 0.2, -0.4),
        ];
        let sphere = BoundingSphere::from_points(points.iter().copied());
        for p in points {
            assert!(sphere.contains(p), "{p} outside {sphere:?}");
        }
    }

    #[test]
    fn empty_point_set_gives_zero_sphere() {
        let sphere = BoundingSphere::from_points(std::iter::empty::<Vec3>());
        assert_eq!(sphere, BoundingSphere::default());
    }

    #[test]
    fn sphere_vec4_round_trip_and_validation() {
        let s = BoundingSphere::new(vec3(1.0, 2.0, 3.0), 4.0).unwrap();
        assert_eq!(BoundingSphere::from_vec4(s.to_vec4()), Ok(s));
        assert_eq!(
            BoundingSphere::new(Vec3::ZERO, -1.0),
            Err(GeometryError::InvalidRadius(-1.0))
        );
    }

    #[test]
    fn sphere_segment_overlap() {
        let s = BoundingSphere::new(Vec3::ZERO, 1.0).unwrap();
        assert!(s.intersects_segment(&Segment::new(vec3(-5.0, 0.5, 0.0), vec3(5.0, 0.5, 0.0))));
        assert!(!s.intersects_segment(&Segment::new(vec3(-5.0, 2.0, 0.0), vec3(5.0, 2.0, 0.0))));
        // Segment ending before reaching the sphere.
        assert!(!s.intersects_segment(&Segment::new(vec3(-5.0, 0.0, 0.0), vec3(-2.0, 0.0, 0.0))));
    }
}
