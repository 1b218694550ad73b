//! Camera matrices consumed by batch rendering.
//!
//! The core only reads `view` and `proj`; the helpers here are thin wrappers
//! over `glam`. Projections use wgpu's `[0, 1]` clip-space depth range.

use glam::{Mat4, Vec3};

use crate::coords::Viewport;

/// View + projection matrices and the eye position they were built from.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub proj: Mat4,
    pub position: Vec3,
}

impl Default for Camera {
    /// Identity camera: vertex positions are taken as clip-space coordinates.
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

impl Camera {
    /// Perspective camera placed at `(0, 0, 200)` looking towards `(0, 0, 2)`,
    /// 90° vertical field of view, depth range `0.1..5000`.
    pub fn standard(aspect: f32) -> Self {
        let mut cam = Self {
            position: Vec3::new(0.0, 0.0, 200.0),
            ..Self::default()
        };
        cam.look_at(Vec3::new(0.0, 0.0, 2.0), Vec3::Y);
        cam.set_perspective(90f32.to_radians(), aspect, 0.1, 5000.0);
        cam
    }

    /// Orthographic camera spanning `left..right` × `bottom..top` world units.
    ///
    /// The view is pulled back one unit along -Z so geometry pushed at `z = 0`
    /// sits inside the `0.1..100` depth range.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            view: Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0)),
            proj: Mat4::orthographic_rh(left, right, bottom, top, 0.1, 100.0),
            position: Vec3::ZERO,
        }
    }

    /// Pixel-space orthographic camera for a target (bottom-left origin).
    pub fn pixels(viewport: Viewport) -> Self {
        Self::orthographic(0.0, viewport.width as f32, 0.0, viewport.height as f32)
    }

    /// Points the view from `position` at `center`.
    pub fn look_at(&mut self, center: Vec3, up: Vec3) {
        self.view = Mat4::look_at_rh(self.position, center, up);
    }

    /// Points the view from `position` along `dir`.
    pub fn look(&mut self, dir: Vec3, up: Vec3) {
        self.view = Mat4::look_to_rh(self.position, dir, up);
    }

    pub fn set_perspective(&mut self, fovy_radians: f32, aspect: f32, near: f32, far: f32) {
        self.proj = Mat4::perspective_rh(fovy_radians, aspect, near, far);
    }

    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.proj * self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn project(cam: &Camera, x: f32, y: f32) -> Vec4 {
        let p = cam.view_projection() * Vec4::new(x, y, 0.0, 1.0);
        p / p.w
    }

    #[test]
    fn pixel_camera_maps_corners_to_clip_corners() {
        let cam = Camera::pixels(Viewport::new(800, 600));

        let bl = project(&cam, 0.0, 0.0);
        assert!((bl.x + 1.0).abs() < 1e-5);
        assert!((bl.y + 1.0).abs() < 1e-5);

        let tr = project(&cam, 800.0, 600.0);
        assert!((tr.x - 1.0).abs() < 1e-5);
        assert!((tr.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn pixel_camera_keeps_z_zero_inside_depth_range() {
        let cam = Camera::pixels(Viewport::new(100, 100));
        let p = project(&cam, 50.0, 50.0);
        assert!(p.z > 0.0 && p.z < 1.0);
    }

    #[test]
    fn standard_camera_is_finite() {
        let cam = Camera::standard(16.0 / 9.0);
        assert!(cam.view_projection().is_finite());
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 200.0));
    }

    #[test]
    fn default_is_identity() {
        let cam = Camera::default();
        let p = project(&cam, 0.25, -0.5);
        assert_eq!((p.x, p.y), (0.25, -0.5));
    }
}
