use glam::{Mat4, Vec3};
use std::f32::consts::{PI, TAU};

use crate::config::CameraConfig;
use crate::core::{Button, Controller, Viewport};
use crate::render::types::CameraUniform;

/// Smallest distance kept between the polar angle and the poles
const POLAR_EPSILON: f32 = 1e-4;
/// Dolly scale per wheel line
const ZOOM_STEP: f32 = 0.95;

pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_config(config: &CameraConfig, viewport: Viewport) -> Self {
        let mut camera = Self::new(config.fov, viewport.aspect(), config.near, config.far);
        camera.position = Vec3::from_array(config.position);
        camera.target = Vec3::from_array(config.target);
        camera
    }

    /// Recompute the projection after changing fov, aspect, near or far
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection().to_cols_array_2d(),
            position: self.position.extend(1.0).to_array(),
        }
    }
}

/// Orbits the camera around a target: left-drag rotates, right-drag pans,
/// the wheel dollies in and out
pub struct OrbitControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    radius: f32,
    /// Angle around the up axis, measured from +Z
    theta: f32,
    /// Angle from the up axis
    phi: f32,
}

impl OrbitControls {
    /// Attach to `camera`, orbiting its current look-at target
    pub fn new(camera: &PerspectiveCamera) -> Self {
        let target = camera.target;
        let offset = camera.position - target;
        let radius = offset.length();
        let (theta, phi) = if radius > 0.0 {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, PI / 2.0)
        };

        Self {
            target,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            radius,
            theta,
            phi,
        }
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Rotate by a pointer drag of (`dx`, `dy`) pixels; a drag across the full
    /// viewport height turns a full circle
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport: Viewport) {
        let height = viewport.height.max(1) as f32;
        self.theta -= TAU * dx / height * self.rotate_speed;
        self.phi = (self.phi - TAU * dy / height * self.rotate_speed)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
    }

    /// Move the target in the view plane so the scene follows the pointer
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &PerspectiveCamera, viewport: Viewport) {
        let height = viewport.height.max(1) as f32;
        let visible_height = 2.0 * self.radius * (camera.fov.to_radians() / 2.0).tan();
        let units_per_pixel = visible_height / height * self.pan_speed;

        let forward = (camera.target - camera.position).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);

        self.target += (-right * dx + up * dy) * units_per_pixel;
    }

    /// Scale the orbit radius; positive `lines` move closer
    pub fn dolly(&mut self, lines: f32) {
        self.radius = (self.radius * ZOOM_STEP.powf(lines)).clamp(self.min_distance, self.max_distance);
    }

    /// Apply this frame's pointer input
    pub fn handle_input(&mut self, input: &dyn Controller, camera: &PerspectiveCamera, viewport: Viewport) {
        let (dx, dy) = input.pointer_delta();

        if input.is_down(Button::MouseLeft) && !input.is_down(Button::Shift) {
            self.rotate(dx, dy, viewport);
        } else if input.is_down(Button::MouseRight)
            || input.is_down(Button::MouseMiddle)
            || (input.is_down(Button::MouseLeft) && input.is_down(Button::Shift))
        {
            self.pan(dx, dy, camera, viewport);
        }

        let scroll = input.scroll_delta();
        if scroll != 0.0 {
            self.dolly(scroll);
        }
    }

    /// Position the camera on the orbit and point it at the target
    pub fn update(&self, camera: &mut PerspectiveCamera) {
        let sin_phi = self.phi.sin();
        let offset = Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        );

        camera.position = self.target + offset;
        camera.look_at(self.target);
    }
}
