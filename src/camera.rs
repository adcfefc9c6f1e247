//! Camera, projection and orbit controls.
//!
//! The camera is a target-based perspective camera. [`OrbitControls`] moves it
//! on a sphere around its target: left drag rotates, right/middle drag pans,
//! the wheel dollies. With damping enabled the motion eases out over several
//! frames, and auto-rotate slowly spins the view while nobody is dragging.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector2, Vector3, Zero};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::{config::ControlsConfig, pick::Ray};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const EPS: f32 = 0.000001;

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, target: P) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
        }
    }

    /// Orthonormal `(right, up, forward)` basis of the view.
    ///
    /// `right` is taken from the horizontal part of the eye offset, so a view
    /// from almost straight above still turns with the orbit azimuth. Only an
    /// exactly vertical offset falls back to screen-up towards -Z.
    pub fn basis(&self) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        let offset = self.position - self.target;
        if offset.magnitude2() == 0.0 {
            return (Vector3::unit_x(), Vector3::unit_y(), -Vector3::unit_z());
        }
        let forward = -offset.normalize();
        let horizontal = Vector3::new(offset.z, 0.0, -offset.x);
        let right = if horizontal.magnitude2() > 0.0 {
            horizontal.normalize()
        } else {
            forward.cross(-Vector3::unit_z()).normalize()
        };
        let up = right.cross(forward);
        (right, up, forward)
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        let (_, up, _) = self.basis();
        Matrix4::look_at_rh(self.position, self.target, up)
    }

    /// Ray from the eye through a point given in normalized device coordinates.
    pub fn ray_through(&self, projection: &Projection, ndc: Vector2<f32>) -> Ray {
        let (right, up, forward) = self.basis();
        let half_height = (projection.fovy.0 / 2.0).tan();
        let half_width = half_height * projection.aspect;
        let direction = forward + right * (ndc.x * half_width) + up * (ndc.y * half_height);
        Ray::new(self.position, direction)
    }

    pub fn cast_ray_from_mouse(
        &self,
        mouse: PhysicalPosition<f64>,
        width: f32,
        height: f32,
        projection: &Projection,
    ) -> Ray {
        self.ray_through(projection, screen_to_ndc(mouse, width, height))
    }
}

pub fn screen_to_ndc(position: PhysicalPosition<f64>, width: f32, height: f32) -> Vector2<f32> {
    Vector2::new(
        (position.x as f32 / width) * 2.0 - 1.0,
        -(position.y as f32 / height) * 2.0 + 1.0,
    )
}

#[derive(Debug, Clone)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    // The sky pass reconstructs view directions from clip space.
    inv_view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
            inv_view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        let view_proj = projection.calc_matrix() * camera.calc_matrix();
        self.view_proj = view_proj.into();
        self.inv_view_proj = view_proj.invert().unwrap_or(Matrix4::identity()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera state together with its GPU uniform and the controls driving it.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controls: OrbitControls,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        camera: Camera,
        controls: OrbitControls,
        projection: &Projection,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controls,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Spherical coordinates with the polar axis along +Y.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    /// Polar angle from +Y.
    pub phi: f32,
    /// Azimuth around +Y, measured from +Z.
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Rotate,
    Pan,
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    spherical_delta: Spherical,
    pan_offset: Vector3<f32>,
    scale: f32,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
}

impl OrbitControls {
    pub fn new<P: Into<Point3<f32>>>(target: P) -> Self {
        Self::from_config(&ControlsConfig::default(), target)
    }

    pub fn from_config<P: Into<Point3<f32>>>(config: &ControlsConfig, target: P) -> Self {
        Self {
            target: target.into(),
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            auto_rotate: config.auto_rotate,
            auto_rotate_speed: config.auto_rotate_speed,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            spherical_delta: Spherical::default(),
            pan_offset: Vector3::zero(),
            scale: 1.0,
            drag: None,
            cursor: None,
        }
    }

    /// Pending rotation that has not been applied to the camera yet.
    pub fn spherical_delta(&self) -> Spherical {
        self.spherical_delta
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Rotate so that dragging across the full viewport height is one turn.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.rotate_left(2.0 * PI * dx * self.rotate_speed / height);
        self.rotate_up(2.0 * PI * dy * self.rotate_speed / height);
    }

    /// Screen-space pan: the point under the cursor follows the cursor at the
    /// depth of the target.
    pub fn pan_by_pixels(
        &mut self,
        dx: f32,
        dy: f32,
        viewport_height: f32,
        camera: &Camera,
        projection: &Projection,
    ) {
        let height = viewport_height.max(1.0);
        let distance = (camera.position - self.target).magnitude();
        let target_distance = distance * (projection.fovy.0 / 2.0).tan();
        let (right, up, _) = camera.basis();
        let left = 2.0 * dx * self.pan_speed * target_distance / height;
        let upward = 2.0 * dy * self.pan_speed * target_distance / height;
        self.pan_offset += right * -left + up * upward;
    }

    /// Wheel zoom; positive `delta_y` (scrolling down) moves away from the target.
    pub fn dolly(&mut self, delta_y: f32) {
        let zoom_scale = 0.95f32.powf(self.zoom_speed * (delta_y * 0.01).abs());
        if delta_y > 0.0 {
            self.scale /= zoom_scale;
        } else if delta_y < 0.0 {
            self.scale *= zoom_scale;
        }
    }

    fn auto_rotation_angle(&self, dt: Duration) -> f32 {
        2.0 * PI / 60.0 * self.auto_rotate_speed * dt.as_secs_f32()
    }

    /// Move the camera by the accumulated input and return whether it moved.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) -> bool {
        let old_position = camera.position;
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        if self.auto_rotate && self.drag.is_none() {
            self.rotate_left(self.auto_rotation_angle(dt));
        }

        if self.enable_damping {
            spherical.theta += self.spherical_delta.theta * self.damping_factor;
            spherical.phi += self.spherical_delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }
        spherical.phi = spherical.phi.clamp(EPS, PI - EPS);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        camera.target = self.target;
        camera.position = self.target + spherical.to_offset();

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vector3::zero();
        }
        self.scale = 1.0;

        (camera.position - old_position).magnitude2() > EPS
    }

    pub fn handle_window_events(
        &mut self,
        event: &WindowEvent,
        camera: &Camera,
        projection: &Projection,
        viewport_height: f32,
    ) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => match (state, button) {
                (ElementState::Pressed, MouseButton::Left) => self.drag = Some(Drag::Rotate),
                (ElementState::Pressed, MouseButton::Right | MouseButton::Middle) => {
                    self.drag = Some(Drag::Pan)
                }
                (ElementState::Released, _) => self.drag = None,
                _ => (),
            },
            WindowEvent::CursorMoved { position, .. } => {
                if let (Some(drag), Some(last)) = (self.drag, self.cursor) {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    match drag {
                        Drag::Rotate => self.rotate_by_pixels(dx, dy, viewport_height),
                        Drag::Pan => {
                            self.pan_by_pixels(dx, dy, viewport_height, camera, projection)
                        }
                    }
                }
                self.cursor = Some(*position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.drag = None;
                self.cursor = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // Browsers report roughly 100px per notch; match that for line deltas.
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * 100.0,
                    MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                };
                self.dolly(delta_y);
            }
            _ => (),
        }
    }
}
