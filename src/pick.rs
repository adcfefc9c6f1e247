//! Pointer picking.
//!
//! A pointer-down casts a ray from the camera through the pointer and tests it
//! against the world-space triangles of everything in the scene (ground and
//! the active model). The nearest hit is reported for diagnostics only.

use cgmath::{InnerSpace, Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Point3<f32>,
    pub b: Point3<f32>,
    pub c: Point3<f32>,
}

impl Triangle {
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        Self { a, b, c }
    }

    /// Möller–Trumbore intersection, double-sided. Returns the ray distance.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        const EPSILON: f32 = 1e-6;

        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;

        let h = ray.direction.cross(edge2);
        let det = edge1.dot(h);
        // parallel
        if det.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / det;
        let s = ray.origin - self.a;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        (t > EPSILON).then_some(t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickOutcome {
    Hit(Point3<f32>),
    Miss,
}

/// Nearest intersection of `ray` with any of `triangles`.
pub fn pick<'a, I>(ray: &Ray, triangles: I) -> PickOutcome
where
    I: IntoIterator<Item = &'a Triangle>,
{
    triangles
        .into_iter()
        .filter_map(|triangle| triangle.intersect(ray))
        .min_by(|a, b| a.total_cmp(b))
        .map_or(PickOutcome::Miss, |t| PickOutcome::Hit(ray.at(t)))
}

/// Pick and log the outcome. Nothing about the hit is kept.
pub fn report<'a, I>(ray: &Ray, triangles: I) -> PickOutcome
where
    I: IntoIterator<Item = &'a Triangle>,
{
    let outcome = pick(ray, triangles);
    match outcome {
        PickOutcome::Hit(point) => {
            log::info!("Clicked at ({:.3}, {:.3}, {:.3})", point.x, point.y, point.z)
        }
        PickOutcome::Miss => log::info!("No object clicked"),
    }
    outcome
}
