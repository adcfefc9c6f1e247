use cgmath::{Deg, MetricSpace, Point3, Vector3};
use floor_viewer::{
    camera::{Camera, Projection},
    config::GroundConfig,
    pick::{PickOutcome, Ray, Triangle, pick, report},
    resources::scene::ground_plane,
};
use winit::dpi::PhysicalPosition;

fn quad(y: f32, half: f32) -> [Triangle; 2] {
    let a = Point3::new(-half, y, -half);
    let b = Point3::new(-half, y, half);
    let c = Point3::new(half, y, half);
    let d = Point3::new(half, y, -half);
    [Triangle::new(a, b, c), Triangle::new(a, c, d)]
}

#[test]
fn should_hit_the_ground_below_the_initial_camera() {
    let camera = Camera::new([0.0, 120.0, 0.0], [0.0, 0.0, 0.0]);
    let projection = Projection::new(800, 600, Deg(45.0), 1.0, 500.0);
    let ground = ground_plane(&GroundConfig::default()).triangles();

    let ray = camera.cast_ray_from_mouse(PhysicalPosition::new(400.0, 300.0), 800.0, 600.0, &projection);
    match report(&ray, &ground) {
        PickOutcome::Hit(point) => assert!(point.distance(Point3::new(0.0, 0.0, 0.0)) < 1e-2),
        PickOutcome::Miss => panic!("expected the ground to be hit"),
    }
}

#[test]
fn should_miss_when_looking_at_the_sky() {
    let ray = Ray::new(Point3::new(0.0, 10.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
    assert_eq!(pick(&ray, &quad(0.0, 250.0)), PickOutcome::Miss);
}

#[test]
fn should_miss_outside_the_triangles() {
    let ray = Ray::new(Point3::new(300.0, 10.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
    assert_eq!(pick(&ray, &quad(0.0, 250.0)), PickOutcome::Miss);
}

#[test]
fn should_report_the_nearest_hit() {
    let mut triangles = quad(0.0, 10.0).to_vec();
    triangles.extend(quad(5.0, 10.0));

    let ray = Ray::new(Point3::new(1.0, 20.0, 1.0), Vector3::new(0.0, -1.0, 0.0));
    match pick(&ray, &triangles) {
        PickOutcome::Hit(point) => assert!(point.distance(Point3::new(1.0, 5.0, 1.0)) < 1e-4),
        PickOutcome::Miss => panic!("expected a hit"),
    }
}

#[test]
fn should_hit_back_faces() {
    let ray = Ray::new(Point3::new(0.0, -5.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
    assert!(matches!(pick(&ray, &quad(0.0, 1.0)), PickOutcome::Hit(_)));
}

#[test]
fn should_ignore_triangles_behind_the_origin() {
    let ray = Ray::new(Point3::new(0.0, -5.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
    assert_eq!(pick(&ray, &quad(0.0, 1.0)), PickOutcome::Miss);
}

#[test]
fn should_cast_corner_rays_through_the_frustum_edge() {
    let camera = Camera::new([0.0, 0.0, 10.0], [0.0, 0.0, 0.0]);
    let projection = Projection::new(100, 100, Deg(90.0), 0.1, 100.0);
    let ray = camera.cast_ray_from_mouse(PhysicalPosition::new(100.0, 0.0), 100.0, 100.0, &projection);

    // 90 degrees vertical at aspect 1: the top right corner is 45 degrees off in both axes
    let d = ray.direction;
    assert!((d.x - d.y).abs() < 1e-4);
    assert!(d.x > 0.0);
    assert!((d.x + d.z).abs() < 1e-4);
}
