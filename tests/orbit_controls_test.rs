use cgmath::{InnerSpace, MetricSpace, Point3};
use floor_viewer::{
    camera::{Camera, OrbitControls, Spherical},
    config::ControlsConfig,
};
use instant::Duration;

const FRAME: Duration = Duration::from_millis(16);

fn still_controls() -> OrbitControls {
    let config = ControlsConfig {
        auto_rotate: false,
        ..Default::default()
    };
    OrbitControls::from_config(&config, [0.0, 0.0, 0.0])
}

#[test]
fn should_round_trip_spherical_offsets() {
    let offset = cgmath::Vector3::new(30.0, 40.0, -12.0);
    let back = Spherical::from_offset(offset).to_offset();
    assert!((back - offset).magnitude() < 1e-3);
}

#[test]
fn should_auto_rotate_at_constant_radius_and_height() {
    let mut camera = Camera::new([60.0, 80.0, 0.0], [0.0, 0.0, 0.0]);
    let mut controls = OrbitControls::new([0.0, 0.0, 0.0]);
    let start = camera.position;
    let radius = start.distance(Point3::new(0.0, 0.0, 0.0));

    for _ in 0..120 {
        controls.update(&mut camera, FRAME);
    }

    let end = camera.position;
    assert!((end.distance(Point3::new(0.0, 0.0, 0.0)) - radius).abs() < 1e-2);
    assert!((end.y - start.y).abs() < 1e-2);
    assert!(end.distance(start) > 1e-3, "camera did not rotate");
}

#[test]
fn should_not_move_without_input_when_auto_rotate_is_off() {
    let mut camera = Camera::new([60.0, 80.0, 0.0], [0.0, 0.0, 0.0]);
    let mut controls = still_controls();
    assert!(!controls.update(&mut camera, FRAME));
    assert!(camera.position.distance(Point3::new(60.0, 80.0, 0.0)) < 1e-3);
}

#[test]
fn should_ease_out_rotation_with_damping() {
    let mut camera = Camera::new([0.0, 0.0, 100.0], [0.0, 0.0, 0.0]);
    let mut controls = still_controls();
    controls.rotate_left(1.0);

    let theta = |camera: &Camera| Spherical::from_offset(camera.position - camera.target).theta;
    let mut previous = theta(&camera);
    let mut steps = Vec::new();
    for _ in 0..5 {
        controls.update(&mut camera, FRAME);
        let now = theta(&camera);
        steps.push((now - previous).abs());
        previous = now;
    }

    assert!(steps[0] > 0.0);
    assert!(steps.windows(2).all(|w| w[1] < w[0]), "steps: {steps:?}");
    assert!((controls.spherical_delta().theta.abs() - 0.9f32.powi(5)).abs() < 1e-4);
}

#[test]
fn should_apply_rotation_at_once_without_damping() {
    let mut camera = Camera::new([0.0, 0.0, 100.0], [0.0, 0.0, 0.0]);
    let mut controls = still_controls();
    controls.enable_damping = false;
    controls.rotate_left(0.5);

    assert!(controls.update(&mut camera, FRAME));
    let theta = Spherical::from_offset(camera.position - camera.target).theta;
    assert!((theta + 0.5).abs() < 1e-4);
    assert_eq!(controls.spherical_delta(), Spherical::default());
}

#[test]
fn should_clamp_the_polar_angle() {
    let mut camera = Camera::new([0.0, 0.0, 100.0], [0.0, 0.0, 0.0]);
    let mut controls = still_controls();
    controls.enable_damping = false;
    controls.rotate_up(10.0);
    controls.update(&mut camera, FRAME);

    let offset = camera.position - camera.target;
    assert!(offset.y > 0.0);
    assert!((offset.magnitude() - 100.0).abs() < 1e-2);
    let view = camera.calc_matrix();
    assert!(view.x.x.is_finite() && view.y.y.is_finite() && view.z.z.is_finite());
}

#[test]
fn should_dolly_out_and_in() {
    let mut camera = Camera::new([0.0, 0.0, 100.0], [0.0, 0.0, 0.0]);
    let mut controls = still_controls();

    controls.dolly(100.0);
    controls.update(&mut camera, FRAME);
    let out = camera.position.distance(Point3::new(0.0, 0.0, 0.0));
    assert!((out - 100.0 / 0.95).abs() < 1e-2);

    controls.dolly(-100.0);
    controls.update(&mut camera, FRAME);
    let back = camera.position.distance(Point3::new(0.0, 0.0, 0.0));
    assert!((back - 100.0).abs() < 1e-2);
}

#[test]
fn should_respect_distance_limits() {
    let mut camera = Camera::new([0.0, 0.0, 100.0], [0.0, 0.0, 0.0]);
    let mut controls = still_controls();
    controls.max_distance = 110.0;

    for _ in 0..10 {
        controls.dolly(500.0);
        controls.update(&mut camera, FRAME);
    }
    assert!(camera.position.distance(Point3::new(0.0, 0.0, 0.0)) <= 110.0 + 1e-3);
}

#[test]
fn should_start_from_the_configured_top_down_view() {
    let mut camera = Camera::new([0.0, 120.0, 0.0], [0.0, 0.0, 0.0]);
    let mut controls = OrbitControls::new([0.0, 0.0, 0.0]);
    controls.update(&mut camera, FRAME);

    let (_, up, forward) = camera.basis();
    assert!(forward.y < -0.99);
    assert!(up.magnitude() > 0.99);
    assert!((camera.position.distance(Point3::new(0.0, 0.0, 0.0)) - 120.0).abs() < 1e-2);
}

#[test]
fn should_turn_the_top_down_view_when_auto_rotating() {
    let mut camera = Camera::new([0.0, 120.0, 0.0], [0.0, 0.0, 0.0]);
    let mut controls = OrbitControls::new([0.0, 0.0, 0.0]);
    controls.update(&mut camera, FRAME);
    let before = camera.calc_matrix();

    // one minute at 60 fps, roughly 0.3 rad of auto-rotation
    for _ in 0..3750 {
        controls.update(&mut camera, FRAME);
    }
    let after = camera.calc_matrix();

    let change: f32 = (0..4)
        .flat_map(|c| (0..4).map(move |r| (c, r)))
        .map(|(c, r)| (after[c][r] - before[c][r]).abs())
        .sum();
    assert!(change > 0.1, "view did not rotate: {change}");

    let (_, _, forward) = camera.basis();
    assert!(forward.y < -0.99);
    assert!((camera.position.distance(Point3::new(0.0, 0.0, 0.0)) - 120.0).abs() < 1e-2);
}

#[test]
fn should_follow_the_azimuth_right_above_the_target() {
    let theta = 0.7f32;
    let offset = Spherical {
        radius: 120.0,
        phi: 1e-6,
        theta,
    }
    .to_offset();
    let camera = Camera::new(Point3::new(0.0, 0.0, 0.0) + offset, Point3::new(0.0, 0.0, 0.0));

    let (right, up, forward) = camera.basis();
    assert!((right.x - theta.cos()).abs() < 1e-3, "right: {right:?}");
    assert!((right.z + theta.sin()).abs() < 1e-3, "right: {right:?}");
    assert!(right.dot(forward).abs() < 1e-4);
    assert!((up.magnitude() - 1.0).abs() < 1e-4);
}
