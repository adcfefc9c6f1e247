use std::{cell::RefCell, rc::Rc};

use floor_viewer::{
    camera::{Camera, OrbitControls},
    flow::{FrameDriver, FrameUpdate},
};
use instant::Duration;

struct Recorder {
    name: &'static str,
    log: Rc<RefCell<Vec<(&'static str, Duration)>>>,
}

impl FrameUpdate for Recorder {
    fn update(&mut self, dt: Duration) {
        self.log.borrow_mut().push((self.name, dt));
    }
}

fn driver_with(names: &[&'static str]) -> (FrameDriver, Rc<RefCell<Vec<(&'static str, Duration)>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut driver = FrameDriver::new();
    for &name in names {
        driver.register(Box::new(Recorder {
            name,
            log: log.clone(),
        }));
    }
    (driver, log)
}

#[test]
fn should_run_updates_in_registration_order_with_the_same_delta() {
    let (mut driver, log) = driver_with(&["first", "second", "third"]);
    assert_eq!(driver.len(), 3);

    let mut camera = Camera::new([0.0, 120.0, 0.0], [0.0, 0.0, 0.0]);
    let mut controls = OrbitControls::new([0.0, 0.0, 0.0]);
    let dt = Duration::from_millis(16);
    driver.advance(&mut controls, &mut camera, dt);
    driver.advance(&mut controls, &mut camera, dt * 2);

    let log = log.borrow();
    let names: Vec<_> = log.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, ["first", "second", "third", "first", "second", "third"]);
    assert!(log[..3].iter().all(|(_, d)| *d == dt));
    assert!(log[3..].iter().all(|(_, d)| *d == dt * 2));
}

#[test]
fn should_drive_the_controls_without_registered_updates() {
    let (mut driver, _) = driver_with(&[]);
    assert!(driver.is_empty());

    let mut camera = Camera::new([60.0, 80.0, 0.0], [0.0, 0.0, 0.0]);
    let mut controls = OrbitControls::new([0.0, 0.0, 0.0]);
    controls.rotate_left(1.0);
    assert!(driver.advance(&mut controls, &mut camera, Duration::from_millis(16)));
}

#[test]
fn should_measure_time_between_ticks() {
    let mut driver = FrameDriver::new();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let first = driver.tick();
    assert!(first >= Duration::from_millis(5));
    let second = driver.tick();
    assert!(second < first);
}
