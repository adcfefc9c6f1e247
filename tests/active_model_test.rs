use std::{cell::Cell, rc::Rc};

use floor_viewer::active_model::{ModelSlot, Resolution, SceneAsset};

#[derive(Debug)]
struct FakeModel {
    name: &'static str,
    disposed: Rc<Cell<u32>>,
    shadows: bool,
}

impl FakeModel {
    fn new(name: &'static str) -> (Self, Rc<Cell<u32>>) {
        let disposed = Rc::new(Cell::new(0));
        (
            Self {
                name,
                disposed: disposed.clone(),
                shadows: false,
            },
            disposed,
        )
    }
}

impl SceneAsset for FakeModel {
    fn enable_shadows(&mut self) {
        self.shadows = true;
    }

    fn dispose(&mut self) {
        self.disposed.set(self.disposed.get() + 1);
    }
}

#[test]
fn should_attach_the_first_model_with_shadows() {
    let mut slot = ModelSlot::new();
    let ticket = slot.request("./model/-2.glb");
    assert!(slot.is_loading());

    let (model, disposed) = FakeModel::new("b2");
    assert_eq!(slot.resolve(ticket, Ok(model)), Resolution::Attached);

    assert!(!slot.is_loading());
    assert_eq!(slot.current_path(), Some("./model/-2.glb"));
    let current = slot.current().unwrap();
    assert_eq!(current.name, "b2");
    assert!(current.shadows);
    assert_eq!(disposed.get(), 0);
}

#[test]
fn should_dispose_the_old_model_before_the_next_load_starts() {
    let mut slot = ModelSlot::new();
    let first = slot.request("./model/1.glb");
    let (model, disposed) = FakeModel::new("f1");
    slot.resolve(first, Ok(model));

    let second = slot.request("./model/2.glb");
    assert_eq!(disposed.get(), 1);
    assert!(slot.current().is_none());

    let (model, _) = FakeModel::new("f2");
    assert_eq!(slot.resolve(second, Ok(model)), Resolution::Attached);
    assert_eq!(slot.current().unwrap().name, "f2");
    assert_eq!(disposed.get(), 1);
}

#[test]
fn should_keep_only_the_latest_request_when_results_arrive_out_of_order() {
    let mut slot = ModelSlot::new();
    let a = slot.request("./model/1.glb");
    let b = slot.request("./model/2.glb");
    assert!(!slot.is_current(&a));
    assert!(slot.is_current(&b));

    let (model_b, disposed_b) = FakeModel::new("f2");
    assert_eq!(slot.resolve(b, Ok(model_b)), Resolution::Attached);

    let (model_a, disposed_a) = FakeModel::new("f1");
    assert_eq!(slot.resolve(a, Ok(model_a)), Resolution::Stale);

    assert_eq!(slot.current().unwrap().name, "f2");
    assert_eq!(disposed_a.get(), 1);
    assert_eq!(disposed_b.get(), 0);
}

#[test]
fn should_discard_a_stale_result_that_arrives_first() {
    let mut slot = ModelSlot::new();
    let a = slot.request("./model/1.glb");
    let b = slot.request("./model/2.glb");

    let (model_a, disposed_a) = FakeModel::new("f1");
    assert_eq!(slot.resolve(a, Ok(model_a)), Resolution::Stale);
    assert!(slot.current().is_none());
    assert!(slot.is_loading());
    assert_eq!(disposed_a.get(), 1);

    let (model_b, _) = FakeModel::new("f2");
    assert_eq!(slot.resolve(b, Ok(model_b)), Resolution::Attached);
    assert_eq!(slot.current_path(), Some("./model/2.glb"));
}

#[test]
fn should_stay_empty_after_a_failed_load_and_recover_on_the_next() {
    let mut slot: ModelSlot<FakeModel> = ModelSlot::new();
    let broken = slot.request("./model/missing.glb");
    assert_eq!(
        slot.resolve(broken, Err(anyhow::anyhow!("404"))),
        Resolution::Failed
    );
    assert!(slot.current().is_none());
    assert!(!slot.is_loading());

    let next = slot.request("./model/3.glb");
    let (model, _) = FakeModel::new("f3");
    assert_eq!(slot.resolve(next, Ok(model)), Resolution::Attached);
    assert_eq!(slot.current().unwrap().name, "f3");
}

#[test]
fn should_not_build_stale_decodes() {
    let mut slot: ModelSlot<FakeModel> = ModelSlot::new();
    let a = slot.request("./model/4.glb");
    let b = slot.request("./model/5.glb");

    let built = Cell::new(0);
    let resolution = slot.resolve_with(a, Ok("decoded f4"), |_| {
        built.set(built.get() + 1);
        Ok(FakeModel::new("f4").0)
    });
    assert_eq!(resolution, Resolution::Stale);
    assert_eq!(built.get(), 0);

    let resolution = slot.resolve_with(b, Ok("decoded f5"), |data| {
        built.set(built.get() + 1);
        assert_eq!(data, "decoded f5");
        Ok(FakeModel::new("f5").0)
    });
    assert_eq!(resolution, Resolution::Attached);
    assert_eq!(built.get(), 1);
    assert_eq!(slot.current().unwrap().name, "f5");
}

#[test]
fn should_report_failed_uploads() {
    let mut slot: ModelSlot<FakeModel> = ModelSlot::new();
    let ticket = slot.request("./model/1.glb");
    let resolution = slot.resolve_with(ticket, Ok(()), |_| Err(anyhow::anyhow!("out of memory")));
    assert_eq!(resolution, Resolution::Failed);
    assert!(slot.current().is_none());
}

#[test]
fn should_reload_the_same_path() {
    let mut slot = ModelSlot::new();
    let first = slot.request("./model/13塔楼.glb");
    let (model, disposed) = FakeModel::new("tower");
    slot.resolve(first, Ok(model));

    let second = slot.request("./model/13塔楼.glb");
    assert_eq!(second.path(), "./model/13塔楼.glb");
    assert_eq!(second.generation(), 2);
    assert_eq!(disposed.get(), 1);
    assert!(slot.current().is_none());
}
