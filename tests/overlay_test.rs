use egui::{Event, Modifiers, PointerButton, Pos2, Rect, pos2, vec2};
use floor_viewer::{
    menu::{ClickTarget, FloorMenu},
    ui::{closes_tower_menu, floor_bar},
};

fn click_at(pos: Pos2) -> Vec<Event> {
    let button = |pressed| Event::PointerButton {
        pos,
        button: PointerButton::Primary,
        pressed,
        modifiers: Modifiers::NONE,
    };
    vec![Event::PointerMoved(pos), button(true), button(false)]
}

/// Run one egui frame of the floor bar and return its clicks.
fn frame(ctx: &egui::Context, menu: &FloorMenu, events: Vec<Event>) -> Vec<ClickTarget> {
    let input = egui::RawInput {
        screen_rect: Some(Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0))),
        events,
        ..Default::default()
    };
    let mut clicks = Vec::new();
    let _ = ctx.run(input, |ctx| floor_bar(ctx, menu, &mut clicks));
    clicks
}

fn open_menu() -> FloorMenu {
    let mut menu = FloorMenu::new();
    menu.click(ClickTarget::TowerToggle);
    menu
}

#[test]
fn should_close_the_tower_menu_on_a_click_in_empty_space() {
    let ctx = egui::Context::default();
    let menu = open_menu();
    assert!(frame(&ctx, &menu, Vec::new()).is_empty());

    let clicks = frame(&ctx, &menu, click_at(pos2(20.0, 20.0)));
    assert_eq!(clicks, vec![ClickTarget::Elsewhere]);
}

#[test]
fn should_ignore_empty_space_clicks_while_the_menu_is_closed() {
    let ctx = egui::Context::default();
    let menu = FloorMenu::new();
    assert!(frame(&ctx, &menu, Vec::new()).is_empty());

    assert!(frame(&ctx, &menu, click_at(pos2(20.0, 20.0))).is_empty());
}

#[test]
fn should_not_report_anything_without_a_click() {
    let ctx = egui::Context::default();
    let menu = open_menu();
    assert!(frame(&ctx, &menu, Vec::new()).is_empty());

    assert!(frame(&ctx, &menu, vec![Event::PointerMoved(pos2(20.0, 20.0))]).is_empty());
}

#[test]
fn should_keep_the_menu_for_clicks_inside_the_popup() {
    let popup = Rect::from_min_max(pos2(600.0, 400.0), pos2(780.0, 540.0));

    assert!(!closes_tower_menu(true, Some(pos2(650.0, 450.0)), Some(popup)));
    assert!(closes_tower_menu(true, Some(pos2(20.0, 20.0)), Some(popup)));
    assert!(closes_tower_menu(true, Some(pos2(20.0, 20.0)), None));
    assert!(!closes_tower_menu(false, Some(pos2(20.0, 20.0)), Some(popup)));
    assert!(!closes_tower_menu(true, None, Some(popup)));
}
