//! Page markup wiring on the web.
//!
//! The hosting page provides the floor buttons:
//!
//! - `.bottom-buttons button` for the floors, matched by id or visible text
//! - `#tower-btn` toggling `#tower-menu`, whose buttons select a tower variant
//!   by position
//!
//! Clicks are translated into [`ClickTarget`]s, run through one shared
//! [`FloorMenu`] and forwarded to the event loop as load requests.

use std::{cell::RefCell, rc::Rc};

use wasm_bindgen::{JsCast, prelude::*};
use web_sys::{Document, Element, HtmlElement, MouseEvent};
use winit::event_loop::EventLoopProxy;

use crate::{
    flow::FlowEvent,
    menu::{ClickTarget, FloorMenu, TOWER_ID, TOWER_LABEL, resolve_floor, tower_menu_display},
};

const FLOOR_BUTTONS: &str = ".bottom-buttons button";
const TOWER_BUTTON: &str = "tower-btn";
const TOWER_MENU: &str = "tower-menu";

/// Hook up the page buttons. Returns `false` when the page has none, in which
/// case the egui floor bar takes over.
pub(crate) fn wire_dom_controls(proxy: EventLoopProxy<FlowEvent>) -> bool {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return false;
    };
    let menu = Rc::new(RefCell::new(FloorMenu::new()));
    let tower_menu = document.get_element_by_id(TOWER_MENU);

    let mut wired = 0;
    for button in query_all(&document, FLOOR_BUTTONS) {
        let id = Some(button.id()).filter(|id| !id.is_empty());
        let text = button.text_content();
        if id.as_deref() == Some(TOWER_BUTTON)
            || id.as_deref() == Some(TOWER_ID)
            || text.as_deref().map(str::trim) == Some(TOWER_LABEL)
        {
            continue;
        }
        match resolve_floor(id.as_deref(), text.as_deref()) {
            Some(floor) => {
                on_click(
                    &button,
                    click_handler(&proxy, &menu, &tower_menu, ClickTarget::Floor(floor.id), false),
                );
                wired += 1;
            }
            None => log::debug!("Unknown floor button {:?} / {:?}", id, text),
        }
    }

    if let (Some(tower_button), Some(tower_menu_el)) =
        (document.get_element_by_id(TOWER_BUTTON), tower_menu.as_ref())
    {
        on_click(
            &tower_button,
            click_handler(&proxy, &menu, &tower_menu, ClickTarget::TowerToggle, true),
        );
        let selector = format!("#{TOWER_MENU} button");
        for (index, item) in query_all(&document, &selector).into_iter().enumerate() {
            on_click(
                &item,
                click_handler(&proxy, &menu, &tower_menu, ClickTarget::TowerItem(index), true),
            );
        }
        // clicks on the menu background stay inside it
        on_click(
            tower_menu_el,
            Closure::<dyn FnMut(MouseEvent)>::new(|event: MouseEvent| event.stop_propagation()),
        );
        on_click(
            &document,
            click_handler(&proxy, &menu, &tower_menu, ClickTarget::Elsewhere, false),
        );
        set_visible(Some(tower_menu_el), menu.borrow().is_tower_open());
        wired += 1;
    } else {
        log::debug!("No #{TOWER_BUTTON}/#{TOWER_MENU} on the page, tower menu disabled");
    }

    wired > 0
}

fn click_handler(
    proxy: &EventLoopProxy<FlowEvent>,
    menu: &Rc<RefCell<FloorMenu>>,
    tower_menu: &Option<Element>,
    target: ClickTarget,
    stop_propagation: bool,
) -> Closure<dyn FnMut(MouseEvent)> {
    let proxy = proxy.clone();
    let menu = menu.clone();
    let tower_menu = tower_menu.clone();
    Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
        if stop_propagation {
            event.stop_propagation();
        }
        let mut menu = menu.borrow_mut();
        let asset = menu.click(target);
        set_visible(tower_menu.as_ref(), menu.is_tower_open());
        if let Some(asset) = asset {
            if proxy.send_event(FlowEvent::Load(asset.to_string())).is_err() {
                log::error!("Event loop closed, cannot load {asset}");
            }
        }
    })
}

fn on_click(target: &web_sys::EventTarget, handler: Closure<dyn FnMut(MouseEvent)>) {
    if let Err(e) =
        target.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())
    {
        log::error!("Cannot attach click listener: {e:?}");
    }
    // listeners live as long as the page
    handler.forget();
}

fn set_visible(element: Option<&Element>, visible: bool) {
    let Some(element) = element.and_then(|el| el.dyn_ref::<HtmlElement>()) else {
        return;
    };
    if let Err(e) = element
        .style()
        .set_property("display", tower_menu_display(visible))
    {
        log::warn!("Cannot toggle tower menu: {e:?}");
    }
}

fn query_all(document: &Document, selector: &str) -> Vec<Element> {
    let Ok(nodes) = document.query_selector_all(selector) else {
        log::warn!("Invalid selector {selector}");
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}
