//! Floor buttons and the tower submenu.
//!
//! Buttons are identified by a stable id; the display label is kept as a
//! fallback for pages that only mark buttons up by their text.

use crate::active_model::{LoadTicket, ModelSlot, SceneAsset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Floor {
    pub id: &'static str,
    pub label: &'static str,
    pub asset: &'static str,
}

pub const TOWER_ID: &str = "tower";
pub const TOWER_LABEL: &str = "塔楼";

pub static FLOORS: [Floor; 7] = [
    Floor {
        id: "b2",
        label: "地下二层",
        asset: "./model/-2.glb",
    },
    Floor {
        id: "b1",
        label: "地下一层",
        asset: "./model/-1.glb",
    },
    Floor {
        id: "f1",
        label: "首层",
        asset: "./model/1.glb",
    },
    Floor {
        id: "f2",
        label: "二层",
        asset: "./model/2.glb",
    },
    Floor {
        id: "f3",
        label: "三层",
        asset: "./model/3.glb",
    },
    Floor {
        id: "f4",
        label: "四层",
        asset: "./model/4.glb",
    },
    Floor {
        id: "f5",
        label: "五层",
        asset: "./model/5.glb",
    },
];

/// Tower variants in submenu order. The last two entries share a model.
pub static TOWER_VARIANTS: [&str; 6] = [
    "./model/6-12北塔楼.glb",
    "./model/6南塔楼.glb",
    "./model/7-10南塔楼.glb",
    "./model/11 12南塔楼.glb",
    "./model/13塔楼.glb",
    "./model/13塔楼.glb",
];

pub fn floor_by_id(id: &str) -> Option<&'static Floor> {
    FLOORS.iter().find(|floor| floor.id == id)
}

pub fn floor_by_label(label: &str) -> Option<&'static Floor> {
    let label = label.trim();
    FLOORS.iter().find(|floor| floor.label == label)
}

/// Resolve a button by id first, then by its visible text.
pub fn resolve_floor(id: Option<&str>, label: Option<&str>) -> Option<&'static Floor> {
    id.and_then(floor_by_id)
        .or_else(|| label.and_then(floor_by_label))
}

pub fn tower_variant(index: usize) -> Option<&'static str> {
    TOWER_VARIANTS.get(index).copied()
}

/// Button text of a tower variant: the file name without directory and
/// extension.
pub fn variant_label(asset: &str) -> &str {
    let name = asset.rsplit('/').next().unwrap_or(asset);
    name.strip_suffix(".glb").unwrap_or(name)
}

/// CSS `display` of the page's tower submenu. The submenu lays its buttons
/// out as a flex row.
pub fn tower_menu_display(open: bool) -> &'static str {
    if open { "flex" } else { "none" }
}

/// Where a click landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Floor(&'static str),
    TowerToggle,
    TowerItem(usize),
    Elsewhere,
}

/// Submenu visibility and click dispatch.
#[derive(Debug, Default, Clone)]
pub struct FloorMenu {
    tower_open: bool,
}

impl FloorMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tower_open(&self) -> bool {
        self.tower_open
    }

    /// Apply a click and return the asset to load, if any.
    pub fn click(&mut self, target: ClickTarget) -> Option<&'static str> {
        match target {
            ClickTarget::Floor(id) => {
                self.tower_open = false;
                floor_by_id(id).map(|floor| floor.asset)
            }
            ClickTarget::TowerToggle => {
                self.tower_open = !self.tower_open;
                None
            }
            // inside the submenu, so it stays open
            ClickTarget::TowerItem(index) => tower_variant(index),
            ClickTarget::Elsewhere => {
                self.tower_open = false;
                None
            }
        }
    }

    /// Apply a click and, when it selects a model, request that model from
    /// `slot`. The returned ticket is what the decode has to resolve.
    pub fn dispatch<M: SceneAsset>(
        &mut self,
        target: ClickTarget,
        slot: &mut ModelSlot<M>,
    ) -> Option<LoadTicket> {
        self.click(target).map(|asset| slot.request(asset))
    }
}
