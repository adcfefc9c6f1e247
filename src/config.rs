//! Viewer configuration.
//!
//! Every tunable of the scene host lives in [`ViewerConfig`]. The defaults
//! reproduce the stock hospital viewer; an optional `viewer.json` in the asset
//! root can override any subset of fields since every section is
//! `#[serde(default)]`.

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::resources::load_string;

/// File name looked up in the asset root at startup.
pub const CONFIG_FILE: &str = "viewer.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub renderer: RendererConfig,
    pub controls: ControlsConfig,
    pub ambient_light: AmbientLightConfig,
    pub directional_light: DirectionalLightConfig,
    pub ground: GroundConfig,
    pub helpers: HelpersConfig,
    pub environment: EnvironmentConfig,
    /// Model loaded before any user interaction.
    pub default_model: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            renderer: RendererConfig::default(),
            controls: ControlsConfig::default(),
            ambient_light: AmbientLightConfig::default(),
            directional_light: DirectionalLightConfig::default(),
            ground: GroundConfig::default(),
            helpers: HelpersConfig::default(),
            environment: EnvironmentConfig::default(),
            default_model: "./model/-2.glb".to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("viewer config is not valid JSON")
    }

    /// Load `viewer.json` from the asset root, falling back to the defaults.
    ///
    /// A missing file is the normal case and only logged at info level.
    pub async fn load() -> Self {
        let json = match load_string(CONFIG_FILE).await {
            Ok(json) => json,
            Err(e) => {
                log::info!("No {CONFIG_FILE} found ({e}), using defaults.");
                return Self::default();
            }
        };
        match Self::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring {CONFIG_FILE}: {e:#}");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y: 45.0,
            near: 1.0,
            far: 500.0,
            position: [0.0, 120.0, 0.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub shadows: bool,
    /// 4x multisampling where the adapter supports it.
    pub antialias: bool,
    pub exposure: f32,
    /// RGBA, shown wherever neither sky nor geometry is drawn.
    pub clear_colour: [f64; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shadows: true,
            antialias: true,
            exposure: 1.5,
            clear_colour: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub auto_rotate: bool,
    /// Full turns per minute at 60 fps, i.e. `2.0` is one turn every 30s.
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.1,
            auto_rotate: true,
            auto_rotate_speed: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientLightConfig {
    /// sRGB hex colour, e.g. `0xffffff`.
    pub color: u32,
    pub intensity: f32,
}

impl Default for AmbientLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightConfig {
    pub color: u32,
    pub intensity: f32,
    pub position: [f32; 3],
    pub cast_shadow: bool,
    /// Half extent of the orthographic shadow frustum.
    pub shadow_extent: f32,
    pub shadow_near: f32,
    pub shadow_far: f32,
    /// Requested shadow map resolution; clamped to the device limit.
    pub shadow_map_size: u32,
    pub shadow_bias: f32,
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            color: 0xfff7e8,
            intensity: 3.0,
            position: [50.0, 100.0, 50.0],
            cast_shadow: true,
            shadow_extent: 150.0,
            shadow_near: 0.1,
            shadow_far: 300.0,
            shadow_map_size: 8192,
            shadow_bias: 0.0005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    pub enabled: bool,
    pub size: f32,
    pub color: u32,
    pub height: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 500.0,
            color: 0x00ffff,
            height: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpersConfig {
    pub axes: bool,
    pub axes_size: f32,
    pub grid: bool,
    pub grid_size: f32,
    pub grid_divisions: u32,
    pub grid_opacity: f32,
}

impl Default for HelpersConfig {
    fn default() -> Self {
        Self {
            axes: true,
            axes_size: 5.0,
            grid: true,
            grid_size: 100.0,
            grid_divisions: 100,
            grid_opacity: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Equirectangular HDR, relative to the asset root. Empty disables it.
    pub path: String,
    pub background_intensity: f32,
    pub environment_intensity: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path: "texture/sky/NoEmotion-Dayhdr_Day_0016_4k.hdr".to_string(),
            background_intensity: 5.0,
            environment_intensity: 1.0,
        }
    }
}

/// Convert an sRGB hex colour to linear RGB.
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

/// Convert linear RGB back to an sRGB hex colour.
pub fn linear_to_hex(rgb: [f32; 3]) -> u32 {
    let channel = |v: f32| (linear_to_srgb(v).clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(rgb[0]) << 16) | (channel(rgb[1]) << 8) | channel(rgb[2])
}

fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c < 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(0.41666) - 0.055
    }
}
