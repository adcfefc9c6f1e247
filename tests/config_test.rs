use floor_viewer::config::{ViewerConfig, hex_to_linear, linear_to_hex};

#[test]
fn should_default_to_the_stock_scene() {
    let config = ViewerConfig::default();
    assert_eq!(config.default_model, "./model/-2.glb");
    assert_eq!(config.camera.fov_y, 45.0);
    assert_eq!(config.camera.position, [0.0, 120.0, 0.0]);
    assert_eq!(config.renderer.exposure, 1.5);
    assert!(config.renderer.shadows);
    assert!(config.renderer.antialias);
    assert!(config.controls.enable_damping);
    assert!(config.controls.auto_rotate);
    assert_eq!(config.ambient_light.color, 0xffffff);
    assert_eq!(config.directional_light.color, 0xfff7e8);
    assert_eq!(config.directional_light.position, [50.0, 100.0, 50.0]);
    assert_eq!(config.ground.size, 500.0);
    assert_eq!(config.ground.color, 0x00ffff);
    assert_eq!(config.helpers.axes_size, 5.0);
    assert_eq!(config.helpers.grid_divisions, 100);
    assert_eq!(config.environment.background_intensity, 5.0);
}

#[test]
fn should_override_only_given_fields() {
    let json = r#"{
        "default_model": "./model/3.glb",
        "renderer": { "exposure": 0.8 },
        "directional_light": { "shadow_map_size": 2048 },
        "helpers": { "grid": false }
    }"#;
    let config = ViewerConfig::from_json(json).unwrap();
    let defaults = ViewerConfig::default();

    assert_eq!(config.default_model, "./model/3.glb");
    assert_eq!(config.renderer.exposure, 0.8);
    assert!(config.renderer.shadows);
    assert!(config.renderer.antialias);
    assert_eq!(config.directional_light.shadow_map_size, 2048);
    assert_eq!(config.directional_light.intensity, defaults.directional_light.intensity);
    assert!(!config.helpers.grid);
    assert!(config.helpers.axes);
    assert_eq!(config.camera, defaults.camera);
}

#[test]
fn should_accept_an_empty_object() {
    assert_eq!(ViewerConfig::from_json("{}").unwrap(), ViewerConfig::default());
}

#[test]
fn should_reject_malformed_json() {
    assert!(ViewerConfig::from_json("{ renderer: }").is_err());
    assert!(ViewerConfig::from_json(r#"{ "renderer": { "exposure": "bright" } }"#).is_err());
}

#[test]
fn should_convert_hex_colours_to_linear() {
    assert!(hex_to_linear(0xffffff).iter().all(|c| (c - 1.0).abs() < 1e-5));
    assert_eq!(hex_to_linear(0x000000), [0.0, 0.0, 0.0]);
    let [r, g, b] = hex_to_linear(0x808080);
    assert!((r - 0.2158).abs() < 1e-3);
    assert_eq!(r, g);
    assert_eq!(g, b);
}

#[test]
fn should_round_trip_hex_colours() {
    for hex in [0xfff7e8, 0x00ffff, 0x123456, 0xffffff] {
        assert_eq!(linear_to_hex(hex_to_linear(hex)), hex);
    }
}
