use cgmath::{Point3, Transform};
use floor_viewer::{
    config::{ViewerConfig, hex_to_linear},
    pipelines::light::{LightSettings, LightUniform, ShadowSettings, light_view_proj},
};

fn in_clip_volume(p: Point3<f32>) -> bool {
    (-1.0..=1.0).contains(&p.x) && (-1.0..=1.0).contains(&p.y) && (0.0..=1.0).contains(&p.z)
}

#[test]
fn should_cover_the_building_with_the_shadow_camera() {
    let config = ViewerConfig::default();
    let settings = LightSettings::from(&config);
    let shadow = ShadowSettings::from(&config);
    let view_proj = light_view_proj(settings.position, &shadow);

    for corner in [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(60.0, 0.0, 60.0),
        Point3::new(-60.0, 30.0, -60.0),
        Point3::new(60.0, 30.0, -60.0),
    ] {
        let clip = view_proj.transform_point(corner);
        assert!(in_clip_volume(clip), "{corner:?} -> {clip:?}");
    }
}

#[test]
fn should_handle_a_light_straight_above() {
    let shadow = ShadowSettings::from(&ViewerConfig::default());
    let view_proj = light_view_proj([0.0, 100.0, 0.0], &shadow);
    let clip = view_proj.transform_point(Point3::new(10.0, 0.0, 10.0));
    assert!(clip.x.is_finite() && clip.y.is_finite());
    assert!(in_clip_volume(clip));
}

#[test]
fn should_scale_colours_by_intensity() {
    let config = ViewerConfig::default();
    let mut settings = LightSettings::from(&config);
    settings.intensity = 2.0;
    settings.ambient_intensity = 0.5;
    let uniform = LightUniform::new(&settings, &ShadowSettings::from(&config));

    let expected = hex_to_linear(config.directional_light.color);
    for (actual, base) in uniform.color().iter().zip(expected) {
        assert!((actual - base * 2.0).abs() < 1e-6);
    }
    for actual in uniform.ambient() {
        assert!((actual - 0.5).abs() < 1e-5);
    }
    assert!(uniform.shadows_enabled());
}

#[test]
fn should_disable_shadows_from_either_switch() {
    let mut config = ViewerConfig::default();
    config.renderer.shadows = false;
    assert!(!ShadowSettings::from(&config).enabled);

    let mut config = ViewerConfig::default();
    config.directional_light.cast_shadow = false;
    let shadow = ShadowSettings::from(&config);
    assert!(!shadow.enabled);
    assert!(!LightUniform::new(&LightSettings::from(&config), &shadow).shadows_enabled());
}
