use floor_viewer::resources::environment::decode_hdr;
use image::{Rgb, codecs::hdr::HdrEncoder};

fn hdr(width: usize, height: usize, radiance: f32) -> Vec<u8> {
    let pixels = vec![Rgb([radiance, radiance * 0.5, radiance * 0.25]); width * height];
    let mut bytes = Vec::new();
    HdrEncoder::new(&mut bytes)
        .encode(&pixels, width, height)
        .unwrap();
    bytes
}

#[test]
fn should_keep_radiance_above_one() {
    let panorama = decode_hdr(&hdr(8, 4, 12.0), 4096).unwrap();
    assert_eq!(panorama.dimensions(), (8, 4));

    let pixel = panorama.get_pixel(3, 2);
    assert!((pixel[0] - 12.0).abs() < 0.5);
    assert!((pixel[1] - 6.0).abs() < 0.25);
    assert!((pixel[2] - 3.0).abs() < 0.125);
    assert_eq!(pixel[3], 1.0);
}

#[test]
fn should_downsize_to_the_device_limit() {
    let panorama = decode_hdr(&hdr(64, 32, 1.0), 16).unwrap();
    assert_eq!(panorama.dimensions(), (16, 8));
}

#[test]
fn should_reject_non_hdr_data() {
    assert!(decode_hdr(b"#?RADIANCE but not really", 4096).is_err());
    assert!(decode_hdr(&[], 4096).is_err());
}
