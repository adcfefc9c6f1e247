use cgmath::{InnerSpace, Vector3};
use floor_viewer::{
    data_structures::model::ModelVertex,
    resources::mesh::{compute_flat_normals, compute_tangents, generate_indices},
};

fn vertex(position: [f32; 3], tex_coords: [f32; 2]) -> ModelVertex {
    ModelVertex {
        position,
        tex_coords,
        normal: [0.0, 1.0, 0.0],
        ..Default::default()
    }
}

#[test]
fn should_generate_sequential_indices() {
    assert_eq!(generate_indices(4), vec![0, 1, 2, 3]);
    assert!(generate_indices(0).is_empty());
}

#[test]
fn should_follow_the_uv_layout() {
    let mut vertices = vec![
        vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
        vertex([0.0, 0.0, 1.0], [0.0, 1.0]),
        vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
    ];
    compute_tangents(&mut vertices, &[0, 1, 2]);

    for v in &vertices {
        let tangent = Vector3::from(v.tangent);
        assert!((tangent - Vector3::unit_x()).magnitude() < 1e-4, "{tangent:?}");
        let bitangent = Vector3::from(v.bitangent);
        assert!(bitangent.dot(Vector3::from(v.normal)).abs() < 1e-4);
    }
}

#[test]
fn should_fall_back_to_an_orthogonal_frame_for_degenerate_uvs() {
    let mut vertices = vec![
        vertex([0.0, 0.0, 0.0], [0.5, 0.5]),
        vertex([0.0, 0.0, 1.0], [0.5, 0.5]),
        vertex([1.0, 0.0, 0.0], [0.5, 0.5]),
    ];
    compute_tangents(&mut vertices, &[0, 1, 2]);

    for v in &vertices {
        let tangent = Vector3::from(v.tangent);
        assert!((tangent.magnitude() - 1.0).abs() < 1e-4);
        assert!(tangent.dot(Vector3::unit_y()).abs() < 1e-4);
    }
}

#[test]
fn should_compute_face_normals() {
    let mut vertices = vec![
        vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
        vertex([1.0, 0.0, 0.0], [0.0, 0.0]),
        vertex([0.0, 1.0, 0.0], [0.0, 0.0]),
    ];
    compute_flat_normals(&mut vertices, &[0, 1, 2]);
    assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
}

#[test]
fn should_ignore_out_of_range_indices() {
    let mut vertices = vec![vertex([0.0, 0.0, 0.0], [0.0, 0.0])];
    compute_flat_normals(&mut vertices, &[0, 7, 9]);
    compute_tangents(&mut vertices, &[0, 7, 9]);
    assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0]);
}
