use cgmath::{InnerSpace, Vector2, Vector3, Zero};

use crate::data_structures::model::ModelVertex;

/// Index list `0..n` for primitives that come without one.
pub fn generate_indices(vertex_count: usize) -> Vec<u32> {
    (0..vertex_count as u32).collect()
}

/**
 * Normal maps need a tangent frame per vertex. When the file does not ship
 * tangents they are derived from the UV layout of each triangle and averaged
 * over every triangle that shares the vertex.
 *
 * Triangles with degenerate UVs contribute nothing. Vertices that end up
 * without a usable tangent get an arbitrary frame orthogonal to the normal so
 * that the flat default normal map still shades correctly.
 */
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut tangents = vec![Vector3::<f32>::zero(); vertices.len()];
    let mut bitangents = vec![Vector3::<f32>::zero(); vertices.len()];
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks_exact(3) {
        let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let (v0, v1, v2) = (vertices[i0], vertices[i1], vertices[i2]);

        let pos0: Vector3<_> = v0.position.into();
        let pos1: Vector3<_> = v1.position.into();
        let pos2: Vector3<_> = v2.position.into();

        let uv0: Vector2<_> = v0.tex_coords.into();
        let uv1: Vector2<_> = v1.tex_coords.into();
        let uv2: Vector2<_> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // Flipped for right-handed normal maps in wgpu's texture coordinate system
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for &i in &[i0, i1, i2] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
            triangles_included[i] += 1;
        }
    }

    for (i, v) in vertices.iter_mut().enumerate() {
        let normal: Vector3<f32> = v.normal.into();
        if triangles_included[i] > 0 && tangents[i].magnitude2() > 0.0 {
            let denom = 1.0 / triangles_included[i] as f32;
            v.tangent = (tangents[i] * denom).into();
            v.bitangent = (bitangents[i] * denom).into();
        } else {
            let (tangent, bitangent) = fallback_frame(normal);
            v.tangent = tangent.into();
            v.bitangent = bitangent.into();
        }
    }
}

fn fallback_frame(normal: Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    if normal.magnitude2() == 0.0 {
        return (Vector3::unit_x(), Vector3::unit_z());
    }
    let normal = normal.normalize();
    let helper = if normal.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    let tangent = (helper - normal * normal.dot(helper)).normalize();
    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}

/// Flat per-face normals for primitives that come without any.
pub fn compute_flat_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut normals = vec![Vector3::<f32>::zero(); vertices.len()];
    for c in indices.chunks_exact(3) {
        let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let p0: Vector3<f32> = vertices[i0].position.into();
        let p1: Vector3<f32> = vertices[i1].position.into();
        let p2: Vector3<f32> = vertices[i2].position.into();
        let face = (p1 - p0).cross(p2 - p0);
        for &i in &[i0, i1, i2] {
            normals[i] += face;
        }
    }
    for (v, n) in vertices.iter_mut().zip(normals) {
        v.normal = if n.magnitude2() > 0.0 {
            n.normalize().into()
        } else {
            [0.0, 1.0, 0.0]
        };
    }
}
