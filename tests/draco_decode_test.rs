use std::collections::HashMap;

use floor_viewer::resources::draco::{Component, DecodedMesh, DracoPrimitive, MeshAttribute};

const POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];

fn extension(attributes: &[(&str, u32)]) -> DracoPrimitive {
    DracoPrimitive {
        buffer_view: 0,
        attributes: attributes
            .iter()
            .map(|(semantic, id)| (semantic.to_string(), *id))
            .collect(),
    }
}

/// Three u16 indices, float positions as id 0 and u16 texture coordinates
/// as id 1.
fn decoded_triangle(indices: [u16; 3]) -> DecodedMesh {
    let mut data: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
    data.extend_from_slice(bytemuck::cast_slice(&POSITIONS));
    for uv in [0u16, 0, 0, 65535, 65535, 0] {
        data.extend_from_slice(&uv.to_le_bytes());
    }
    DecodedMesh {
        data,
        vertex_count: 3,
        index_count: 3,
        attributes: vec![
            MeshAttribute {
                unique_id: 0,
                dim: 3,
                component: Component::F32,
                offset: 6,
                length: 36,
            },
            MeshAttribute {
                unique_id: 1,
                dim: 2,
                component: Component::U16,
                offset: 42,
                length: 12,
            },
        ],
    }
}

#[test]
fn should_unpack_indices_and_attributes_by_unique_id() {
    let mesh = decoded_triangle([0, 1, 2]);
    let draco = extension(&[("POSITION", 0), ("TEXCOORD_0", 1)]);

    let streams = draco
        .streams(&mesh, |semantic| semantic == "TEXCOORD_0")
        .unwrap();
    assert_eq!(streams.positions, POSITIONS.to_vec());
    assert_eq!(streams.indices, Some(vec![0, 1, 2]));
    assert_eq!(
        streams.tex_coords,
        Some(vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0]])
    );
    assert!(streams.normals.is_none());
    assert!(streams.tangents.is_none());
}

#[test]
fn should_keep_integer_values_of_unnormalized_accessors() {
    let mesh = decoded_triangle([0, 1, 2]);
    let draco = extension(&[("POSITION", 0), ("TEXCOORD_0", 1)]);

    let streams = draco.streams(&mesh, |_| false).unwrap();
    assert_eq!(streams.tex_coords.unwrap()[1], [0.0, 65535.0]);
}

#[test]
fn should_reject_indices_past_the_decoded_vertices() {
    let mesh = decoded_triangle([0, 1, 7]);
    assert!(mesh.indices().is_err());
}

#[test]
fn should_require_positions_and_known_attribute_ids() {
    let mesh = decoded_triangle([0, 1, 2]);

    assert!(extension(&[("TEXCOORD_0", 1)]).streams(&mesh, |_| false).is_err());
    assert!(extension(&[("POSITION", 0), ("NORMAL", 9)]).streams(&mesh, |_| false).is_err());
    // texture coordinates in place of normals have the wrong arity
    assert!(extension(&[("POSITION", 0), ("NORMAL", 1)]).streams(&mesh, |_| false).is_err());
}

#[test]
fn should_reject_truncated_attribute_data() {
    let mut mesh = decoded_triangle([0, 1, 2]);
    mesh.data.truncate(40);
    assert!(mesh.attribute(0, false).is_err());
}

#[test]
fn should_read_wide_indices_above_u16_range() {
    let vertex_count = 70_000;
    let index_count = 70_002;
    let mut data = Vec::new();
    for i in 0..index_count as u32 {
        data.extend_from_slice(&(i % vertex_count as u32).to_le_bytes());
    }
    let mesh = DecodedMesh {
        data,
        vertex_count,
        index_count,
        attributes: Vec::new(),
    };

    let indices = mesh.indices().unwrap();
    assert_eq!(indices.len(), index_count);
    assert_eq!(indices[69_999], 69_999);
    assert_eq!(indices[70_000], 0);
}

#[test]
fn should_collect_attribute_names_from_the_extension_object() {
    let draco: DracoPrimitive = serde_json::from_value(serde_json::json!({
        "bufferView": 3,
        "attributes": { "POSITION": 0, "NORMAL": 1 }
    }))
    .unwrap();
    assert_eq!(draco.buffer_view, 3);
    assert_eq!(
        draco.attributes,
        HashMap::from([("POSITION".to_string(), 0), ("NORMAL".to_string(), 1)])
    );
}

#[cfg(feature = "draco")]
mod decoder {
    use floor_viewer::resources::scene::decode_gltf;
    use futures::executor::block_on;
    use serde_json::json;

    use super::POSITIONS;

    fn varint(mut value: u32, out: &mut Vec<u8>) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                return;
            }
            out.push(byte | 0x80);
        }
    }

    /// A one-triangle mesh in Draco's sequential layout with uncompressed
    /// connectivity and a raw float POSITION attribute with id 0.
    fn draco_triangle() -> Vec<u8> {
        let mut out = b"DRACO".to_vec();
        // version 2.2, triangular mesh, sequential method, no flags
        out.extend_from_slice(&[2, 2, 1, 0, 0, 0]);
        varint(1, &mut out);
        varint(3, &mut out);
        // uncompressed connectivity, one byte per index below 256 points
        out.extend_from_slice(&[1, 0, 1, 2]);
        // one attribute decoder holding one attribute
        out.push(1);
        varint(1, &mut out);
        // POSITION, FLOAT32, three components, not normalized
        out.extend_from_slice(&[0, 9, 3, 0]);
        varint(0, &mut out);
        // generic attribute decoder
        out.push(0);
        out.extend_from_slice(bytemuck::cast_slice(&POSITIONS));
        out
    }

    fn draco_glb() -> Vec<u8> {
        let mut bin = draco_triangle();
        let stream_length = bin.len();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let document = json!({
            "asset": { "version": "2.0" },
            "extensionsUsed": ["KHR_draco_mesh_compression"],
            "extensionsRequired": ["KHR_draco_mesh_compression"],
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "name": "compressed", "mesh": 0 }],
            "meshes": [{
                "primitives": [{
                    "attributes": { "POSITION": 0 },
                    "indices": 1,
                    "extensions": {
                        "KHR_draco_mesh_compression": {
                            "bufferView": 0,
                            "attributes": { "POSITION": 0 }
                        }
                    }
                }]
            }],
            "accessors": [
                {
                    "componentType": 5126,
                    "count": 3,
                    "type": "VEC3",
                    "min": [0.0, 0.0, 0.0],
                    "max": [1.0, 0.0, 1.0]
                },
                { "componentType": 5123, "count": 3, "type": "SCALAR" }
            ],
            "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": stream_length }],
            "buffers": [{ "byteLength": bin.len() }]
        });

        let mut json = serde_json::to_vec(&document).unwrap();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    #[test]
    fn should_decode_a_draco_compressed_glb() {
        let scene = block_on(decode_gltf(&draco_glb(), "compressed.glb")).unwrap();

        assert_eq!(scene.primitive_count(), 1);
        let primitive = &scene.roots[0].primitives[0];
        assert_eq!(primitive.indices.len(), 3);
        let mut positions: Vec<[f32; 3]> = primitive
            .indices
            .iter()
            .map(|&i| primitive.vertices[i as usize].position)
            .collect();
        positions.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut expected = POSITIONS.to_vec();
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(positions, expected);
        assert_eq!(scene.triangles().len(), 1);
    }

    #[test]
    fn should_fail_the_load_on_a_corrupt_bitstream() {
        let mut glb = draco_glb();
        // the bitstream starts right after the BIN chunk header
        let json_length = u32::from_le_bytes([glb[12], glb[13], glb[14], glb[15]]) as usize;
        let stream = 12 + 8 + json_length + 8;
        glb[stream..stream + 5].copy_from_slice(b"XXXXX");

        assert!(block_on(decode_gltf(&glb, "corrupt.glb")).is_err());
    }
}
