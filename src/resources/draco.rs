//! `KHR_draco_mesh_compression` primitives.
//!
//! A compressed primitive points at one buffer view holding a Draco
//! bitstream and maps its glTF attribute semantics to Draco attribute ids.
//! The accessors it replaces carry no buffer view of their own. Decoding
//! needs the `draco` feature; the unpacking of the decoded buffer is plain
//! byte work and always available.

use std::collections::{HashMap, HashSet};

use anyhow::{Context as _, bail};
use serde::Deserialize;

pub const EXTENSION: &str = "KHR_draco_mesh_compression";

/// The extension object of one primitive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DracoPrimitive {
    pub buffer_view: usize,
    /// glTF semantic to Draco unique attribute id.
    pub attributes: HashMap<String, u32>,
}

impl DracoPrimitive {
    pub fn of(primitive: &gltf::Primitive) -> Option<anyhow::Result<Self>> {
        let value = primitive.extension_value(EXTENSION)?;
        Some(
            serde_json::from_value(value.clone())
                .with_context(|| format!("malformed {EXTENSION} on primitive {}", primitive.index())),
        )
    }

    /// The compressed bitstream inside `buffers`.
    pub fn bitstream<'a>(
        &self,
        document: &gltf::Document,
        buffers: &'a [Vec<u8>],
    ) -> anyhow::Result<&'a [u8]> {
        let view = document
            .views()
            .nth(self.buffer_view)
            .with_context(|| format!("{EXTENSION} points at missing buffer view {}", self.buffer_view))?;
        let start = view.offset();
        buffers
            .get(view.buffer().index())
            .and_then(|buffer| buffer.get(start..start + view.length()))
            .with_context(|| format!("buffer view {} is out of bounds", self.buffer_view))
    }

    /// Pull the vertex streams out of a decoded mesh. `normalized` reports
    /// whether the accessor of a semantic maps integers to `0..=1`.
    pub fn streams(
        &self,
        mesh: &DecodedMesh,
        normalized: impl Fn(&str) -> bool,
    ) -> anyhow::Result<VertexStreams> {
        let read = |semantic: &str| -> anyhow::Result<Option<(usize, Vec<f32>)>> {
            match self.attributes.get(semantic) {
                Some(&id) => mesh.attribute(id, normalized(semantic)).map(Some),
                None => Ok(None),
            }
        };
        let Some((3, positions)) = read("POSITION")? else {
            bail!("compressed primitive has no three-component POSITION");
        };
        let normals = match read("NORMAL")? {
            Some((3, values)) => Some(chunked::<3>(&values)),
            Some((dim, _)) => bail!("NORMAL has {dim} components"),
            None => None,
        };
        let tex_coords = match read("TEXCOORD_0")? {
            Some((2, values)) => Some(chunked::<2>(&values)),
            Some((dim, _)) => bail!("TEXCOORD_0 has {dim} components"),
            None => None,
        };
        let tangents = match read("TANGENT")? {
            Some((4, values)) => Some(chunked::<4>(&values)),
            Some((dim, _)) => bail!("TANGENT has {dim} components"),
            None => None,
        };
        Ok(VertexStreams {
            positions: chunked::<3>(&positions),
            normals,
            tex_coords,
            tangents,
            indices: Some(mesh.indices()?),
        })
    }
}

/// Per-vertex data of one triangle primitive before it is interleaved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexStreams {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 4]>>,
    pub indices: Option<Vec<u32>>,
}

fn chunked<const N: usize>(values: &[f32]) -> Vec<[f32; N]> {
    values
        .chunks_exact(N)
        .map(|chunk| std::array::from_fn(|i| chunk[i]))
        .collect()
}

/// Accessor indices that compressed primitives stand in for.
pub fn compressed_accessors(root: &gltf::json::Root) -> HashSet<usize> {
    let mut accessors = HashSet::new();
    for primitive in root.meshes.iter().flat_map(|mesh| &mesh.primitives) {
        let compressed = primitive
            .extensions
            .as_ref()
            .is_some_and(|extensions| extensions.others.contains_key(EXTENSION));
        if compressed {
            accessors.extend(primitive.attributes.values().map(|index| index.value()));
            accessors.extend(primitive.indices.map(|index| index.value()));
        }
    }
    accessors
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
}

impl Component {
    pub fn size(self) -> usize {
        match self {
            Component::I8 | Component::U8 => 1,
            Component::I16 | Component::U16 => 2,
            Component::I32 | Component::U32 | Component::F32 => 4,
        }
    }

    fn read(self, bytes: &[u8], normalized: bool) -> f32 {
        match (self, normalized) {
            (Component::I8, false) => bytes[0] as i8 as f32,
            (Component::I8, true) => (bytes[0] as i8 as f32 / 127.0).max(-1.0),
            (Component::U8, false) => bytes[0] as f32,
            (Component::U8, true) => bytes[0] as f32 / 255.0,
            (Component::I16, false) => i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            (Component::I16, true) => {
                (i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32767.0).max(-1.0)
            }
            (Component::U16, false) => u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            (Component::U16, true) => u16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 65535.0,
            (Component::I32, _) => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            (Component::U32, _) => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            (Component::F32, _) => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }
}

/// Where one attribute lives in [`DecodedMesh::data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshAttribute {
    pub unique_id: u32,
    pub dim: usize,
    pub component: Component,
    pub offset: usize,
    pub length: usize,
}

/// Output of the Draco decoder: the index list first, u16 while the count
/// fits and u32 above, followed by the attributes at their offsets.
#[derive(Debug, Clone)]
pub struct DecodedMesh {
    pub data: Vec<u8>,
    pub vertex_count: usize,
    pub index_count: usize,
    pub attributes: Vec<MeshAttribute>,
}

impl DecodedMesh {
    pub fn indices(&self) -> anyhow::Result<Vec<u32>> {
        let wide = self.index_count > u16::MAX as usize;
        let size = if wide { 4 } else { 2 };
        let bytes = self
            .data
            .get(..self.index_count * size)
            .context("decoded index data is truncated")?;
        let indices: Vec<u32> = if wide {
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        } else {
            bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect()
        };
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= self.vertex_count) {
            bail!("index {bad} exceeds {} decoded vertices", self.vertex_count);
        }
        Ok(indices)
    }

    /// Components of attribute `unique_id` as floats, with its dimension.
    pub fn attribute(&self, unique_id: u32, normalized: bool) -> anyhow::Result<(usize, Vec<f32>)> {
        let attribute = self
            .attributes
            .iter()
            .find(|a| a.unique_id == unique_id)
            .with_context(|| format!("decoded mesh has no attribute {unique_id}"))?;
        let size = attribute.component.size();
        let expected = attribute.dim * self.vertex_count * size;
        if attribute.length < expected {
            bail!(
                "attribute {unique_id} holds {} bytes, {expected} needed",
                attribute.length
            );
        }
        let bytes = self
            .data
            .get(attribute.offset..attribute.offset + expected)
            .with_context(|| format!("attribute {unique_id} is out of bounds"))?;
        let values = bytes
            .chunks_exact(size)
            .map(|c| attribute.component.read(c, normalized))
            .collect();
        Ok((attribute.dim, values))
    }
}

#[cfg(feature = "draco")]
impl From<draco_decoder::MeshDecodeResult> for DecodedMesh {
    fn from(result: draco_decoder::MeshDecodeResult) -> Self {
        use draco_decoder::AttributeDataType;

        let attributes = result
            .config
            .attributes()
            .into_iter()
            .map(|attribute| MeshAttribute {
                unique_id: attribute.unique_id(),
                dim: attribute.dim() as usize,
                component: match attribute.data_type() {
                    AttributeDataType::Int8 => Component::I8,
                    AttributeDataType::UInt8 => Component::U8,
                    AttributeDataType::Int16 => Component::I16,
                    AttributeDataType::UInt16 => Component::U16,
                    AttributeDataType::Int32 => Component::I32,
                    AttributeDataType::UInt32 => Component::U32,
                    AttributeDataType::Float32 => Component::F32,
                },
                offset: attribute.offset() as usize,
                length: attribute.lenght() as usize,
            })
            .collect();
        DecodedMesh {
            vertex_count: result.config.vertex_count() as usize,
            index_count: result.config.index_count() as usize,
            attributes,
            data: result.data,
        }
    }
}

/// Run the Draco decoder over one bitstream.
#[cfg(all(feature = "draco", not(target_arch = "wasm32")))]
pub async fn decode(bitstream: &[u8]) -> anyhow::Result<DecodedMesh> {
    // the native decoder panics on streams it cannot read
    let result = std::panic::catch_unwind(|| draco_decoder::decode_mesh_with_config_sync(bitstream))
        .map_err(|_| anyhow::anyhow!("Draco decoder rejected the bitstream"))?;
    result
        .map(DecodedMesh::from)
        .context("Draco decoder returned no mesh")
}

#[cfg(all(feature = "draco", target_arch = "wasm32"))]
pub async fn decode(bitstream: &[u8]) -> anyhow::Result<DecodedMesh> {
    draco_decoder::decode_mesh_with_config(bitstream)
        .await
        .map(DecodedMesh::from)
        .context("Draco decoder returned no mesh")
}
