//! glTF decoding into plain, thread-safe CPU data.
//!
//! A [`DecodedScene`] mirrors the node hierarchy of the file: local
//! transforms, triangle primitives with full vertex data, and a material
//! table with decoded images. It holds no GPU handles, so it can be built on
//! a worker and sent back to the event loop.

use std::collections::{HashMap, HashSet};

use anyhow::{Context as _, bail};
use cgmath::{Matrix4, Point3, SquareMatrix, Transform};
use image::RgbaImage;

use crate::{
    config::{GroundConfig, hex_to_linear},
    data_structures::model::ModelVertex,
    pick::Triangle,
    resources::{
        draco::{self, DracoPrimitive, VertexStreams},
        load_binary,
        mesh::{compute_flat_normals, compute_tangents, generate_indices},
        relative_to,
        texture::decode_image,
    },
};

/// Extensions a file may require that decoding still handles.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "KHR_materials_emissive_strength",
    "KHR_texture_transform",
    #[cfg(feature = "draco")]
    draco::EXTENSION,
];

/// Decompressed vertex streams keyed by mesh and primitive index.
type Decompressed = HashMap<(usize, usize), VertexStreams>;

#[derive(Debug, Clone)]
pub struct DecodedScene {
    pub name: String,
    pub roots: Vec<DecodedNode>,
    pub materials: Vec<DecodedMaterial>,
}

#[derive(Debug, Clone)]
pub struct DecodedNode {
    pub name: Option<String>,
    /// Local transform relative to the parent node.
    pub transform: Matrix4<f32>,
    pub primitives: Vec<DecodedPrimitive>,
    pub children: Vec<DecodedNode>,
}

#[derive(Debug, Clone)]
pub struct DecodedPrimitive {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct DecodedMaterial {
    pub name: String,
    /// Linear RGBA factor.
    pub base_color: [f32; 4],
    pub base_color_image: Option<RgbaImage>,
    pub normal_image: Option<RgbaImage>,
}

impl Default for DecodedMaterial {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_image: None,
            normal_image: None,
        }
    }
}

impl DecodedScene {
    /// Every triangle of the scene in world space.
    pub fn triangles(&self) -> Vec<Triangle> {
        let mut triangles = Vec::new();
        for root in &self.roots {
            root.collect_triangles(&Matrix4::identity(), &mut triangles);
        }
        triangles
    }

    pub fn primitive_count(&self) -> usize {
        fn count(node: &DecodedNode) -> usize {
            node.primitives.len() + node.children.iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }
}

impl DecodedNode {
    fn collect_triangles(&self, parent: &Matrix4<f32>, out: &mut Vec<Triangle>) {
        let world = parent * self.transform;
        for primitive in &self.primitives {
            let position = |i: u32| -> Option<Point3<f32>> {
                primitive
                    .vertices
                    .get(i as usize)
                    .map(|v| world.transform_point(Point3::from(v.position)))
            };
            for c in primitive.indices.chunks_exact(3) {
                if let (Some(a), Some(b), Some(c)) = (position(c[0]), position(c[1]), position(c[2])) {
                    out.push(Triangle::new(a, b, c));
                }
            }
        }
        for child in &self.children {
            child.collect_triangles(&world, out);
        }
    }
}

fn parse(bytes: &[u8], name: &str) -> anyhow::Result<gltf::Gltf> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice_without_validation(bytes)
        .with_context(|| format!("parsing {name}"))?;
    let mut root = document.into_json();
    for extension in &root.extensions_required {
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            bail!("{name} requires unsupported extension {extension}");
        }
    }
    // gltf only accepts required extensions from its own list
    root.extensions_required
        .retain(|extension| extension != draco::EXTENSION);

    let compressed = draco::compressed_accessors(&root);
    let document = if compressed.is_empty() {
        gltf::Document::from_json(root)
    } else {
        validate_compressed(root, &compressed)
    }
    .with_context(|| format!("validating {name}"))?;
    Ok(gltf::Gltf { document, blob })
}

/// Validate a document whose compressed primitives leave their accessors
/// without buffer views.
fn validate_compressed(
    root: gltf::json::Root,
    compressed: &HashSet<usize>,
) -> Result<gltf::Document, gltf::Error> {
    match gltf::Document::from_json(root.clone()) {
        Err(gltf::Error::Validation(errors)) => {
            let missing_view = |path: &gltf::json::Path| {
                compressed.iter().any(|&accessor| {
                    *path
                        == gltf::json::Path::new()
                            .field("accessors")
                            .index(accessor)
                            .field("bufferView")
                })
            };
            let errors: Vec<_> = errors
                .into_iter()
                .filter(|(path, error)| {
                    !(matches!(error, gltf::json::validation::Error::Missing) && missing_view(path))
                })
                .collect();
            if errors.is_empty() {
                Ok(gltf::Document::from_json_without_validation(root))
            } else {
                Err(gltf::Error::Validation(errors))
            }
        }
        result => result,
    }
}

/// The Draco extension of every compressed primitive, with the semantics
/// whose accessors are normalized.
fn compressed_primitives(
    gltf: &gltf::Gltf,
) -> anyhow::Result<Vec<((usize, usize), DracoPrimitive, HashSet<String>)>> {
    let mut jobs = Vec::new();
    for mesh in gltf.meshes() {
        for primitive in mesh.primitives() {
            if let Some(extension) = DracoPrimitive::of(&primitive) {
                let normalized = primitive
                    .attributes()
                    .filter(|(_, accessor)| accessor.normalized())
                    .map(|(semantic, _)| semantic.to_string())
                    .collect();
                jobs.push(((mesh.index(), primitive.index()), extension?, normalized));
            }
        }
    }
    Ok(jobs)
}

#[cfg(feature = "draco")]
async fn decompress(
    gltf: &gltf::Gltf,
    buffers: &[Vec<u8>],
    name: &str,
) -> anyhow::Result<Decompressed> {
    let mut decompressed = HashMap::new();
    for (key, extension, normalized) in compressed_primitives(gltf)? {
        let bitstream = extension.bitstream(&gltf.document, buffers)?;
        let mesh = draco::decode(bitstream)
            .await
            .with_context(|| format!("decompressing primitive {} of mesh {} in {name}", key.1, key.0))?;
        let streams = extension.streams(&mesh, |semantic| normalized.contains(semantic))?;
        decompressed.insert(key, streams);
    }
    Ok(decompressed)
}

#[cfg(not(feature = "draco"))]
async fn decompress(
    gltf: &gltf::Gltf,
    _buffers: &[Vec<u8>],
    name: &str,
) -> anyhow::Result<Decompressed> {
    let skipped = compressed_primitives(gltf)?.len();
    if skipped > 0 {
        log::warn!("{name} has {skipped} Draco primitives; reading their fallback accessors");
    }
    Ok(HashMap::new())
}

fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Fetch and decode the model at `path`, including external buffers and
/// images referenced relative to it.
pub async fn load_gltf(path: &str) -> anyhow::Result<DecodedScene> {
    let bytes = load_binary(path).await?;
    let gltf = parse(&bytes, path)?;

    let has_external_buffers = gltf.buffers().any(|buffer| {
        matches!(buffer.source(), gltf::buffer::Source::Uri(uri) if !is_data_uri(uri))
    });
    let buffers = if has_external_buffers {
        let mut buffers = Vec::new();
        for buffer in gltf.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => gltf
                    .blob
                    .clone()
                    .with_context(|| format!("{path} has no binary chunk"))?,
                gltf::buffer::Source::Uri(uri) if is_data_uri(uri) => {
                    bail!("{path} mixes embedded and external buffers")
                }
                gltf::buffer::Source::Uri(uri) => load_binary(&relative_to(path, uri))
                    .await
                    .with_context(|| format!("buffer {uri} of {path}"))?,
            };
            buffers.push(data);
        }
        buffers
    } else {
        embedded_buffers(&gltf, path)?
    };

    let fetches = gltf.images().filter_map(|image| match image.source() {
        gltf::image::Source::Uri { uri, .. } if !is_data_uri(uri) => {
            let location = relative_to(path, uri);
            Some(async move { (image.index(), uri, load_binary(&location).await) })
        }
        _ => None,
    });
    let mut external_images = HashMap::new();
    for (index, uri, result) in futures::future::join_all(fetches).await {
        match result {
            Ok(bytes) => {
                external_images.insert(index, bytes);
            }
            Err(e) => log::warn!("Image {uri} of {path} could not be loaded: {e:#}"),
        }
    }

    let decompressed = decompress(&gltf, &buffers, path).await?;
    decode_document(&gltf, &buffers, &decompressed, &external_images, path)
}

/// Decode a self-contained glTF (GLB blob or `data:` buffers).
pub async fn decode_gltf(bytes: &[u8], name: &str) -> anyhow::Result<DecodedScene> {
    let gltf = parse(bytes, name)?;
    let buffers = embedded_buffers(&gltf, name)?;
    let decompressed = decompress(&gltf, &buffers, name).await?;
    decode_document(&gltf, &buffers, &decompressed, &HashMap::new(), name)
}

fn embedded_buffers(gltf: &gltf::Gltf, name: &str) -> anyhow::Result<Vec<Vec<u8>>> {
    let buffers = gltf::import_buffers(&gltf.document, None, gltf.blob.clone())
        .with_context(|| format!("loading buffers of {name}"))?;
    Ok(buffers.into_iter().map(|data| data.0).collect())
}

fn decode_document(
    gltf: &gltf::Gltf,
    buffers: &[Vec<u8>],
    decompressed: &Decompressed,
    external_images: &HashMap<usize, Vec<u8>>,
    name: &str,
) -> anyhow::Result<DecodedScene> {
    let mut images: HashMap<usize, Option<RgbaImage>> = HashMap::new();
    let mut decode_texture = |texture: gltf::Texture| -> Option<RgbaImage> {
        let image = texture.source();
        images
            .entry(image.index())
            .or_insert_with(|| {
                let decoded = match image.source() {
                    gltf::image::Source::View { view, mime_type } => {
                        let start = view.offset();
                        let end = start + view.length();
                        match buffers.get(view.buffer().index()).and_then(|b| b.get(start..end)) {
                            Some(bytes) => decode_image(bytes, Some(mime_type)),
                            None => Err(anyhow::anyhow!("image view out of bounds")),
                        }
                    }
                    gltf::image::Source::Uri { uri, mime_type } => {
                        match external_images.get(&image.index()) {
                            Some(bytes) => decode_image(bytes, mime_type),
                            None => Err(anyhow::anyhow!("image {uri} is not available")),
                        }
                    }
                };
                decoded
                    .inspect_err(|e| {
                        log::warn!("Image {} of {name} falls back to default: {e:#}", image.index())
                    })
                    .ok()
            })
            .clone()
    };

    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        materials.push(DecodedMaterial {
            name: material
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{name} material {}", materials.len())),
            base_color: pbr.base_color_factor(),
            base_color_image: pbr
                .base_color_texture()
                .and_then(|info| decode_texture(info.texture())),
            normal_image: material
                .normal_texture()
                .and_then(|normal| decode_texture(normal.texture())),
        });
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{name} contains no scene"))?;
    let roots = scene
        .nodes()
        .map(|node| decode_node(node, buffers, decompressed, name))
        .collect();

    Ok(DecodedScene {
        name: name.to_string(),
        roots,
        materials,
    })
}

fn decode_node(
    node: gltf::Node,
    buffers: &[Vec<u8>],
    decompressed: &Decompressed,
    name: &str,
) -> DecodedNode {
    let mut primitives = Vec::new();
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping {:?} primitive of mesh {:?} in {name}",
                    primitive.mode(),
                    mesh.name()
                );
                continue;
            }
            let streams = match decompressed.get(&(mesh.index(), primitive.index())) {
                Some(streams) => Some(streams.clone()),
                None => read_streams(&primitive, buffers),
            };
            match streams.and_then(|streams| build_primitive(streams, primitive.material().index())) {
                Some(decoded) => primitives.push(decoded),
                None => log::warn!("Skipping empty primitive of mesh {:?} in {name}", mesh.name()),
            }
        }
    }

    DecodedNode {
        name: node.name().map(str::to_string),
        transform: Matrix4::from(node.transform().matrix()),
        primitives,
        children: node
            .children()
            .map(|child| decode_node(child, buffers, decompressed, name))
            .collect(),
    }
}

fn read_streams(primitive: &gltf::Primitive, buffers: &[Vec<u8>]) -> Option<VertexStreams> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    Some(VertexStreams {
        positions: reader.read_positions()?.collect(),
        normals: reader.read_normals().map(Iterator::collect),
        tex_coords: reader.read_tex_coords(0).map(|uvs| uvs.into_f32().collect()),
        tangents: reader.read_tangents().map(Iterator::collect),
        indices: reader.read_indices().map(|indices| indices.into_u32().collect()),
    })
}

/// Interleave the streams into vertices, filling in whatever the file left
/// out. `None` for primitives without a single triangle.
fn build_primitive(streams: VertexStreams, material: Option<usize>) -> Option<DecodedPrimitive> {
    let mut vertices: Vec<ModelVertex> = streams
        .positions
        .into_iter()
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();

    if vertices.is_empty() {
        return None;
    }

    let has_normals = match streams.normals {
        Some(normals) => {
            vertices
                .iter_mut()
                .zip(normals)
                .for_each(|(v, normal)| v.normal = normal);
            true
        }
        None => false,
    };
    if let Some(tex_coords) = streams.tex_coords {
        vertices
            .iter_mut()
            .zip(tex_coords)
            .for_each(|(v, uv)| v.tex_coords = uv);
    }

    let indices = streams
        .indices
        .unwrap_or_else(|| generate_indices(vertices.len()));
    if indices.len() < 3 {
        return None;
    }

    if !has_normals {
        compute_flat_normals(&mut vertices, &indices);
    }

    match streams.tangents {
        // glTF tangents are vec4, w gives the handedness of the bitangent
        Some(tangents) => vertices.iter_mut().zip(tangents).for_each(|(v, t)| {
            let tangent = cgmath::Vector3::new(t[0], t[1], t[2]);
            let normal: cgmath::Vector3<f32> = v.normal.into();
            v.tangent = tangent.into();
            v.bitangent = (normal.cross(tangent) * t[3]).into();
        }),
        None => compute_tangents(&mut vertices, &indices),
    }

    Some(DecodedPrimitive {
        vertices,
        indices,
        material,
    })
}

/// The ground as a one-quad scene so it flows through the same upload path
/// as floor models.
pub fn ground_plane(config: &GroundConfig) -> DecodedScene {
    let h = config.size / 2.0;
    let y = config.height;
    let corner = |x: f32, z: f32, u: f32, v: f32| ModelVertex {
        position: [x, y, z],
        tex_coords: [u, v],
        normal: [0.0, 1.0, 0.0],
        ..Default::default()
    };
    let mut vertices = vec![
        corner(-h, -h, 0.0, 0.0),
        corner(-h, h, 0.0, 1.0),
        corner(h, h, 1.0, 1.0),
        corner(h, -h, 1.0, 0.0),
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    compute_tangents(&mut vertices, &indices);

    let [r, g, b] = hex_to_linear(config.color);
    DecodedScene {
        name: "ground".to_string(),
        roots: vec![DecodedNode {
            name: Some("ground".to_string()),
            transform: Matrix4::identity(),
            primitives: vec![DecodedPrimitive {
                vertices,
                indices,
                material: Some(0),
            }],
            children: Vec::new(),
        }],
        materials: vec![DecodedMaterial {
            name: "ground".to_string(),
            base_color: [r, g, b, 1.0],
            ..Default::default()
        }],
    }
}
