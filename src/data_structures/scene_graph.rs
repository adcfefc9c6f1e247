//! Scene graph of uploaded models.
//!
//! A decoded glTF hierarchy is uploaded into a tree of [`SceneNode`]s:
//! [`ModelNode`]s own the vertex, index and instance buffers of one glTF node,
//! [`ContainerNode`]s only group children. A [`SceneModel`] owns the tree plus
//! the material table shared by all of its nodes, and is what the active
//! model slot holds.

use std::{fmt::Debug, sync::Arc};

use anyhow::bail;
use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    active_model::SceneAsset,
    data_structures::{
        instance::InstanceRaw,
        model::{Material, Mesh, Model},
        texture::Texture,
    },
    pick::Triangle,
    render::{Instanced, Render},
    resources::scene::{DecodedMaterial, DecodedNode, DecodedScene},
};

pub trait SceneNode: Debug {
    /// Recompute this node's and all descendants' world transforms.
    fn update_world_transform(&mut self, parent: &Matrix4<f32>);

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn set_shadows(&mut self, cast: bool, receive: bool);

    fn write_to_buffers(&mut self, queue: &wgpu::Queue);

    fn get_render(&self) -> Vec<Instanced<'_>>;

    /// Destroy geometry and instance buffers of the whole subtree.
    fn dispose(&mut self);

    fn mesh_count(&self) -> usize;
}

#[derive(Debug)]
pub struct ContainerNode {
    children: Vec<Box<dyn SceneNode>>,
    local: Matrix4<f32>,
    world: Matrix4<f32>,
}

impl ContainerNode {
    pub fn new(local: Matrix4<f32>) -> Self {
        Self {
            children: Vec::new(),
            world: local,
            local,
        }
    }
}

impl Default for ContainerNode {
    fn default() -> Self {
        Self::new(Matrix4::identity())
    }
}

impl SceneNode for ContainerNode {
    fn update_world_transform(&mut self, parent: &Matrix4<f32>) {
        self.world = parent * self.local;
        for child in self.children.iter_mut() {
            child.update_world_transform(&self.world);
        }
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_shadows(&mut self, cast: bool, receive: bool) {
        self.children
            .iter_mut()
            .for_each(|child| child.set_shadows(cast, receive));
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }

    fn dispose(&mut self) {
        self.children.iter_mut().for_each(|child| child.dispose());
    }

    fn mesh_count(&self) -> usize {
        self.children.iter().map(|child| child.mesh_count()).sum()
    }
}

#[derive(Debug)]
pub struct ModelNode {
    children: Vec<Box<dyn SceneNode>>,
    local: Matrix4<f32>,
    world: Matrix4<f32>,
    instance_buffer: wgpu::Buffer,
    model: Model,
    cast_shadow: bool,
    receive_shadow: bool,
    needs_write: bool,
}

impl ModelNode {
    pub fn from_model(device: &wgpu::Device, model: Model, local: Matrix4<f32>) -> Self {
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&[InstanceRaw::new(&local, false)]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            children: Vec::new(),
            world: local,
            local,
            instance_buffer,
            model,
            cast_shadow: false,
            receive_shadow: false,
            needs_write: true,
        }
    }
}

impl SceneNode for ModelNode {
    fn update_world_transform(&mut self, parent: &Matrix4<f32>) {
        self.world = parent * self.local;
        self.needs_write = true;
        for child in self.children.iter_mut() {
            child.update_world_transform(&self.world);
        }
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_shadows(&mut self, cast: bool, receive: bool) {
        self.cast_shadow = cast;
        if self.receive_shadow != receive {
            self.receive_shadow = receive;
            self.needs_write = true;
        }
        self.children
            .iter_mut()
            .for_each(|child| child.set_shadows(cast, receive));
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        if self.needs_write {
            queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&[InstanceRaw::new(&self.world, self.receive_shadow)]),
            );
            self.needs_write = false;
        }
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain([Instanced {
                instance: &self.instance_buffer,
                model: &self.model,
                amount: 1,
                cast_shadow: self.cast_shadow,
            }])
            .collect()
    }

    fn dispose(&mut self) {
        self.model.meshes.iter().for_each(Mesh::destroy);
        self.instance_buffer.destroy();
        self.children.iter_mut().for_each(|child| child.dispose());
    }

    fn mesh_count(&self) -> usize {
        self.model.meshes.len()
            + self
                .children
                .iter()
                .map(|child| child.mesh_count())
                .sum::<usize>()
    }
}

/// Upload one decoded node and its subtree.
pub fn to_scene_node(
    node: &DecodedNode,
    device: &wgpu::Device,
    materials: &Arc<Vec<Material>>,
    default_material: usize,
) -> Box<dyn SceneNode> {
    let mut scene_node: Box<dyn SceneNode> = if node.primitives.is_empty() {
        Box::new(ContainerNode::new(node.transform))
    } else {
        let label = node.name.as_deref().unwrap_or("unnamed");
        let meshes = node
            .primitives
            .iter()
            .map(|primitive| {
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label} Vertex Buffer")),
                    contents: bytemuck::cast_slice(&primitive.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label} Index Buffer")),
                    contents: bytemuck::cast_slice(&primitive.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                let material = primitive
                    .material
                    .filter(|&index| index < default_material)
                    .unwrap_or(default_material);
                Mesh {
                    name: label.to_string(),
                    vertex_buffer,
                    index_buffer,
                    num_elements: primitive.indices.len() as u32,
                    material,
                }
            })
            .collect();
        let model = Model {
            meshes,
            materials: materials.clone(),
        };
        Box::new(ModelNode::from_model(device, model, node.transform))
    };
    for child in &node.children {
        scene_node.add_child(to_scene_node(child, device, materials, default_material));
    }
    scene_node
}

fn upload_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    material: &DecodedMaterial,
) -> Material {
    let diffuse_texture = match &material.base_color_image {
        Some(image) => Texture::from_rgba(device, queue, image, &material.name, false),
        None => Texture::white(device, queue),
    };
    let normal_texture = match &material.normal_image {
        Some(image) => Texture::from_rgba(device, queue, image, &material.name, true),
        None => Texture::default_normal_map(device, queue),
    };
    Material::new(
        device,
        &material.name,
        diffuse_texture,
        normal_texture,
        material.base_color,
        layout,
    )
}

/// An uploaded asset: node tree, shared materials and the world-space
/// triangles used for picking.
#[derive(Debug)]
pub struct SceneModel {
    pub name: String,
    root: ContainerNode,
    materials: Arc<Vec<Material>>,
    triangles: Vec<Triangle>,
    disposed: bool,
}

impl SceneModel {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
        scene: DecodedScene,
    ) -> anyhow::Result<Self> {
        let max_buffer_size = device.limits().max_buffer_size;
        if let Some(size) = largest_buffer(&scene.roots).filter(|&size| size > max_buffer_size) {
            bail!(
                "{} needs a {size} byte buffer, the device allows {max_buffer_size}",
                scene.name
            );
        }

        let mut materials: Vec<Material> = scene
            .materials
            .iter()
            .map(|material| upload_material(device, queue, material_layout, material))
            .collect();
        let default_material = materials.len();
        materials.push(upload_material(
            device,
            queue,
            material_layout,
            &DecodedMaterial::default(),
        ));
        let materials = Arc::new(materials);

        let mut root = ContainerNode::default();
        for node in &scene.roots {
            root.add_child(to_scene_node(node, device, &materials, default_material));
        }
        root.update_world_transform(&Matrix4::identity());

        if root.mesh_count() == 0 {
            log::warn!("{} contains no triangle meshes", scene.name);
        }

        Ok(Self {
            triangles: scene.triangles(),
            name: scene.name,
            root,
            materials,
            disposed: false,
        })
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn mesh_count(&self) -> usize {
        self.root.mesh_count()
    }

    pub fn set_shadows(&mut self, cast: bool, receive: bool) {
        self.root.set_shadows(cast, receive);
    }

    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.root.write_to_buffers(queue);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl SceneAsset for SceneModel {
    fn enable_shadows(&mut self) {
        self.set_shadows(true, true);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.root.dispose();
        self.materials.iter().for_each(Material::destroy);
        self.triangles.clear();
        self.disposed = true;
    }
}

impl<'a> From<&'a SceneModel> for Render<'a> {
    fn from(model: &'a SceneModel) -> Self {
        if model.disposed {
            return Render::None;
        }
        Render::Defaults(model.root.get_render())
    }
}

fn largest_buffer(nodes: &[DecodedNode]) -> Option<u64> {
    nodes
        .iter()
        .flat_map(|node| {
            node.primitives
                .iter()
                .flat_map(|p| {
                    [
                        std::mem::size_of_val(p.vertices.as_slice()) as u64,
                        std::mem::size_of_val(p.indices.as_slice()) as u64,
                    ]
                })
                .chain(largest_buffer(&node.children))
        })
        .max()
}
