//! Line geometry of the grid and axes helpers.

use crate::data_structures::model::Vertex;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex for LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

const GRID_CENTER_COLOR: [f32; 3] = [0.267, 0.267, 0.267];
const GRID_COLOR: [f32; 3] = [0.533, 0.533, 0.533];

/// Square grid on the XZ plane centred at the origin, `divisions` cells per
/// side. The two centre lines are drawn darker.
pub fn grid_vertices(size: f32, divisions: u32, opacity: f32) -> Vec<LineVertex> {
    if divisions == 0 || size <= 0.0 {
        return Vec::new();
    }
    let half = size / 2.0;
    let step = size / divisions as f32;
    let center = divisions / 2;

    let mut vertices = Vec::with_capacity((divisions as usize + 1) * 4);
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let rgb = if divisions % 2 == 0 && i == center {
            GRID_CENTER_COLOR
        } else {
            GRID_COLOR
        };
        let color = [rgb[0], rgb[1], rgb[2], opacity];
        // line parallel to Z, then parallel to X
        vertices.push(LineVertex { position: [k, 0.0, -half], color });
        vertices.push(LineVertex { position: [k, 0.0, half], color });
        vertices.push(LineVertex { position: [-half, 0.0, k], color });
        vertices.push(LineVertex { position: [half, 0.0, k], color });
    }
    vertices
}

/// Red X, green Y and blue Z from the origin.
pub fn axes_vertices(size: f32) -> Vec<LineVertex> {
    let red = [1.0, 0.0, 0.0, 1.0];
    let green = [0.0, 1.0, 0.0, 1.0];
    let blue = [0.0, 0.0, 1.0, 1.0];
    let origin = [0.0, 0.0, 0.0];
    vec![
        LineVertex { position: origin, color: red },
        LineVertex { position: [size, 0.0, 0.0], color: red },
        LineVertex { position: origin, color: green },
        LineVertex { position: [0.0, size, 0.0], color: green },
        LineVertex { position: origin, color: blue },
        LineVertex { position: [0.0, 0.0, size], color: blue },
    ]
}
