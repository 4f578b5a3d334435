use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::InnerSpace;

use crate::data_structures::material::Material;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Identifies a mesh across frames so the renderer can keep its GPU buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

impl MeshId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// CPU-side triangle geometry with a single material.
#[derive(Clone, Debug)]
pub struct Mesh {
    id: MeshId,
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: Material,
}

impl Mesh {
    pub fn new(name: &str, vertices: Vec<ModelVertex>, indices: Vec<u32>, material: Material) -> Self {
        Self {
            id: MeshId::next(),
            name: name.to_string(),
            vertices,
            indices,
            material,
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Replaces all normals with area-weighted face normals.
    ///
    /// Used for primitives that ship without a `NORMAL` attribute.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![cgmath::Vector3::new(0.0_f32, 0.0, 0.0); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            if i0 >= self.vertices.len() || i1 >= self.vertices.len() || i2 >= self.vertices.len() {
                continue;
            }
            let p0: cgmath::Vector3<f32> = self.vertices[i0].position.into();
            let p1: cgmath::Vector3<f32> = self.vertices[i1].position.into();
            let p2: cgmath::Vector3<f32> = self.vertices[i2].position.into();
            // Length is twice the triangle area
            let face = (p1 - p0).cross(p2 - p0);
            normals[i0] += face;
            normals[i1] += face;
            normals[i2] += face;
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            vertex.normal = if normal.magnitude() > f32::EPSILON {
                normal.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(position: [f32; 3]) -> ModelVertex {
        ModelVertex {
            position,
            normal: [0.0; 3],
        }
    }

    #[test]
    fn computed_normals_are_unit_length() {
        // Large triangle in the y = 0 plane, wound towards +Y
        let mut mesh = Mesh::new(
            "floor",
            vec![
                vertex([0.0, 0.0, 0.0]),
                vertex([0.0, 0.0, 10.0]),
                vertex([10.0, 0.0, 0.0]),
            ],
            vec![0, 1, 2],
            Material::default(),
        );

        mesh.compute_normals();

        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
            let n: cgmath::Vector3<f32> = v.normal.into();
            assert!((n.magnitude() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn degenerate_faces_fall_back_to_up() {
        let mut mesh = Mesh::new(
            "line",
            vec![
                vertex([0.0, 0.0, 0.0]),
                vertex([1.0, 1.0, 1.0]),
                vertex([2.0, 2.0, 2.0]),
            ],
            vec![0, 1, 2],
            Material::default(),
        );

        mesh.compute_normals();

        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }
}
