use cgmath::{Quaternion, Vector3};

use crate::data_structures::{
    instance::Instance,
    material::Material,
    mesh::{Mesh, ModelVertex},
    scene_graph::{Camera, Node, NodeKind},
};

/// Converts a glTF node and its subtree into a scene node.
///
/// A node with a single triangle primitive becomes a mesh node. Several
/// primitives become a group with one mesh child per primitive. Primitives
/// that aren't triangle lists are skipped.
pub fn to_scene_node(node: gltf::Node, buffers: &[Vec<u8>]) -> Node {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let mut meshes: Vec<Mesh> = node
        .mesh()
        .map(|mesh| load_primitives(&mesh, &name, buffers))
        .unwrap_or_default();

    let camera = node.camera().map(|camera| to_camera(&camera));

    let mut scene_node = match (meshes.len(), camera) {
        (0, Some(camera)) => Node::new(&name, NodeKind::Camera(camera)),
        (count, camera) => {
            let mut scene_node = if count == 1 {
                Node::new(&name, NodeKind::Mesh(meshes.remove(0)))
            } else {
                let mut group = Node::group(&name);
                for mesh in meshes {
                    group.add_child(Node::mesh(mesh));
                }
                group
            };
            // A node carries at most one kind, so the camera hangs below the mesh
            if let Some(camera) = camera {
                scene_node.add_child(Node::new(
                    &format!("{}.camera", name),
                    NodeKind::Camera(camera),
                ));
            }
            scene_node
        }
    };

    let (t, r, s) = node.transform().decomposed();
    scene_node.transform = Instance {
        position: Vector3::from(t),
        // glTF stores quaternions as [x, y, z, w]
        rotation: Quaternion::new(r[3], r[0], r[1], r[2]),
        scale: Vector3::from(s),
    };

    for child in node.children() {
        scene_node.add_child(to_scene_node(child, buffers));
    }
    scene_node
}

fn to_camera(camera: &gltf::Camera) -> Camera {
    match camera.projection() {
        gltf::camera::Projection::Perspective(p) => Camera {
            yfov: p.yfov(),
            znear: p.znear(),
            zfar: p.zfar(),
        },
        gltf::camera::Projection::Orthographic(o) => Camera {
            yfov: 0.0,
            znear: o.znear(),
            zfar: Some(o.zfar()),
        },
    }
}

fn load_primitives(mesh: &gltf::Mesh, node_name: &str, buffers: &[Vec<u8>]) -> Vec<Mesh> {
    let mesh_name = mesh.name().unwrap_or(node_name);
    mesh.primitives()
        .filter_map(|primitive| {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of mesh '{}': unsupported mode {:?}",
                    primitive.index(),
                    mesh_name,
                    primitive.mode()
                );
                return None;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let Some(positions) = reader.read_positions() else {
                log::warn!(
                    "Skipping primitive {} of mesh '{}': no positions",
                    primitive.index(),
                    mesh_name
                );
                return None;
            };
            let mut vertices: Vec<ModelVertex> = positions
                .map(|position| ModelVertex {
                    position,
                    normal: [0.0, 0.0, 0.0],
                })
                .collect();
            let has_normals = match reader.read_normals() {
                Some(normals) => {
                    vertices
                        .iter_mut()
                        .zip(normals)
                        .for_each(|(vertex, normal)| vertex.normal = normal);
                    true
                }
                None => false,
            };
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };

            let material = primitive.material();
            let material = Material::new(
                material.name().unwrap_or("default"),
                material.pbr_metallic_roughness().base_color_factor(),
            );
            let mut mesh = Mesh::new(
                &format!("{}.{}", mesh_name, primitive.index()),
                vertices,
                indices,
                material,
            );
            if !has_normals {
                mesh.compute_normals();
            }
            Some(mesh)
        })
        .collect()
}
