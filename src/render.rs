//! Drawing a [`Scene`] through a camera.
//!
//! [`SceneRenderer`] is the seam between the placement loop and the GPU.
//! [`WgpuRenderer`] implements it on top of the window's [`Context`]:
//!
//! 1. Walk the visible part of the scene graph and collect mesh instances
//! 2. Upload geometry the first time a mesh is seen, instances and material every frame
//! 3. Draw opaque meshes, then blended meshes from far to near
//! 4. Present

use std::{collections::HashMap, iter};

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::{CameraUniform, PerspectiveCamera},
    context::Context,
    data_structures::{
        instance::{Instance, InstanceRaw},
        mesh::{Mesh, MeshId},
        scene_graph::{Node, NodeVisitor, Scene},
    },
    pipelines::{
        basic::{mk_basic_pipeline, mk_scene_pipeline_layout},
        light::{LightResources, LightUniform, mk_bind_group_layout},
        transparent::mk_transparent_pipeline,
    },
};

/// Something that can put a scene on screen.
pub trait SceneRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()>;
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    color: [f32; 4],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    Opaque,
    Blended,
    BlendedDepthWrite,
}

/// GPU copy of a [`Mesh`].
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instances: Vec<InstanceRaw>,
    material_buffer: wgpu::Buffer,
    material_bind_group: wgpu::BindGroup,
    material: MaterialUniform,
    uploaded_material: MaterialUniform,
    pass: Pass,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = mk_instance_buffer(device, &[Instance::default().to_raw()]);
        let material = MaterialUniform {
            color: mesh.material.color(),
        };
        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Material Buffer", mesh.material.name)),
            contents: bytemuck::cast_slice(&[material]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: material_buffer.as_entire_binding(),
            }],
            label: Some("material_bind_group"),
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_elements: mesh.indices.len() as u32,
            instance_buffer,
            instance_capacity: 1,
            instances: Vec::new(),
            material_buffer,
            material_bind_group,
            material,
            uploaded_material: material,
            pass: Pass::Opaque,
        }
    }

    fn write_to_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.instances.len() > self.instance_capacity {
            self.instance_buffer = mk_instance_buffer(device, &self.instances);
            self.instance_capacity = self.instances.len();
        } else {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.instances));
        }
        if self.material != self.uploaded_material {
            self.uploaded_material = self.material;
            queue.write_buffer(&self.material_buffer, 0, bytemuck::cast_slice(&[self.material]));
        }
    }
}

fn mk_instance_buffer(device: &wgpu::Device, instances: &[InstanceRaw]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Instance Buffer"),
        contents: bytemuck::cast_slice(instances),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

struct Draw {
    id: MeshId,
    pass: Pass,
    distance: f32,
}

/// Collects the visible mesh instances of a frame.
struct DrawCollector<'a> {
    device: &'a wgpu::Device,
    layout: &'a wgpu::BindGroupLayout,
    meshes: &'a mut HashMap<MeshId, GpuMesh>,
    eye: Vector3<f32>,
    draws: Vec<Draw>,
}

impl NodeVisitor for DrawCollector<'_> {
    fn enter(&mut self, node: &Node) -> bool {
        node.visible
    }

    fn visit_mesh(&mut self, _: &Node, mesh: &Mesh, world: &Instance) {
        if mesh.indices.is_empty() {
            return;
        }
        let gpu = self
            .meshes
            .entry(mesh.id())
            .or_insert_with(|| GpuMesh::new(self.device, self.layout, mesh));
        let material = &mesh.material;
        gpu.pass = match (material.transparent, material.depth_write) {
            (false, _) => Pass::Opaque,
            (true, false) => Pass::Blended,
            (true, true) => Pass::BlendedDepthWrite,
        };
        if gpu.instances.is_empty() {
            self.draws.push(Draw {
                id: mesh.id(),
                pass: gpu.pass,
                distance: (world.position - self.eye).magnitude(),
            });
        }
        gpu.material = MaterialUniform {
            color: material.color(),
        };
        gpu.instances.push(world.to_raw());
    }
}

pub struct WgpuRenderer {
    ctx: Context,
    opaque: wgpu::RenderPipeline,
    blended: wgpu::RenderPipeline,
    blended_depth_write: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    light: LightResources,
    meshes: HashMap<MeshId, GpuMesh>,
}

impl WgpuRenderer {
    pub fn new(ctx: Context) -> Self {
        let uniform_layout = mk_bind_group_layout(&ctx.device);
        let layout = mk_scene_pipeline_layout(&ctx.device, &uniform_layout);
        let opaque = mk_basic_pipeline(&ctx.device, &ctx.config, &layout);
        let blended = mk_transparent_pipeline(&ctx.device, &ctx.config, &layout, false);
        let blended_depth_write = mk_transparent_pipeline(&ctx.device, &ctx.config, &layout, true);

        let camera_uniform = CameraUniform::new();
        let camera_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        let light = LightResources::new(&ctx.device, &uniform_layout, LightUniform::default());

        Self {
            ctx,
            opaque,
            blended,
            blended_depth_write,
            uniform_layout,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            light,
            meshes: HashMap::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    pub fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), wgpu::SurfaceError> {
        // Rendering requires the surface to be configured
        if !self.ctx.is_surface_configured {
            return Ok(());
        }

        self.camera_uniform.update_view_proj(camera);
        self.ctx.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        if let Some(light) = scene.light() {
            self.light.update(&self.ctx.queue, light);
        }

        self.meshes
            .values_mut()
            .for_each(|mesh| mesh.instances.clear());
        let mut collector = DrawCollector {
            device: &self.ctx.device,
            layout: &self.uniform_layout,
            meshes: &mut self.meshes,
            eye: camera.pose.w.truncate(),
            draws: Vec::new(),
        };
        scene.accept(&mut collector);
        let mut draws = collector.draws;
        for draw in &draws {
            if let Some(mesh) = self.meshes.get_mut(&draw.id) {
                mesh.write_to_buffers(&self.ctx.device, &self.ctx.queue);
            }
        }
        // Opaque first, blended back to front
        draws.sort_by(|a, b| match (a.pass == Pass::Opaque, b.pass == Pass::Opaque) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (true, true) => std::cmp::Ordering::Equal,
            (false, false) => b.distance.total_cmp(&a.distance),
        });

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_bind_group(1, &self.light.bind_group, &[]);
            for draw in &draws {
                let Some(mesh) = self.meshes.get(&draw.id) else {
                    continue;
                };
                let pipeline = match draw.pass {
                    Pass::Opaque => &self.opaque,
                    Pass::Blended => &self.blended,
                    Pass::BlendedDepthWrite => &self.blended_depth_write,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(2, &mesh.material_bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, mesh.instance_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.num_elements, 0, 0..mesh.instances.len() as u32);
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl SceneRenderer for WgpuRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()> {
        self.draw(scene, camera)?;
        Ok(())
    }
}
