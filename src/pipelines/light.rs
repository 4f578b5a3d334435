use wgpu::util::DeviceExt;

use crate::data_structures::scene_graph::Light;

/// GPU resources of the scene's hemisphere light.
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// rgb + intensity in w
    sky: [f32; 4],
    // Uniforms require 16 byte alignment so the ground colour is padded to a vec4 as well
    ground: [f32; 4],
}

impl From<&Light> for LightUniform {
    fn from(light: &Light) -> Self {
        match light {
            Light::Hemisphere {
                sky,
                ground,
                intensity,
            } => Self {
                sky: [sky[0], sky[1], sky[2], *intensity],
                ground: [ground[0], ground[1], ground[2], 0.0],
            },
        }
    }
}

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            sky: [1.0, 1.0, 1.0, 1.0],
            ground: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl LightResources {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, uniform: LightUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    /// Uploads `light` if it differs from what the GPU already has.
    pub fn update(&mut self, queue: &wgpu::Queue, light: &Light) {
        let uniform = LightUniform::from(light);
        if uniform != self.uniform {
            self.uniform = uniform;
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
        }
    }
}

/// Layout shared by every single-uniform bind group (camera, light, material).
pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: None,
    })
}
