use crate::{
    data_structures::{
        instance::InstanceRaw,
        mesh::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::{mk_render_pipeline, scene_shader},
};

/**
 * Alpha-blended variant of the basic pipeline.
 *
 * Materials that were made see-through via `set_opacity` are drawn with this
 * after all opaque meshes. `depth_write` mirrors the material flag: a fully
 * opaque but blended material still occludes, anything below opacity 1 does not.
 */
pub fn mk_transparent_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    layout: &wgpu::PipelineLayout,
    depth_write: bool,
) -> wgpu::RenderPipeline {
    mk_render_pipeline(
        device,
        layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(Texture::DEPTH_FORMAT),
        depth_write,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        scene_shader(),
    )
}
