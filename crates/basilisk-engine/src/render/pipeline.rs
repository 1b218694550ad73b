//! Bind group layouts and render pipeline construction.
//!
//! Pipelines are keyed by everything wgpu bakes into them that the bound-state
//! API lets callers change between draws: program, target format, depth test,
//! and for batch draws the vertex layout and topology.

use std::num::NonZeroU64;

use crate::backend::{DrawMode, ShaderId, VertexLayout};

use super::common::{
    alpha_blend, batch_attributes, batch_vertex_layout, depth_state, screen_vertex_layout,
    topology, Globals,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) enum PipelineVariant {
    Batch { layout: VertexLayout, mode: DrawMode },
    Composite,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) struct PipelineKey {
    pub shader: ShaderId,
    pub format: wgpu::TextureFormat,
    pub depth_test: bool,
    pub variant: PipelineVariant,
}

// ── layouts ───────────────────────────────────────────────────────────────

/// Group 0: the program's `Globals` uniform.
pub(super) fn globals_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("basilisk globals bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(Globals::SIZE),
            },
            count: None,
        }],
    })
}

/// Group 1: a sampled color target.
pub(super) fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("basilisk source texture bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub(super) fn pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    groups: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: groups,
        immediate_size: 0,
    })
}

// ── pipelines ─────────────────────────────────────────────────────────────

pub(super) fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    key: PipelineKey,
) -> wgpu::RenderPipeline {
    let (prim_topology, attributes) = match key.variant {
        PipelineVariant::Batch { layout, mode } => (topology(mode), batch_attributes(layout)),
        PipelineVariant::Composite => (wgpu::PrimitiveTopology::TriangleList, Vec::new()),
    };
    let buffers = match key.variant {
        PipelineVariant::Batch { .. } => [batch_vertex_layout(&attributes)],
        PipelineVariant::Composite => [screen_vertex_layout()],
    };

    log::debug!("building pipeline {key:?}");

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("basilisk pipeline"),
        layout: Some(layout),

        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.format,
                blend: Some(alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: prim_topology,
            strip_index_format: prim_topology
                .is_strip()
                .then_some(wgpu::IndexFormat::Uint32),
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: Some(depth_state(key.depth_test)),
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}
