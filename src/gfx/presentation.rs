//! Presentation stage
//!
//! Samples the committed `current()` generation and maps each cell to a
//! color over a full-surface quad. Read-only with respect to simulation
//! state; it holds one bind group per physical texture and picks the one the
//! role binding currently marks as front.

use bytemuck::{Pod, Zeroable};
use wgpu::{BindGroup, RenderPipeline};

use super::context::GpuContext;
use crate::config::{Palette, ProgramSource};
use crate::error::AutomatonResult;
use crate::simulation::buffers::{BufferPair, GRID_COUNT};
use crate::simulation::gpu::GpuGrid;
use crate::wgpu_utils::{binding_types, UniformBuffer};

/// Uniform block of the presentation program
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PresentUniforms {
    pub alive_color: [f32; 4],
    pub dead_color: [f32; 4],
    pub grid_size: [u32; 2],
    pub _padding: [u32; 2],
}

impl PresentUniforms {
    pub fn new(palette: &Palette, width: u32, height: u32) -> Self {
        Self {
            alive_color: palette.alive,
            dead_color: palette.dead,
            grid_size: [width, height],
            _padding: [0; 2],
        }
    }
}

/// Full-surface draw of the current generation
pub struct Presenter {
    pipeline: RenderPipeline,
    /// Indexed by physical grid, not by role
    bind_groups: [BindGroup; GRID_COUNT],
    // Keeps the uniform block alive for the bind groups
    _uniforms: UniformBuffer<PresentUniforms>,
    clear_color: wgpu::Color,
}

impl Presenter {
    pub fn new(
        context: &GpuContext,
        source: &ProgramSource,
        surface_format: wgpu::TextureFormat,
        grids: &BufferPair<GpuGrid>,
        palette: &Palette,
    ) -> AutomatonResult<Self> {
        let module = context.compile_program("presentation", source)?;
        let (width, height) = grids.current().dimensions();

        let (layout, pipeline) = context.validated("presentation", |device| {
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Presentation Bind Group Layout"),
                entries: &[
                    binding_types::entry(0, wgpu::ShaderStages::FRAGMENT, binding_types::uniform()),
                    binding_types::entry(
                        1,
                        wgpu::ShaderStages::FRAGMENT,
                        binding_types::utexture_2d(),
                    ),
                ],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Presentation Pipeline Layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Presentation Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            (layout, pipeline)
        })?;

        let uniforms = UniformBuffer::new_with_data(
            context.device(),
            &PresentUniforms::new(palette, width, height),
        );

        let bind_groups = [0, 1].map(|index| {
            context
                .device()
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Presentation Bind Group"),
                    layout: &layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: uniforms.binding_resource(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(
                                grids.physical(index).view(),
                            ),
                        },
                    ],
                })
        });

        let [r, g, b, a] = palette.background;
        Ok(Self {
            pipeline,
            bind_groups,
            _uniforms: uniforms,
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            },
        })
    }

    /// Record the draw of `grids.current()` into `target`
    ///
    /// Takes the pair as handed out by the scheduler once the generation is
    /// committed, so it can only ever see the front grid.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        grids: &BufferPair<GpuGrid>,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Presentation Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_groups[grids.front_index()], &[]);
        render_pass.draw(0..6, 0..1);
    }
}
