//! GPU backend
//!
//! Each generation lives in an `Rgba8Uint` texture. The kernel reads
//! `current()` as a sampled integer texture and writes `next()` through a
//! write-only storage binding, so the read set and the write set of one
//! dispatch never alias. Two bind groups are built up front, one per role
//! binding, and dispatch selects by the pair's front index.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::{BindGroup, BindGroupLayout, ComputePipeline, Device, Queue};

use super::boundary::BoundaryPolicy;
use super::buffers::{BufferPair, GRID_COUNT};
use super::cell::{Cell, Grid};
use super::rule::{LifeRule, TransitionRule};
use super::tiling::Tiling;
use super::traits::ComputeBackend;
use crate::config::ProgramSource;
use crate::error::{AutomatonError, AutomatonResult};
use crate::gfx::context::{ErrorSink, GpuContext};
use crate::wgpu_utils::{binding_types, UniformBuffer};

/// Texel format of both generation textures
pub const CELL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Uint;

const CELL_BYTES: u32 = std::mem::size_of::<Cell>() as u32;

/// Uniform block of the transition kernel
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct KernelParams {
    pub width: u32,
    pub height: u32,
    pub boundary: u32,
    pub birth_mask: u32,
    pub survive_mask: u32,
    pub _padding: [u32; 3],
}

impl KernelParams {
    pub fn new(width: u32, height: u32, rule: &LifeRule, boundary: BoundaryPolicy) -> Self {
        Self {
            width,
            height,
            boundary: boundary.kernel_code(),
            birth_mask: rule.birth as u32,
            survive_mask: rule.survive as u32,
            _padding: [0; 3],
        }
    }
}

/// One generation resident in GPU memory
pub struct GpuGrid {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl GpuGrid {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// Completion handle: the queue submission carrying the dispatch
#[derive(Debug)]
pub struct GpuPending {
    submission: wgpu::SubmissionIndex,
}

/// wgpu compute backend for Life-like rules
pub struct GpuBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,
    errors: ErrorSink,
    pipeline: ComputePipeline,
    layout: BindGroupLayout,
    params: UniformBuffer<KernelParams>,
    rule: LifeRule,
    boundary: BoundaryPolicy,
    /// Indexed by the pair's front index
    bind_groups: Option<[BindGroup; GRID_COUNT]>,
}

impl GpuBackend {
    /// Build the transition pipeline; compile or link failure is fatal
    pub fn new(
        context: &GpuContext,
        kernel: &ProgramSource,
        rule: LifeRule,
        boundary: BoundaryPolicy,
    ) -> AutomatonResult<Self> {
        let module = context.compile_program("transition", kernel)?;

        let (layout, pipeline) = context.validated("transition", |device| {
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Transition Bind Group Layout"),
                entries: &[
                    binding_types::entry(0, wgpu::ShaderStages::COMPUTE, binding_types::uniform()),
                    binding_types::entry(
                        1,
                        wgpu::ShaderStages::COMPUTE,
                        binding_types::utexture_2d(),
                    ),
                    binding_types::entry(
                        2,
                        wgpu::ShaderStages::COMPUTE,
                        binding_types::image_2d(CELL_FORMAT, wgpu::StorageTextureAccess::WriteOnly),
                    ),
                ],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Transition Pipeline Layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Transition Pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

            (layout, pipeline)
        })?;

        let params = UniformBuffer::new_with_data(
            context.device(),
            &KernelParams::new(0, 0, &rule, boundary),
        );

        log::info!(
            "transition kernel ready: rule {} boundary {}",
            rule.name(),
            boundary.as_str()
        );

        Ok(Self {
            device: context.device().clone(),
            queue: context.queue().clone(),
            errors: context.errors().clone(),
            pipeline,
            layout,
            params,
            rule,
            boundary,
            bind_groups: None,
        })
    }

    pub fn rule(&self) -> LifeRule {
        self.rule
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    /// Parameters currently bound to the kernel
    pub fn kernel_params(&self) -> KernelParams {
        bytemuck::pod_read_unaligned(self.params.content_bytes())
    }

    fn check_errors(&self) -> AutomatonResult<()> {
        match self.errors.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl ComputeBackend for GpuBackend {
    type Grid = GpuGrid;
    type Pending = GpuPending;

    fn name(&self) -> &str {
        "gpu"
    }

    fn tiling(&self) -> Tiling {
        Tiling::KERNEL
    }

    fn allocate(&mut self, width: u32, height: u32) -> AutomatonResult<GpuGrid> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(AutomatonError::allocation(format!(
                "grid {width}x{height} outside device texture limit {max}"
            )));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Generation Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CELL_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuGrid {
            texture,
            view,
            width,
            height,
        })
    }

    fn bind(&mut self, grids: &BufferPair<GpuGrid>) -> AutomatonResult<()> {
        let (width, height) = grids.physical(0).dimensions();
        if grids.physical(1).dimensions() != (width, height) {
            return Err(AutomatonError::allocation("generation textures differ in size"));
        }

        self.params.update_content(
            &self.queue,
            KernelParams::new(width, height, &self.rule, self.boundary),
        );

        let bind_groups = [0, 1].map(|front| {
            let read = grids.physical(front);
            let write = grids.physical((front + 1) % GRID_COUNT);
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(if front == 0 {
                    "Transition Bind Group A->B"
                } else {
                    "Transition Bind Group B->A"
                }),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.params.binding_resource(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(read.view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(write.view()),
                    },
                ],
            })
        });
        self.bind_groups = Some(bind_groups);
        Ok(())
    }

    fn upload(&mut self, target: &mut GpuGrid, source: &Grid) -> AutomatonResult<()> {
        if target.dimensions() != source.dimensions() {
            return Err(AutomatonError::dispatch(format!(
                "upload of {:?} grid into {:?} texture",
                source.dimensions(),
                target.dimensions()
            )));
        }

        self.queue.write_texture(
            target.texture.as_image_copy(),
            source.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(CELL_BYTES * target.width),
                rows_per_image: Some(target.height),
            },
            target.extent(),
        );
        self.check_errors()
    }

    fn dispatch(&mut self, grids: &mut BufferPair<GpuGrid>) -> AutomatonResult<GpuPending> {
        let bind_groups = self
            .bind_groups
            .as_ref()
            .ok_or_else(|| AutomatonError::invalid_state("generation textures not bound"))?;
        let bind_group = &bind_groups[grids.front_index()];
        let (width, height) = grids.current().dimensions();
        let (groups_x, groups_y) = Tiling::KERNEL.tile_counts(width, height);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Transition Encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Transition Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, bind_group, &[]);
            compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        let submission = self.queue.submit(std::iter::once(encoder.finish()));
        Ok(GpuPending { submission })
    }

    fn wait(&mut self, pending: GpuPending) -> AutomatonResult<()> {
        self.device
            .poll(wgpu::PollType::WaitForSubmissionIndex(pending.submission))
            .map_err(|e| AutomatonError::dispatch(format!("completion wait failed: {e}")))?;
        self.check_errors()
    }

    fn download(&mut self, source: &GpuGrid) -> AutomatonResult<Grid> {
        let bytes = read_texture(&self.device, &self.queue, source.texture())?;
        self.check_errors()?;

        Grid::from_bytes(source.width, source.height, &bytes)
            .ok_or_else(|| AutomatonError::dispatch("readback size mismatch"))
    }
}

/// Copy a 4-byte-per-texel texture back to the host, rows tightly packed
pub(crate) fn read_texture(
    device: &Device,
    queue: &Queue,
    texture: &wgpu::Texture,
) -> AutomatonResult<Vec<u8>> {
    let (width, height) = (texture.width(), texture.height());
    let row_bytes = CELL_BYTES * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_row_bytes = row_bytes.div_ceil(align) * align;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Texture Readback"),
        size: padded_row_bytes as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row_bytes),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = futures::channel::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| AutomatonError::dispatch(format!("readback wait failed: {e}")))?;

    match futures::executor::block_on(rx) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(AutomatonError::dispatch(format!("readback map failed: {e}"))),
        Err(_) => return Err(AutomatonError::dispatch("readback callback dropped")),
    }

    let mut bytes = Vec::with_capacity((row_bytes * height) as usize);
    {
        let mapped = slice.get_mapped_range();
        for row in mapped.chunks(padded_row_bytes as usize) {
            bytes.extend_from_slice(&row[..row_bytes as usize]);
        }
    }
    staging.unmap();
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::scheduler::GenerationScheduler;
    use crate::simulation::seed::SeedDistribution;
    use crate::simulation::CpuBackend;

    #[test]
    fn test_kernel_params_layout() {
        assert_eq!(std::mem::size_of::<KernelParams>(), 32);
        let params = KernelParams::new(17, 9, &LifeRule::CONWAY, BoundaryPolicy::Dead);
        assert_eq!(params.birth_mask, 0b1000);
        assert_eq!(params.survive_mask, 0b1100);
        assert_eq!(params.boundary, 2);
        assert_eq!((params.width, params.height), (17, 9));
    }

    fn gpu_scheduler(
        context: &GpuContext,
        rule: LifeRule,
        boundary: BoundaryPolicy,
        seed: &Grid,
    ) -> GenerationScheduler<GpuBackend> {
        let backend =
            GpuBackend::new(context, &ProgramSource::builtin_kernel(), rule, boundary).unwrap();
        let (w, h) = seed.dimensions();
        let mut scheduler = GenerationScheduler::new(backend, w, h).unwrap();
        scheduler.seed(seed).unwrap();
        scheduler
    }

    fn single_cell(width: u32, height: u32, x: u32, y: u32) -> Grid {
        let mut grid = Grid::new(width, height);
        grid.set_alive(x, y, true);
        grid
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_gpu_matches_cpu_reference() {
        let context = pollster::block_on(GpuContext::headless()).unwrap();

        for (width, height) in [(67, 45), (17, 17), (16, 16)] {
            let seed = SeedDistribution::random(0.3, Some(11))
                .generate(width, height)
                .unwrap();
            for boundary in [BoundaryPolicy::Wrap, BoundaryPolicy::Clamp, BoundaryPolicy::Dead] {
                let mut gpu = gpu_scheduler(&context, LifeRule::CONWAY, boundary, &seed);
                let mut cpu = GenerationScheduler::new(
                    CpuBackend::new(LifeRule::CONWAY, boundary),
                    width,
                    height,
                )
                .unwrap();
                cpu.seed(&seed).unwrap();

                for generation in 1..=8 {
                    gpu.step().unwrap();
                    cpu.step().unwrap();
                    assert_eq!(
                        gpu.read_current().unwrap(),
                        cpu.read_current().unwrap(),
                        "{width}x{height} {} generation {generation}",
                        boundary.as_str()
                    );
                }
            }
        }
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_kernel_writes_every_cell_of_partial_tiles() {
        let context = pollster::block_on(GpuContext::headless()).unwrap();
        let always: LifeRule = "B012345678/S012345678".parse().unwrap();
        let never: LifeRule = "B/S".parse().unwrap();

        // 17x17 needs 2x2 workgroups of 16x16, most of the second ones idle
        let mut fill = gpu_scheduler(&context, always, BoundaryPolicy::Dead, &Grid::new(17, 17));
        fill.step().unwrap();
        assert_eq!(fill.read_current().unwrap().live_count(), 17 * 17);

        let mut full = Grid::new(17, 17);
        for y in 0..17 {
            for x in 0..17 {
                full.set_alive(x, y, true);
            }
        }
        let mut empty = gpu_scheduler(&context, never, BoundaryPolicy::Dead, &full);
        empty.step().unwrap();
        assert_eq!(empty.read_current().unwrap().live_count(), 0);
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_kernel_wraps_non_power_of_two_grid() {
        let context = pollster::block_on(GpuContext::headless()).unwrap();
        let spread: LifeRule = "B12345678/S12345678".parse().unwrap();

        let mut scheduler =
            gpu_scheduler(&context, spread, BoundaryPolicy::Wrap, &single_cell(17, 17, 0, 0));
        scheduler.step().unwrap();
        assert_eq!(
            scheduler.read_current().unwrap().live_cells(),
            vec![
                (1, 0),
                (16, 0),
                (0, 1),
                (1, 1),
                (16, 1),
                (0, 16),
                (1, 16),
                (16, 16),
            ]
        );
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_kernel_single_cell_scenario() {
        let context = pollster::block_on(GpuContext::headless()).unwrap();
        let spread: LifeRule = "B12345678/S12345678".parse().unwrap();

        for boundary in [BoundaryPolicy::Wrap, BoundaryPolicy::Clamp, BoundaryPolicy::Dead] {
            let mut scheduler = gpu_scheduler(&context, spread, boundary, &single_cell(4, 4, 1, 1));
            scheduler.step().unwrap();
            assert_eq!(
                scheduler.read_current().unwrap().live_cells(),
                vec![(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (1, 2), (2, 2)],
                "{}",
                boundary.as_str()
            );
        }

        let corner = single_cell(4, 4, 0, 0);
        let mut wrapped = gpu_scheduler(&context, spread, BoundaryPolicy::Wrap, &corner);
        wrapped.step().unwrap();
        let grid = wrapped.read_current().unwrap();
        assert_eq!(grid.live_count(), 8);
        assert!(grid.is_alive(3, 3));
        assert!(!grid.is_alive(0, 0));

        let mut dead = gpu_scheduler(&context, spread, BoundaryPolicy::Dead, &corner);
        dead.step().unwrap();
        assert_eq!(dead.read_current().unwrap().live_cells(), vec![(1, 0), (0, 1), (1, 1)]);

        let mut clamped = gpu_scheduler(&context, spread, BoundaryPolicy::Clamp, &corner);
        clamped.step().unwrap();
        assert_eq!(
            clamped.read_current().unwrap().live_cells(),
            vec![(0, 0), (1, 0), (0, 1), (1, 1)]
        );
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_broken_kernel_is_fatal_at_startup() {
        let context = pollster::block_on(GpuContext::headless()).unwrap();
        let broken = ProgramSource::from_wgsl("broken.wgsl", "@compute fn main( {");
        let result = GpuBackend::new(&context, &broken, LifeRule::CONWAY, BoundaryPolicy::Wrap);
        assert!(matches!(result, Err(AutomatonError::ShaderCompile { .. })));
    }
}
