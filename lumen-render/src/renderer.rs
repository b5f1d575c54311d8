//! The terminal renderer: frame orchestration on top of the GPU pipeline.
//!
//! Typical host loop:
//!
//! ```ignore
//! let mut renderer = TerminalRenderer::new(&instance, surface, size, metrics, config)?;
//! let (_clock, ticks) = FrameClock::start(config.refresh_rate_hz, renderer.dirty_flag())?;
//! for _tick in ticks {
//!     renderer.render_if_dirty(&grid);
//! }
//! ```

use std::sync::mpsc;

use lumen_grid::{GridSnapshot, SelectionRange};
use tracing::{error, info, trace, warn};

use crate::atlas::GlyphRasterizer;
use crate::clock::DirtyFlag;
use crate::color::ColorMapper;
use crate::config::RendererConfig;
use crate::error::{RendererError, Result};
use crate::frame::FrameComposer;
use crate::geometry::CellMetrics;
use crate::gpu::{AtlasTexture, DrawCounts, FrameSlot, GpuContext, RenderPipeline};
use crate::ring::BufferRing;
use crate::stats::{CacheStats, FrameCounters, FrameOutcome, FrameStats};
use crate::types::{CursorStyle, GlyphInstance};

/// Color format of the headless render target.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

enum Target {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

pub struct TerminalRenderer {
    composer: FrameComposer,
    gpu: GpuContext,
    pipeline: RenderPipeline,
    atlas_texture: AtlasTexture,
    frames: BufferRing<FrameSlot>,
    target: Target,
    counters: FrameCounters,
}

impl TerminalRenderer {
    /// Render into a window surface. `size` is the drawable size in physical pixels.
    pub fn new(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        size: (u32, u32),
        metrics: CellMetrics,
        config: RendererConfig,
    ) -> Result<Self> {
        config.validate()?;
        let gpu = GpuContext::new(instance, Some(&surface))?;
        let size = (size.0.max(1), size.1.max(1));
        check_device_limits(&gpu, size, &config)?;

        let caps = surface.get_capabilities(&gpu.adapter);
        // Prefer a non-sRGB format so palette colors are written as-is.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RendererError::UnsupportedSurface)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.0,
            height: size.1,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        gpu.scoped("surface", |device| surface.configure(device, &surface_config))?;

        let target = Target::Surface {
            surface,
            config: surface_config,
        };
        Self::build(gpu, target, format, size, metrics, config)
    }

    /// Render into an offscreen texture (`OFFSCREEN_FORMAT`), readable with `read_pixels`.
    pub fn new_headless(
        size: (u32, u32),
        metrics: CellMetrics,
        config: RendererConfig,
    ) -> Result<Self> {
        config.validate()?;
        if size.0 == 0 || size.1 == 0 {
            return Err(RendererError::InvalidConfig(format!(
                "headless target must be non-empty, got {}x{}",
                size.0, size.1
            )));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let gpu = GpuContext::new(&instance, None)?;
        check_device_limits(&gpu, size, &config)?;

        let texture = gpu.scoped("offscreen target", |device| {
            create_offscreen_texture(device, size)
        })?;
        let target = Target::Offscreen { texture };
        Self::build(gpu, target, OFFSCREEN_FORMAT, size, metrics, config)
    }

    fn build(
        gpu: GpuContext,
        target: Target,
        format: wgpu::TextureFormat,
        size: (u32, u32),
        metrics: CellMetrics,
        config: RendererConfig,
    ) -> Result<Self> {
        let pipeline = RenderPipeline::new(&gpu.device, format)?;
        let atlas_texture = gpu.scoped("glyph atlas", |device| {
            AtlasTexture::new(
                device,
                pipeline.atlas_layout(),
                (config.atlas_size, config.atlas_size),
            )
        })?;
        let frames = gpu.scoped("frame buffers", |device| {
            BufferRing::new(config.frames_in_flight, |index| {
                FrameSlot::new(device, pipeline.frame_layout(), config.max_instances, index)
            })
        })?;
        let composer = FrameComposer::new(&config, size, metrics);

        info!(
            "terminal renderer ready: {:?}, {}x{}, atlas {}px, {} frames in flight",
            format,
            size.0,
            size.1,
            config.atlas_size,
            frames.len()
        );

        Ok(Self {
            composer,
            gpu,
            pipeline,
            atlas_texture,
            frames,
            target,
            counters: FrameCounters::default(),
        })
    }

    /// Draw `grid` to the renderer's own target and present it.
    ///
    /// Clears the dirty flag on entry. A frame that cannot acquire a surface
    /// texture is dropped and the flag is set again so the next tick retries.
    pub fn render<G: GridSnapshot + ?Sized>(&mut self, grid: &G) -> FrameOutcome {
        self.composer.take_dirty();

        let acquired = match &self.target {
            Target::Surface { surface, .. } => surface.get_current_texture().map(Some),
            Target::Offscreen { .. } => Ok(None),
        };

        let outcome = match acquired {
            Ok(Some(frame)) => {
                let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
                self.draw(grid, &view);
                frame.present();
                FrameOutcome::Presented
            }
            Ok(None) => match self.offscreen_view() {
                Some(view) => {
                    self.draw(grid, &view);
                    FrameOutcome::Presented
                }
                None => FrameOutcome::Dropped,
            },
            Err(err) => {
                self.handle_surface_error(err);
                self.composer.set_needs_display();
                FrameOutcome::Dropped
            }
        };

        self.counters.record(outcome);
        outcome
    }

    /// Render only if something changed since the last frame.
    pub fn render_if_dirty<G: GridSnapshot + ?Sized>(&mut self, grid: &G) -> FrameOutcome {
        if !self.composer.needs_display() {
            self.counters.record(FrameOutcome::Skipped);
            return FrameOutcome::Skipped;
        }
        self.render(grid)
    }

    /// Draw into a view supplied by the host. The view's format must match `format()`.
    pub fn render_to_view<G: GridSnapshot + ?Sized>(
        &mut self,
        grid: &G,
        view: &wgpu::TextureView,
    ) -> FrameOutcome {
        self.composer.take_dirty();
        self.draw(grid, view);
        self.counters.record(FrameOutcome::Presented);
        FrameOutcome::Presented
    }

    fn draw<G: GridSnapshot + ?Sized>(&mut self, grid: &G, view: &wgpu::TextureView) {
        let frame = self.composer.prepare(grid);

        // Partial texture upload if atlas changed
        if let Some(update) = &frame.atlas_update {
            self.atlas_texture.upload(&self.gpu.queue, update);
        }

        let slot = self.frames.current_mut();
        slot.write(&self.gpu.device, &self.gpu.queue, &frame);

        let counts = DrawCounts {
            instances: frame.instances.len() as u32,
            selection_rects: frame.selection.len() as u32,
        };
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Terminal Frame Encoder"),
            });
        self.pipeline.encode(
            &mut encoder,
            view,
            slot,
            &self.atlas_texture,
            &frame.passes,
            counts,
            frame.clear_color,
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.frames.advance();

        trace!(
            frame = self.frames.frame_index(),
            instances = counts.instances,
            "frame submitted"
        );
    }

    fn offscreen_view(&self) -> Option<wgpu::TextureView> {
        match &self.target {
            Target::Offscreen { texture } => {
                Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
            }
            Target::Surface { .. } => None,
        }
    }

    fn handle_surface_error(&self, err: wgpu::SurfaceError) {
        match err {
            wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost => {
                warn!("surface {err}, reconfiguring");
                if let Target::Surface { surface, config } = &self.target {
                    surface.configure(&self.gpu.device, config);
                }
            }
            wgpu::SurfaceError::OutOfMemory => error!("surface out of memory, frame dropped"),
            other => warn!("failed to acquire surface texture: {other}"),
        }
    }

    /// New drawable size in physical pixels.
    ///
    /// Zero sizes and sizes beyond the device's texture limit are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        let max_dimension = self.gpu.max_texture_dimension();
        if width > max_dimension || height > max_dimension {
            warn!("ignoring resize to {width}x{height}, device limit is {max_dimension}");
            return;
        }
        if width == 0 || height == 0 {
            self.composer.resize(width, height);
            return;
        }

        match &mut self.target {
            Target::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.gpu.device, config);
            }
            Target::Offscreen { texture } => {
                let created = self.gpu.scoped("offscreen target", |device| {
                    create_offscreen_texture(device, (width, height))
                });
                match created {
                    Ok(new_texture) => *texture = new_texture,
                    Err(err) => {
                        warn!("keeping previous target: {err}");
                        return;
                    }
                }
            }
        }
        self.composer.resize(width, height);
    }

    /// Copy the headless target back to the CPU as tightly packed RGBA rows.
    ///
    /// Returns `None` for surface-backed renderers or if mapping fails.
    pub fn read_pixels(&self) -> Option<Vec<u8>> {
        let Target::Offscreen { texture } = &self.target else {
            return None;
        };
        let (width, height) = (texture.width(), texture.height());
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Terminal Readback"),
            size: (padded * height) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Terminal Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.gpu.device.poll(wgpu::Maintain::Wait);
        if let Err(err) = rx.recv().ok()? {
            warn!("readback mapping failed: {err}");
            return None;
        }

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in mapped.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Some(pixels)
    }

    pub fn set_needs_display(&self) {
        self.composer.set_needs_display();
    }

    /// Shared flag for the frame clock and other threads.
    pub fn dirty_flag(&self) -> DirtyFlag {
        self.composer.dirty_flag()
    }

    pub fn update_scale_factor(&mut self, scale_factor: f32) {
        self.composer.update_scale_factor(scale_factor);
    }

    pub fn update_cell_metrics(&mut self, width: f32, height: f32) {
        self.composer.update_cell_metrics(width, height);
    }

    pub fn set_fonts(&mut self, rasterizer: impl GlyphRasterizer + 'static) {
        self.composer.set_fonts(rasterizer);
    }

    pub fn set_color_mapper(&mut self, mapper: impl ColorMapper + 'static) {
        self.composer.set_color_mapper(mapper);
    }

    pub fn set_theme(
        &mut self,
        foreground: [f32; 4],
        background: [f32; 4],
        palette: [[f32; 3]; 16],
    ) {
        self.composer.set_theme(foreground, background, palette);
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.composer.set_clear_color(color);
    }

    pub fn set_selection(&mut self, selection: Option<SelectionRange>) {
        self.composer.set_selection(selection);
    }

    pub fn set_selection_color(&mut self, color: [f32; 4]) {
        self.composer.set_selection_color(color);
    }

    pub fn set_cursor_style(&mut self, style: CursorStyle) {
        self.composer.set_cursor_style(style);
    }

    pub fn set_cursor_color(&mut self, color: [f32; 4]) {
        self.composer.set_cursor_color(color);
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.composer.set_cursor_visible(visible);
    }

    pub fn set_cursor_blink(&mut self, blink: bool) {
        self.composer.set_cursor_blink(blink);
    }

    pub fn invalidate_glyph_cache(&mut self) {
        self.composer.invalidate_glyph_cache();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.composer.cache_stats()
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.counters.snapshot()
    }

    /// Color format passes are compiled for.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.pipeline.format()
    }

    pub fn composer(&self) -> &FrameComposer {
        &self.composer
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.gpu.device
    }
}

/// Reject sizes the device cannot allocate before anything is created.
fn check_device_limits(gpu: &GpuContext, size: (u32, u32), config: &RendererConfig) -> Result<()> {
    let max_dimension = gpu.max_texture_dimension();
    if config.atlas_size > max_dimension {
        return Err(RendererError::InvalidConfig(format!(
            "atlas_size {} exceeds device limit {max_dimension}",
            config.atlas_size
        )));
    }
    if size.0 > max_dimension || size.1 > max_dimension {
        return Err(RendererError::InvalidConfig(format!(
            "target size {}x{} exceeds device limit {max_dimension}",
            size.0, size.1
        )));
    }

    let max_buffer = gpu.max_buffer_size();
    let instance_bytes = (config.max_instances as u64)
        .checked_mul(std::mem::size_of::<GlyphInstance>() as u64)
        .unwrap_or(u64::MAX);
    if instance_bytes > max_buffer {
        return Err(RendererError::InvalidConfig(format!(
            "max_instances {} needs a {instance_bytes} byte buffer, device limit is {max_buffer}",
            config.max_instances
        )));
    }
    Ok(())
}

fn create_offscreen_texture(device: &wgpu::Device, size: (u32, u32)) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Terminal Offscreen Target"),
        size: wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
