//! GPU buffers and textures owned by the renderer.

use crate::frame::{AtlasUpdate, PreparedFrame};
use crate::types::{GlyphInstance, OverlayUniforms, SelectionRect, TerminalUniforms};

/// Initial selection buffer size, in rects. Grows on demand.
const INITIAL_SELECTION_RECTS: usize = 64;

/// Buffers for one in-flight frame.
pub struct FrameSlot {
    uniforms: wgpu::Buffer,
    overlay: wgpu::Buffer,
    instances: wgpu::Buffer,
    selection: wgpu::Buffer,
    selection_capacity: usize,
    bind_group: wgpu::BindGroup,
    index: usize,
}

impl FrameSlot {
    /// Allocate a slot able to hold `max_instances` instances.
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        max_instances: usize,
        index: usize,
    ) -> Self {
        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Terminal Uniforms {index}")),
            size: std::mem::size_of::<TerminalUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let overlay = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Terminal Overlay {index}")),
            size: std::mem::size_of::<OverlayUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Terminal Instances {index}")),
            size: (max_instances.max(1) * std::mem::size_of::<GlyphInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let selection = create_selection_buffer(device, INITIAL_SELECTION_RECTS, index);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Terminal Frame Bind Group {index}")),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: overlay.as_entire_binding(),
                },
            ],
        });

        Self {
            uniforms,
            overlay,
            instances,
            selection,
            selection_capacity: INITIAL_SELECTION_RECTS,
            bind_group,
            index,
        }
    }

    /// Copy a prepared frame into this slot's buffers.
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &PreparedFrame<'_>) {
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&frame.uniforms));
        queue.write_buffer(&self.overlay, 0, bytemuck::bytes_of(&frame.overlay));

        if !frame.instances.is_empty() {
            queue.write_buffer(&self.instances, 0, bytemuck::cast_slice(frame.instances));
        }

        if !frame.selection.is_empty() {
            if frame.selection.len() > self.selection_capacity {
                // Need a bigger buffer - grow by 2x
                self.selection_capacity = frame.selection.len() * 2;
                self.selection =
                    create_selection_buffer(device, self.selection_capacity, self.index);
            }
            queue.write_buffer(&self.selection, 0, bytemuck::cast_slice(&frame.selection));
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn instance_slice(&self, count: u32) -> wgpu::BufferSlice<'_> {
        let end = (count.max(1) as usize * std::mem::size_of::<GlyphInstance>()) as u64;
        self.instances.slice(..end.min(self.instances.size()))
    }

    pub fn selection_slice(&self, count: u32) -> wgpu::BufferSlice<'_> {
        let end = (count.max(1) as usize * std::mem::size_of::<SelectionRect>()) as u64;
        self.selection.slice(..end.min(self.selection.size()))
    }
}

fn create_selection_buffer(device: &wgpu::Device, rects: usize, index: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("Terminal Selection {index}")),
        size: (rects * std::mem::size_of::<SelectionRect>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Single-channel glyph atlas texture with its sampler and bind group.
pub struct AtlasTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

impl AtlasTexture {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, size: (u32, u32)) -> Self {
        let (width, height) = size;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Glyph Atlas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Glyph Atlas Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Atlas Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            texture,
            bind_group,
            size,
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Upload only the dirty region of the atlas.
    pub fn upload(&self, queue: &wgpu::Queue, update: &AtlasUpdate<'_>) {
        let region = update.region;
        if region.width == 0 || region.height == 0 {
            return;
        }
        let (width, height) = self.size;
        if region.x + region.width > width || region.y + region.height > height {
            return;
        }

        // Rows of the region are strided by the full atlas width in the store.
        let start = (region.y * update.atlas_width + region.x) as usize;
        let Some(data) = update.data.get(start..) else {
            return;
        };

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(update.atlas_width),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
    }
}
