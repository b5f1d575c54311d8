//! The five render pipelines and the per-frame pass sequence.
//!
//! All pipelines share one layout: group 0 holds the per-frame uniform and
//! overlay buffers, group 1 the glyph atlas texture and sampler.

use crate::error::{RendererError, Result};
use crate::types::{
    CursorRenderInfo, GlyphInstance, OverlayUniforms, SelectionRect, TerminalUniforms,
};

use super::resources::{AtlasTexture, FrameSlot};

/// One draw in the frame, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Background,
    Selection,
    Glyph,
    Decoration,
    Cursor,
}

/// Passes to run this frame.
///
/// Instance passes are skipped with no instances, the selection pass
/// without rects, and the cursor pass when the cursor is hidden.
pub fn plan_passes(
    instance_count: usize,
    selection_len: usize,
    cursor: &CursorRenderInfo,
) -> Vec<Pass> {
    let mut passes = Vec::with_capacity(5);
    if instance_count > 0 {
        passes.push(Pass::Background);
    }
    if selection_len > 0 {
        passes.push(Pass::Selection);
    }
    if instance_count > 0 {
        passes.push(Pass::Glyph);
        passes.push(Pass::Decoration);
    }
    if cursor.visible {
        passes.push(Pass::Cursor);
    }
    passes
}

/// Draw counts for `RenderPipeline::encode`.
#[derive(Debug, Clone, Copy)]
pub struct DrawCounts {
    pub instances: u32,
    pub selection_rects: u32,
}

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
    0 => Float32x2, // position
    1 => Float32x2, // atlas_offset
    2 => Float32x2, // atlas_size
    3 => Float32x4, // foreground
    4 => Float32x4, // background
    5 => Uint32,    // flags
    6 => Sint16x2,  // bearing
];

const SELECTION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];

fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GlyphInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRIBUTES,
    }
}

fn selection_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<SelectionRect>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &SELECTION_ATTRIBUTES,
    }
}

pub struct RenderPipeline {
    background: wgpu::RenderPipeline,
    selection: wgpu::RenderPipeline,
    glyph: wgpu::RenderPipeline,
    decoration: wgpu::RenderPipeline,
    cursor: wgpu::RenderPipeline,
    frame_layout: wgpu::BindGroupLayout,
    atlas_layout: wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
}

impl RenderPipeline {
    /// Compile the shader and build all five pipelines for `format`.
    ///
    /// Validation errors are captured and returned instead of reaching the
    /// device's uncaptured error handler.
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terminal Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/terminal.wgsl").into()),
        });

        let uniform_entry = |binding: u32, size: usize| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(size as u64),
            },
            count: None,
        };

        // Per-frame bind group layout
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terminal Frame Layout"),
            entries: &[
                uniform_entry(0, std::mem::size_of::<TerminalUniforms>()),
                uniform_entry(1, std::mem::size_of::<OverlayUniforms>()),
            ],
        });

        // Atlas bind group layout
        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terminal Atlas Layout"),
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
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terminal Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &atlas_layout],
            push_constant_ranges: &[],
        });

        let build = |label: &str,
                     vs: &str,
                     fs: &str,
                     buffers: &[wgpu::VertexBufferLayout<'_>],
                     blend: Option<wgpu::BlendState>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(vs),
                    buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            })
        };

        let blended = Some(wgpu::BlendState::ALPHA_BLENDING);
        let background = build(
            "Terminal Background",
            "vs_background",
            "fs_solid",
            &[instance_layout()],
            None,
        );
        let selection = build(
            "Terminal Selection",
            "vs_selection",
            "fs_solid",
            &[selection_layout()],
            blended,
        );
        let glyph = build("Terminal Glyphs", "vs_glyph", "fs_glyph", &[instance_layout()], blended);
        let decoration = build(
            "Terminal Decorations",
            "vs_decoration",
            "fs_decoration",
            &[instance_layout()],
            blended,
        );
        let cursor = build("Terminal Cursor", "vs_cursor", "fs_cursor", &[], blended);

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RendererError::Pipeline(err.to_string()));
        }

        Ok(Self {
            background,
            selection,
            glyph,
            decoration,
            cursor,
            frame_layout,
            atlas_layout,
            format,
        })
    }

    pub fn frame_layout(&self) -> &wgpu::BindGroupLayout {
        &self.frame_layout
    }

    pub fn atlas_layout(&self) -> &wgpu::BindGroupLayout {
        &self.atlas_layout
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Record one render pass that clears `target` and runs `passes` in order.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        slot: &FrameSlot,
        atlas: &AtlasTexture,
        passes: &[Pass],
        counts: DrawCounts,
        clear_color: [f32; 4],
    ) {
        let [r, g, b, a] = clear_color.map(f64::from);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Terminal Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, slot.bind_group(), &[]);
        pass.set_bind_group(1, atlas.bind_group(), &[]);

        for step in passes {
            match step {
                Pass::Background | Pass::Glyph | Pass::Decoration => {
                    pass.set_pipeline(match step {
                        Pass::Background => &self.background,
                        Pass::Glyph => &self.glyph,
                        _ => &self.decoration,
                    });
                    pass.set_vertex_buffer(0, slot.instance_slice(counts.instances));
                    pass.draw(0..6, 0..counts.instances);
                }
                Pass::Selection => {
                    pass.set_pipeline(&self.selection);
                    pass.set_vertex_buffer(0, slot.selection_slice(counts.selection_rects));
                    pass.draw(0..6, 0..counts.selection_rects);
                }
                Pass::Cursor => {
                    pass.set_pipeline(&self.cursor);
                    pass.draw(0..6, 0..1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CursorStyle;

    fn cursor(visible: bool) -> CursorRenderInfo {
        CursorRenderInfo {
            position: [0.0, 0.0],
            color: [1.0; 4],
            style: CursorStyle::Block,
            visible,
        }
    }

    #[test]
    fn test_full_plan_order() {
        assert_eq!(
            plan_passes(10, 2, &cursor(true)),
            vec![
                Pass::Background,
                Pass::Selection,
                Pass::Glyph,
                Pass::Decoration,
                Pass::Cursor,
            ]
        );
    }

    #[test]
    fn test_empty_plan() {
        assert!(plan_passes(0, 0, &cursor(false)).is_empty());
    }

    #[test]
    fn test_skips() {
        assert_eq!(plan_passes(0, 3, &cursor(true)), vec![Pass::Selection, Pass::Cursor]);
        assert_eq!(
            plan_passes(5, 0, &cursor(false)),
            vec![Pass::Background, Pass::Glyph, Pass::Decoration]
        );
    }

    #[test]
    fn test_vertex_layout_matches_instance() {
        let last = INSTANCE_ATTRIBUTES[6];
        assert_eq!(last.offset, 60);
        assert_eq!(last.offset + last.format.size(), std::mem::size_of::<GlyphInstance>() as u64);
        assert_eq!(INSTANCE_ATTRIBUTES[5].offset, 56);
    }
}
