//! Render pass helpers.
//!
//! - [`TrackedRenderPass`] skips redundant pipeline, bind group and buffer
//!   switches within one pass.
//! - [`DebugScope`] brackets a stretch of encoder commands in a debug group
//!   and closes it when dropped, so an early return can never leave a group
//!   open.

use std::ops::{Deref, DerefMut, Range};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id for a pipeline, bind group or buffer, used by
/// [`TrackedRenderPass`] to detect redundant binds.
pub fn next_binding_id() -> u64 {
    NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed)
}

/// Bind group binding state; fixed array avoids a heap allocation per call.
#[derive(Clone, Copy, PartialEq)]
struct BindGroupState {
    id: u64,
    offsets: [u32; 4],
    offset_count: u8,
}

pub struct TrackedRenderPass<'a> {
    pass: wgpu::RenderPass<'a>,
    current_pipeline_id: Option<u64>,
    current_bind_groups: [Option<BindGroupState>; 4],
    current_vertex_buffers: [Option<u64>; 2],
    current_index_buffer: Option<u64>,
}

impl<'a> TrackedRenderPass<'a> {
    #[must_use]
    pub fn new(pass: wgpu::RenderPass<'a>) -> Self {
        Self {
            pass,
            current_pipeline_id: None,
            current_bind_groups: [None; 4],
            current_vertex_buffers: [None; 2],
            current_index_buffer: None,
        }
    }

    pub fn set_pipeline(&mut self, pipeline_id: u64, pipeline: &'a wgpu::RenderPipeline) {
        if self.current_pipeline_id != Some(pipeline_id) {
            self.pass.set_pipeline(pipeline);
            self.current_pipeline_id = Some(pipeline_id);
        }
    }

    pub fn set_bind_group(&mut self, index: u32, bind_group_id: u64, bind_group: &'a wgpu::BindGroup, offsets: &[u32]) {
        let slot = index as usize;
        let needs_update = match &self.current_bind_groups[slot] {
            Some(state) => {
                state.id != bind_group_id
                    || state.offset_count as usize != offsets.len()
                    || state.offsets[..offsets.len()] != *offsets
            }
            None => true,
        };

        if needs_update {
            self.pass.set_bind_group(index, bind_group, offsets);

            let mut state = BindGroupState {
                id: bind_group_id,
                offsets: [0; 4],
                offset_count: offsets.len() as u8,
            };
            let len = offsets.len().min(4);
            state.offsets[..len].copy_from_slice(&offsets[..len]);
            self.current_bind_groups[slot] = Some(state);
        }
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, buffer_id: u64, buffer_slice: wgpu::BufferSlice<'a>) {
        let index = slot as usize;
        if self.current_vertex_buffers[index] != Some(buffer_id) {
            self.pass.set_vertex_buffer(slot, buffer_slice);
            self.current_vertex_buffers[index] = Some(buffer_id);
        }
    }

    pub fn set_index_buffer(&mut self, buffer_id: u64, buffer_slice: wgpu::BufferSlice<'a>, format: wgpu::IndexFormat) {
        if self.current_index_buffer != Some(buffer_id) {
            self.pass.set_index_buffer(buffer_slice, format);
            self.current_index_buffer = Some(buffer_id);
        }
    }

    pub fn set_viewport(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.pass.set_viewport(x, y, w, h, 0.0, 1.0);
    }

    pub fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    pub fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.draw_indexed(indices, base_vertex, instances);
    }
}

/// Debug group guard over a command encoder.
pub struct DebugScope<'e> {
    encoder: &'e mut wgpu::CommandEncoder,
}

impl<'e> DebugScope<'e> {
    pub fn new(encoder: &'e mut wgpu::CommandEncoder, label: &str) -> Self {
        encoder.push_debug_group(label);
        Self { encoder }
    }
}

impl Deref for DebugScope<'_> {
    type Target = wgpu::CommandEncoder;

    fn deref(&self) -> &Self::Target {
        self.encoder
    }
}

impl DerefMut for DebugScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.encoder
    }
}

impl Drop for DebugScope<'_> {
    fn drop(&mut self) {
        self.encoder.pop_debug_group();
    }
}

/// Color attachment that clears to `clear` (or loads when `None`) and stores.
#[must_use]
pub fn color_attachment(view: &wgpu::TextureView, clear: Option<wgpu::Color>) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
            store: wgpu::StoreOp::Store,
        },
    })
}

/// Begins a pass writing only the given color targets.
pub fn begin_color_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    attachments: &[Option<wgpu::RenderPassColorAttachment<'_>>],
) -> wgpu::RenderPass<'e> {
    encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: attachments,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        })
}

/// Records one fullscreen triangle into `targets` with `bind_groups` bound
/// in order from group 0.
pub fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    targets: &[Option<wgpu::RenderPassColorAttachment<'_>>],
    pipeline: &wgpu::RenderPipeline,
    bind_groups: &[&wgpu::BindGroup],
) {
    let mut pass = begin_color_pass(encoder, label, targets);
    pass.set_pipeline(pipeline);
    for (index, bind_group) in bind_groups.iter().enumerate() {
        pass.set_bind_group(index as u32, *bind_group, &[]);
    }
    pass.draw(0..3, 0..1);
}
