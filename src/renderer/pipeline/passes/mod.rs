//! Frame stages, in execution order:
//!
//! ```text
//! Shadow → GBuffer → SSAO (+ blur) → SSR (+ blur) → Combine
//!        → Bloom blur → Backdrop blur → Transparent (OIT)
//!        → Compose → Post (FXAA / sharpen) → Lens flares
//! ```

mod blur;
mod combine;
mod compose;
mod flare;
mod gbuffer;
mod post;
mod shadow;
mod ssao;
mod ssr;
mod transparent;

pub use blur::{BlurPass, BlurStage};
pub use combine::CombinePass;
pub use compose::ComposePass;
pub use flare::FlarePass;
pub use gbuffer::GBufferPass;
pub use post::PostPass;
pub use shadow::ShadowPass;
pub use ssao::SsaoPass;
pub use ssr::SsrPass;
pub use transparent::TransparentPass;

use crate::renderer::meshes::{GpuMesh, Meshes};
use crate::renderer::pass::TrackedRenderPass;
use crate::renderer::pipeline::context::ExecuteContext;
use crate::renderer::pipeline::frame::{DrawPacket, PacketGeometry};

fn packet_mesh(meshes: &Meshes, geometry: PacketGeometry) -> Option<&GpuMesh> {
    match geometry {
        PacketGeometry::Mesh(id) => meshes.get(id),
        PacketGeometry::Billboard => Some(meshes.billboard()),
    }
}

/// Replays `packets`, binding each draw's object uniforms (group 1) and,
/// when `with_material` is set, its material (group 2).
fn draw_packets<'a>(
    pass: &mut TrackedRenderPass<'a>,
    ctx: &ExecuteContext<'a>,
    packets: &'a [DrawPacket],
    with_material: bool,
) {
    let (object_id, object_group) = ctx.frame.objects.bind_group();
    for packet in packets {
        let Some(mesh) = packet_mesh(ctx.meshes, packet.geometry) else {
            continue;
        };
        if with_material {
            let Some(material) = packet.material.as_ref().and_then(|key| ctx.textures.material(key)) else {
                continue;
            };
            pass.set_bind_group(2, material.id, &material.bind_group, &[]);
        }
        pass.set_bind_group(1, object_id, object_group, &[packet.object_offset]);
        pass.set_vertex_buffer(0, mesh.id, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.id, mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.index_count, 0, 0..packet.instances);
    }
}

fn depth_attachment(view: &wgpu::TextureView, clear: Option<f32>) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}
