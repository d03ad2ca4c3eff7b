//! The core render node trait for the render graph.

use crate::gpu::GpuContext;
use crate::render_graph::RenderContext;
use crate::ui::Tweak;

/// One full-screen step of the post chain.
///
/// Every node owns its parameters and exposes them through [`Tweak`], so
/// the graph can hand each panel folder to the nodes that belong in it.
pub trait RenderNode: Tweak {
    fn name(&self) -> &str;

    /// Disabled nodes are skipped and their input flows to the next node.
    fn enabled(&self) -> bool {
        true
    }

    /// Read `input`, write `target`.
    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: &wgpu::TextureView,
    );

    /// Called when the window size changed, before the next `execute`.
    fn resize(&mut self, _gpu: &GpuContext) {}
}
