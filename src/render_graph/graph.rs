//! The post chain and the builder that assembles it.

use crate::gpu::GpuContext;
use crate::render_graph::{RenderContext, RenderNode, RenderTarget};
use crate::ui::{ControlPanel, Folder};

/// Which ping-pong buffer a step reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    A,
    B,
    Screen,
}

/// Input and output slots for `steps` intermediate nodes followed by the
/// output node. The scene always lands in A.
pub(crate) fn ping_pong(steps: usize) -> Vec<(Slot, Slot)> {
    let mut plan = Vec::with_capacity(steps + 1);
    let mut input = Slot::A;
    for _ in 0..steps {
        let output = if input == Slot::A { Slot::B } else { Slot::A };
        plan.push((input, output));
        input = output;
    }
    plan.push((input, Slot::Screen));
    plan
}

/// Assembles a [`RenderGraph`]. Nodes run in insertion order.
///
/// ```ignore
/// let graph = RenderGraph::builder()
///     .node(tone_mapping)
///     .node(bloom)
///     .build(&gpu, gamma);
/// ```
pub struct RenderGraphBuilder {
    nodes: Vec<Box<dyn RenderNode>>,
}

impl RenderGraphBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn node<N: RenderNode + 'static>(mut self, node: N) -> Self {
        self.nodes.push(Box::new(node));
        self
    }

    /// Finish with the node that writes the screen. It always runs.
    pub fn build<N: RenderNode + 'static>(self, gpu: &GpuContext, output: N) -> RenderGraph {
        RenderGraph {
            nodes: self.nodes,
            output: Box::new(output),
            target_a: RenderTarget::hdr(gpu, "RenderGraph Target A"),
            target_b: RenderTarget::hdr(gpu, "RenderGraph Target B"),
            size: (gpu.width(), gpu.height()),
        }
    }
}

impl Default for RenderGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scene image in, post chain, screen out.
///
/// ```text
/// scene ──▶ A ──▶ node ──▶ B ──▶ node ──▶ A ──▶ output ──▶ screen ──▶ overlay + UI
/// ```
///
/// Disabled nodes drop out of the plan entirely, so the ping-pong order is
/// computed per frame from the enabled set.
pub struct RenderGraph {
    nodes: Vec<Box<dyn RenderNode>>,
    output: Box<dyn RenderNode>,
    target_a: RenderTarget,
    target_b: RenderTarget,
    size: (u32, u32),
}

impl RenderGraph {
    pub fn builder() -> RenderGraphBuilder {
        RenderGraphBuilder::new()
    }

    /// Names of the nodes that will run this frame, output last.
    pub fn active_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.enabled())
            .map(|n| n.name())
            .chain(std::iter::once(self.output.name()))
            .collect()
    }

    /// Offer `folder` to every node that lives in it.
    pub fn tweak(&mut self, folder: Folder, panel: &mut ControlPanel) -> bool {
        let mut changed = false;
        for node in self.nodes.iter_mut().chain(std::iter::once(&mut self.output)) {
            if node.folder() == folder {
                changed |= node.tweak(panel);
            }
        }
        changed
    }

    fn ensure_size(&mut self, gpu: &GpuContext) {
        if self.size == (gpu.width(), gpu.height()) {
            return;
        }
        self.target_a.ensure_size(gpu, "RenderGraph Target A");
        self.target_b.ensure_size(gpu, "RenderGraph Target B");
        for node in self.nodes.iter_mut().chain(std::iter::once(&mut self.output)) {
            node.resize(gpu);
        }
        self.size = (gpu.width(), gpu.height());
    }

    /// Record and submit one frame.
    ///
    /// `scene_fn` renders the HDR scene into the first target. After the
    /// chain has written `screen`, `ui_fn` draws on top of it in a pass that
    /// loads the existing contents.
    pub fn execute<S, U>(
        &mut self,
        gpu: &GpuContext,
        screen: &wgpu::TextureView,
        time: f32,
        scene_fn: S,
        ui_fn: U,
    ) where
        S: FnOnce(&mut wgpu::CommandEncoder, &wgpu::TextureView),
        U: FnOnce(&mut wgpu::RenderPass),
    {
        self.ensure_size(gpu);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("RenderGraph Encoder"),
            });

        scene_fn(&mut encoder, &self.target_a.view);

        {
            let mut ctx = RenderContext {
                gpu,
                encoder: &mut encoder,
                time,
            };

            let active: Vec<&dyn RenderNode> = self
                .nodes
                .iter()
                .filter(|n| n.enabled())
                .map(|n| n.as_ref())
                .chain(std::iter::once(self.output.as_ref()))
                .collect();
            let plan = ping_pong(active.len() - 1);

            for (node, (input, output)) in active.into_iter().zip(plan) {
                let view = |slot| match slot {
                    Slot::A => &self.target_a.view,
                    Slot::B => &self.target_b.view,
                    Slot::Screen => screen,
                };
                node.execute(&mut ctx, view(output), view(input));
            }
        }

        {
            let mut ui_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("UI Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: screen,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            ui_fn(&mut ui_pass);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_only_reads_the_scene() {
        assert_eq!(ping_pong(0), vec![(Slot::A, Slot::Screen)]);
    }

    #[test]
    fn intermediate_nodes_alternate_targets() {
        assert_eq!(
            ping_pong(3),
            vec![
                (Slot::A, Slot::B),
                (Slot::B, Slot::A),
                (Slot::A, Slot::B),
                (Slot::B, Slot::Screen),
            ]
        );
    }

    #[test]
    fn no_step_reads_what_it_writes() {
        for (input, output) in ping_pong(6) {
            assert_ne!(input, output);
        }
    }
}
