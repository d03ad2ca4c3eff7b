//! Full-screen dimming overlay drawn over the finished frame.

use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::loading::LoadingScreen;
use crate::ui::{ControlPanel, Folder, Tweak};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayParams {
    /// Opacity the overlay starts at.
    pub alpha: f32,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl Tweak for LoadingScreen {
    fn folder(&self) -> Folder {
        Folder::Overlay
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        panel.slider("overlayAlpha", &mut self.overlay_alpha, 0.0..=1.0, 0.01)
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct OverlayUniforms {
    color: [f32; 3],
    alpha: f32,
}

/// Composites black at a given alpha over whatever the pass already holds.
pub struct OverlayPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl OverlayPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(OVERLAY_SHADER.into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Overlay Uniforms"),
            size: std::mem::size_of::<OverlayUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Overlay Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Overlay Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
        }
    }

    /// Draw the overlay into an open pass. Nothing is drawn at zero alpha.
    pub fn draw(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let uniforms = OverlayUniforms {
            color: [0.0; 3],
            alpha,
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

const OVERLAY_SHADER: &str = r#"
struct Uniforms {
    color: vec3f,
    alpha: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4f {
    let uv = vec2f(f32((vi << 1u) & 2u), f32(vi & 2u));
    return vec4f(uv * 2.0 - 1.0, 0.0, 1.0);
}

@fragment
fn fs() -> @location(0) vec4f {
    return vec4f(u.color, u.alpha);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::{ProgressBar, ProgressBarStyle};
    use crate::ui::PanelInput;
    use glam::Vec2;

    #[test]
    fn starts_opaque() {
        assert_eq!(OverlayParams::default().alpha, 1.0);
    }

    #[test]
    fn uniforms_fit_one_vec4() {
        assert_eq!(std::mem::size_of::<OverlayUniforms>(), 16);
    }

    #[test]
    fn loading_screen_lives_in_the_overlay_folder() {
        let screen = LoadingScreen::new(ProgressBar::new(ProgressBarStyle::default()));
        assert_eq!(screen.folder(), Folder::Overlay);

        let mut panel = ControlPanel::new("Tweak It", 340.0);
        panel.begin(PanelInput::default(), Vec2::new(800.0, 600.0));
        let mut screen = screen;
        assert!(!screen.tweak(&mut panel));
        panel.end();
    }
}
