use crate::assets::{Assets, FontId};
use crate::gpu::GpuContext;
use crate::ui::Color;

/// Vertex for 2D quads and text, in window pixels.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Draw2dUniforms {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

const MAX_VERTICES: usize = 16384;

/// Two triangles covering `[x, x + w] × [y, y + h]` with uvs `[u0, u1] × [v0, v1]`.
fn quad(x: f32, y: f32, w: f32, h: f32, uv: [f32; 4], color: Color) -> [Vertex2d; 6] {
    let [u0, v0, u1, v1] = uv;
    let color = color.to_array();
    let v = |px, py, u, v| Vertex2d {
        position: [px, py],
        uv: [u, v],
        color,
    };
    [
        v(x, y, u0, v0),
        v(x + w, y, u1, v0),
        v(x, y + h, u0, v1),
        v(x + w, y, u1, v0),
        v(x + w, y + h, u1, v1),
        v(x, y + h, u0, v1),
    ]
}

/// Immediate-mode batcher for the UI pass: flat rectangles and text.
///
/// Calls accumulate during the frame and are flushed by [`render`](Self::render)
/// into a pass that loads the existing frame. Rectangles draw first, then text.
pub struct Draw2d {
    colored_pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,

    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,

    // one per loaded font, created lazily
    font_bind_groups: Vec<Option<wgpu::BindGroup>>,

    colored_vertices: Vec<Vertex2d>,
    text_batches: Vec<(FontId, Vec<Vertex2d>)>,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Draw2d Shader"),
            source: wgpu::ShaderSource::Wgsl(DRAW2D_SHADER.into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Uniforms"),
            size: std::mem::size_of::<Draw2dUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Uniform Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw2d Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Texture Layout"),
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

        let colored_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Draw2d Colored Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Draw2d Textured Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |label: &str, layout: &wgpu::PipelineLayout, fragment: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex2d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment),
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
            })
        };
        let colored_pipeline = pipeline("Draw2d Colored Pipeline", &colored_layout, "fs_colored");
        let textured_pipeline =
            pipeline("Draw2d Textured Pipeline", &textured_layout, "fs_textured");

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex2d>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            colored_pipeline,
            textured_pipeline,
            vertex_buffer,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            font_bind_groups: Vec::new(),
            colored_vertices: Vec::with_capacity(1024),
            text_batches: Vec::new(),
        }
    }

    /// Drop everything recorded for the previous frame.
    pub fn clear(&mut self) {
        self.colored_vertices.clear();
        self.text_batches.clear();
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.colored_vertices
            .extend_from_slice(&quad(x, y, w, h, [0.0; 4], color));
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn text(
        &mut self,
        assets: &Assets,
        font_id: FontId,
        x: f32,
        y: f32,
        text: &str,
        color: Color,
    ) {
        let Some(font) = assets.font(font_id) else {
            return;
        };

        let batch = match self.text_batches.iter().position(|(id, _)| *id == font_id) {
            Some(i) => i,
            None => {
                self.text_batches.push((font_id, Vec::new()));
                self.text_batches.len() - 1
            }
        };

        let baseline = y + font.size();
        let mut cursor = x;
        for ch in text.chars() {
            let Some(glyph) = font.glyph(ch) else {
                cursor += font.size() * 0.5;
                continue;
            };
            if glyph.width > 0 && glyph.height > 0 {
                // fontdue's ymin is measured up from the baseline to the glyph's bottom
                let gx = cursor + glyph.offset_x;
                let gy = baseline - glyph.offset_y - glyph.height as f32;
                let [u, v, du, dv] = glyph.uv;
                self.text_batches[batch].1.extend_from_slice(&quad(
                    gx,
                    gy,
                    glyph.width as f32,
                    glyph.height as f32,
                    [u, v, u + du, v + dv],
                    color,
                ));
            }
            cursor += glyph.advance;
        }
    }

    /// Create bind groups for fonts loaded since the last call.
    pub(crate) fn update_font_bind_groups(&mut self, gpu: &GpuContext, assets: &Assets) {
        self.font_bind_groups.resize_with(assets.fonts.len(), || None);
        for (slot, font) in self.font_bind_groups.iter_mut().zip(&assets.fonts) {
            if slot.is_some() {
                continue;
            }
            *slot = Some(gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Font Bind Group"),
                layout: &self.texture_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&font.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&font.sampler),
                    },
                ],
            }));
        }
    }

    /// Flush the recorded batches into `render_pass`.
    ///
    /// Anything past the vertex buffer's capacity is dropped with a warning.
    pub fn render(&self, gpu: &GpuContext, render_pass: &mut wgpu::RenderPass<'_>) {
        let uniforms = Draw2dUniforms {
            resolution: [gpu.width() as f32, gpu.height() as f32],
            _padding: [0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let stride = std::mem::size_of::<Vertex2d>();
        let mut offset = 0usize;
        let mut upload = |vertices: &[Vertex2d]| -> Option<std::ops::Range<u32>> {
            if vertices.is_empty() {
                return None;
            }
            if offset + vertices.len() > MAX_VERTICES {
                log::warn!("Draw2d vertex buffer full, dropping {} vertices", vertices.len());
                return None;
            }
            gpu.queue.write_buffer(
                &self.vertex_buffer,
                (offset * stride) as u64,
                bytemuck::cast_slice(vertices),
            );
            let range = offset as u32..(offset + vertices.len()) as u32;
            offset += vertices.len();
            Some(range)
        };

        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

        if let Some(range) = upload(&self.colored_vertices) {
            render_pass.set_pipeline(&self.colored_pipeline);
            render_pass.draw(range, 0..1);
        }

        for (font_id, vertices) in &self.text_batches {
            let Some(bind_group) = self.font_bind_groups.get(font_id.0).and_then(Option::as_ref)
            else {
                continue;
            };
            if let Some(range) = upload(vertices) {
                render_pass.set_pipeline(&self.textured_pipeline);
                render_pass.set_bind_group(1, bind_group, &[]);
                render_pass.draw(range, 0..1);
            }
        }
    }
}

const DRAW2D_SHADER: &str = r#"
struct Uniforms {
    resolution: vec2f,
    _padding: vec2f,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(1) @binding(0) var atlas: texture_2d<f32>;
@group(1) @binding(1) var atlas_sampler: sampler;

struct VertexOut {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
    @location(1) color: vec4f,
}

@vertex
fn vs(@location(0) position: vec2f, @location(1) uv: vec2f, @location(2) color: vec4f) -> VertexOut {
    // pixels, y down -> clip space
    let ndc = position / u.resolution * vec2f(2.0, -2.0) + vec2f(-1.0, 1.0);
    var out: VertexOut;
    out.position = vec4f(ndc, 0.0, 1.0);
    out.uv = uv;
    out.color = color;
    return out;
}

@fragment
fn fs_colored(in: VertexOut) -> @location(0) vec4f {
    return in.color;
}

@fragment
fn fs_textured(in: VertexOut) -> @location(0) vec4f {
    let coverage = textureSample(atlas, atlas_sampler, in.uv).r;
    return vec4f(in.color.rgb, in.color.a * coverage);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_spans_the_rect() {
        let q = quad(10.0, 20.0, 30.0, 5.0, [0.0; 4], Color::WHITE);
        let xs: Vec<f32> = q.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = q.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), 10.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 40.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), 20.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 25.0);
    }

    #[test]
    fn quad_corners_carry_matching_uvs() {
        let q = quad(0.0, 0.0, 1.0, 1.0, [0.1, 0.2, 0.3, 0.4], Color::BLACK);
        for v in q {
            let expected_u = if v.position[0] == 0.0 { 0.1 } else { 0.3 };
            let expected_v = if v.position[1] == 0.0 { 0.2 } else { 0.4 };
            assert_eq!(v.uv, [expected_u, expected_v]);
            assert_eq!(v.color, [0.0, 0.0, 0.0, 1.0]);
        }
    }
}
