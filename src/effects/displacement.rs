use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::post_process::ShaderPass;
use crate::render_graph::{HDR_FORMAT, RenderContext, RenderNode};
use crate::texture::Texture;
use crate::ui::{ControlPanel, Folder, Tweak};

/// A normal map that arrives after the chain is built.
///
/// The loader fills it once the PNG is decoded and uploaded; the displacement
/// node reads whatever is there each frame.
#[derive(Clone, Default)]
pub struct NormalMapSlot(Rc<RefCell<Option<Texture>>>);

impl NormalMapSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, texture: Texture) {
        *self.0.borrow_mut() = Some(texture);
    }

    pub fn is_loaded(&self) -> bool {
        self.0.borrow().is_some()
    }
}

/// Wavy, normal-mapped distortion of the whole frame.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplacementParams {
    pub enabled: bool,
}

impl Tweak for DisplacementParams {
    fn folder(&self) -> Folder {
        Folder::PostProcessing
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        panel.checkbox("displacementPass (our custom pass)", &mut self.enabled)
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DisplacementUniforms {
    resolution: [f32; 2],
    time: f32,
    _pad: f32,
}

pub struct DisplacementNode {
    pub params: DisplacementParams,
    pass: ShaderPass,
    normal_map: NormalMapSlot,
    flat: Texture,
}

impl DisplacementNode {
    pub fn new(gpu: &GpuContext, params: DisplacementParams, normal_map: NormalMapSlot) -> Self {
        let pass = ShaderPass::new(
            gpu,
            "Displacement",
            DISPLACEMENT_FS,
            std::mem::size_of::<DisplacementUniforms>() as u64,
            1,
            HDR_FORMAT,
        );
        Self {
            params,
            pass,
            normal_map,
            flat: Texture::flat_normal(gpu),
        }
    }
}

impl Tweak for DisplacementNode {
    fn folder(&self) -> Folder {
        self.params.folder()
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        self.params.tweak(panel)
    }
}

impl RenderNode for DisplacementNode {
    fn name(&self) -> &str {
        "displacement"
    }

    fn enabled(&self) -> bool {
        self.params.enabled
    }

    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: &wgpu::TextureView,
    ) {
        self.pass.write_uniforms(
            ctx.gpu,
            &DisplacementUniforms {
                resolution: super::resolution(ctx.gpu),
                time: ctx.time,
                _pad: 0.0,
            },
        );
        let loaded = self.normal_map.0.borrow();
        let normal = loaded.as_ref().unwrap_or(&self.flat);
        self.pass
            .render(ctx.gpu, ctx.encoder, target, input, &[&normal.view]);
    }
}

const DISPLACEMENT_FS: &str = r#"
struct Uniforms {
    resolution: vec2f,
    time: f32,
    _pad: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;
@group(0) @binding(3) var normal_map: texture_2d<f32>;

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let normal = textureSample(normal_map, input_sampler, uv).xyz * 2.0 - 1.0;

    var new_uv = vec2f(uv.x, uv.y + sin(uv.x * 10.0 + u.time) * 0.1);
    new_uv += normal.xy * 0.1;
    var color = textureSample(input_texture, input_sampler, new_uv);

    let light_direction = normalize(vec3f(-1.0, 1.0, 0.0));
    let lightness = clamp(dot(normal, light_direction), 0.0, 1.0);
    color = vec4f(color.rgb + lightness * 2.0, color.a);
    return color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_starts_empty() {
        assert!(!NormalMapSlot::new().is_loaded());
    }

    #[test]
    fn uniforms_fit_one_vec4() {
        assert_eq!(std::mem::size_of::<DisplacementUniforms>(), 16);
    }
}
