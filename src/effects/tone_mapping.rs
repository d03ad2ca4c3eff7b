use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::post_process::ShaderPass;
use crate::render_graph::{HDR_FORMAT, RenderContext, RenderNode};
use crate::ui::{ControlPanel, Folder, Tweak};

/// Curve used to bring HDR scene values into display range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMappingMode {
    No,
    Linear,
    #[default]
    Reinhard,
    Cineon,
    AcesFilmic,
}

impl ToneMappingMode {
    pub const OPTIONS: [(ToneMappingMode, &'static str); 5] = [
        (ToneMappingMode::No, "No"),
        (ToneMappingMode::Linear, "Linear"),
        (ToneMappingMode::Reinhard, "Reinhard"),
        (ToneMappingMode::Cineon, "Cineon"),
        (ToneMappingMode::AcesFilmic, "ACESFilmic"),
    ];

    fn shader_index(self) -> u32 {
        self as u32
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToneMappingParams {
    pub mode: ToneMappingMode,
    pub exposure: f32,
}

impl Default for ToneMappingParams {
    fn default() -> Self {
        Self {
            mode: ToneMappingMode::Reinhard,
            exposure: 3.0,
        }
    }
}

impl Tweak for ToneMappingParams {
    fn folder(&self) -> Folder {
        Folder::RealisticRendering
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        let mut changed = panel.choice("toneMapping", &mut self.mode, &ToneMappingMode::OPTIONS);
        changed |= panel.slider("toneMappingExposure", &mut self.exposure, 0.0..=10.0, 0.001);
        changed
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ToneMappingUniforms {
    resolution: [f32; 2],
    exposure: f32,
    mode: u32,
}

/// Always-on first node of the chain.
pub struct ToneMappingNode {
    pub params: ToneMappingParams,
    pass: ShaderPass,
}

impl ToneMappingNode {
    pub fn new(gpu: &GpuContext, params: ToneMappingParams) -> Self {
        let pass = ShaderPass::new(
            gpu,
            "Tone Mapping",
            TONE_MAPPING_FS,
            std::mem::size_of::<ToneMappingUniforms>() as u64,
            0,
            HDR_FORMAT,
        );
        Self { params, pass }
    }
}

impl Tweak for ToneMappingNode {
    fn folder(&self) -> Folder {
        self.params.folder()
    }

    fn tweak(&mut self, panel: &mut ControlPanel) -> bool {
        self.params.tweak(panel)
    }
}

impl RenderNode for ToneMappingNode {
    fn name(&self) -> &str {
        "tone mapping"
    }

    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: &wgpu::TextureView,
    ) {
        self.pass.write_uniforms(
            ctx.gpu,
            &ToneMappingUniforms {
                resolution: super::resolution(ctx.gpu),
                exposure: self.params.exposure,
                mode: self.params.mode.shader_index(),
            },
        );
        self.pass.render(ctx.gpu, ctx.encoder, target, input, &[]);
    }
}

const TONE_MAPPING_FS: &str = r#"
struct Uniforms {
    resolution: vec2f,
    exposure: f32,
    mode: u32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var input_texture: texture_2d<f32>;
@group(0) @binding(2) var input_sampler: sampler;

fn cineon(color: vec3f) -> vec3f {
    let c = max(vec3f(0.0), color - 0.004);
    return pow((c * (6.2 * c + 0.5)) / (c * (6.2 * c + 1.7) + 0.06), vec3f(2.2));
}

fn rrt_and_odt_fit(v: vec3f) -> vec3f {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    return a / b;
}

fn aces_filmic(color: vec3f) -> vec3f {
    // sRGB => XYZ => D65_2_D60 => AP1 => RRT_SAT
    let input_mat = mat3x3f(
        vec3f(0.59719, 0.07600, 0.02840),
        vec3f(0.35458, 0.90834, 0.13383),
        vec3f(0.04823, 0.01566, 0.83777),
    );
    // ODT_SAT => XYZ => D60_2_D65 => sRGB
    let output_mat = mat3x3f(
        vec3f(1.60475, -0.10208, -0.00327),
        vec3f(-0.53108, 1.10813, -0.07276),
        vec3f(-0.07367, -0.00605, 1.07602),
    );
    var c = input_mat * (color / 0.6);
    c = rrt_and_odt_fit(c);
    return clamp(output_mat * c, vec3f(0.0), vec3f(1.0));
}

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let texel = textureSample(input_texture, input_sampler, uv);
    let c = texel.rgb * u.exposure;

    var mapped = texel.rgb;
    switch u.mode {
        case 1u: { mapped = clamp(c, vec3f(0.0), vec3f(1.0)); }
        case 2u: { mapped = clamp(c / (vec3f(1.0) + c), vec3f(0.0), vec3f(1.0)); }
        case 3u: { mapped = cineon(c); }
        case 4u: { mapped = aces_filmic(c); }
        default: {}
    }
    return vec4f(mapped, texel.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_indices_follow_option_order() {
        for (i, (mode, _)) in ToneMappingMode::OPTIONS.iter().enumerate() {
            assert_eq!(mode.shader_index(), i as u32);
        }
    }

    #[test]
    fn modes_deserialize_from_snake_case() {
        let p: ToneMappingParams =
            serde_json::from_str(r#"{ "mode": "aces_filmic", "exposure": 1.5 }"#).unwrap();
        assert_eq!(p.mode, ToneMappingMode::AcesFilmic);
        assert_eq!(p.exposure, 1.5);
    }
}
