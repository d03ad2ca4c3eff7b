//! The post chain's nodes, in the order they run.
//!
//! | # | Node            | Default | Panel folder        |
//! |---|-----------------|---------|---------------------|
//! | 1 | tone mapping    | on      | Realistic Rendering |
//! | 2 | dot screen      | off     | Post Processing     |
//! | 3 | glitch          | off     | Post Processing     |
//! | 4 | RGB shift       | off     | Post Processing     |
//! | 5 | bloom           | off     | Post Processing     |
//! | 6 | tint            | off     | Post Processing     |
//! | 7 | displacement    | off     | Post Processing     |
//! | 8 | gamma (output)  | on      | Post Processing     |

mod bloom;
mod displacement;
mod dot_screen;
mod gamma;
mod glitch;
mod rgb_shift;
mod tint;
mod tone_mapping;

pub use bloom::{BloomNode, BloomParams};
pub use displacement::{DisplacementNode, DisplacementParams, NormalMapSlot};
pub use dot_screen::{DotScreenNode, DotScreenParams};
pub use gamma::{GammaNode, GammaParams};
pub use glitch::{GlitchNode, GlitchParams};
pub use rgb_shift::{RgbShiftNode, RgbShiftParams};
pub use tint::{TintNode, TintParams};
pub use tone_mapping::{ToneMappingMode, ToneMappingNode, ToneMappingParams};

use serde::Deserialize;

use crate::gpu::GpuContext;
use crate::render_graph::RenderGraph;

/// Switches and settings for every effect after tone mapping.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostParams {
    pub dot_screen: DotScreenParams,
    pub glitch: GlitchParams,
    pub rgb_shift: RgbShiftParams,
    pub bloom: BloomParams,
    pub tint: TintParams,
    pub displacement: DisplacementParams,
    pub gamma: GammaParams,
}

/// Build the full chain.
///
/// The displacement node samples whatever normal map is later placed in
/// `normal_map`.
pub fn post_chain(
    gpu: &GpuContext,
    tone_mapping: &ToneMappingParams,
    post: &PostParams,
    normal_map: NormalMapSlot,
) -> RenderGraph {
    RenderGraph::builder()
        .node(ToneMappingNode::new(gpu, tone_mapping.clone()))
        .node(DotScreenNode::new(gpu, post.dot_screen.clone()))
        .node(GlitchNode::new(gpu, post.glitch.clone()))
        .node(RgbShiftNode::new(gpu, post.rgb_shift.clone()))
        .node(BloomNode::new(gpu, post.bloom.clone()))
        .node(TintNode::new(gpu, post.tint.clone()))
        .node(DisplacementNode::new(gpu, post.displacement.clone(), normal_map))
        .build(gpu, GammaNode::new(gpu, post.gamma.clone()))
}

/// Window size in the form effect uniforms expect.
pub(crate) fn resolution(gpu: &GpuContext) -> [f32; 2] {
    [gpu.width().max(1) as f32, gpu.height().max(1) as f32]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_but_gamma_starts_off() {
        let p = PostParams::default();
        assert!(!p.dot_screen.enabled);
        assert!(!p.glitch.enabled);
        assert!(!p.rgb_shift.enabled);
        assert!(!p.bloom.enabled);
        assert!(!p.tint.enabled);
        assert!(!p.displacement.enabled);
        assert!(p.gamma.enabled);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let p: PostParams =
            serde_json::from_str(r#"{ "tint": { "enabled": true, "tint": [0.0, 0.5, 0.0] } }"#)
                .unwrap();
        assert!(p.tint.enabled);
        assert_eq!(p.tint.tint, [0.0, 0.5, 0.0]);
        assert_eq!(p.bloom, BloomParams::default());
    }
}
