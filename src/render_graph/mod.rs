//! The post-processing chain between the scene pass and the screen.
//!
//! The graph is linear. The scene renders into target A, each enabled node
//! reads the previous image and writes the other ping-pong target, and the
//! output node writes the swapchain image. A final pass with `LoadOp::Load`
//! composites the overlay and UI on top.
//!
//! ```text
//! ┌─────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  Scene  │───▶│  Tone map   │───▶│  ...effects │───▶│   Output    │───▶ overlay, UI
//! │ (HDR)   │    │             │    │  (skipped   │    │  (gamma)    │
//! └─────────┘    └─────────────┘    │  when off)  │    └─────────────┘
//!      │                │           └─────────────┘
//!      ▼                ▼
//!   Target A ◀──────▶ Target B        (ping-pong)
//! ```

mod graph;
mod render_node;
mod render_target;

pub use graph::{RenderGraph, RenderGraphBuilder};
pub use render_node::RenderNode;
pub use render_target::{HDR_FORMAT, RenderContext, RenderTarget};
