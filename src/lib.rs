//! # reveal
//!
//! **A PBR model viewer that hides its scene until every asset has loaded.**
//!
//! An HDR environment, a glTF/STL model and a normal map are decoded on
//! worker threads. A black overlay covers the scene while a thin bar tracks
//! progress. When the last asset settles, the overlay fades out and the bar
//! leaves only after its final fill has finished, so it never jumps.
//!
//! ```no_run
//! use reveal::{CliArgs, Config};
//!
//! fn main() -> reveal::Result<()> {
//!     let args = CliArgs::parse(std::env::args().skip(1))?;
//!     reveal::run(Config::from_args(&args)?)
//! }
//! ```
//!
//! The frame is a lit scene pass followed by a linear post chain (tone
//! mapping, optional effects, gamma) and then the overlay and control panel.
//! Press `H` to hide the panel.

mod app;
mod assets;
mod camera;
mod config;
mod draw2d;
pub mod effects;
mod environment;
mod error;
mod geometry;
mod gpu;
mod input;
mod light;
mod loader;
pub mod loading;
mod material;
mod mesh;
mod mesh_pass;
mod orbit_camera;
mod overlay;
mod post_process;
mod render_graph;
mod scene;
mod shadow_pass;
mod texture;
pub mod ui;

pub use app::run;
pub use assets::{Assets, FontAtlas, FontId};
pub use camera::Camera;
pub use config::{AssetPaths, CliArgs, Config, PanelConfig, RevealConfig, SceneParameters, WindowConfig};
pub use draw2d::Draw2d;
pub use environment::{Environment, EnvironmentParams, HdrEnvironment};
pub use error::{Error, Result};
pub use geometry::{ModelData, RawGeometry, load_model};
pub use gpu::{GpuContext, SurfaceAction};
pub use input::Input;
pub use light::LightParams;
pub use loader::{AssetKind, AssetLoader, AssetRequest, LoadedAsset};
pub use loading::{
    Easing, LoadEvent, LoadProgress, LoadingCoordinator, LoadingManager, LoadingScreen,
    ProgressBar, ProgressBarStyle, RevealState, RevealSurface, RevealTiming, Tween,
};
pub use mesh::{Mesh, Transform, Vertex3d};
pub use mesh_pass::{MeshPass, RendererParams};
pub use orbit_camera::OrbitCamera;
pub use overlay::{OverlayParams, OverlayPass};
pub use post_process::ShaderPass;
pub use render_graph::{RenderContext, RenderGraph, RenderNode, RenderTarget};
pub use scene::{ModelParams, Scene};
pub use shadow_pass::ShadowPass;
pub use texture::{ColorSpace, ImageData, Texture};
pub use ui::{ControlPanel, Folder, Tweak};
