use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowId};

use crate::assets::{Assets, FontId};
use crate::camera::Camera;
use crate::config::Config;
use crate::draw2d::Draw2d;
use crate::effects::{self, NormalMapSlot};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::gpu::{GpuContext, SurfaceAction};
use crate::input::Input;
use crate::light::LightParams;
use crate::loader::{AssetKind, AssetLoader, AssetRequest, LoadedAsset};
use crate::loading::{LoadingCoordinator, LoadingManager, LoadingScreen, ProgressBar};
use crate::mesh_pass::MeshPass;
use crate::orbit_camera::OrbitCamera;
use crate::overlay::OverlayPass;
use crate::render_graph::RenderGraph;
use crate::scene::Scene;
use crate::shadow_pass::ShadowPass;
use crate::texture::{ColorSpace, Texture};
use crate::ui::{ControlPanel, Folder, Tweak};

/// Open the window and run the demo until it is closed.
///
/// Startup failures (window, adapter, device) are returned once the event
/// loop has exited.
pub fn run(config: Config) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|e| Error::Window(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = RevealApp::Pending { config };
    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::Window(e.to_string()))?;

    match app {
        RevealApp::Failed(e) => Err(e),
        _ => Ok(()),
    }
}

enum RevealApp {
    Pending { config: Config },
    Running(Box<Running>),
    Failed(Error),
}

impl ApplicationHandler for RevealApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let RevealApp::Pending { config } = self else {
            return;
        };
        match Running::new(event_loop, config) {
            Ok(running) => *self = RevealApp::Running(Box::new(running)),
            Err(e) => {
                *self = RevealApp::Failed(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let RevealApp::Running(app) = self else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => app.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                if !app.frame() {
                    event_loop.exit();
                    return;
                }
                app.input.end_frame();
                app.window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let RevealApp::Running(app) = self {
            app.window.request_redraw();
        }
    }
}

/// Everything that lives on the event-loop thread once the window exists.
struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    start: Instant,
    input: Input,
    camera: Camera,
    orbit: OrbitCamera,

    manager: LoadingManager,
    loader: AssetLoader,
    coordinator: LoadingCoordinator,
    screen: LoadingScreen,
    model_path: PathBuf,

    scene: Scene,
    environment: Environment,
    light: LightParams,
    shadow: ShadowPass,
    mesh_pass: MeshPass,
    graph: RenderGraph,
    normal_map: NormalMapSlot,
    overlay: OverlayPass,

    panel: ControlPanel,
    draw: Draw2d,
    assets: Assets,
    font: Option<FontId>,
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, config: &Config) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window.width,
                config.window.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| Error::Window(e.to_string()))?,
        );
        let gpu = GpuContext::new(window.clone())?;

        let mut assets = Assets::new();
        let font = match assets.load_font(&gpu, &config.assets.font, config.assets.font_size) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!(
                    "Font '{}' unavailable, panel text disabled: {e}",
                    config.assets.font.display()
                );
                None
            }
        };

        let params = &config.scene;
        let scene = Scene::new(&gpu, params.model.clone());
        let environment = Environment::new(&gpu, params.environment.clone());
        let shadow = ShadowPass::new(&gpu, &scene, params.light.shadow_map_size);
        let mesh_pass = MeshPass::new(&gpu, &params.renderer, &scene, &environment, &shadow);
        let normal_map = NormalMapSlot::new();
        let graph = effects::post_chain(&gpu, &params.tone_mapping, &params.post, normal_map.clone());
        log::debug!("Post chain: {:?}", graph.active_nodes());

        let mut camera = Camera::new();
        camera.set_aspect(gpu.width(), gpu.height());
        let orbit = OrbitCamera::from_camera(&camera);

        let mut panel = ControlPanel::new(config.panel.title.clone(), config.panel.width);
        panel.set_visible(config.panel.visible);

        let mut screen = LoadingScreen::new(ProgressBar::new(config.reveal.bar_style()?));
        screen.overlay_alpha = params.overlay.alpha;

        let mut input = Input::new();
        input.set_window_size(gpu.width(), gpu.height());

        let mut manager = LoadingManager::new();
        let mut loader = AssetLoader::new();
        loader.request(
            &mut manager,
            AssetRequest::new(AssetKind::Environment, &config.assets.environment),
        );
        loader.request(
            &mut manager,
            AssetRequest::new(AssetKind::NormalMap, &config.assets.normal_map),
        );
        manager.seal();

        Ok(Self {
            overlay: OverlayPass::new(&gpu),
            draw: Draw2d::new(&gpu),
            window,
            gpu,
            start: Instant::now(),
            input,
            camera,
            orbit,
            manager,
            loader,
            coordinator: LoadingCoordinator::new(config.reveal.timing()?),
            screen,
            model_path: config.assets.model.clone(),
            scene,
            environment,
            light: params.light.clone(),
            shadow,
            mesh_pass,
            graph,
            normal_map,
            panel,
            assets,
            font,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        self.camera.set_aspect(width, height);
        self.mesh_pass.ensure_size(&self.gpu);
    }

    /// Upload finished assets, then settle them with the manager.
    ///
    /// The model is requested from the environment's completion handler, so
    /// it is registered before the environment settles.
    fn poll_loader(&mut self) {
        let gpu = &self.gpu;
        let environment = &mut self.environment;
        let scene = &mut self.scene;
        let normal_map = &self.normal_map;
        let model_path = &self.model_path;

        self.loader.poll(&mut self.manager, |url, asset| {
            match asset {
                LoadedAsset::Environment(map) => {
                    environment.set_map(gpu, &map);
                    return Ok(vec![AssetRequest::new(AssetKind::Model, model_path)]);
                }
                LoadedAsset::Model(model) => {
                    log::info!(
                        "'{url}': {} primitives, {} vertices, {} triangles",
                        model.primitives.len(),
                        model.vertex_count(),
                        model.triangle_count()
                    );
                    scene.add_model(gpu, model, environment.params.env_map_intensity);
                }
                LoadedAsset::NormalMap(image) => {
                    normal_map.set(Texture::from_image(
                        gpu,
                        &image,
                        ColorSpace::Linear,
                        "Interface Normal Map",
                    ));
                }
            }
            Ok(Vec::new())
        });
    }

    fn update_panel(&mut self) {
        let viewport = Vec2::new(self.gpu.width() as f32, self.gpu.height() as f32);
        let env_intensity = self.environment.params.env_map_intensity;

        self.panel.begin(self.input.panel_input(), viewport);
        for folder in Folder::ALL {
            if !self.panel.folder(folder) {
                continue;
            }
            let owners: [&mut dyn Tweak; 4] = [
                &mut self.environment,
                &mut self.light,
                &mut self.scene,
                &mut self.screen,
            ];
            for owner in owners {
                if owner.folder() == folder {
                    owner.tweak(&mut self.panel);
                }
            }
            self.graph.tweak(folder, &mut self.panel);
        }
        self.panel.end();

        let next = self.environment.params.env_map_intensity;
        if next != env_intensity {
            let updated = self.scene.set_env_intensity(&self.gpu, next);
            log::debug!("envMapIntensity {next} applied to {updated} materials");
        }
    }

    /// Run one frame. Returns false when the app must stop.
    fn frame(&mut self) -> bool {
        let now: Duration = self.start.elapsed();

        self.poll_loader();
        for event in self.manager.drain_events() {
            self.coordinator.handle(event, now, &mut self.screen);
        }

        if self.input.key_pressed(KeyCode::KeyH) {
            self.panel.toggle();
        }
        self.coordinator.update(now, &mut self.screen);
        self.orbit
            .handle_input(&self.input, !self.panel.wants_pointer());
        self.orbit.update();
        self.orbit.apply(&mut self.camera);
        self.update_panel();

        self.environment.update(&self.gpu);
        self.scene.update(&self.gpu);
        if self.shadow.ensure_size(&self.gpu, self.light.shadow_map_size) {
            self.mesh_pass.rebind_shadow(&self.gpu, &self.shadow);
        }
        self.mesh_pass.ensure_size(&self.gpu);

        let surface = match self.gpu.acquire() {
            Ok(surface) => surface,
            Err(SurfaceAction::SkipFrame) => return true,
            Err(SurfaceAction::Exit) => return false,
        };
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.render(&view, now);
        surface.present();
        true
    }

    fn render(&mut self, view: &wgpu::TextureView, now: Duration) {
        let Self {
            gpu,
            graph,
            shadow,
            mesh_pass,
            camera,
            light,
            environment,
            scene,
            overlay,
            draw,
            assets,
            panel,
            screen,
            font,
            ..
        } = self;

        let (width, height) = (gpu.width() as f32, gpu.height() as f32);
        draw.clear();
        draw.update_font_bind_groups(gpu, assets);
        screen.bar.draw(draw, now, width, height);
        panel.draw(draw, assets, *font);

        let overlay_alpha = screen.overlay_alpha;
        let draw = &*draw;
        graph.execute(
            gpu,
            view,
            now.as_secs_f32(),
            |encoder, target| {
                shadow.render(gpu, encoder, light, scene);
                mesh_pass.render(
                    gpu,
                    encoder,
                    target,
                    camera,
                    light,
                    shadow.size(),
                    environment,
                    scene,
                );
            },
            |pass| {
                overlay.draw(gpu, pass, overlay_alpha);
                draw.render(gpu, pass);
            },
        );
    }
}
