//! Background asset decoding.
//!
//! Files are read and decoded on short-lived worker threads. Results come
//! back over a channel that the render thread polls once per frame, so every
//! [`LoadingManager`] notification happens on the thread that owns it, in
//! completion order.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::environment::HdrEnvironment;
use crate::error::{Error, Result};
use crate::geometry::{self, ModelData};
use crate::loading::LoadingManager;
use crate::texture::ImageData;

/// What a file decodes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    /// Equirectangular Radiance HDR.
    Environment,
    /// glTF, GLB or STL.
    Model,
    /// Tangent-space normal map for the displacement pass.
    NormalMap,
}

/// A decoded asset, ready for upload on the render thread.
pub enum LoadedAsset {
    Environment(HdrEnvironment),
    Model(ModelData),
    NormalMap(ImageData),
}

impl std::fmt::Debug for LoadedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadedAsset::Environment(env) => {
                write!(f, "Environment({}x{})", env.width(), env.height())
            }
            LoadedAsset::Model(model) => write!(
                f,
                "Model({} primitives, {} triangles)",
                model.primitives.len(),
                model.triangle_count()
            ),
            LoadedAsset::NormalMap(image) => write!(f, "NormalMap({}x{})", image.width, image.height),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRequest {
    pub kind: AssetKind,
    pub path: PathBuf,
}

impl AssetRequest {
    pub fn new(kind: AssetKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// The name the loading session knows this asset by.
    pub fn url(&self) -> String {
        self.path.display().to_string()
    }
}

fn decode(kind: AssetKind, path: &Path) -> Result<LoadedAsset> {
    Ok(match kind {
        AssetKind::Environment => LoadedAsset::Environment(HdrEnvironment::decode(path)?),
        AssetKind::Model => LoadedAsset::Model(geometry::load_model(path)?),
        AssetKind::NormalMap => LoadedAsset::NormalMap(ImageData::decode(path)?),
    })
}

type Decoder = fn(AssetKind, &Path) -> Result<LoadedAsset>;

struct Completion {
    url: String,
    result: Result<LoadedAsset>,
}

/// Spawns decode workers and hands their results back to the render thread.
pub struct AssetLoader {
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    in_flight: usize,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Loads started but not yet handed to [`poll`](Self::poll)'s handler.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Register `request` with the manager and start decoding it.
    pub fn request(&mut self, manager: &mut LoadingManager, request: AssetRequest) {
        self.spawn(manager, request, decode);
    }

    /// A panicking decoder still reports back, as a failed load.
    fn spawn(&mut self, manager: &mut LoadingManager, request: AssetRequest, decode: Decoder) {
        let url = request.url();
        manager.item_start(&url);
        log::info!("Loading {:?} '{url}'", request.kind);

        let sender = self.sender.clone();
        let worker_url = url.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("load {url}"))
            .spawn(move || {
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| decode(request.kind, &request.path)))
                        .unwrap_or_else(|_| Err(Error::asset(worker_url.clone(), "decoder panicked")));
                // the receiver is gone only when the app is shutting down
                let _ = sender.send(Completion {
                    url: worker_url,
                    result,
                });
            });

        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(e) => {
                let e = Error::asset(url.clone(), e);
                manager.item_error(&url, e.to_string());
            }
        }
    }

    /// Settle every load that finished since the last call. Failures are
    /// reported through the manager's error event.
    ///
    /// `on_loaded` runs first and may return follow-up requests, which are
    /// registered before the finished asset's `item_end`. That keeps the
    /// session open across chained loads. A handler error settles the asset
    /// as failed.
    pub fn poll<F>(&mut self, manager: &mut LoadingManager, mut on_loaded: F)
    where
        F: FnMut(&str, LoadedAsset) -> Result<Vec<AssetRequest>>,
    {
        loop {
            let completion = match self.receiver.try_recv() {
                Ok(completion) => completion,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            self.in_flight = self.in_flight.saturating_sub(1);
            let Completion { url, result } = completion;

            match result.and_then(|asset| {
                log::debug!("Decoded '{url}': {asset:?}");
                on_loaded(&url, asset)
            }) {
                Ok(follow_ups) => {
                    for request in follow_ups {
                        self.request(manager, request);
                    }
                    log::info!("Loaded '{url}'");
                    manager.item_end(&url);
                }
                Err(e) => {
                    let e = match e {
                        e @ Error::AssetLoadFailure { .. } => e,
                        other => Error::asset(url.clone(), other),
                    };
                    manager.item_error(&url, e.to_string());
                }
            }
        }
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::LoadEvent;
    use std::time::{Duration, Instant};

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("reveal-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    const TRIANGLE_STL: &str = "solid t
facet normal 0 0 1
outer loop
vertex 0 0 0
vertex 1 0 0
vertex 0 1 0
endloop
endfacet
endsolid t
";

    /// Poll until nothing is in flight, or give up after a few seconds.
    fn settle<F>(loader: &mut AssetLoader, manager: &mut LoadingManager, mut on_loaded: F)
    where
        F: FnMut(&str, LoadedAsset) -> Result<Vec<AssetRequest>>,
    {
        let deadline = Instant::now() + Duration::from_secs(10);
        while loader.in_flight() > 0 && Instant::now() < deadline {
            loader.poll(manager, &mut on_loaded);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(loader.in_flight(), 0, "loads did not finish in time");
    }

    #[test]
    fn url_is_the_path() {
        let r = AssetRequest::new(AssetKind::Model, "assets/models/helmet.glb");
        assert_eq!(r.url(), "assets/models/helmet.glb");
    }

    #[test]
    fn unknown_model_extension_is_rejected() {
        let path = temp_file("mesh.fbx", "");
        assert!(matches!(
            decode(AssetKind::Model, &path),
            Err(Error::UnknownFormat(_))
        ));
    }

    #[test]
    fn missing_file_settles_as_failure() {
        let mut manager = LoadingManager::new();
        let mut loader = AssetLoader::new();
        loader.request(
            &mut manager,
            AssetRequest::new(AssetKind::NormalMap, "/definitely/not/here.png"),
        );
        manager.seal();
        settle(&mut loader, &mut manager, |_, _| {
            panic!("a missing file never reaches the handler")
        });

        let events: Vec<LoadEvent> = manager.drain_events().collect();
        assert!(matches!(events[0], LoadEvent::Error { .. }));
        assert!(matches!(
            events[1],
            LoadEvent::Progress {
                loaded: 1,
                total: 1,
                ..
            }
        ));
        assert_eq!(events[2], LoadEvent::AllLoaded);
    }

    #[test]
    fn chained_load_keeps_the_session_open() {
        let first = temp_file("first.stl", TRIANGLE_STL);
        let second = temp_file("second.stl", TRIANGLE_STL);

        let mut manager = LoadingManager::new();
        let mut loader = AssetLoader::new();
        loader.request(&mut manager, AssetRequest::new(AssetKind::Model, &first));
        manager.seal();

        let first_url = first.display().to_string();
        let mut chained = false;
        settle(&mut loader, &mut manager, |url, asset| {
            assert!(matches!(asset, LoadedAsset::Model(_)));
            if url == first_url && !chained {
                chained = true;
                return Ok(vec![AssetRequest::new(AssetKind::Model, &second)]);
            }
            Ok(Vec::new())
        });

        let events: Vec<LoadEvent> = manager.drain_events().collect();
        assert_eq!(
            events[0],
            LoadEvent::Progress {
                url: first_url,
                loaded: 1,
                total: 2,
            }
        );
        assert!(matches!(
            events[1],
            LoadEvent::Progress {
                loaded: 2,
                total: 2,
                ..
            }
        ));
        assert_eq!(events[2], LoadEvent::AllLoaded);
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn panicking_decoder_still_settles() {
        fn explode(_: AssetKind, _: &Path) -> Result<LoadedAsset> {
            panic!("corrupt header");
        }

        let mut manager = LoadingManager::new();
        let mut loader = AssetLoader::new();
        loader.spawn(
            &mut manager,
            AssetRequest::new(AssetKind::Environment, "sky.hdr"),
            explode,
        );
        manager.seal();
        settle(&mut loader, &mut manager, |_, _| {
            panic!("a panicked decode never reaches the handler")
        });

        let events: Vec<LoadEvent> = manager.drain_events().collect();
        match &events[0] {
            LoadEvent::Error { url, message } => {
                assert_eq!(url, "sky.hdr");
                assert!(message.contains("decoder panicked"));
            }
            other => panic!("expected an error event, got {other:?}"),
        }
        assert_eq!(
            events[1],
            LoadEvent::Progress {
                url: "sky.hdr".to_string(),
                loaded: 1,
                total: 1,
            }
        );
        assert_eq!(events[2], LoadEvent::AllLoaded);
    }

    #[test]
    fn handler_error_counts_as_failure() {
        let path = temp_file("rejected.stl", TRIANGLE_STL);
        let mut manager = LoadingManager::new();
        let mut loader = AssetLoader::new();
        loader.request(&mut manager, AssetRequest::new(AssetKind::Model, &path));
        manager.seal();
        settle(&mut loader, &mut manager, |_, _| {
            Err(Error::Font("upload rejected".into()))
        });

        let events: Vec<LoadEvent> = manager.drain_events().collect();
        match &events[0] {
            LoadEvent::Error { message, .. } => assert!(message.contains("upload rejected")),
            other => panic!("expected an error event, got {other:?}"),
        }
        assert_eq!(events.last(), Some(&LoadEvent::AllLoaded));
    }
}
