//! Error types for reveal.

use thiserror::Error;

/// The main error type for reveal operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading an asset or config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An image could not be decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// A glTF document could not be imported.
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    /// An STL file could not be parsed.
    #[error("STL parse error: {0}")]
    Stl(String),

    /// The file extension does not map to a known loader.
    #[error("unknown asset format: '{0}'")]
    UnknownFormat(String),

    /// The config file is not valid JSON for [`Config`](crate::Config).
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// A config value parses but cannot be used.
    #[error("invalid config value: {0}")]
    ConfigValue(String),

    /// A command-line flag is unknown or malformed.
    #[error("invalid argument: {0}")]
    Args(String),

    /// A font could not be parsed.
    #[error("font error: {0}")]
    Font(String),

    /// The window surface could not be created.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    /// No GPU adapter is compatible with the window surface.
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    /// The logical device could not be created.
    #[error("device error: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// The window or event loop could not be created.
    #[error("window error: {0}")]
    Window(String),

    /// A named asset failed to fetch or parse.
    #[error("failed to load '{url}': {reason}")]
    AssetLoadFailure { url: String, reason: String },
}

impl Error {
    /// Wraps any error as an [`Error::AssetLoadFailure`] for the given asset.
    pub fn asset(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::AssetLoadFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// A specialized Result type for reveal operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_failure_names_the_url() {
        let err = Error::asset("/models/helmet.glb", "unexpected end of file");
        assert_eq!(
            err.to_string(),
            "failed to load '/models/helmet.glb': unexpected end of file"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
