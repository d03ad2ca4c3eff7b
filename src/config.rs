//! Startup configuration: an optional JSON file overridden by CLI flags.
//!
//! Every section falls back to its defaults field by field, so a config file
//! only needs to name what it changes:
//!
//! ```json
//! { "reveal": { "overlay_fade_secs": 1.5 }, "scene": { "light": { "intensity": 2.0 } } }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::effects::{PostParams, ToneMappingParams};
use crate::environment::EnvironmentParams;
use crate::error::{Error, Result};
use crate::light::LightParams;
use crate::loading::{Easing, ProgressBarStyle, RevealTiming};
use crate::mesh_pass::RendererParams;
use crate::overlay::OverlayParams;
use crate::scene::ModelParams;

/// Top-level configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub assets: AssetPaths,
    pub reveal: RevealConfig,
    pub scene: SceneParameters,
    pub panel: PanelConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "reveal".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Where each asset of the scene is read from.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub environment: PathBuf,
    pub model: PathBuf,
    pub normal_map: PathBuf,
    pub font: PathBuf,
    pub font_size: f32,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            environment: PathBuf::from("assets/textures/environmentMaps/underpass/2k.hdr"),
            model: PathBuf::from("assets/models/cyber_helmet/cyber_helmet.glb"),
            normal_map: PathBuf::from("assets/textures/interfaceNormalMap.png"),
            font: PathBuf::from("assets/fonts/ui.ttf"),
            font_size: 14.0,
        }
    }
}

/// Timing of the loading bar and the reveal fade, in seconds.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Duration of each bar fill transition. The bar is ended this long after
    /// the last load settles.
    pub bar_transition_secs: f32,
    pub bar_exit_secs: f32,
    pub overlay_fade_secs: f32,
    pub overlay_easing: Easing,
    pub bar_easing: Easing,
    pub bar_thickness: f32,
}

impl Default for RevealConfig {
    fn default() -> Self {
        let bar = ProgressBarStyle::default();
        let timing = RevealTiming::default();
        Self {
            bar_transition_secs: bar.transition.as_secs_f32(),
            bar_exit_secs: bar.exit.as_secs_f32(),
            overlay_fade_secs: timing.overlay_fade.as_secs_f32(),
            overlay_easing: timing.overlay_easing,
            bar_easing: bar.easing,
            bar_thickness: bar.thickness,
        }
    }
}

impl RevealConfig {
    pub fn bar_style(&self) -> Result<ProgressBarStyle> {
        Ok(ProgressBarStyle {
            transition: secs("bar_transition_secs", self.bar_transition_secs)?,
            easing: self.bar_easing,
            exit: secs("bar_exit_secs", self.bar_exit_secs)?,
            thickness: self.bar_thickness.max(0.0),
            ..ProgressBarStyle::default()
        })
    }

    /// Reveal timing. The grace delay always equals the bar transition.
    pub fn timing(&self) -> Result<RevealTiming> {
        Ok(RevealTiming {
            bar_grace_delay: secs("bar_transition_secs", self.bar_transition_secs)?,
            overlay_fade: secs("overlay_fade_secs", self.overlay_fade_secs)?,
            overlay_easing: self.overlay_easing,
        })
    }
}

/// Every tunable of the scene, one slice per subsystem.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SceneParameters {
    pub renderer: RendererParams,
    pub tone_mapping: ToneMappingParams,
    pub environment: EnvironmentParams,
    pub model: ModelParams,
    pub light: LightParams,
    pub post: PostParams,
    pub overlay: OverlayParams,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub title: String,
    pub width: f32,
    pub visible: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            title: "Tweak It".to_string(),
            width: 340.0,
            visible: true,
        }
    }
}

/// Flags accepted on the command line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub size: Option<(u32, u32)>,
    pub model: Option<PathBuf>,
    pub env: Option<PathBuf>,
}

impl CliArgs {
    /// Parse flags, excluding the program name.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = CliArgs::default();
        for arg in args {
            let arg = arg.as_ref();
            if let Some(v) = arg.strip_prefix("--config=") {
                out.config = Some(PathBuf::from(v));
            } else if let Some(v) = arg.strip_prefix("--size=") {
                out.size = Some(parse_size(v)?);
            } else if let Some(v) = arg.strip_prefix("--model=") {
                out.model = Some(PathBuf::from(v));
            } else if let Some(v) = arg.strip_prefix("--env=") {
                out.env = Some(PathBuf::from(v));
            } else {
                return Err(Error::Args(format!("unknown flag '{arg}'")));
            }
        }
        Ok(out)
    }
}

impl Config {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.reveal.bar_style()?;
        config.reveal.timing()?;
        Ok(config)
    }

    /// Build the config from CLI flags: the file named by `--config` (or the
    /// defaults), then the individual overrides.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::load(path)?
            }
            None => Self::default(),
        };
        config.apply_args(args);
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some((w, h)) = args.size {
            self.window.width = w;
            self.window.height = h;
        }
        if let Some(model) = &args.model {
            self.assets.model = model.clone();
        }
        if let Some(env) = &args.env {
            self.assets.environment = env.clone();
        }
    }
}

/// Seconds to a `Duration`. Negative values clamp to zero.
fn secs(field: &str, value: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(value.max(0.0))
        .map_err(|e| Error::ConfigValue(format!("reveal.{field} = {value}: {e}")))
}

fn parse_size(value: &str) -> Result<(u32, u32)> {
    let (w, h) = value
        .split_once('x')
        .or_else(|| value.split_once('X'))
        .ok_or_else(|| Error::Args(format!("size '{value}' is not WxH")))?;
    let parse = |s: &str| {
        s.parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| Error::Args(format!("size '{value}' is not WxH")))
    };
    Ok((parse(w)?, parse(h)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::ToneMappingMode;

    #[test]
    fn defaults_match_the_scene() {
        let c = Config::default();
        assert_eq!((c.window.width, c.window.height), (1280, 720));
        assert_eq!(c.panel.title, "Tweak It");
        assert_eq!(c.panel.width, 340.0);
        assert_eq!(c.scene.tone_mapping.mode, ToneMappingMode::Reinhard);
        assert_eq!(c.scene.tone_mapping.exposure, 3.0);
        assert_eq!(c.scene.light.position, [-4.0, 6.5, 2.5]);
        assert_eq!(c.scene.model.scale, 10.0);
        assert!(!c.scene.post.bloom.enabled);
        assert_eq!(c.scene.overlay.alpha, 1.0);
    }

    #[test]
    fn grace_delay_follows_bar_transition() {
        let json = r#"{ "reveal": { "bar_transition_secs": 0.25 } }"#;
        let c = Config::from_json(json).unwrap();
        let timing = c.reveal.timing().unwrap();
        assert_eq!(timing.bar_grace_delay, Duration::from_millis(250));
        assert_eq!(c.reveal.bar_style().unwrap().transition, Duration::from_millis(250));
        assert_eq!(timing.overlay_fade, Duration::from_secs(3));
    }

    #[test]
    fn default_timing_is_half_second_grace_and_three_second_fade() {
        let timing = RevealConfig::default().timing().unwrap();
        assert_eq!(timing, RevealTiming::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let json = r#"{ "scene": { "light": { "intensity": 2.5 } }, "window": { "title": "demo" } }"#;
        let c = Config::from_json(json).unwrap();
        assert_eq!(c.scene.light.intensity, 2.5);
        assert_eq!(c.scene.light.target, [0.0, 2.0, 0.0]);
        assert_eq!(c.window.title, "demo");
        assert_eq!(c.window.width, 1280);
    }

    #[test]
    fn out_of_range_durations_are_rejected() {
        for json in [
            r#"{ "reveal": { "overlay_fade_secs": 1e39 } }"#,
            r#"{ "reveal": { "bar_transition_secs": 1e20 } }"#,
            r#"{ "reveal": { "bar_exit_secs": 1e30 } }"#,
        ] {
            let err = Config::from_json(json).unwrap_err();
            assert!(matches!(err, Error::ConfigValue(_)), "{json}: {err}");
        }

        let reveal = RevealConfig {
            overlay_fade_secs: f32::INFINITY,
            ..RevealConfig::default()
        };
        assert!(matches!(reveal.timing(), Err(Error::ConfigValue(_))));
        assert!(reveal.bar_style().is_ok());
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        let c = Config::from_json(r#"{ "reveal": { "overlay_fade_secs": -2.0 } }"#).unwrap();
        assert_eq!(c.reveal.timing().unwrap().overlay_fade, Duration::ZERO);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = Config::from_json("{ nope").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn cli_flags_override() {
        let args = CliArgs::parse(["--size=800x600", "--model=a.stl", "--env=b.hdr"]).unwrap();
        assert_eq!(args.size, Some((800, 600)));

        let c = Config::from_args(&args).unwrap();
        assert_eq!((c.window.width, c.window.height), (800, 600));
        assert_eq!(c.assets.model, PathBuf::from("a.stl"));
        assert_eq!(c.assets.environment, PathBuf::from("b.hdr"));
    }

    #[test]
    fn bad_flags_are_rejected() {
        assert!(matches!(CliArgs::parse(["--size=big"]), Err(Error::Args(_))));
        assert!(matches!(CliArgs::parse(["--size=0x10"]), Err(Error::Args(_))));
        assert!(matches!(CliArgs::parse(["--fast"]), Err(Error::Args(_))));
        assert_eq!(CliArgs::parse(Vec::<String>::new()).unwrap(), CliArgs::default());
    }
}
