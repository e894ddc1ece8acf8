use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::frame::gbuffer::DisplayMode;
use crate::scene_pkg::camera::ProjectionKind;
use crate::scene_pkg::fog::Fog;

pub const DEFAULT_SETTINGS_FILE: &str = "puffscene.toml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Forward,
    #[default]
    Deferred,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        WindowSettings {
            title: String::from("puffscene"),
            width: 1000,
            height: 800,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub pipeline: PipelineKind,
    pub clear_color: [f32; 4],
    pub display_mode: DisplayMode,
}

impl Default for RendererSettings {
    fn default() -> Self {
        RendererSettings {
            pipeline: PipelineKind::Deferred,
            clear_color: [0.2, 0.3, 0.3, 1.0],
            display_mode: DisplayMode::Combined,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: [f32; 3],
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub fov: f32,
    pub projection: ProjectionKind,
    pub ortho_height: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            position: [0.0, 0.0, 6.0],
            movement_speed: 2.5,
            mouse_sensitivity: 0.1,
            fov: 45.0,
            projection: ProjectionKind::Perspective,
            ortho_height: 10.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// OBJ model placed next to the primitives; skipped when unset.
    pub model_path: Option<PathBuf>,
    /// Extra point lights scattered over the floor.
    pub point_lights: usize,
    pub seed: u64,
}

impl Default for SceneSettings {
    fn default() -> Self {
        SceneSettings {
            model_path: None,
            point_lights: 6,
            seed: 7,
        }
    }
}

/// Contents of `puffscene.toml`. Every section and key is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub renderer: RendererSettings,
    pub camera: CameraSettings,
    pub fog: Fog,
    pub scene: SceneSettings,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Settings> {
        toml::from_str(text).context("invalid settings")
    }

    /// Reads `path`, or returns the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Settings> {
        if !path.exists() {
            log::info!("no '{}' found, using default settings", path.display());
            return Ok(Settings::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let settings = toml::from_str(&text)
            .with_context(|| format!("failed to parse TOML from '{}'", path.display()))?;
        log::info!("loaded settings from '{}'", path.display());
        Ok(settings)
    }

    /// First command-line argument, falling back to `puffscene.toml`.
    pub fn path_from_args(mut args: impl Iterator<Item = String>) -> PathBuf {
        args.nth(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }
}
