use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::render::{SURFACE_HEIGHT, SURFACE_WIDTH};

const DEFAULT_STREAM_URL: &str = "http://localhost:8000/detections/stream";

#[derive(Debug, Deserialize, Default)]
struct ViewerConfigFile {
    stream: Option<StreamConfigFile>,
    surface: Option<SurfaceConfigFile>,
    snapshot: Option<SnapshotConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SurfaceConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SnapshotConfigFile {
    path: Option<PathBuf>,
    every_frame: Option<bool>,
}

/// Host-side settings for the viewer binary.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub stream_url: String,
    pub surface_width: u32,
    pub surface_height: u32,
    pub snapshot: SnapshotSettings,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotSettings {
    /// PNG written at exit (and after every frame if `every_frame`).
    pub path: Option<PathBuf>,
    pub every_frame: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            stream_url: DEFAULT_STREAM_URL.to_string(),
            surface_width: SURFACE_WIDTH,
            surface_height: SURFACE_HEIGHT,
            snapshot: SnapshotSettings::default(),
        }
    }
}

impl ViewerConfig {
    /// Defaults, then the JSON file named by `OVERLAY_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OVERLAY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ViewerConfigFile) -> Self {
        let defaults = Self::default();
        let surface = file.surface.unwrap_or_default();
        let snapshot = file.snapshot.unwrap_or_default();
        Self {
            stream_url: file
                .stream
                .and_then(|stream| stream.url)
                .unwrap_or(defaults.stream_url),
            surface_width: surface.width.unwrap_or(defaults.surface_width),
            surface_height: surface.height.unwrap_or(defaults.surface_height),
            snapshot: SnapshotSettings {
                path: snapshot.path,
                every_frame: snapshot.every_frame.unwrap_or(false),
            },
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("OVERLAY_STREAM_URL") {
            if !url.trim().is_empty() {
                self.stream_url = url;
            }
        }
        if let Ok(path) = std::env::var("OVERLAY_SNAPSHOT_PATH") {
            if !path.trim().is_empty() {
                self.snapshot.path = Some(PathBuf::from(path));
            }
        }
    }

    /// Check the settings; also used after CLI overrides are applied.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.stream_url)
            .map_err(|e| anyhow!("invalid stream url {}: {}", self.stream_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "stream url must be http(s), got '{}'",
                url.scheme()
            ));
        }
        if self.surface_width == 0 || self.surface_height == 0 {
            return Err(anyhow!("surface size must be non-zero"));
        }
        if self.snapshot.every_frame && self.snapshot.path.is_none() {
            return Err(anyhow!("snapshot.every_frame requires snapshot.path"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ViewerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
