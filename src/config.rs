use crate::scene::{Environment, LightKind, Rgb};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "lightbench.json";

const MIN_SHADOW_MAP: u32 = 256;
const MAX_SHADOW_MAP: u32 = 8192;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [3.0, 3.0, 3.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_title: String,
    pub window_size: [u32; 2],
    /// Light kind selected at startup, by key (`"spot"`).
    pub initial_light: String,
    pub clear_color: Rgb,
    pub shadow_map_size: u32,
    pub camera: CameraConfig,
    pub environment: Environment,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_title: "lightbench".to_string(),
            window_size: [1280, 720],
            initial_light: LightKind::default().key().to_string(),
            clear_color: Rgb::from_hex(0x000000),
            shadow_map_size: 2048,
            camera: CameraConfig::default(),
            environment: Environment::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: ViewerConfig = serde_json::from_str(json)?;
        config.sanitize();
        Ok(config)
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Self::from_json(&json).map(Some)
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(Some(config)) => {
                log::info!("Loaded viewer config from {}", path.display());
                config
            }
            Ok(None) => {
                log::debug!("No {} found, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                log::warn!("Ignoring {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    fn sanitize(&mut self) {
        self.window_size = self.window_size.map(|extent| extent.max(64));
        self.shadow_map_size = self
            .shadow_map_size
            .clamp(MIN_SHADOW_MAP, MAX_SHADOW_MAP)
            .next_power_of_two()
            .min(MAX_SHADOW_MAP);
        let camera = &mut self.camera;
        camera.fov_deg = camera.fov_deg.clamp(10.0, 150.0);
        camera.near = camera.near.max(1e-3);
        camera.far = camera.far.max(camera.near * 2.0);
        self.environment.sanitize();
    }
}
