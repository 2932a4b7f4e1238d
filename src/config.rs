use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TARGET_LABEL};
use crate::location::ipinfo::DEFAULT_IPINFO_URL;
use crate::location::DEFAULT_LOCATION_TTL;
use crate::notify::{DEFAULT_ID_LENGTH, DEFAULT_NOTIFY_TIMEOUT, DEFAULT_QUEUE_CAPACITY};
use crate::roi::DEFAULT_MIN_ROI_SIZE;

pub const CONFIG_ENV: &str = "ROI_WATCH_CONFIG";

const DEFAULT_CAMERA_ID: &str = "camera_1";
const DEFAULT_CAMERA_URL: &str = "stub://camera_1";
const DEFAULT_FRAME_WIDTH: u32 = 1280;
const DEFAULT_FRAME_HEIGHT: u32 = 720;
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_DETECTOR: &str = "stub";
const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/notifications";
const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    camera: Option<CameraConfigFile>,
    detection: Option<DetectionConfigFile>,
    roi: Option<RoiConfigFile>,
    location: Option<LocationConfigFile>,
    notify: Option<NotifyConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    id: Option<String>,
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    labels: Option<Vec<String>>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct RoiConfigFile {
    min_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct LocationConfigFile {
    enabled: Option<bool>,
    url: Option<String>,
    ttl_secs: Option<u64>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct NotifyConfigFile {
    api_url: Option<String>,
    api_key: Option<String>,
    timeout_ms: Option<u64>,
    id_length: Option<usize>,
    background: Option<bool>,
    queue_capacity: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub camera: CameraSettings,
    pub detection: DetectionSettings,
    pub roi: RoiSettings,
    pub location: LocationSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub id: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub backend: String,
    /// Model identifier reported at startup. No built-in backend loads it;
    /// out-of-tree detectors registered with `BackendRegistry` may.
    pub model_path: PathBuf,
    pub labels: Vec<String>,
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct RoiSettings {
    pub min_size: u32,
}

#[derive(Debug, Clone)]
pub struct LocationSettings {
    pub enabled: bool,
    pub url: String,
    pub ttl: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub id_length: usize,
    pub background: bool,
    pub queue_capacity: usize,
}

impl AppConfig {
    /// Defaults, then the file named by `ROI_WATCH_CONFIG`, then environment
    /// overrides, then validation.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Like `load`, with an explicit config file path instead of the env var.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => AppConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let detection = file.detection.unwrap_or_default();
        let roi = file.roi.unwrap_or_default();
        let location = file.location.unwrap_or_default();
        let notify = file.notify.unwrap_or_default();

        Self {
            camera: CameraSettings {
                id: camera.id.unwrap_or_else(|| DEFAULT_CAMERA_ID.to_string()),
                url: camera.url.unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
                width: camera.width.unwrap_or(DEFAULT_FRAME_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_FRAME_HEIGHT),
                target_fps: camera.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
            },
            detection: DetectionSettings {
                backend: detection
                    .backend
                    .unwrap_or_else(|| DEFAULT_DETECTOR.to_string()),
                model_path: detection
                    .model_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                labels: detection
                    .labels
                    .unwrap_or_else(|| vec![DEFAULT_TARGET_LABEL.to_string()]),
                confidence_threshold: detection
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            },
            roi: RoiSettings {
                min_size: roi.min_size.unwrap_or(DEFAULT_MIN_ROI_SIZE),
            },
            location: LocationSettings {
                enabled: location.enabled.unwrap_or(true),
                url: location
                    .url
                    .unwrap_or_else(|| DEFAULT_IPINFO_URL.to_string()),
                ttl: location
                    .ttl_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_LOCATION_TTL),
                timeout: Duration::from_millis(
                    location.timeout_ms.unwrap_or(DEFAULT_LOCATION_TIMEOUT_MS),
                ),
            },
            notify: NotifySettings {
                api_url: notify
                    .api_url
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                api_key: notify.api_key.unwrap_or_default(),
                timeout: notify
                    .timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_NOTIFY_TIMEOUT),
                id_length: notify.id_length.unwrap_or(DEFAULT_ID_LENGTH),
                background: notify.background.unwrap_or(false),
                queue_capacity: notify.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = env_string("ROI_WATCH_API_URL") {
            self.notify.api_url = url;
        }
        if let Some(key) = env_string("ROI_WATCH_API_KEY") {
            self.notify.api_key = key;
        }
        if let Some(id) = env_string("ROI_WATCH_CAMERA_ID") {
            self.camera.id = id;
        }
        if let Some(url) = env_string("ROI_WATCH_CAMERA_URL") {
            self.camera.url = url;
        }
        if let Some(width) = env_string("ROI_WATCH_FRAME_WIDTH") {
            self.camera.width = width
                .parse()
                .map_err(|_| anyhow!("ROI_WATCH_FRAME_WIDTH must be an integer"))?;
        }
        if let Some(height) = env_string("ROI_WATCH_FRAME_HEIGHT") {
            self.camera.height = height
                .parse()
                .map_err(|_| anyhow!("ROI_WATCH_FRAME_HEIGHT must be an integer"))?;
        }
        if let Some(backend) = env_string("ROI_WATCH_DETECTOR") {
            self.detection.backend = backend;
        }
        if let Some(path) = env_string("ROI_WATCH_MODEL_PATH") {
            self.detection.model_path = PathBuf::from(path);
        }
        if let Ok(labels) = std::env::var("ROI_WATCH_LABELS") {
            let parsed = split_csv(&labels);
            if !parsed.is_empty() {
                self.detection.labels = parsed;
            }
        }
        if let Some(confidence) = env_string("ROI_WATCH_CONFIDENCE") {
            self.detection.confidence_threshold = confidence
                .parse()
                .map_err(|_| anyhow!("ROI_WATCH_CONFIDENCE must be a number"))?;
        }
        if let Some(ttl) = env_string("ROI_WATCH_LOCATION_TTL_SECS") {
            let seconds: u64 = ttl.parse().map_err(|_| {
                anyhow!("ROI_WATCH_LOCATION_TTL_SECS must be an integer number of seconds")
            })?;
            self.location.ttl = Duration::from_secs(seconds);
        }
        if let Some(url) = env_string("ROI_WATCH_LOCATION_URL") {
            self.location.url = url;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let threshold = self.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "confidence threshold must be within [0, 1], got {}",
                threshold
            ));
        }

        self.detection.labels = self
            .detection
            .labels
            .iter()
            .map(|label| label.trim().to_lowercase())
            .filter(|label| !label.is_empty())
            .collect();
        if self.detection.labels.is_empty() {
            return Err(anyhow!("at least one target label is required"));
        }

        if self.roi.min_size == 0 {
            return Err(anyhow!("roi min_size must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!(
                "frame size must be non-zero, got {}x{}",
                self.camera.width,
                self.camera.height
            ));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("target_fps must be greater than zero"));
        }
        if self.camera.id.trim().is_empty() {
            return Err(anyhow!("camera id must not be empty"));
        }
        if self.notify.id_length == 0 {
            return Err(anyhow!("notification id_length must be greater than zero"));
        }

        validate_http_url("notification api_url", &self.notify.api_url)?;
        if self.location.enabled {
            validate_http_url("location url", &self.location.url)?;
        }
        Ok(())
    }
}

fn validate_http_url(what: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value).with_context(|| format!("invalid {what} '{value}'"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!(
            "{what} must use http or https, got '{}' in '{}'",
            other,
            value
        )),
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_drops_blanks() {
        assert_eq!(split_csv(" person, ,dog ,"), vec!["person", "dog"]);
    }

    #[test]
    fn http_url_validation() {
        assert!(validate_http_url("x", "https://example.com/hook").is_ok());
        assert!(validate_http_url("x", "ftp://example.com").is_err());
        assert!(validate_http_url("x", "not a url").is_err());
    }

    #[test]
    fn defaults_pass_validation() {
        let mut cfg = AppConfig::from_file(AppConfigFile::default());
        cfg.validate().unwrap();
        assert_eq!(cfg.camera.url, DEFAULT_CAMERA_URL);
        assert_eq!(cfg.detection.labels, vec!["person"]);
        assert_eq!(cfg.notify.timeout, Duration::from_secs(5));
    }
}
