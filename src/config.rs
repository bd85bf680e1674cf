use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::error::{ApiError, ApiResult};

/// Hard limit on configured lights, matching the original panel firmware.
pub const MAX_LIGHTS: usize = 16;

/// Maximum label length shown on a tile.
pub const MAX_LABEL_LEN: usize = 31;

/// A single controllable light, as configured by the web editor.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct LightEntry {
    pub entity_id: String,
    pub label: String,
    #[serde(default = "default_icon")]
    pub icon: String,
}

fn default_icon() -> String {
    "bulb".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct HassConfig {
    /// Home Assistant base URL, e.g. `http://192.168.1.100:8123`.
    #[serde(default)]
    pub url: String,
    /// Long-lived access token.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

const fn default_poll_interval_ms() -> u64 {
    5000
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
}

const fn default_web_port() -> u16 {
    8080
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            password: String::new(),
        }
    }
}

/// Panel geometry. The grid math is generic over columns × rows, so a
/// different panel only needs different values here.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_columns")]
    pub columns: u32,
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_fb_device")]
    pub fb_device: String,
    #[serde(default = "default_touch_device")]
    pub touch_device: String,
    /// Raw touch axis range reported by the controller (XPT2046: 0..4095).
    #[serde(default = "default_touch_raw_max")]
    pub touch_raw_max: u32,
}

const fn default_width() -> u32 {
    480
}

const fn default_height() -> u32 {
    320
}

const fn default_columns() -> u32 {
    2
}

const fn default_rows() -> u32 {
    2
}

fn default_fb_device() -> String {
    "/dev/fb0".to_string()
}

fn default_touch_device() -> String {
    "/dev/input/event0".to_string()
}

const fn default_touch_raw_max() -> u32 {
    4095
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            columns: default_columns(),
            rows: default_rows(),
            fb_device: default_fb_device(),
            touch_device: default_touch_device(),
            touch_raw_max: default_touch_raw_max(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub hass: HassConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub lights: Vec<LightEntry>,
}

/// Shared, mutable configuration handle. The web server replaces the
/// contents on save; everyone else takes snapshots under the lock.
pub type SharedConfig = Arc<Mutex<AppConfig>>;

impl AppConfig {
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.hass.url.trim().is_empty() && !self.hass.token.trim().is_empty()
    }

    #[must_use]
    pub fn entity_ids(&self) -> Vec<String> {
        self.lights.iter().map(|l| l.entity_id.clone()).collect()
    }
}

/// Entity ids have the form `<domain>.<name>`, both segments non-empty
/// and limited to `[A-Za-z0-9_]`.
#[must_use]
pub fn valid_entity_id(entity_id: &str) -> bool {
    let Some((domain, name)) = entity_id.split_once('.') else {
        return false;
    };
    let valid_segment =
        |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid_segment(domain) && valid_segment(name)
}

/// Validate everything the core is allowed to assume about a config.
///
/// Malformed entries are rejected here, at the boundary, so the tile
/// grid never sees an invalid `LightEntry`.
pub fn validate(config: &AppConfig) -> ApiResult<()> {
    if config.lights.len() > MAX_LIGHTS {
        return Err(ApiError::invalid_config(format!(
            "Too many lights: {} (maximum {MAX_LIGHTS})",
            config.lights.len()
        )));
    }

    for (index, light) in config.lights.iter().enumerate() {
        if !valid_entity_id(&light.entity_id) {
            return Err(ApiError::invalid_config(format!(
                "Light {index}: invalid entity_id {:?}",
                light.entity_id
            )));
        }
        if light.label.is_empty() || light.label.chars().count() > MAX_LABEL_LEN {
            return Err(ApiError::invalid_config(format!(
                "Light {index}: label must be 1..={MAX_LABEL_LEN} characters"
            )));
        }
    }

    if !config.hass.url.trim().is_empty() {
        Url::parse(config.hass.url.trim())?;
    }

    if config.display.columns == 0 || config.display.rows == 0 {
        return Err(ApiError::invalid_config(
            "display.columns and display.rows must be at least 1",
        ));
    }

    Ok(())
}

pub fn parse(path: &Path) -> ApiResult<AppConfig> {
    let contents = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&contents)?;
    validate(&config)?;
    Ok(config)
}

/// Save the configuration as JSON, preserving light order.
pub fn save(path: &Path, config: &AppConfig) -> ApiResult<()> {
    let mut contents = serde_json::to_string_pretty(config)?;
    contents.push('\n');
    fs::write(path, contents)?;
    Ok(())
}
