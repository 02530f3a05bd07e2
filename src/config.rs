//! TOML configuration for the controller
//!
//! Missing sections and fields fall back to the stock joystick/camera setup, so an
//! empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::camera::SettlePolicy;
use crate::controller::axis::{AxisConfig, AxisMapper, DEFAULT_PAN, DEFAULT_TILT, DEFAULT_ZOOM};
use crate::controller::buttons::{default_layout, ButtonBinding, ButtonId};
use crate::controller::controller_handle::ControllerSettings;
use crate::controller::device::DeviceSettings;
use crate::controller::input_poller::PollerSettings;
use crate::mapping::DispatchSettings;

/// Environment variable overriding the configuration file location
pub const CONFIG_PATH_ENV: &str = "PTZ_CONTROLLER_CONFIG";

// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Button {0} declares itself as its own modifier")]
    SelfModifier(ButtonId),

    #[error("Button {0} is declared more than once")]
    DuplicateButton(ButtonId),

    #[error("Button {button} declares modifier {modifier}, which is not part of the layout")]
    UnknownModifier { button: ButtonId, modifier: ButtonId },

    #[error("Focus modifier {0} is not part of the button layout")]
    UnknownFocusModifier(ButtonId),

    #[error("Axis {axis} has an empty range {min}..={max}")]
    EmptyAxisRange { axis: &'static str, min: u8, max: u8 },

    #[error("Axis {axis} deadzone {deadzone} is outside [0, 1)")]
    InvalidDeadzone { axis: &'static str, deadzone: f32 },

    #[error("Hold time must be a positive number of seconds, got {0}")]
    InvalidHoldTime(f64),

    #[error("Device read timeout must be at least 1 ms")]
    ZeroReadTimeout,

    #[error("Failed to access configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No configuration directory available on this system")]
    NoConfigDir,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub controller: ControllerConfig,
    pub axes: AxesConfig,
    pub camera: CameraConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// HID interface to open when the joystick exposes several
    pub interface: Option<i32>,
    pub read_timeout_ms: u32,
    pub reconnect_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x07C0,
            product_id: 0x1131,
            interface: None,
            read_timeout_ms: 100,
            reconnect_delay_ms: 1000,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub hold_time_secs: f64,
    pub focus_modifier: ButtonId,
    pub buttons: Vec<ButtonBinding>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            hold_time_secs: 2.0,
            focus_modifier: ButtonId::L,
            buttons: default_layout(),
        }
    }
}

/// Axis calibration; fields missing from a `[axes.*]` table keep that axis' defaults
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(from = "AxesOverride")]
pub struct AxesConfig {
    pub pan: AxisConfig,
    pub tilt: AxisConfig,
    pub zoom: AxisConfig,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            pan: DEFAULT_PAN,
            tilt: DEFAULT_TILT,
            zoom: DEFAULT_ZOOM,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AxisOverride {
    min: Option<u8>,
    max: Option<u8>,
    deadzone: Option<f32>,
    invert: Option<bool>,
}

impl AxisOverride {
    fn apply(self, base: AxisConfig) -> AxisConfig {
        AxisConfig {
            min: self.min.unwrap_or(base.min),
            max: self.max.unwrap_or(base.max),
            deadzone: self.deadzone.unwrap_or(base.deadzone),
            invert: self.invert.unwrap_or(base.invert),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AxesOverride {
    pan: AxisOverride,
    tilt: AxisOverride,
    zoom: AxisOverride,
}

impl From<AxesOverride> for AxesConfig {
    fn from(axes: AxesOverride) -> Self {
        Self {
            pan: axes.pan.apply(DEFAULT_PAN),
            tilt: axes.tilt.apply(DEFAULT_TILT),
            zoom: axes.zoom.apply(DEFAULT_ZOOM),
        }
    }
}

/// Camera address and credentials, passed through to the camera implementation
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub address: String,
    pub user: String,
    pub password: String,
    pub settle_interval_ms: u64,
    pub settle_max_polls: Option<u32>,
    pub preset_speed: u32,
    pub home_speed: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            address: "192.168.1.2".to_string(),
            user: "root".to_string(),
            password: String::new(),
            settle_interval_ms: 100,
            settle_max_polls: None,
            preset_speed: 50,
            home_speed: 100,
        }
    }
}

impl Config {
    /// `$PTZ_CONTROLLER_CONFIG`, or `<config dir>/ptz-controller/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join("ptz-controller").join("config.toml"))
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Writes the default configuration if nothing exists at `path` yet.
    pub fn ensure_default(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }

        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = toml::to_string_pretty(&Config::default())?;
        fs::write(path, content).map_err(io_error)?;
        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    pub fn load_or_create() -> Result<(Self, PathBuf), ConfigError> {
        let path = Self::default_path()?;
        Self::ensure_default(&path)?;
        let config = Self::load(&path)?;
        Ok((config, path))
    }

    /// Validates the configuration and converts it into runtime settings.
    pub fn controller_settings(&self) -> Result<ControllerSettings, ConfigError> {
        let hold_time_secs = self.controller.hold_time_secs;
        let hold_threshold = Duration::try_from_secs_f64(hold_time_secs)
            .ok()
            .filter(|duration| !duration.is_zero())
            .ok_or(ConfigError::InvalidHoldTime(hold_time_secs))?;

        if self.device.read_timeout_ms == 0 {
            return Err(ConfigError::ZeroReadTimeout);
        }

        let poller = PollerSettings {
            layout: self.controller.buttons.clone(),
            hold_threshold,
            focus_modifier: self.controller.focus_modifier,
            axes: AxisMapper::new(self.axes.pan, self.axes.tilt, self.axes.zoom)?,
        };
        poller.validate()?;

        Ok(ControllerSettings {
            device: DeviceSettings {
                vendor_id: self.device.vendor_id,
                product_id: self.device.product_id,
                interface: self.device.interface,
                read_timeout_ms: i32::try_from(self.device.read_timeout_ms).unwrap_or(i32::MAX),
            },
            poller,
            dispatch: DispatchSettings {
                preset_speed: self.camera.preset_speed,
                home_speed: self.camera.home_speed,
                settle: SettlePolicy {
                    interval: Duration::from_millis(self.camera.settle_interval_ms),
                    max_polls: self.camera.settle_max_polls,
                },
            },
            camera: self.camera.clone(),
            reconnect_delay: Duration::from_millis(self.device.reconnect_delay_ms),
        })
    }
}
