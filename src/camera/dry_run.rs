//! Camera that logs every command instead of talking to hardware.
//!
//! Keeps a simulated position so presets and the settle poll behave like a real
//! camera that arrives instantly.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{CameraError, PositionSnapshot, PtzCamera};
use crate::config::CameraConfig;

#[derive(Debug)]
pub struct DryRunCamera {
    address: String,
    position: PositionSnapshot,
    presets: HashMap<String, PositionSnapshot>,
    auto_focus: bool,
}

impl DryRunCamera {
    pub fn connect(config: &CameraConfig) -> Result<Self, CameraError> {
        if config.address.trim().is_empty() {
            return Err(CameraError::Unreachable {
                address: config.address.clone(),
                reason: "no camera address configured".to_string(),
            });
        }

        info!(
            "Dry-run camera bound to {} as user '{}'",
            config.address, config.user
        );
        Ok(Self {
            address: config.address.clone(),
            position: PositionSnapshot::default(),
            presets: HashMap::new(),
            auto_focus: true,
        })
    }

    pub fn auto_focus(&self) -> bool {
        self.auto_focus
    }
}

impl PtzCamera for DryRunCamera {
    fn continuous_move(&mut self, pan: i32, tilt: i32, zoom: i32) -> Result<(), CameraError> {
        info!(
            "[{}] continuous move pan={} tilt={} zoom={}",
            self.address, pan, tilt, zoom
        );
        self.position.pan = (self.position.pan + f64::from(pan) / 100.0).clamp(-180.0, 180.0);
        self.position.tilt = (self.position.tilt + f64::from(tilt) / 100.0).clamp(-90.0, 90.0);
        self.position.zoom = (self.position.zoom + f64::from(zoom) / 100.0).clamp(0.0, 100.0);
        Ok(())
    }

    fn stop_move(&mut self) -> Result<(), CameraError> {
        info!("[{}] stop move", self.address);
        Ok(())
    }

    fn continuous_focus(&mut self, value: i32) -> Result<(), CameraError> {
        info!("[{}] continuous focus {}", self.address, value);
        Ok(())
    }

    fn set_auto_focus(&mut self, enabled: bool) -> Result<(), CameraError> {
        info!(
            "[{}] auto focus {}",
            self.address,
            if enabled { "on" } else { "off" }
        );
        self.auto_focus = enabled;
        Ok(())
    }

    fn stop_focus(&mut self) -> Result<(), CameraError> {
        info!("[{}] stop focus", self.address);
        Ok(())
    }

    fn go_home_position(&mut self, speed: u32) -> Result<(), CameraError> {
        info!("[{}] go home at speed {}", self.address, speed);
        self.position = PositionSnapshot::default();
        Ok(())
    }

    fn go_to_preset(&mut self, name: &str, speed: u32) -> Result<(), CameraError> {
        info!("[{}] go to preset '{}' at speed {}", self.address, name, speed);
        match self.presets.get(name) {
            Some(position) => self.position = *position,
            None => warn!("[{}] preset '{}' is not stored", self.address, name),
        }
        Ok(())
    }

    fn set_preset(&mut self, name: &str) -> Result<(), CameraError> {
        info!("[{}] store preset '{}' at {:?}", self.address, name, self.position);
        self.presets.insert(name.to_string(), self.position);
        Ok(())
    }

    fn get_position(&mut self) -> Result<PositionSnapshot, CameraError> {
        debug!("[{}] position {:?}", self.address, self.position);
        Ok(self.position)
    }
}
