use hidapi::{HidApi, HidDevice};
use statum::{machine, state};
use tracing::{debug, error, info, warn};

use crate::controller::buttons::ButtonMask;

/// Bytes in one joystick report: pan, tilt, zoom, button mask
pub const REPORT_LEN: usize = 4;

// One raw joystick report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawReport {
    pub pan: u8,
    pub tilt: u8,
    pub zoom: u8,
    pub buttons: ButtonMask,
}

impl RawReport {
    /// Parses a report; trailing bytes beyond the fourth are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self, DeviceError> {
        match bytes {
            [pan, tilt, zoom, buttons, ..] => Ok(Self {
                pan: *pan,
                tilt: *tilt,
                zoom: *zoom,
                buttons: ButtonMask::from_bits(*buttons),
            }),
            _ => Err(DeviceError::ShortReport {
                expected: REPORT_LEN,
                actual: bytes.len(),
            }),
        }
    }
}

// Device errors
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Input device {vendor_id:04x}:{product_id:04x} unavailable: {reason}")]
    Unavailable {
        vendor_id: u16,
        product_id: u16,
        reason: String,
    },

    #[error("Failed to read from input device: {0}")]
    ReadError(String),

    #[error("Short report from input device: expected {expected} bytes, got {actual}")]
    ShortReport { expected: usize, actual: usize },
}

/// Source of raw joystick reports
pub trait ReportSource {
    /// Blocks for at most the device read timeout; `Ok(None)` means nothing arrived.
    fn read_report(&mut self) -> Result<Option<RawReport>, DeviceError>;
}

#[derive(Clone, Debug)]
pub struct DeviceSettings {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: Option<i32>,
    pub read_timeout_ms: i32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: 0x07C0,
            product_id: 0x1131,
            interface: None,
            read_timeout_ms: 100,
        }
    }
}

impl DeviceSettings {
    fn unavailable(&self, reason: impl ToString) -> DeviceError {
        DeviceError::Unavailable {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            reason: reason.to_string(),
        }
    }
}

// Reader lifecycle
#[state]
#[derive(Debug, Clone)]
pub enum ReaderState {
    Initializing,
    Reading,
}

#[machine]
pub struct HidJoystick<S: ReaderState> {
    // hidapi context
    api: HidApi,

    // Opened device, set once Reading
    device: Option<HidDevice>,

    settings: DeviceSettings,
}

impl HidJoystick<Initializing> {
    pub fn create(settings: DeviceSettings) -> Result<Self, DeviceError> {
        debug!("Creating HID joystick reader with settings: {:?}", settings);

        let api = match HidApi::new() {
            Ok(api) => api,
            Err(e) => {
                error!("Failed to initialize hidapi: {}", e);
                return Err(settings.unavailable(e));
            }
        };

        Ok(Self::new(api, None, settings))
    }

    // Open the joystick and transition to Reading state
    pub fn open(mut self) -> Result<HidJoystick<Reading>, DeviceError> {
        let vendor_id = self.settings.vendor_id;
        let product_id = self.settings.product_id;
        info!(
            "Opening joystick {:04x}:{:04x} (interface: {:?})",
            vendor_id, product_id, self.settings.interface
        );

        let device = match self.settings.interface {
            Some(interface) => {
                let info = self
                    .api
                    .device_list()
                    .find(|info| {
                        info.vendor_id() == vendor_id
                            && info.product_id() == product_id
                            && info.interface_number() == interface
                    })
                    .ok_or_else(|| {
                        self.settings
                            .unavailable(format!("no device exposes interface {}", interface))
                    })?;
                info.open_device(&self.api)
                    .map_err(|e| self.settings.unavailable(e))?
            }
            None => self
                .api
                .open(vendor_id, product_id)
                .map_err(|e| self.settings.unavailable(e))?,
        };

        self.device = Some(device);
        info!("Joystick opened, transitioning to Reading state");
        Ok(self.transition())
    }
}

impl ReportSource for HidJoystick<Reading> {
    fn read_report(&mut self) -> Result<Option<RawReport>, DeviceError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| DeviceError::ReadError("device handle missing".to_string()))?;

        let mut buf = [0u8; 64];
        let size = device
            .read_timeout(&mut buf, self.settings.read_timeout_ms)
            .map_err(|e| {
                warn!("Joystick read failed: {}", e);
                DeviceError::ReadError(e.to_string())
            })?;

        if size == 0 {
            return Ok(None);
        }
        let report = RawReport::parse(&buf[..size])?;
        debug!(
            "Report: pan {} tilt {} zoom {} buttons {:#010b}",
            report.pan,
            report.tilt,
            report.zoom,
            report.buttons.bits()
        );
        Ok(Some(report))
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted step returned by [`ScriptedSource`]
    pub enum Step {
        Report(RawReport),
        Timeout,
        Fail,
    }

    /// Report source replaying a fixed script, then timing out forever
    pub struct ScriptedSource {
        pub steps: VecDeque<Step>,
    }

    impl ScriptedSource {
        pub fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl ReportSource for ScriptedSource {
        fn read_report(&mut self) -> Result<Option<RawReport>, DeviceError> {
            match self.steps.pop_front() {
                Some(Step::Report(report)) => Ok(Some(report)),
                Some(Step::Timeout) | None => Ok(None),
                Some(Step::Fail) => Err(DeviceError::ReadError("scripted failure".to_string())),
            }
        }
    }

    pub fn report(pan: u8, tilt: u8, zoom: u8, buttons: ButtonMask) -> RawReport {
        RawReport {
            pan,
            tilt,
            zoom,
            buttons,
        }
    }
}
