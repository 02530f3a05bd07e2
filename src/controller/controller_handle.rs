//! Controller Handle - lifecycle of the joystick → camera pipeline
//!
//! Runs the blocking poll loop on a dedicated blocking task and supervises its
//! collaborators:
//!
//! ```text
//! ReportSource ──► InputPoller ──[Vec<Event>]──► ModeDispatcher ──► PtzCamera
//!      ▲                                               ▲
//!      └── reopened after DeviceError                  └── reconnected after CameraError
//! ```
//!
//! A tick (read + dispatch) always completes before the shutdown token is checked
//! again; the read itself is bounded by the device read timeout.

use chrono::Local;
use color_eyre::eyre::{eyre, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::camera::dry_run::DryRunCamera;
use crate::camera::{CameraError, PtzCamera};
use crate::config::{CameraConfig, ConfigError};
use crate::controller::device::{
    DeviceError, DeviceSettings, HidJoystick, Reading, ReportSource,
};
use crate::controller::input_poller::{InputPoller, PollerSettings};
use crate::mapping::{DispatchSettings, ModeDispatcher};

/// Slice used when sleeping so cancellation is noticed promptly
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Runtime settings for one joystick/camera pair
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    pub device: DeviceSettings,
    pub poller: PollerSettings,
    pub dispatch: DispatchSettings,
    pub camera: CameraConfig,
    /// Delay before reopening a failed device or camera
    pub reconnect_delay: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            device: DeviceSettings::default(),
            poller: PollerSettings::default(),
            dispatch: DispatchSettings::default(),
            camera: CameraConfig::default(),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

/// Failure categories surfaced to the supervisor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    DeviceUnavailable,
    CameraUnreachable,
    ConfigurationError,
}

// Controller errors
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ControllerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ControllerError::Device(_) => ErrorClass::DeviceUnavailable,
            ControllerError::Camera(_) => ErrorClass::CameraUnreachable,
            ControllerError::Config(_) => ErrorClass::ConfigurationError,
        }
    }
}

// Periodic throughput logging
struct TickStats {
    ticks: u64,
    events: u64,
    last_log_time: chrono::DateTime<Local>,
    log_interval: chrono::Duration,
}

impl TickStats {
    fn new() -> Self {
        Self {
            ticks: 0,
            events: 0,
            last_log_time: Local::now(),
            log_interval: chrono::Duration::seconds(30),
        }
    }

    fn record(&mut self, events: usize) {
        self.ticks += 1;
        self.events += events as u64;

        let now = Local::now();
        if now - self.last_log_time > self.log_interval {
            info!(
                "Controller stats: {} ticks, {} events in {} seconds",
                self.ticks,
                self.events,
                self.log_interval.num_seconds()
            );
            self.ticks = 0;
            self.events = 0;
            self.last_log_time = now;
        }
    }
}

fn sleep_unless_cancelled(shutdown: &CancellationToken, delay: Duration) {
    let mut remaining = delay;
    while !remaining.is_zero() && !shutdown.is_cancelled() {
        let step = remaining.min(SHUTDOWN_POLL);
        std::thread::sleep(step);
        remaining -= step;
    }
}

/// Blocking supervision loop; returns once `shutdown` is cancelled.
///
/// `open_source` and `connect_camera` are called again whenever the previous
/// instance failed. Configuration errors end the loop.
pub fn run_supervisor<R, C, O, K>(
    settings: &ControllerSettings,
    shutdown: &CancellationToken,
    mut open_source: O,
    mut connect_camera: K,
) -> Result<(), ControllerError>
where
    R: ReportSource,
    C: PtzCamera,
    O: FnMut(&DeviceSettings) -> Result<R, DeviceError>,
    K: FnMut(&CameraConfig) -> Result<C, CameraError>,
{
    let mut poller: Option<InputPoller<R>> = None;
    let mut dispatcher: Option<ModeDispatcher<C>> = None;
    let mut stats = TickStats::new();

    info!("Entering controller loop");
    while !shutdown.is_cancelled() {
        if poller.is_none() {
            match open_source(&settings.device) {
                Ok(source) => {
                    poller = Some(InputPoller::new(source, &settings.poller)?);
                    info!("Input device ready");
                }
                Err(e) => {
                    let e = ControllerError::from(e);
                    error!("{:?}: {}", e.class(), e);
                    sleep_unless_cancelled(shutdown, settings.reconnect_delay);
                    continue;
                }
            }
        }

        if dispatcher.is_none() {
            match connect_camera(&settings.camera) {
                Ok(camera) => {
                    dispatcher = Some(ModeDispatcher::new(camera, settings.dispatch.clone()));
                    info!("Camera ready at {}", settings.camera.address);
                }
                Err(e) => {
                    let e = ControllerError::from(e);
                    error!("{:?}: {}", e.class(), e);
                    sleep_unless_cancelled(shutdown, settings.reconnect_delay);
                    continue;
                }
            }
        }

        let (Some(active_poller), Some(active_dispatcher)) = (poller.as_mut(), dispatcher.as_mut())
        else {
            continue;
        };

        let events = match active_poller.poll() {
            Ok(events) => events,
            Err(e) => {
                let e = ControllerError::from(e);
                error!("{:?}: {}, reopening device", e.class(), e);
                poller = None;
                // the new poller starts from a neutral stick, so no *End would follow
                if let Err(e) = active_dispatcher.reset() {
                    let e = ControllerError::from(e);
                    error!("{:?}: {}, reconnecting camera", e.class(), e);
                    dispatcher = None;
                }
                sleep_unless_cancelled(shutdown, settings.reconnect_delay);
                continue;
            }
        };
        stats.record(events.len());

        if let Err(e) = active_dispatcher.handle_events(&events) {
            let e = ControllerError::from(e);
            error!("{:?}: {}, reconnecting camera", e.class(), e);
            dispatcher = None;
        }
    }

    info!("Shutdown requested, leaving controller loop");
    Ok(())
}

fn open_hid_joystick(settings: &DeviceSettings) -> Result<HidJoystick<Reading>, DeviceError> {
    HidJoystick::create(settings.clone())?.open()
}

/// Handle for the spawned controller task
pub struct ControllerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), ControllerError>>,
}

impl ControllerHandle {
    /// Spawns the supervisor with the HID joystick and the dry-run camera.
    pub fn spawn(settings: ControllerSettings) -> Self {
        info!(
            "Initializing controller for device {:04x}:{:04x}",
            settings.device.vendor_id, settings.device.product_id
        );
        debug!("Controller settings: {:?}", settings);

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = tokio::task::spawn_blocking(move || {
            run_supervisor(&settings, &token, open_hid_joystick, DryRunCamera::connect)
        });

        Self { shutdown, task }
    }

    /// Runs until Ctrl-C or until the controller task stops on its own.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let ControllerHandle {
            shutdown,
            mut task,
        } = self;

        tokio::select! {
            result = &mut task => {
                warn!("Controller task stopped without shutdown request");
                let outcome = result.map_err(|e| eyre!("Controller task panicked: {}", e))?;
                outcome?;
                return Ok(());
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Ctrl-C received, shutting down controller");
            }
        }

        shutdown.cancel();
        let outcome = task
            .await
            .map_err(|e| eyre!("Controller task panicked: {}", e))?;
        outcome?;
        info!("Controller stopped");
        Ok(())
    }
}
