//! Camera capability boundary
//!
//! The dispatcher only ever talks to a camera through [`PtzCamera`]. Transport,
//! authentication and payload formats belong to the implementation behind it.

pub mod dry_run;

use std::time::Duration;
use tracing::{debug, warn};

/// Camera position as reported by the collaborator, compared for settling
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PositionSnapshot {
    pub pan: f64,
    pub tilt: f64,
    pub zoom: f64,
}

// Camera errors
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Camera at {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("Camera rejected {command}: {reason}")]
    CommandFailed {
        command: &'static str,
        reason: String,
    },
}

/// Everything the dispatcher needs from a PTZ camera
pub trait PtzCamera {
    fn continuous_move(&mut self, pan: i32, tilt: i32, zoom: i32) -> Result<(), CameraError>;

    fn stop_move(&mut self) -> Result<(), CameraError>;

    fn continuous_focus(&mut self, value: i32) -> Result<(), CameraError>;

    fn set_auto_focus(&mut self, enabled: bool) -> Result<(), CameraError>;

    fn stop_focus(&mut self) -> Result<(), CameraError>;

    fn go_home_position(&mut self, speed: u32) -> Result<(), CameraError>;

    fn go_to_preset(&mut self, name: &str, speed: u32) -> Result<(), CameraError>;

    fn set_preset(&mut self, name: &str) -> Result<(), CameraError>;

    fn get_position(&mut self) -> Result<PositionSnapshot, CameraError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct SettlePolicy {
    pub interval: Duration,
    /// Upper bound on samples; `None` polls until the camera settles
    pub max_polls: Option<u32>,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_polls: None,
        }
    }
}

/// Blocks until two consecutive position samples are equal.
pub fn wait_for_settle<C: PtzCamera + ?Sized>(
    camera: &mut C,
    policy: &SettlePolicy,
) -> Result<(), CameraError> {
    let mut last = camera.get_position()?;
    let mut polls: u32 = 0;

    loop {
        if !policy.interval.is_zero() {
            std::thread::sleep(policy.interval);
        }
        let current = camera.get_position()?;
        polls += 1;

        if current == last {
            debug!("Camera settled after {} polls at {:?}", polls, current);
            return Ok(());
        }
        if let Some(max_polls) = policy.max_polls {
            if polls >= max_polls {
                warn!("Camera still moving after {} polls, giving up", polls);
                return Ok(());
            }
        }
        last = current;
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        ContinuousMove(i32, i32, i32),
        StopMove,
        ContinuousFocus(i32),
        SetAutoFocus(bool),
        StopFocus,
        GoHome(u32),
        GoToPreset(String, u32),
        SetPreset(String),
        GetPosition,
    }

    /// Records every call; positions are served from a script, then repeat the last one.
    #[derive(Debug, Default)]
    pub struct RecordingCamera {
        pub calls: Vec<Call>,
        pub positions: VecDeque<PositionSnapshot>,
        pub fail_all: bool,
    }

    impl RecordingCamera {
        pub fn with_positions(positions: Vec<PositionSnapshot>) -> Self {
            Self {
                positions: positions.into(),
                ..Self::default()
            }
        }

        /// Calls other than position sampling
        pub fn commands(&self) -> Vec<Call> {
            self.calls
                .iter()
                .filter(|call| **call != Call::GetPosition)
                .cloned()
                .collect()
        }

        fn record(&mut self, call: Call) -> Result<(), CameraError> {
            self.calls.push(call);
            if self.fail_all {
                return Err(CameraError::Unreachable {
                    address: "test".to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            Ok(())
        }
    }

    impl PtzCamera for RecordingCamera {
        fn continuous_move(&mut self, pan: i32, tilt: i32, zoom: i32) -> Result<(), CameraError> {
            self.record(Call::ContinuousMove(pan, tilt, zoom))
        }

        fn stop_move(&mut self) -> Result<(), CameraError> {
            self.record(Call::StopMove)
        }

        fn continuous_focus(&mut self, value: i32) -> Result<(), CameraError> {
            self.record(Call::ContinuousFocus(value))
        }

        fn set_auto_focus(&mut self, enabled: bool) -> Result<(), CameraError> {
            self.record(Call::SetAutoFocus(enabled))
        }

        fn stop_focus(&mut self) -> Result<(), CameraError> {
            self.record(Call::StopFocus)
        }

        fn go_home_position(&mut self, speed: u32) -> Result<(), CameraError> {
            self.record(Call::GoHome(speed))
        }

        fn go_to_preset(&mut self, name: &str, speed: u32) -> Result<(), CameraError> {
            self.record(Call::GoToPreset(name.to_string(), speed))
        }

        fn set_preset(&mut self, name: &str) -> Result<(), CameraError> {
            self.record(Call::SetPreset(name.to_string()))
        }

        fn get_position(&mut self) -> Result<PositionSnapshot, CameraError> {
            self.record(Call::GetPosition)?;
            let position = if self.positions.len() > 1 {
                self.positions.pop_front().unwrap_or_default()
            } else {
                self.positions.front().copied().unwrap_or_default()
            };
            Ok(position)
        }
    }
}
