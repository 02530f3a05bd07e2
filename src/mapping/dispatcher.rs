//! Mode-aware event dispatcher
//!
//! ```text
//!            MoveStart                    FocusStart
//!   Moving ◄─────────── Idle ──────────────────► Focusing
//!     │                  ▲ ▲                        │
//!     └──── MoveEnd ─────┘ └────── FocusEnd ────────┘
//! ```
//!
//! Stick updates only reach the camera in the matching mode; button events only
//! while idle.

use tracing::{debug, info, warn};

use crate::camera::{wait_for_settle, CameraError, PtzCamera, SettlePolicy};
use crate::controller::axis::{focus_depth, to_percent, AxisSample};
use crate::controller::event::{Event, EventKind};
use crate::mapping::action_table::{ActionTable, BindingKey, CameraAction, Gesture};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CameraMode {
    #[default]
    Idle,
    Moving,
    Focusing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DispatchSettings {
    pub preset_speed: u32,
    pub home_speed: u32,
    pub settle: SettlePolicy,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            preset_speed: 50,
            home_speed: 100,
            settle: SettlePolicy::default(),
        }
    }
}

pub struct ModeDispatcher<C: PtzCamera> {
    camera: C,
    mode: CameraMode,
    table: ActionTable,
    settings: DispatchSettings,
}

impl<C: PtzCamera> ModeDispatcher<C> {
    pub fn new(camera: C, settings: DispatchSettings) -> Self {
        let table = ActionTable::standard();
        debug!(
            "Creating mode dispatcher with {} bindings ({} active)",
            table.len(),
            table.active_bindings().count()
        );

        Self {
            camera,
            mode: CameraMode::Idle,
            table,
            settings,
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Applies the events of one tick in order, stopping at the first camera failure.
    pub fn handle_events(&mut self, events: &[Event]) -> Result<(), CameraError> {
        for event in events {
            self.handle(event)?;
        }
        Ok(())
    }

    pub fn handle(&mut self, event: &Event) -> Result<(), CameraError> {
        match event.kind {
            EventKind::MoveStart => self.begin(CameraMode::Moving)?,
            EventKind::MoveEnd => self.end(CameraMode::Moving)?,
            EventKind::FocusStart => {
                self.begin(CameraMode::Focusing)?;
                self.camera.set_auto_focus(false)?;
            }
            EventKind::FocusEnd => self.end(CameraMode::Focusing)?,
            _ => {}
        }

        match self.mode {
            CameraMode::Moving if event.kind == EventKind::MoveUpdate => {
                let axes = self.axes_of(event)?;
                self.camera.continuous_move(
                    to_percent(axes.pan),
                    to_percent(axes.tilt),
                    to_percent(axes.zoom),
                )
            }
            CameraMode::Focusing if event.kind == EventKind::FocusUpdate => {
                let axes = self.axes_of(event)?;
                self.camera
                    .continuous_focus(to_percent(focus_depth(axes.zoom)))
            }
            CameraMode::Idle if event.kind.is_button() => self.handle_button(event),
            CameraMode::Moving | CameraMode::Focusing if event.kind.is_button() => {
                debug!("Ignoring {:?} while {:?}", event.kind, self.mode);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Halts whatever continuous motion is active and returns to Idle.
    pub fn reset(&mut self) -> Result<(), CameraError> {
        let previous = self.mode;
        if previous != CameraMode::Idle {
            info!("Resetting camera mode {:?} -> Idle", previous);
        }
        self.mode = CameraMode::Idle;
        self.halt(previous)
    }

    fn axes_of(&self, event: &Event) -> Result<AxisSample, CameraError> {
        event.axes.ok_or(CameraError::CommandFailed {
            command: "continuous update",
            reason: format!("{:?} event carries no axis sample", event.kind),
        })
    }

    fn begin(&mut self, mode: CameraMode) -> Result<(), CameraError> {
        if self.mode != CameraMode::Idle && self.mode != mode {
            warn!("{:?} requested while {:?}, halting first", mode, self.mode);
            self.halt(self.mode)?;
        }
        debug!("Camera mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        Ok(())
    }

    fn end(&mut self, mode: CameraMode) -> Result<(), CameraError> {
        let previous = self.mode;
        debug!("Camera mode {:?} -> Idle", previous);
        self.mode = CameraMode::Idle;

        if previous != CameraMode::Idle && previous != mode {
            warn!("{:?} ended while {:?}, halting both", mode, previous);
            self.halt(previous)?;
        }
        self.halt(mode)
    }

    fn halt(&mut self, mode: CameraMode) -> Result<(), CameraError> {
        match mode {
            CameraMode::Moving => self.camera.stop_move(),
            CameraMode::Focusing => self.camera.stop_focus(),
            CameraMode::Idle => Ok(()),
        }
    }

    fn handle_button(&mut self, event: &Event) -> Result<(), CameraError> {
        let (Some(button), Some(gesture)) = (event.button, Gesture::from_kind(event.kind)) else {
            warn!("Button event without button identity: {:?}", event);
            return Ok(());
        };

        let key = BindingKey::new(button, event.modifier, gesture);
        let action = self.table.lookup(&key).clone();
        self.execute(&key, action)
    }

    fn execute(&mut self, key: &BindingKey, action: CameraAction) -> Result<(), CameraError> {
        match action {
            CameraAction::RecallPreset(name) => {
                info!("Going to preset \"{}\"", name);
                self.camera.go_to_preset(&name, self.settings.preset_speed)?;
                wait_for_settle(&mut self.camera, &self.settings.settle)
            }
            CameraAction::StorePreset(name) => {
                info!("Setting preset \"{}\"", name);
                wait_for_settle(&mut self.camera, &self.settings.settle)?;
                self.camera.set_preset(&name)
            }
            CameraAction::GoHome => {
                info!("Moving camera to home position");
                self.camera.go_home_position(self.settings.home_speed)?;
                wait_for_settle(&mut self.camera, &self.settings.settle)
            }
            CameraAction::EnableAutoFocus => {
                info!("Re-enabling camera auto-focus");
                self.camera.set_auto_focus(true)
            }
            CameraAction::Reserved => {
                debug!("No action bound to {}", key);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::testing::{Call, RecordingCamera};
    use crate::camera::PositionSnapshot;
    use crate::controller::buttons::ButtonId;
    use std::time::{Duration, Instant};

    fn dispatcher(camera: RecordingCamera) -> ModeDispatcher<RecordingCamera> {
        let settings = DispatchSettings {
            settle: SettlePolicy {
                interval: Duration::ZERO,
                max_polls: None,
            },
            ..DispatchSettings::default()
        };
        ModeDispatcher::new(camera, settings)
    }

    fn stick(kind: EventKind, pan: f32, tilt: f32, zoom: f32) -> Event {
        Event::joystick(kind, AxisSample::new(pan, tilt, zoom), Instant::now())
    }

    fn button(kind: EventKind, button: ButtonId, modifier: Option<ButtonId>) -> Event {
        Event::button(kind, button, modifier, Instant::now())
    }

    #[test]
    fn move_sequence_drives_camera_and_returns_idle() {
        let mut dispatcher = dispatcher(RecordingCamera::default());

        dispatcher
            .handle_events(&[
                stick(EventKind::MoveStart, 0.3, 0.0, 0.0),
                stick(EventKind::MoveUpdate, 0.5, 0.0, 0.0),
            ])
            .unwrap();
        assert_eq!(dispatcher.mode(), CameraMode::Moving);

        dispatcher
            .handle(&stick(EventKind::MoveEnd, 0.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(dispatcher.mode(), CameraMode::Idle);
        assert_eq!(
            dispatcher.camera().commands(),
            vec![Call::ContinuousMove(50, 0, 0), Call::StopMove]
        );
    }

    #[test]
    fn focus_sequence_uses_eased_zoom() {
        let mut dispatcher = dispatcher(RecordingCamera::default());

        dispatcher
            .handle_events(&[
                stick(EventKind::FocusStart, 0.0, 0.0, 0.2),
                stick(EventKind::FocusUpdate, 0.0, 0.0, 0.5),
                stick(EventKind::FocusUpdate, 0.0, 0.0, -0.5),
            ])
            .unwrap();
        assert_eq!(dispatcher.mode(), CameraMode::Focusing);

        dispatcher
            .handle(&stick(EventKind::FocusEnd, 0.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(dispatcher.mode(), CameraMode::Idle);
        assert_eq!(
            dispatcher.camera().commands(),
            vec![
                Call::SetAutoFocus(false),
                Call::ContinuousFocus(12),
                Call::ContinuousFocus(-12),
                Call::StopFocus,
            ]
        );
    }

    #[test]
    fn updates_outside_their_mode_are_ignored() {
        let mut dispatcher = dispatcher(RecordingCamera::default());
        dispatcher
            .handle_events(&[
                stick(EventKind::MoveUpdate, 0.5, 0.5, 0.5),
                stick(EventKind::FocusUpdate, 0.0, 0.0, 0.5),
            ])
            .unwrap();
        assert!(dispatcher.camera().commands().is_empty());
    }

    #[test]
    fn press_recalls_preset_and_waits_for_settle() {
        let moving = vec![
            PositionSnapshot::default(),
            PositionSnapshot {
                pan: 10.0,
                ..PositionSnapshot::default()
            },
            PositionSnapshot {
                pan: 20.0,
                ..PositionSnapshot::default()
            },
        ];
        let mut dispatcher = dispatcher(RecordingCamera::with_positions(moving));

        dispatcher
            .handle(&button(EventKind::ButtonPress, ButtonId::J2, None))
            .unwrap();
        assert_eq!(
            dispatcher.camera().calls,
            vec![
                Call::GoToPreset("J2".to_string(), 50),
                Call::GetPosition,
                Call::GetPosition,
                Call::GetPosition,
                Call::GetPosition,
            ]
        );
    }

    #[test]
    fn right_modifier_stores_preset_after_settling() {
        let mut dispatcher = dispatcher(RecordingCamera::default());
        dispatcher
            .handle(&button(
                EventKind::ButtonPressWithModifier,
                ButtonId::J3,
                Some(ButtonId::R),
            ))
            .unwrap();
        assert_eq!(
            dispatcher.camera().calls,
            vec![
                Call::GetPosition,
                Call::GetPosition,
                Call::SetPreset("J3".to_string())
            ]
        );
    }

    #[test]
    fn hold_bindings_reach_camera() {
        let mut dispatcher = dispatcher(RecordingCamera::default());
        dispatcher
            .handle_events(&[
                button(EventKind::ButtonHold, ButtonId::J1, None),
                button(EventKind::ButtonHold, ButtonId::L, None),
            ])
            .unwrap();
        assert_eq!(
            dispatcher.camera().commands(),
            vec![Call::GoHome(100), Call::SetAutoFocus(true)]
        );
    }

    #[test]
    fn reserved_bindings_do_nothing() {
        let mut dispatcher = dispatcher(RecordingCamera::default());
        dispatcher
            .handle_events(&[
                button(
                    EventKind::ButtonPressWithModifier,
                    ButtonId::J1,
                    Some(ButtonId::L),
                ),
                button(EventKind::ButtonPress, ButtonId::R, None),
                button(EventKind::ButtonHold, ButtonId::J4, None),
            ])
            .unwrap();
        assert!(dispatcher.camera().calls.is_empty());
        assert_eq!(dispatcher.mode(), CameraMode::Idle);
    }

    #[test]
    fn buttons_ignored_while_moving() {
        let mut dispatcher = dispatcher(RecordingCamera::default());
        dispatcher
            .handle_events(&[
                stick(EventKind::MoveStart, 1.0, 0.0, 0.0),
                button(EventKind::ButtonPress, ButtonId::J1, None),
            ])
            .unwrap();
        assert!(dispatcher.camera().calls.is_empty());
    }

    #[test]
    fn move_end_while_focusing_stops_both() {
        let mut dispatcher = dispatcher(RecordingCamera::default());
        dispatcher
            .handle_events(&[
                stick(EventKind::FocusStart, 0.0, 0.0, 0.5),
                stick(EventKind::MoveUpdate, 0.2, 0.0, 0.5),
                stick(EventKind::MoveEnd, 0.0, 0.0, 0.0),
            ])
            .unwrap();
        assert_eq!(dispatcher.mode(), CameraMode::Idle);
        assert_eq!(
            dispatcher.camera().commands(),
            vec![Call::SetAutoFocus(false), Call::StopFocus, Call::StopMove]
        );
    }

    #[test]
    fn focus_start_while_moving_stops_move_first() {
        let mut dispatcher = dispatcher(RecordingCamera::default());
        dispatcher
            .handle_events(&[
                stick(EventKind::MoveStart, 0.5, 0.0, 0.0),
                stick(EventKind::FocusStart, 0.0, 0.0, 0.5),
            ])
            .unwrap();
        assert_eq!(dispatcher.mode(), CameraMode::Focusing);
        assert_eq!(
            dispatcher.camera().commands(),
            vec![Call::StopMove, Call::SetAutoFocus(false)]
        );
    }

    #[test]
    fn reset_halts_active_mode() {
        let mut dispatcher = dispatcher(RecordingCamera::default());
        dispatcher
            .handle_events(&[
                stick(EventKind::FocusStart, 0.0, 0.0, 0.5),
                stick(EventKind::FocusUpdate, 0.0, 0.0, 1.0),
            ])
            .unwrap();

        dispatcher.reset().unwrap();
        assert_eq!(dispatcher.mode(), CameraMode::Idle);
        assert_eq!(
            dispatcher.camera().commands(),
            vec![
                Call::SetAutoFocus(false),
                Call::ContinuousFocus(100),
                Call::StopFocus,
            ]
        );

        // idle reset is silent, and buttons work again
        dispatcher.reset().unwrap();
        dispatcher
            .handle(&button(EventKind::ButtonHold, ButtonId::L, None))
            .unwrap();
        assert_eq!(
            dispatcher.camera().commands().last(),
            Some(&Call::SetAutoFocus(true))
        );
        assert_eq!(dispatcher.camera().commands().len(), 4);
    }

    #[test]
    fn camera_failure_surfaces() {
        let mut dispatcher = dispatcher(RecordingCamera {
            fail_all: true,
            ..RecordingCamera::default()
        });
        dispatcher
            .handle(&stick(EventKind::MoveStart, 1.0, 0.0, 0.0))
            .unwrap();
        let result = dispatcher.handle(&stick(EventKind::MoveUpdate, 0.5, 0.0, 0.0));
        assert!(matches!(result, Err(CameraError::Unreachable { .. })));
    }
}
