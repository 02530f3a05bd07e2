use std::time::Instant;

use crate::controller::axis::AxisSample;
use crate::controller::buttons::ButtonId;

/// Semantic control events produced by the input poller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    MoveStart,
    MoveUpdate,
    MoveEnd,
    FocusStart,
    FocusUpdate,
    FocusEnd,
    ButtonPress,
    ButtonPressWithModifier,
    ButtonHold,
}

impl EventKind {
    pub fn is_button(self) -> bool {
        matches!(
            self,
            EventKind::ButtonPress | EventKind::ButtonPressWithModifier | EventKind::ButtonHold
        )
    }
}

// Immutable event value, consumed once by the dispatcher
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub button: Option<ButtonId>,
    pub modifier: Option<ButtonId>,
    pub axes: Option<AxisSample>,
    pub timestamp: Instant,
}

impl Event {
    pub fn button(
        kind: EventKind,
        button: ButtonId,
        modifier: Option<ButtonId>,
        timestamp: Instant,
    ) -> Self {
        Self {
            kind,
            button: Some(button),
            modifier,
            axes: None,
            timestamp,
        }
    }

    pub fn joystick(kind: EventKind, axes: AxisSample, timestamp: Instant) -> Self {
        Self {
            kind,
            button: None,
            modifier: None,
            axes: Some(axes),
            timestamp,
        }
    }
}
