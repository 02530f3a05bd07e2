//! Input poller: one raw report per tick, turned into an ordered event list
//!
//! Per tick the poller runs every button state machine (declaration order) and
//! then compares the normalized stick triple against the previous one:
//!
//! ```text
//! previous      new           event
//! (0,0,0)       non-zero      *Start
//! non-zero      (0,0,0)       *End
//! non-zero      non-zero      *Update   (only when the triple changed)
//! ```
//!
//! `*` is `Focus` while the focus modifier is held, `Move` otherwise.

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::ConfigError;
use crate::controller::axis::{AxisMapper, AxisSample};
use crate::controller::buttons::{default_layout, ButtonBank, ButtonBinding, ButtonId};
use crate::controller::device::{DeviceError, RawReport, ReportSource};
use crate::controller::event::{Event, EventKind};

#[derive(Clone, Debug)]
pub struct PollerSettings {
    pub layout: Vec<ButtonBinding>,
    pub hold_threshold: Duration,
    /// Button that routes stick motion into the focus namespace
    pub focus_modifier: ButtonId,
    pub axes: AxisMapper,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            layout: default_layout(),
            hold_threshold: Duration::from_secs(2),
            focus_modifier: ButtonId::L,
            axes: AxisMapper::default(),
        }
    }
}

impl PollerSettings {
    pub fn validate(&self) -> Result<ButtonBank, ConfigError> {
        let bank = ButtonBank::new(&self.layout, self.hold_threshold)?;
        if !bank.contains(self.focus_modifier) {
            return Err(ConfigError::UnknownFocusModifier(self.focus_modifier));
        }
        Ok(bank)
    }
}

pub struct InputPoller<R: ReportSource> {
    source: R,
    buttons: ButtonBank,
    axes: AxisMapper,
    focus_modifier: ButtonId,
    last_axes: AxisSample,
    last_report: Option<RawReport>,
}

impl<R: ReportSource> InputPoller<R> {
    pub fn new(source: R, settings: &PollerSettings) -> Result<Self, ConfigError> {
        let buttons = settings.validate()?;
        debug!(
            "Creating input poller (focus modifier: {})",
            settings.focus_modifier
        );

        Ok(Self {
            source,
            buttons,
            axes: settings.axes,
            focus_modifier: settings.focus_modifier,
            last_axes: AxisSample::NEUTRAL,
            last_report: None,
        })
    }

    pub fn buttons(&self) -> &ButtonBank {
        &self.buttons
    }

    pub fn last_axes(&self) -> AxisSample {
        self.last_axes
    }

    /// Reads one report and resolves it into events.
    ///
    /// A read timeout replays the last report, so hold thresholds keep elapsing
    /// for devices that only report on change.
    pub fn poll(&mut self) -> Result<Vec<Event>, DeviceError> {
        let report = match self.source.read_report()? {
            Some(report) => {
                self.last_report = Some(report);
                report
            }
            None => match self.last_report {
                Some(report) => report,
                None => return Ok(Vec::new()),
            },
        };

        Ok(self.process_report(report, Instant::now()))
    }

    pub fn process_report(&mut self, report: RawReport, now: Instant) -> Vec<Event> {
        trace!("Processing report: {:?}", report);

        let mut events = self.buttons.update(report.buttons, now);
        if let Some(event) = self.process_joystick(&report, now) {
            events.push(event);
        }

        if !events.is_empty() {
            debug!(
                "Tick produced {} events: {:?}",
                events.len(),
                events.iter().map(|event| event.kind).collect::<Vec<_>>()
            );
        }
        events
    }

    fn process_joystick(&mut self, report: &RawReport, now: Instant) -> Option<Event> {
        let sample = self.axes.map(report.pan, report.tilt, report.zoom);
        if sample == self.last_axes {
            return None;
        }

        let focus = self.buttons.is_engaged(self.focus_modifier);
        if focus {
            self.buttons.force_modifier(self.focus_modifier);
        }

        let kind = match (self.last_axes.is_neutral(), sample.is_neutral(), focus) {
            (true, _, false) => EventKind::MoveStart,
            (true, _, true) => EventKind::FocusStart,
            (false, true, false) => EventKind::MoveEnd,
            (false, true, true) => EventKind::FocusEnd,
            (false, false, false) => EventKind::MoveUpdate,
            (false, false, true) => EventKind::FocusUpdate,
        };
        self.last_axes = sample;

        Some(Event::joystick(kind, sample, now))
    }
}
