//! Button identities and the per-button press/hold state machine
//!
//! Every physical button owns one [`ButtonEntry`]. The entries live together in a
//! [`ButtonBank`] so that a press transition can look at (and force) the state of
//! the modifier buttons it declares.
//!
//! ```text
//!          bit set                 held >= threshold
//! Idle ─────────────► Pressed ─────────────────────► Inactive
//!  ▲                     │  (emits ButtonHold)          │
//!  │   bit cleared       │                              │ bit cleared
//!  ├─────────────────────┘ (emits ButtonPress /         │
//!  │                        ButtonPressWithModifier)    │
//!  ├────────────────────────────────────────────────────┘
//!  │   bit cleared
//!  └──────────────── ModifierActive (forced by another button's press)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ConfigError;
use crate::controller::event::{Event, EventKind};

/// Button bitmask carried in byte 3 of every joystick report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ButtonMask(u8);

impl ButtonMask {
    pub const J1: ButtonMask = ButtonMask(1 << 0);
    pub const J2: ButtonMask = ButtonMask(1 << 1);
    pub const J3: ButtonMask = ButtonMask(1 << 2);
    pub const J4: ButtonMask = ButtonMask(1 << 3);
    pub const L: ButtonMask = ButtonMask(1 << 4);
    pub const R: ButtonMask = ButtonMask(1 << 5);

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Keeps every bit, including ones no button is mapped to
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: ButtonMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ButtonMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// Button identity, one per bit of the mask
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonId {
    J1,
    J2,
    J3,
    J4,
    L,
    R,
}

impl ButtonId {
    /// Declaration order, which is also the per-tick update order
    pub const ALL: [ButtonId; 6] = [
        ButtonId::J1,
        ButtonId::J2,
        ButtonId::J3,
        ButtonId::J4,
        ButtonId::L,
        ButtonId::R,
    ];

    pub fn mask(self) -> ButtonMask {
        match self {
            ButtonId::J1 => ButtonMask::J1,
            ButtonId::J2 => ButtonMask::J2,
            ButtonId::J3 => ButtonMask::J3,
            ButtonId::J4 => ButtonMask::J4,
            ButtonId::L => ButtonMask::L,
            ButtonId::R => ButtonMask::R,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ButtonId::J1 => "J1",
            ButtonId::J2 => "J2",
            ButtonId::J3 => "J3",
            ButtonId::J4 => "J4",
            ButtonId::L => "L",
            ButtonId::R => "R",
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    Pressed,
    ModifierActive,
    Inactive,
}

impl ButtonState {
    /// Whether a button in this state counts as a held modifier
    pub fn is_engaged(self) -> bool {
        matches!(self, ButtonState::Pressed | ButtonState::ModifierActive)
    }
}

/// Layout entry: a button and the modifiers it recognises, in priority order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub id: ButtonId,
    #[serde(default)]
    pub modifiers: Vec<ButtonId>,
}

impl ButtonBinding {
    pub fn new(id: ButtonId, modifiers: &[ButtonId]) -> Self {
        Self {
            id,
            modifiers: modifiers.to_vec(),
        }
    }
}

/// The stock layout: preset buttons accept `L` and `R`, modifiers accept nothing.
pub fn default_layout() -> Vec<ButtonBinding> {
    vec![
        ButtonBinding::new(ButtonId::J1, &[ButtonId::L, ButtonId::R]),
        ButtonBinding::new(ButtonId::J2, &[ButtonId::L, ButtonId::R]),
        ButtonBinding::new(ButtonId::J3, &[ButtonId::L, ButtonId::R]),
        ButtonBinding::new(ButtonId::J4, &[ButtonId::L, ButtonId::R]),
        ButtonBinding::new(ButtonId::L, &[]),
        ButtonBinding::new(ButtonId::R, &[]),
    ]
}

#[derive(Clone, Debug)]
pub struct ButtonEntry {
    pub id: ButtonId,
    pub declared_modifiers: Vec<ButtonId>,
    pub state: ButtonState,
    pub active_modifier: Option<ButtonId>,
    pub pressed_at: Option<Instant>,
}

impl ButtonEntry {
    fn new(binding: &ButtonBinding) -> Self {
        Self {
            id: binding.id,
            declared_modifiers: binding.modifiers.clone(),
            state: ButtonState::Idle,
            active_modifier: None,
            pressed_at: None,
        }
    }

    fn reset(&mut self) {
        self.state = ButtonState::Idle;
        self.active_modifier = None;
        self.pressed_at = None;
    }
}

/// All button state machines of one controller, in declaration order
#[derive(Clone, Debug)]
pub struct ButtonBank {
    entries: Vec<ButtonEntry>,
    hold_threshold: Duration,
}

impl ButtonBank {
    pub fn new(layout: &[ButtonBinding], hold_threshold: Duration) -> Result<Self, ConfigError> {
        validate_layout(layout)?;
        if hold_threshold.is_zero() {
            return Err(ConfigError::InvalidHoldTime(0.0));
        }

        debug!(
            "Creating button bank with {} buttons, hold threshold {:?}",
            layout.len(),
            hold_threshold
        );
        Ok(Self {
            entries: layout.iter().map(ButtonEntry::new).collect(),
            hold_threshold,
        })
    }

    pub fn entries(&self) -> &[ButtonEntry] {
        &self.entries
    }

    pub fn entry(&self, id: ButtonId) -> Option<&ButtonEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: ButtonId) -> bool {
        self.entry(id).is_some()
    }

    pub fn is_engaged(&self, id: ButtonId) -> bool {
        self.entry(id)
            .map(|entry| entry.state.is_engaged())
            .unwrap_or(false)
    }

    /// Forces a held button into `ModifierActive` so it never reports its own press.
    pub fn force_modifier(&mut self, id: ButtonId) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) {
            if entry.state != ButtonState::ModifierActive {
                debug!("Button {} now acts as modifier", id);
                entry.state = ButtonState::ModifierActive;
            }
        }
    }

    /// Runs one tick over every button in declaration order.
    pub fn update(&mut self, mask: ButtonMask, now: Instant) -> Vec<Event> {
        let mut events = Vec::new();
        for index in 0..self.entries.len() {
            if let Some(event) = self.update_button(index, mask, now) {
                events.push(event);
            }
        }
        events
    }

    fn update_button(&mut self, index: usize, mask: ButtonMask, now: Instant) -> Option<Event> {
        let id = self.entries[index].id;
        let pressed = mask.contains(id.mask());

        match self.entries[index].state {
            ButtonState::Idle => {
                if pressed {
                    // First engaged modifier in declaration order wins
                    let modifier = self.entries[index]
                        .declared_modifiers
                        .iter()
                        .copied()
                        .find(|candidate| self.is_engaged(*candidate));

                    let entry = &mut self.entries[index];
                    entry.state = ButtonState::Pressed;
                    entry.pressed_at = Some(now);
                    entry.active_modifier = modifier;
                    debug!("Button {} pressed (modifier: {:?})", id, modifier);

                    if let Some(modifier) = modifier {
                        self.force_modifier(modifier);
                    }
                }
                None
            }
            ButtonState::Pressed => {
                let hold_threshold = self.hold_threshold;
                let entry = &mut self.entries[index];

                if pressed {
                    let held_for = entry
                        .pressed_at
                        .map(|pressed_at| now.saturating_duration_since(pressed_at))
                        .unwrap_or_default();
                    if held_for < hold_threshold {
                        return None;
                    }

                    entry.state = ButtonState::Inactive;
                    debug!("Button {} held for {:?}", id, held_for);
                    Some(Event::button(
                        EventKind::ButtonHold,
                        id,
                        entry.active_modifier,
                        now,
                    ))
                } else {
                    let kind = if entry.active_modifier.is_some() {
                        EventKind::ButtonPressWithModifier
                    } else {
                        EventKind::ButtonPress
                    };
                    let event = Event::button(kind, id, entry.active_modifier, now);
                    entry.reset();
                    debug!("Button {} released: {:?}", id, kind);
                    Some(event)
                }
            }
            ButtonState::ModifierActive | ButtonState::Inactive => {
                if !pressed {
                    self.entries[index].reset();
                    debug!("Button {} released without event", id);
                }
                None
            }
        }
    }
}

fn validate_layout(layout: &[ButtonBinding]) -> Result<(), ConfigError> {
    for (index, binding) in layout.iter().enumerate() {
        if layout[..index].iter().any(|other| other.id == binding.id) {
            return Err(ConfigError::DuplicateButton(binding.id));
        }
        for modifier in &binding.modifiers {
            if *modifier == binding.id {
                return Err(ConfigError::SelfModifier(binding.id));
            }
            if !layout.iter().any(|other| other.id == *modifier) {
                return Err(ConfigError::UnknownModifier {
                    button: binding.id,
                    modifier: *modifier,
                });
            }
        }
    }
    Ok(())
}
