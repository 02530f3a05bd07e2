//! Static button binding table
//!
//! The table is built by enumerating every `(button, modifier, gesture)`
//! combination, so a lookup never misses: combinations without a camera action
//! resolve to [`CameraAction::Reserved`].

use std::collections::HashMap;
use std::fmt;

use crate::controller::buttons::ButtonId;
use crate::controller::event::EventKind;

/// Button gestures that can be bound to an action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gesture {
    Press,
    PressWithModifier,
    Hold,
}

impl Gesture {
    pub const ALL: [Gesture; 3] = [Gesture::Press, Gesture::PressWithModifier, Gesture::Hold];

    pub fn from_kind(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::ButtonPress => Some(Gesture::Press),
            EventKind::ButtonPressWithModifier => Some(Gesture::PressWithModifier),
            EventKind::ButtonHold => Some(Gesture::Hold),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub button: ButtonId,
    pub modifier: Option<ButtonId>,
    pub gesture: Gesture,
}

impl BindingKey {
    pub fn new(button: ButtonId, modifier: Option<ButtonId>, gesture: Gesture) -> Self {
        Self {
            button,
            modifier,
            gesture,
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            Some(modifier) => write!(f, "{:?} {}+{}", self.gesture, modifier, self.button),
            None => write!(f, "{:?} {}", self.gesture, self.button),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CameraAction {
    /// Go to the named preset and wait for the camera to settle
    RecallPreset(String),
    /// Wait for the camera to settle, then store its position under the name
    StorePreset(String),
    /// Go to the home position and wait for the camera to settle
    GoHome,
    EnableAutoFocus,
    /// Placeholder for future bindings; does nothing
    Reserved,
}

static RESERVED: CameraAction = CameraAction::Reserved;

#[derive(Clone, Debug)]
pub struct ActionTable {
    bindings: HashMap<BindingKey, CameraAction>,
}

impl ActionTable {
    pub fn standard() -> Self {
        let modifiers = std::iter::once(None).chain(ButtonId::ALL.into_iter().map(Some));

        let mut bindings = HashMap::new();
        for modifier in modifiers {
            for button in ButtonId::ALL {
                for gesture in Gesture::ALL {
                    let key = BindingKey::new(button, modifier, gesture);
                    bindings.insert(key, standard_binding(key));
                }
            }
        }

        Self { bindings }
    }

    pub fn lookup(&self, key: &BindingKey) -> &CameraAction {
        self.bindings.get(key).unwrap_or(&RESERVED)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Keys bound to something other than [`CameraAction::Reserved`]
    pub fn active_bindings(&self) -> impl Iterator<Item = (&BindingKey, &CameraAction)> {
        self.bindings
            .iter()
            .filter(|(_, action)| **action != CameraAction::Reserved)
    }
}

fn standard_binding(key: BindingKey) -> CameraAction {
    use ButtonId::{J1, J2, J3, J4, L, R};

    match (key.button, key.modifier, key.gesture) {
        (J1 | J2 | J3 | J4, None, Gesture::Press) => {
            CameraAction::RecallPreset(key.button.to_string())
        }
        (J1 | J2 | J3 | J4, Some(R), Gesture::PressWithModifier) => {
            CameraAction::StorePreset(key.button.to_string())
        }
        (J1, None, Gesture::Hold) => CameraAction::GoHome,
        (L, None, Gesture::Hold) => CameraAction::EnableAutoFocus,

        // Reserved for future bindings
        (J1 | J2 | J3 | J4, Some(L), Gesture::PressWithModifier) => CameraAction::Reserved,
        (J2 | J3 | J4, None, Gesture::Hold) => CameraAction::Reserved,
        (L | R, None, Gesture::Press) => CameraAction::Reserved,
        (R, None, Gesture::Hold) => CameraAction::Reserved,
        (_, Some(_), Gesture::Hold) => CameraAction::Reserved,

        // Modifier combinations the default layout never produces
        (J1 | J2 | J3 | J4, Some(J1 | J2 | J3 | J4), Gesture::PressWithModifier) => {
            CameraAction::Reserved
        }
        (L | R, Some(_), Gesture::PressWithModifier) => CameraAction::Reserved,

        // Gesture and modifier disagree; the button bank never emits these
        (_, Some(_), Gesture::Press) => CameraAction::Reserved,
        (_, None, Gesture::PressWithModifier) => CameraAction::Reserved,
    }
}
