//! Mapping of semantic controller events onto camera actions.
//!
//! The [`ModeDispatcher`] tracks whether the camera is idle, moving or focusing and
//! routes idle button gestures through the static [`ActionTable`].

pub mod action_table;
pub mod dispatcher;

pub use action_table::{ActionTable, BindingKey, CameraAction, Gesture};
pub use dispatcher::{CameraMode, DispatchSettings, ModeDispatcher};
