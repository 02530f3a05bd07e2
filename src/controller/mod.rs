//! Controller subsystem for joystick input handling
//!
//! Turns raw HID reports into semantic events:
//!
//! 1. [`device`] - HID access and report parsing
//! 2. [`buttons`] - Per-button press/hold/modifier state machines
//! 3. [`axis`] - Deadzone and inversion for the three stick axes
//! 4. [`input_poller`] - One read per tick, producing [`event::Event`]s
//! 5. [`controller_handle`] - Supervision and lifecycle
//!
//! # Architecture
//!
//! ```text
//! Joystick ──► RawReport ──► ButtonBank ─┐
//!                       └──► AxisMapper ─┴─► Vec<Event> ──► ModeDispatcher
//! ```

pub mod axis;
pub mod buttons;
pub mod controller_handle;
pub mod device;
pub mod event;
pub mod input_poller;
