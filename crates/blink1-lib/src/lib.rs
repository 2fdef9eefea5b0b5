//! blink1-lib: control ThingM blink(1) USB notification lights.

pub mod codec;
pub mod color;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod protocol;
pub mod retry;
pub mod state;
pub mod tickle;

pub use color::Rgb;
pub use controller::{Controller, ControllerOptions};
pub use error::Blink1Error;
pub use state::{LedIndex, LightState, Pattern, PatternState, StateSequence};
pub use tickle::ManualTickle;
