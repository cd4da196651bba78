pub mod recording_display;

pub use recording_display::*;
