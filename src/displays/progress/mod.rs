pub mod progress_display;

pub use progress_display::*;
