pub mod progress;
pub mod recording;

pub use progress::*;
pub use recording::*;
