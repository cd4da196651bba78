pub mod synthetic_sender;

pub use synthetic_sender::*;
