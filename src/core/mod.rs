pub mod aton;
pub mod display;
pub mod error;
pub mod framebuffer;
pub mod misc;
pub mod options;
pub mod protocol;
pub mod session;
pub mod transform;
