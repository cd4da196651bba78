pub mod constants;

pub use constants::*;

pub use super::display::*;
pub use super::error::*;
pub use super::framebuffer::*;
pub use super::misc::*;
pub use super::options::*;
pub use super::protocol::*;
pub use super::session::*;
pub use super::transform::*;
