pub mod listener;
pub mod receiver;
pub mod session;

pub use listener::*;
pub use receiver::*;
pub use session::*;
