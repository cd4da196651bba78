pub mod core;
pub mod displays;
pub mod senders;
