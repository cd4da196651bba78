pub mod receiver_options;

pub use receiver_options::*;
