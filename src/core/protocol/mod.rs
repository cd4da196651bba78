pub mod client;
pub mod decode;
pub mod encode;
pub mod packet;

pub use client::Client;
pub use decode::read_packet;
pub use encode::{encode_packet, write_packet};
pub use packet::*;
