pub mod frame_buffer;
pub mod frame_table;
pub mod region;

pub use frame_buffer::*;
pub use frame_table::*;
pub use region::*;
