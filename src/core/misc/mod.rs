pub mod progressreporter;
pub mod status;

pub use progressreporter::*;
pub use status::*;
