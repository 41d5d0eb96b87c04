pub mod assistant_handler;
pub mod file_handler;

pub use assistant_handler::*;
pub use file_handler::*;
