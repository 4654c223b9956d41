pub mod config;
pub mod errors;
pub mod loader;
pub mod problem;
pub mod status;

pub use config::*;
pub use errors::*;
pub use loader::*;
pub use problem::*;
pub use status::*;
