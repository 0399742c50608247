pub mod api;
pub mod crypto;
pub mod models;
pub mod utils;
pub mod window;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
