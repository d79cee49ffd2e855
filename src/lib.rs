pub mod board;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod logging;

pub use boardsync_common as common;
