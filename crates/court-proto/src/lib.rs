pub mod config;
pub mod dates;
pub mod error;
pub mod platform;
pub mod protocol;
pub mod results;
