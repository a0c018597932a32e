pub mod config;
pub mod error;
pub mod logging;

pub mod archive;
pub mod export;
pub mod media;
pub mod scheduler;
pub mod transfer;
