//! CLI command handlers, one file per command.

mod chats;
mod config;
pub(super) mod export;

pub use chats::run_chats;
pub use config::run_config;
pub use export::run_export;
