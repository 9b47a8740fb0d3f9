pub mod api;
pub mod config;
pub mod environment;
pub mod lifecycle;
pub mod logs;
pub mod observability;
pub mod plugins;
pub mod runtime;
pub mod skills;
pub mod state;
pub mod types;

pub use config::Config;
pub use types::*;
