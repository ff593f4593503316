pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{KiteClient, LocalStorage, OrderStore};
pub use config::AppConfig;
#[cfg(feature = "cli")]
pub use config::cli::{Cli, Command};

pub use core::gtt_service::GttService;
pub use utils::error::{GttError, Result};
