pub mod csv_sync;
pub mod gtt_service;
pub mod holdings;
pub mod saved_filters;
pub mod trigger;

pub use crate::domain::ports::{Broker, Storage};
pub use crate::utils::error::Result;
