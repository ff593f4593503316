pub mod custom_gtt;
pub mod debug;
pub mod filters;
pub mod gtt;
pub mod holdings;
