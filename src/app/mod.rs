// HTTP API (axum): shared state, error envelope, route modules.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
pub use server::{router, serve};
pub use state::{AppState, SharedState};
