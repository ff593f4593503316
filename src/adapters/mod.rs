// Adapters: concrete implementations of the domain ports.

pub mod kite;
pub mod storage;
pub mod store;

pub use kite::KiteClient;
pub use storage::LocalStorage;
pub use store::OrderStore;
