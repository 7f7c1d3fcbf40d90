pub mod app;
pub mod config;
pub mod handlers;
pub mod users;

pub use app::{build_router, AppState};
