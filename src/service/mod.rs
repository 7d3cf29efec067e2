//! Service coordination: application state, wiring and background tasks

pub mod app;

pub use app::AppState;
