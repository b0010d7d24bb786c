pub mod app;
pub mod cache;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod source;
pub mod state;
pub mod ui;

pub use app::router;
pub use config::{Config, DataSource};
pub use state::AppState;
