pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod layout;
pub mod models;
pub mod session;
pub mod state;
pub mod store;
pub mod tracker;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use tracker::{aggregate_row, apply_toggle, mood_for, toggle, Block, CellStatus, Mood};
