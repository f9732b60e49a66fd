pub mod app;
pub mod audit;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod permissions;
pub mod session;
pub mod state;
pub mod storage;
pub mod ui;

pub use app::app;
pub use state::AppState;
