// handlers/public/mod.rs - Handlers that never require a session

pub mod health;
pub mod pages;
pub mod session;
