// handlers/protected/mod.rs - Handlers behind the route guard
//
// Every handler takes an `Actor` (resolved session and active profile) and
// re-checks role requirements with `crate::permissions` before mutating state.

pub mod audit;
pub mod files;
pub mod pages;
pub mod profile;
pub mod schools;
pub mod users;
pub mod utils;
