// handlers/mod.rs - Two-tier handler layout
//
// public:    no session required (root, auth pages, auth callbacks, health)
// protected: routes the guard resolves an actor for (/dashboard, /api/profile, ...)

pub mod protected;
pub mod public;
