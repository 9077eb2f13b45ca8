pub mod config;
pub mod console;
pub mod error;
pub mod reconcile;
pub mod roster;
pub mod scanner;
pub mod session;
pub mod store;
pub mod ticket;

// Load env from a simple, standardized location resolution.
// This uses dotenvy::dotenv().ok() which loads .env if present and silently ignores if missing.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}
