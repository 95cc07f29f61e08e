pub mod auth;
pub mod error;
pub mod manager;
pub mod pages;
pub mod state;

pub use state::AppState;
