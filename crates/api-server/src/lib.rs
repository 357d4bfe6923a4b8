#![warn(clippy::unwrap_used)]

pub mod rest;
pub mod segment_rest;
pub mod server;

pub use rest::AppState;
pub use server::{router, ApiServer};
