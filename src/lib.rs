pub mod config;
pub mod domain;
pub mod handlers;
pub mod srs;
pub mod state;
pub mod stats;
pub mod store;
