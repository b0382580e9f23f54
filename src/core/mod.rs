//! Geographic primitives, projection math and map configuration.

pub mod config;
pub mod constants;
pub mod geo;
pub mod projection;
pub mod viewport;
