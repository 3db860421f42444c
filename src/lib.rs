//! Pinpoint — resolves free-form postal addresses into validated map coordinates.

pub mod batch;
pub mod config;
pub mod location;
pub mod server;
