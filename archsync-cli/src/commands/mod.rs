//! CLI command implementations.

pub mod check;
pub mod common;
pub mod config;
pub mod manifest;
pub mod status;
pub mod sync;
