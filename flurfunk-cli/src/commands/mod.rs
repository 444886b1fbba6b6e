//! CLI command implementations.

pub mod common;
pub mod config;
pub mod nearby;
pub mod post;
pub mod radius;
pub mod watch;
