//! Command handlers

pub mod annotate;
pub mod config;
pub mod feed;
pub mod status;
pub mod watch;
