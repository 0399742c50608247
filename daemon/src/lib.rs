// Promodraw Daemon Library
// Exposes internal modules for integration testing

extern crate log;

pub mod config;
pub mod core;
pub mod posthog;
pub mod rpc;
