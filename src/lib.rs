//! Research Assistant: search research articles, keep a local-first search
//! history mirrored to a hosted store, and export article summaries.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod repository;
pub mod rpc_handler;
pub mod services;
pub mod telemetry;
pub mod types;
