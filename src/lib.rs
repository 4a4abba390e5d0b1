//! High/Low outcome prediction service.
//!
//! Fetches recent dice results from the upstream feed, runs a bank of
//! heuristic models through a performance-weighted ensemble and serves the
//! resulting prediction over HTTP.

pub mod adapters;
pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod services;

pub use config::AppConfig;
pub use engine::PredictionEngine;
pub use error::{Result, SicboError};
