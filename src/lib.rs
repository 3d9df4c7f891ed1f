//! Sensor dashboard - cached, paginated and polled view of machine sensor data
//!
//! This library exposes the core modules for testing and reuse.

pub mod api;
pub mod common;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod sync;
