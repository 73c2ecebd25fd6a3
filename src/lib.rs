//! StatusWatch - website availability dashboard backend.
//!
//! Turns recorded health-check ticks into per-website status views: a
//! fixed 30-minute uptime chart plus current status, uptime and latency.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod refresh;
pub mod source;
pub mod web;
