//! File-system storage adapters.

pub mod config;
