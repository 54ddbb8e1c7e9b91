//! services/api/src/lib.rs
//!
//! The chapter maps HTTP service: storage adapters, configuration, and the
//! Axum web layer. The binaries in `src/bin` are thin wrappers around it.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
