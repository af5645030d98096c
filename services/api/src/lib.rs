//! services/api/src/lib.rs

pub mod adapters;
pub mod cache;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod web;
