//! lotline identifier service library.
//!
//! This crate primarily ships the `lotline` binary, but exposes its library
//! surface for integration testing and embedding.

pub mod allocator;
pub mod api;
pub mod config;
pub mod db;
pub mod service;
pub mod state;
