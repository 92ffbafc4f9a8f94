//! Core types and traits for think-space
//!
//! This crate provides the error taxonomy, configuration loading, logging
//! setup and the in-process session store shared by the other think-space
//! components.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use error::{Error, Result};
