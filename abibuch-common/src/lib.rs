//! # Abibuch Common Library
//!
//! Shared code for the Abibuch yearbook server:
//! - Configuration loading and root folder resolution
//! - Database initialization, schema and migrations
//! - Domain enums and reference-data models
//! - Password hashing and token generation
//! - Time and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod password;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
