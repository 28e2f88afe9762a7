//! Service Layer
//!
//! Business logic sitting between the HTTP handlers and the storage tiers.

mod image_service;

pub use image_service::*;
