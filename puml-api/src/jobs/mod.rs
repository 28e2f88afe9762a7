//! Background Jobs for the PUML API
//!
//! - `reaper`: Evicts artifacts that have not been requested recently
//!
//! # Usage
//!
//! The reaper is normally owned by [`crate::lifecycle::Lifecycle`], which
//! spawns it on start and stops it on shutdown:
//!
//! ```ignore
//! use puml_api::jobs::{reaper_task, ReaperConfig};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handle = tokio::spawn(reaper_task(service, ReaperConfig::default(), shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

pub mod reaper;

pub use reaper::{reap_once, reaper_task, ReaperConfig, ReaperMetrics, ReaperSnapshot};
