// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod post;
mod snapshot;

// Re-export all public types
pub use config::{Config, CrawlerConfig, LoggingConfig, PathsConfig, SiteConfig};
pub use post::{Located, PostDetail, PostRef};
pub use snapshot::{ContentSnapshot, HeadMarker, ListSnapshot, Snapshot};
