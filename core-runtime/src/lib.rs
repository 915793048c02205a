//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the library engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system (sync lifecycle, discovery previews, library changes)
//! - Observable discovery state
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the other crates depend on.
//! It establishes the logging conventions, the configuration builder and the
//! two observation channels exposed to hosts: a lossy broadcast of events and
//! a single latest-value discovery state.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod state;

pub use error::{Error, Result};
pub use state::{DiscoveryState, DiscoveryStateHolder, DiscoveryStateWatcher};
