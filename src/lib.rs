//! Workspace placeholder crate.
//!
//! This crate exposes the workspace feature flags so a host application can
//! depend on a single crate and get the `core-service` façade with the desktop
//! bridges wired in.

#[cfg(feature = "desktop-shims")]
pub use core_service::{LibraryService, LibraryServiceBuilder};
