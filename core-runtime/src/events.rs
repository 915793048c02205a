//! # Event Bus System
//!
//! Broadcast channel for everything the engine wants hosts to hear about but
//! does not need acknowledged: sync run lifecycle, album previews produced
//! during discovery, and library mutations.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps one enum per domain
//! - **EventBus**: Clonable handle around a `tokio::sync::broadcast` sender
//! - **EventStream**: Receiver wrapper with an optional filter
//!
//! The bus is lossy. A subscriber that falls more than the buffer size behind
//! receives `RecvError::Lagged(n)` and continues with newer events; emitting
//! with no subscribers is not an error anyone needs to act on, so producers
//! call `event_bus.emit(..).ok()`.
//!
//! Discovery *state* (idle, scanning, rebuilding) is not an event. It lives in
//! [`crate::state`] where a late subscriber still sees the latest value.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::Cancelled {
//!         run_id: "run-1".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Sync cancelled");
//! # }
//! ```

use bridge_traits::{AlbumPalette, DecodedArtwork};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Discovery pipeline output
    Discovery(DiscoveryEvent),
    /// Sync run lifecycle
    Sync(SyncEvent),
    /// Library mutations
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Discovery(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Cancelled { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::LibraryReplaced { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Discovery Events
// ============================================================================

/// First-seen album artwork, published while metadata extraction is still
/// running so a UI can show something before the library is rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryPreview {
    /// Album name as tagged
    pub name: String,
    /// Decoded artwork at preview size
    pub image: DecodedArtwork,
    /// `None` when palette generation failed
    pub palette: Option<AlbumPalette>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DiscoveryEvent {
    /// An album preview is available.
    Preview(DiscoveryPreview),
    /// The media index finished rescanning a root.
    RescanCompleted {
        root: String,
        /// Files the index visited under `root`
        files: u64,
    },
}

impl DiscoveryEvent {
    fn description(&self) -> &str {
        match self {
            DiscoveryEvent::Preview(_) => "Album preview available",
            DiscoveryEvent::RescanCompleted { .. } => "Media index rescan completed",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Lifecycle of one sync run. Every variant carries the run id assigned when
/// the run started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A run acquired the sync lock.
    Started {
        run_id: String,
        /// Generation check bypassed
        forced: bool,
    },
    /// The media index generation matched the stored one; nothing to do.
    Skipped { run_id: String, generation: i64 },
    /// The library was replaced.
    Completed {
        run_id: String,
        tracks: u64,
        albums: u64,
        duration_ms: u64,
    },
    /// The run aborted and the stored library was left untouched.
    Failed { run_id: String, message: String },
    /// The run was cancelled before commit.
    Cancelled { run_id: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Skipped { .. } => "Sync skipped, media index unchanged",
            SyncEvent::Completed { .. } => "Sync completed",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Cancelled { .. } => "Sync cancelled",
        }
    }

    /// Run id carried by the event.
    pub fn run_id(&self) -> &str {
        match self {
            SyncEvent::Started { run_id, .. }
            | SyncEvent::Skipped { run_id, .. }
            | SyncEvent::Completed { run_id, .. }
            | SyncEvent::Failed { run_id, .. }
            | SyncEvent::Cancelled { run_id } => run_id,
        }
    }

    /// True for the variants that end a run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncEvent::Started { .. })
    }
}

// ============================================================================
// Library Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A sync committed a new track and album set.
    LibraryReplaced { tracks: u64, albums: u64 },
    /// A track's favorite flag changed.
    FavoriteChanged { track_id: i64, is_favorite: bool },
    /// A settings key was written.
    SettingsChanged { key: String },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::LibraryReplaced { .. } => "Library replaced",
            LibraryEvent::FavoriteChanged { .. } => "Favorite changed",
            LibraryEvent::SettingsChanged { .. } => "Settings changed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` is the number of events buffered per subscriber before it
    /// starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it, or an error when
    /// there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Subscribe to all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to album previews only.
    pub fn subscribe_previews(&self) -> EventStream {
        EventStream::new(self.subscribe())
            .filter(|event| matches!(event, CoreEvent::Discovery(DiscoveryEvent::Preview(_))))
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. Returns `None` if no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
