//! Observable discovery state.
//!
//! A single latest-value cell built on `tokio::sync::watch`. The sync
//! coordinator owns the only [`DiscoveryStateHolder`]; everyone else gets a
//! read-only [`DiscoveryStateWatcher`]. Unlike the event bus, a watcher that
//! subscribes late still sees the current value.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// What discovery is doing right now.
///
/// `Scanning` counts files visited by a media index rescan, `Rebuilding`
/// counts files whose metadata has been extracted. For both, `current` never
/// exceeds `total` and never decreases within one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum DiscoveryState {
    #[default]
    Idle,
    Scanning { current: usize, total: usize },
    Rebuilding { current: usize, total: usize },
}

impl DiscoveryState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DiscoveryState::Idle)
    }

    /// `(current, total)` for the busy states.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match *self {
            DiscoveryState::Idle => None,
            DiscoveryState::Scanning { current, total }
            | DiscoveryState::Rebuilding { current, total } => Some((current, total)),
        }
    }
}

/// Write side of the discovery state.
#[derive(Debug)]
pub struct DiscoveryStateHolder {
    sender: watch::Sender<DiscoveryState>,
}

impl DiscoveryStateHolder {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(DiscoveryState::Idle);
        Self { sender }
    }

    /// Publish a new state. Works with zero watchers.
    pub fn set(&self, state: DiscoveryState) {
        self.sender.send_replace(state);
    }

    pub fn reset(&self) {
        self.set(DiscoveryState::Idle);
    }

    /// Publish `state` unless it would move the current phase backwards.
    ///
    /// Concurrent workers may report counts out of order; a stale count for
    /// the phase already showing is dropped. Returns whether it was published.
    pub fn advance(&self, state: DiscoveryState) -> bool {
        self.sender.send_if_modified(|current| {
            let stale = match (*current, state) {
                (
                    DiscoveryState::Rebuilding { current: shown, .. },
                    DiscoveryState::Rebuilding { current: next, .. },
                )
                | (
                    DiscoveryState::Scanning { current: shown, .. },
                    DiscoveryState::Scanning { current: next, .. },
                ) => next < shown,
                _ => false,
            };
            if !stale {
                *current = state;
            }
            !stale
        })
    }

    pub fn current(&self) -> DiscoveryState {
        *self.sender.borrow()
    }

    pub fn watch(&self) -> DiscoveryStateWatcher {
        DiscoveryStateWatcher {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish `state` and return a guard that resets to `Idle` when dropped.
    ///
    /// Dropping happens on every exit path of the scope holding the guard,
    /// including an early `?` return or the enclosing future being dropped.
    pub fn enter(&self, state: DiscoveryState) -> IdleOnDrop<'_> {
        self.set(state);
        IdleOnDrop { holder: self }
    }
}

impl Default for DiscoveryStateHolder {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by [`DiscoveryStateHolder::enter`].
#[must_use = "the state resets to Idle as soon as the guard is dropped"]
#[derive(Debug)]
pub struct IdleOnDrop<'a> {
    holder: &'a DiscoveryStateHolder,
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.holder.reset();
    }
}

/// Read side of the discovery state.
#[derive(Debug, Clone)]
pub struct DiscoveryStateWatcher {
    receiver: watch::Receiver<DiscoveryState>,
}

impl DiscoveryStateWatcher {
    pub fn current(&self) -> DiscoveryState {
        *self.receiver.borrow()
    }

    /// Wait for the next change and return the new value.
    ///
    /// Returns `None` once the holder is dropped.
    pub async fn changed(&mut self) -> Option<DiscoveryState> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }

    /// Wait until `predicate` holds for the current value.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&DiscoveryState) -> bool,
    ) -> Option<DiscoveryState> {
        self.receiver.wait_for(predicate).await.ok().map(|state| *state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let holder = DiscoveryStateHolder::new();
        assert!(holder.current().is_idle());
        assert!(holder.watch().current().is_idle());
    }

    #[test]
    fn test_late_watcher_sees_latest_value() {
        let holder = DiscoveryStateHolder::new();
        holder.set(DiscoveryState::Rebuilding {
            current: 10,
            total: 25,
        });

        let watcher = holder.watch();
        assert_eq!(watcher.current().progress(), Some((10, 25)));
    }

    #[test]
    fn test_guard_resets_to_idle() {
        let holder = DiscoveryStateHolder::new();
        {
            let _guard = holder.enter(DiscoveryState::Scanning {
                current: 0,
                total: 1,
            });
            assert!(!holder.current().is_idle());
        }
        assert!(holder.current().is_idle());
    }

    #[test]
    fn test_advance_drops_stale_counts() {
        let holder = DiscoveryStateHolder::new();
        let rebuilding = |current| DiscoveryState::Rebuilding { current, total: 30 };

        assert!(holder.advance(rebuilding(20)));
        assert!(!holder.advance(rebuilding(10)));
        assert_eq!(holder.current(), rebuilding(20));

        assert!(holder.advance(rebuilding(30)));
        assert!(holder.advance(DiscoveryState::Idle));
    }

    #[tokio::test]
    async fn test_watcher_observes_changes() {
        let holder = DiscoveryStateHolder::new();
        let mut watcher = holder.watch();

        holder.set(DiscoveryState::Scanning {
            current: 0,
            total: 3,
        });
        assert_eq!(
            watcher.changed().await,
            Some(DiscoveryState::Scanning {
                current: 0,
                total: 3
            })
        );

        drop(holder);
        assert_eq!(watcher.changed().await, None);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&DiscoveryState::Rebuilding {
            current: 1,
            total: 2,
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"Rebuilding","current":1,"total":2}"#);
    }
}
