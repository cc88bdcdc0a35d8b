//! Tab visibility gate.
//!
//! The polling loop must not burn requests while the user is not looking.
//! The embedding shell reports visibility transitions through a
//! [`VisibilityGate`]; the loop subscribes and suspends its timer while
//! hidden. Resuming fires exactly one immediate poll if one was pending,
//! then the fixed interval takes over again, so no backlog of missed polls
//! accumulates.

use tokio::sync::watch;

/// Whether the tab is currently visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Publisher side of the visibility signal. Owned by the embedding shell.
#[derive(Debug)]
pub struct VisibilityGate {
    tx: watch::Sender<Visibility>,
}

impl VisibilityGate {
    /// Create a gate. Tabs start visible.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Visibility::Visible);
        Self { tx }
    }

    /// Report a visibility transition.
    pub fn set(&self, visibility: Visibility) {
        self.tx.send_replace(visibility);
    }

    /// Subscribe a polling loop to visibility changes.
    pub fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.tx.subscribe()
    }

    /// Current visibility.
    pub fn current(&self) -> Visibility {
        *self.tx.borrow()
    }
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_visible() {
        let gate = VisibilityGate::new();
        assert_eq!(gate.current(), Visibility::Visible);
    }

    #[test]
    fn test_transitions_observed_by_subscriber() {
        let gate = VisibilityGate::new();
        let rx = gate.subscribe();

        gate.set(Visibility::Hidden);
        assert_eq!(*rx.borrow(), Visibility::Hidden);

        gate.set(Visibility::Visible);
        assert_eq!(*rx.borrow(), Visibility::Visible);
    }
}
