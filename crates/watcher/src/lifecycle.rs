//! Watcher lifecycle: `Constructed -> Running -> Closed`
//!
//! The current state lives in a `tokio::sync::watch` channel so that the
//! dispatch task and every pending debounce task can select on the close
//! signal instead of discovering it through a dropped channel.

use crate::error::{Result, WatchError};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle state of a [`Watcher`](crate::Watcher)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Folders discovered and registered, no events processed yet
    Constructed,
    /// Dispatch task running
    Running,
    /// Terminal; output streams closed
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Constructed => write!(f, "constructed"),
            State::Running => write!(f, "running"),
            State::Closed => write!(f, "closed"),
        }
    }
}

/// Shared handle to the lifecycle state
#[derive(Clone)]
pub(crate) struct Lifecycle {
    tx: Arc<watch::Sender<State>>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(State::Constructed);
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn state(&self) -> State {
        *self.tx.borrow()
    }

    /// Move `Constructed -> Running`
    pub(crate) fn begin_running(&self) -> Result<()> {
        let mut actual = State::Constructed;
        let moved = self.tx.send_if_modified(|state| {
            actual = *state;
            if *state == State::Constructed {
                *state = State::Running;
                true
            } else {
                false
            }
        });

        if moved {
            Ok(())
        } else {
            Err(WatchError::InvalidState {
                expected: State::Constructed,
                actual,
            })
        }
    }

    /// Move to `Closed`. Returns false if already closed.
    pub(crate) fn close(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == State::Closed {
                false
            } else {
                *state = State::Closed;
                true
            }
        })
    }

    /// Resolves once the state is `Closed`
    pub(crate) fn closed(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // The sender lives as long as any Lifecycle clone, and every
            // clone closes before it is dropped, so an error here also means
            // the watcher is gone.
            let _ = rx.wait_for(|state| *state == State::Closed).await;
        }
    }
}
