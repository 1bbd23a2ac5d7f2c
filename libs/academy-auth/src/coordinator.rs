//! Single-flight gate for access-token refresh.
//!
//! The first caller to see a 401 becomes the leader and performs the refresh;
//! callers arriving while it runs queue up and receive the leader's outcome
//! in arrival order.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::secret::SecretString;

type Outcome = Option<SecretString>;

#[derive(Default)]
struct State {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<Outcome>>,
}

/// Refresh state shared by every request issued through one client.
///
/// Lock hold times are a few pointer moves; the lock is never held across an
/// `.await`.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<State>,
}

/// Result of [`RefreshCoordinator::acquire`].
#[must_use]
pub enum Acquired<'a> {
    /// No refresh was running; the caller must perform it.
    Leader(RefreshGuard<'a>),
    /// A refresh is already running; wait for its outcome.
    Follower(Waiter),
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the gate: `Idle -> Refreshing` for the leader, enqueue otherwise.
    pub fn acquire(&self) -> Acquired<'_> {
        let mut state = self.state.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            tracing::debug!(queued = state.waiters.len(), "refresh in flight; waiting");
            Acquired::Follower(Waiter { rx })
        } else {
            state.refreshing = true;
            Acquired::Leader(RefreshGuard {
                coordinator: self,
                released: false,
            })
        }
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of callers waiting on the current refresh.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn finish(&self, outcome: &Outcome) -> usize {
        let waiters = {
            let mut state = self.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        let released = waiters.len();
        for tx in waiters {
            if tx.send(outcome.clone()).is_err() {
                tracing::trace!("refresh waiter dropped before release");
            }
        }
        released
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &state.refreshing)
            .field("queued", &state.waiters.len())
            .finish()
    }
}

/// Held by the leader while it refreshes.
///
/// Dropping it without [`release`](Self::release) (for example when the
/// leader's future is cancelled) releases every waiter with `None`.
#[must_use = "dropping the guard releases waiters with no token"]
pub struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    released: bool,
}

impl RefreshGuard<'_> {
    /// Return to `Idle` and hand `outcome` to every waiter, oldest first.
    /// Returns how many waiters were released.
    pub fn release(mut self, outcome: Option<SecretString>) -> usize {
        self.released = true;
        self.coordinator.finish(&outcome)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("refresh leader dropped before completing; releasing waiters");
            self.coordinator.finish(&None);
        }
    }
}

/// A queued follower.
#[must_use = "a waiter does nothing unless awaited"]
pub struct Waiter {
    rx: oneshot::Receiver<Outcome>,
}

impl Waiter {
    /// The leader's outcome: the new access token, or `None` on failure.
    pub async fn wait(self) -> Option<SecretString> {
        self.rx.await.ok().flatten()
    }
}
