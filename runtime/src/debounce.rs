//! Leading-edge write coalescing.
//!
//! Persistence writes triggered by ordinary cart mutations are coalesced
//! with a short window: the first mutation in a burst fires an immediate
//! write, and further mutations inside the window do not re-trigger. After
//! the window elapses, the next mutation fires again. This bounds write
//! amplification from rapid increment/decrement taps while keeping the
//! persisted state reasonably fresh.
//!
//! The gate is an explicit component rather than a closure over a timer so
//! that teardown is first-class:
//!
//! - [`DebounceGate::cancel`] invalidates every outstanding
//!   [`WriteTicket`], so an in-flight write for a scope that no longer
//!   exists abandons itself instead of writing stale data. Cancellation
//!   never suppresses writes fired afterwards - those carry a fresh
//!   generation.
//! - [`DebounceGate::flush`] fires unconditionally *and* invalidates
//!   earlier tickets, which is what makes a reset-then-crash read back the
//!   reset state rather than a resurrected snapshot.
//!
//! Time is measured with [`tokio::time::Instant`] so paused-clock tests
//! control the window deterministically.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Default coalescing window for persistence writes.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct GateState {
    /// End of the current coalescing window, if one is open.
    window_closes_at: Option<Instant>,
    /// Bumped on cancel/flush; tickets from older generations are dead.
    generation: u64,
}

/// Proof that a write is allowed to proceed.
///
/// The async write must call [`WriteTicket::is_live`] immediately before
/// touching storage: a ticket issued before a `cancel` or `flush` is dead
/// and the write must be abandoned.
#[derive(Debug, Clone)]
pub struct WriteTicket {
    generation: u64,
    inner: Arc<Mutex<GateState>>,
}

impl WriteTicket {
    /// Whether this ticket's write is still wanted.
    #[must_use]
    pub fn is_live(&self) -> bool {
        let state = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.generation == self.generation
    }
}

/// Leading-edge, no-trailing debounce gate for persistence writes.
///
/// Clones share the same window and generation, so a gate can live in a
/// reducer environment that is cloned into spawned effects.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    window: Duration,
    inner: Arc<Mutex<GateState>>,
}

impl DebounceGate {
    /// Create a gate with the given coalescing window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            inner: Arc::new(Mutex::new(GateState {
                window_closes_at: None,
                generation: 0,
            })),
        }
    }

    /// Attempt a leading-edge fire.
    ///
    /// Returns a ticket if no window is open (the write should proceed and
    /// a new window opens), or `None` if the write coalesces into the
    /// window opened by an earlier fire.
    #[must_use]
    pub fn try_fire(&self) -> Option<WriteTicket> {
        let mut state = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        if state.window_closes_at.is_some_and(|closes_at| now < closes_at) {
            metrics::counter!("debounce.coalesced").increment(1);
            tracing::trace!("write coalesced into open debounce window");
            return None;
        }

        state.window_closes_at = Some(now + self.window);
        metrics::counter!("debounce.fired").increment(1);
        Some(WriteTicket {
            generation: state.generation,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Fire unconditionally, invalidating any earlier in-flight write.
    ///
    /// Used by operations that must never lose their persist to coalescing
    /// (cart reset). Opens a fresh window so immediately following ordinary
    /// mutations still coalesce.
    #[must_use]
    pub fn flush(&self) -> WriteTicket {
        let mut state = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        state.window_closes_at = Some(Instant::now() + self.window);
        metrics::counter!("debounce.flushed").increment(1);
        WriteTicket {
            generation: state.generation,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Invalidate all outstanding tickets and close the window.
    ///
    /// Called on scope teardown (identity transition, logout). Writes fired
    /// after the cancel carry a new generation and proceed normally.
    pub fn cancel(&self) {
        let mut state = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        state.window_closes_at = None;
        metrics::counter!("debounce.cancelled").increment(1);
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
#[allow(clippy::panic)] // Test code can panic on setup failure
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_fire_passes_burst_coalesces() {
        let gate = DebounceGate::new(Duration::from_millis(100));

        assert!(gate.try_fire().is_some());
        assert!(gate.try_fire().is_none());
        assert!(gate.try_fire().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn window_elapse_allows_fresh_fire() {
        let gate = DebounceGate::new(Duration::from_millis(100));

        assert!(gate.try_fire().is_some());
        tokio::time::advance(Duration::from_millis(101)).await;
        assert!(gate.try_fire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_kills_outstanding_ticket_but_not_future_fires() {
        let gate = DebounceGate::new(Duration::from_millis(100));

        let ticket = gate.try_fire().unwrap_or_else(|| panic!("first fire"));
        gate.cancel();
        assert!(!ticket.is_live());

        // A fire after the cancel proceeds with a live ticket.
        let fresh = gate.try_fire().unwrap_or_else(|| panic!("post-cancel fire"));
        assert!(fresh.is_live());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_fires_inside_open_window_and_invalidates_predecessor() {
        let gate = DebounceGate::new(Duration::from_millis(100));

        let first = gate.try_fire().unwrap_or_else(|| panic!("first fire"));
        let flushed = gate.flush();

        assert!(!first.is_live());
        assert!(flushed.is_live());

        // The flush reopened the window, so ordinary writes coalesce.
        assert!(gate.try_fire().is_none());
    }
}
