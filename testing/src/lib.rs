//! # Trolley Testing
//!
//! Testing utilities and helpers for the Trolley storefront state engine.
//!
//! This crate provides:
//! - Mock implementations of Environment traits ([`FixedClock`],
//!   [`MemoryKeyStore`])
//! - [`ReducerTest`], a fluent Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use trolley_testing::{MemoryKeyStore, test_clock};
//! use trolley_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_cart_flow() {
//!     let env = test_environment();
//!     let store = Store::new(CartState::guest(), CartReducer, env);
//!
//!     store.send(CartAction::AddItem(item)).await;
//!
//!     let total = store.state(|s| s.cart.total_amount).await;
//!     assert_eq!(total, 100);
//! }
//! ```

use chrono::{DateTime, Utc};
use trolley_core::environment::Clock;

/// In-memory key/value store for tests and development
pub mod memory_store;


/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use trolley_testing::mocks::FixedClock;
    /// use trolley_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use memory_store::MemoryKeyStore;
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
