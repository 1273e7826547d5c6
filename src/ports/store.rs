//! Subscription store port (§6.3): durable persistence of subscription
//! cursors. The engine treats this as complete-overwrite storage — it never
//! persists events, only where each subscription has gotten to.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::StoredSubscription;

/// Durable storage for subscription cursors.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Load all persisted subscriptions (called once, at `watch()`/`init`).
    async fn all(&self) -> Result<Vec<StoredSubscription>, StoreError>;

    /// Persist the complete current set of subscriptions, replacing
    /// whatever was stored before (§6.3: "complete overwrite of the stored
    /// set").
    async fn save(&self, subscriptions: &[StoredSubscription]) -> Result<(), StoreError>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! In-memory subscription store for tests.

    use std::sync::Mutex;

    use super::{StoreError, StoredSubscription, SubscriptionStore};

    /// An in-memory store, useful both for tests and for embedding
    /// applications that don't need cross-restart durability.
    #[derive(Debug, Default)]
    pub struct MockSubscriptionStore {
        subscriptions: Mutex<Vec<StoredSubscription>>,
    }

    impl MockSubscriptionStore {
        /// Create an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed the store with subscriptions, as if loaded from a prior
        /// run.
        #[must_use]
        pub fn seeded(subscriptions: Vec<StoredSubscription>) -> Self {
            Self {
                subscriptions: Mutex::new(subscriptions),
            }
        }

        /// Inspect what is currently persisted (test assertions).
        pub fn snapshot(&self) -> Vec<StoredSubscription> {
            self.subscriptions
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait::async_trait]
    impl SubscriptionStore for MockSubscriptionStore {
        async fn all(&self) -> Result<Vec<StoredSubscription>, StoreError> {
            Ok(self.snapshot())
        }

        async fn save(&self, subscriptions: &[StoredSubscription]) -> Result<(), StoreError> {
            *self
                .subscriptions
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = subscriptions.to_vec();
            Ok(())
        }
    }
}
