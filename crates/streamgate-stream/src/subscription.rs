//! `SubscriptionRegistry`: live upstream subscriptions by generated id.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use indexmap::IndexMap;
use parking_lot::Mutex;
use streamgate_core::{
    bounded, error::StreamError, CancelHandle, StreamsClient, SubscribeParams, UpstreamFeed,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::filter::FilterPolicy;
use crate::router::BroadcastRouter;

struct ActiveSubscription {
    cancel: Box<dyn CancelHandle>,
    pump: JoinHandle<()>,
}

/// Owns every active subscription.
///
/// An entry exists exactly while its subscription is active: it is added
/// after the upstream feed opened and removed once its cancel handle
/// succeeded or the feed ended on its own, so a second cancel of the same id
/// reports `SubscriptionNotFound`.
pub struct SubscriptionRegistry {
    remote: Arc<dyn StreamsClient>,
    router: Arc<BroadcastRouter>,
    remote_timeout: Duration,
    active: Arc<Mutex<IndexMap<String, ActiveSubscription>>>,
}

impl SubscriptionRegistry {
    pub fn new(
        remote: Arc<dyn StreamsClient>,
        router: Arc<BroadcastRouter>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            remote,
            router,
            remote_timeout,
            active: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    /// Open an upstream feed and start routing its events through `policy`.
    pub async fn create(
        &self,
        policy: FilterPolicy,
        params: SubscribeParams,
    ) -> Result<String, StreamError> {
        let UpstreamFeed { mut events, cancel } =
            bounded(self.remote_timeout, self.remote.subscribe(params)).await?;
        let id = Uuid::new_v4().to_string();

        let router = Arc::clone(&self.router);
        let active = Arc::clone(&self.active);
        let sub_id = id.clone();

        // The entry is inserted before the pump can observe the end of the
        // feed and remove it.
        let mut guard = self.active.lock();
        let pump = tokio::spawn(async move {
            while let Some(item) = events.next().await {
                match item {
                    Ok(payload) => {
                        router.route(&sub_id, &policy, payload);
                    }
                    Err(e) => warn!(subscription = %sub_id, error = %e, "upstream stream error"),
                }
            }
            if active.lock().shift_remove(&sub_id).is_some() {
                warn!(subscription = %sub_id, "upstream feed ended, subscription removed");
            }
        });
        guard.insert(id.clone(), ActiveSubscription { cancel, pump });
        drop(guard);
        info!(subscription = %id, "subscription active");
        Ok(id)
    }

    /// Cancel one subscription.
    ///
    /// If the cancel handle fails the subscription stays registered and the
    /// remote error is returned.
    pub fn cancel(&self, id: &str) -> Result<(), StreamError> {
        let mut active = self.active.lock();
        let sub = active
            .get(id)
            .ok_or_else(|| StreamError::SubscriptionNotFound { id: id.to_string() })?;
        sub.cancel.cancel()?;
        if let Some(sub) = active.shift_remove(id) {
            sub.pump.abort();
        }
        info!(subscription = %id, "subscription cancelled");
        Ok(())
    }

    /// Active subscription ids in creation order.
    pub fn list(&self) -> Vec<String> {
        self.active.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel everything, e.g. on process teardown. Failures are logged.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.active.lock().drain(..).collect();
        for (id, sub) in drained {
            if let Err(e) = sub.cancel.cancel() {
                warn!(subscription = %id, error = %e, "cancel failed during shutdown");
            }
            sub.pump.abort();
        }
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        for (_, sub) in self.active.lock().drain(..) {
            sub.pump.abort();
        }
    }
}
