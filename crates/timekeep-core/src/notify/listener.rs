//! Delivery listener.
//!
//! The inactivity reminder has no native fixed-interval recurrence. It is a
//! one-state machine instead: while `Pending`, a delivery of its key
//! recomputes the reminder, which either re-enters `Pending` at
//! `now + interval` (reading the live interval setting) or drops to idle
//! when a timer is running or the feature was switched off.
//!
//! Timer and routine notifications need nothing after delivery and are
//! ignored here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::keys::INACTIVITY_KEY;
use super::scheduler::{InactivityOutcome, TriggerScheduler};
use crate::events::DeliveryEvent;

/// What the listener did with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerAction {
    /// Not registered, or not a key this listener cares about.
    Ignored,
    /// The inactivity reminder was recomputed.
    Renewed(InactivityOutcome),
}

pub struct DeliveryListener {
    scheduler: Arc<TriggerScheduler>,
    registered: AtomicBool,
}

impl DeliveryListener {
    pub fn new(scheduler: Arc<TriggerScheduler>) -> Self {
        Self {
            scheduler,
            registered: AtomicBool::new(false),
        }
    }

    /// Start reacting to deliveries. A second call is a no-op and returns
    /// `false`.
    pub fn register(&self) -> bool {
        let first = !self.registered.swap(true, Ordering::AcqRel);
        if first {
            debug!("delivery listener registered");
        }
        first
    }

    pub fn unregister(&self) {
        if self.registered.swap(false, Ordering::AcqRel) {
            debug!("delivery listener unregistered");
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Handle one delivery, foreground or background alike.
    pub async fn on_delivered(&self, event: &DeliveryEvent) -> ListenerAction {
        if !self.is_registered() || event.key != INACTIVITY_KEY {
            return ListenerAction::Ignored;
        }
        info!(origin = ?event.origin, "inactivity reminder delivered, renewing");
        let outcome = self.scheduler.reconcile_inactivity(false, None).await;
        ListenerAction::Renewed(outcome)
    }

    /// Drain delivery events until every sender is dropped.
    ///
    /// Returns how many deliveries led to a renewal.
    pub async fn listen(&self, mut deliveries: mpsc::UnboundedReceiver<DeliveryEvent>) -> usize {
        let mut renewed = 0;
        while let Some(event) = deliveries.recv().await {
            if let ListenerAction::Renewed(_) = self.on_delivered(&event).await {
                renewed += 1;
            }
        }
        renewed
    }
}
