use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::events::LiveEvent;

pub type ObserverId = Uuid;

/// Per-campaign fan-out to live observers.
///
/// Publishing never blocks: a full observer queue drops the event for that
/// observer only, and closed observers are pruned on the next publish.
#[derive(Clone, Default)]
pub struct LiveNotifier {
    channels: Arc<DashMap<String, HashMap<ObserverId, mpsc::Sender<LiveEvent>>>>,
}

impl LiveNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, campaign_id: &str, sender: mpsc::Sender<LiveEvent>) -> ObserverId {
        let id = Uuid::new_v4();
        self.channels
            .entry(campaign_id.to_string())
            .or_default()
            .insert(id, sender);
        info!("👀 [NOTIFIER] Observer {} joined {}", id, campaign_id);
        id
    }

    /// Convenience for callers that just want a receiver.
    pub fn subscribe_channel(&self, campaign_id: &str, capacity: usize) -> (ObserverId, mpsc::Receiver<LiveEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (self.subscribe(campaign_id, tx), rx)
    }

    pub fn unsubscribe(&self, campaign_id: &str, id: ObserverId) -> bool {
        let removed = match self.channels.get_mut(campaign_id) {
            Some(mut observers) => observers.remove(&id).is_some(),
            None => false,
        };
        self.channels.remove_if(campaign_id, |_, observers| observers.is_empty());
        if removed {
            info!("👋 [NOTIFIER] Observer {} left {}", id, campaign_id);
        }
        removed
    }

    pub fn observer_count(&self, campaign_id: &str) -> usize {
        self.channels.get(campaign_id).map(|o| o.len()).unwrap_or(0)
    }

    /// Returns how many observers accepted the event.
    pub fn publish(&self, campaign_id: &str, event: LiveEvent) -> usize {
        let Some(mut observers) = self.channels.get_mut(campaign_id) else {
            return 0;
        };

        let mut delivered = 0;
        observers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!("[NOTIFIER] Observer {} is lagging, event dropped", id);
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("[NOTIFIER] Observer {} closed, pruning", id);
                false
            }
        });
        drop(observers);

        self.channels.remove_if(campaign_id, |_, observers| observers.is_empty());
        delivered
    }
}
