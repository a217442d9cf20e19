//! Active EVSE list poller.
//!
//! Independent of any session: its own task, its own cadence
//! (`list_poll_interval_ms`), nothing shared with detail controllers.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::client::StatusClient;
use crate::config::KioskConfig;
use crate::error::Error;
use crate::status::EvseId;

/// What the list screen shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ListView {
    /// No non-empty id list received yet
    Loading,
    /// Active EVSEs, in backend order
    Ready(Vec<EvseId>),
    /// A poll failed; stays until the poller is recreated
    Failed(Error),
}

impl ListView {
    /// Ids to list, if any.
    pub fn ids(&self) -> Option<&[EvseId]> {
        match self {
            ListView::Ready(ids) => Some(ids),
            _ => None,
        }
    }

    /// Line text for one entry, e.g. `"EVSE 3"`.
    pub fn item_label(evse_id: EvseId) -> String {
        format!("EVSE {}", evse_id)
    }

    /// Apply one poll result.
    ///
    /// An empty list reads as still loading. Once failed, the view stays failed.
    fn apply(&mut self, result: Result<Vec<EvseId>, Error>) -> bool {
        if matches!(self, ListView::Failed(_)) {
            return false;
        }
        let next = match result {
            Ok(ids) if ids.is_empty() => ListView::Loading,
            Ok(ids) => ListView::Ready(ids),
            Err(err) => {
                tracing::warn!(error = %err, "active EVSE poll failed");
                ListView::Failed(err)
            }
        };
        if *self == next {
            return false;
        }
        *self = next;
        true
    }
}

/// Owner handle of a running list poller. Dropping it stops the poller.
#[derive(Debug)]
pub struct ListPoller {
    view: watch::Receiver<ListView>,
    task: JoinHandle<()>,
}

impl ListPoller {
    /// Start polling `GET /evses/active/ids` on the current tokio runtime.
    pub fn spawn<C: StatusClient>(client: Arc<C>, config: &KioskConfig) -> Self {
        let (view_tx, view) = watch::channel(ListView::Loading);
        let interval = config.list_poll_interval();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Awaited inline: one fetch at a time, applied in order
                let result = client.fetch_active_ids().await;
                view_tx.send_if_modified(|view| view.apply(result));
            }
        });

        Self { view, task }
    }

    /// Latest list view.
    pub fn view(&self) -> ListView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        let mut rx = self.view.clone();
        // Only changes after this call count as new
        rx.borrow_and_update();
        rx
    }

    /// Stop polling and wait for the task to end.
    pub async fn close(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

impl Drop for ListPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
