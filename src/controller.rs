//! Session controller actor.
//!
//! One task per open detail view. It owns the poll timer and the
//! [`SessionState`], receives attendant intents through a [`SessionHandle`],
//! and publishes a [`SessionView`] after every event. Dropping or closing
//! the handle tears the task down: the timer stops and in-flight fetches
//! are aborted, so nothing touches the session after the view is gone.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use evse_kiosk::{Client, KioskConfig, SessionController};
//!
//! # async fn example() {
//! let config = KioskConfig::default();
//! let client = Arc::new(Client::from_config(&config));
//!
//! let session = SessionController::spawn(client, 1, &config);
//! session.press_start();
//! session.badge_input("04A1B2C3D4");
//!
//! println!("{}", session.view().headline());
//! session.close().await;
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::client::{CommandClient, StatusClient};
use crate::config::{CommandPolicy, KioskConfig};
use crate::error::Error;
use crate::session::{CommandReport, PendingCommand, PollTicket, SessionState, SessionView};
use crate::status::{EvseId, StatusSnapshot};

/// Attendant input forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// "Start Charge" pressed
    PressStart,
    /// "Stop Charge" pressed
    PressStop,
    /// Raw characters from the badge reader
    Badge(String),
    /// Back out of a capture without sending anything
    CancelCapture,
}

type PollResult = (PollTicket, Result<StatusSnapshot, Error>);

/// The actor driving one [`SessionState`].
pub struct SessionController<C> {
    client: Arc<C>,
    state: SessionState,
    poll_interval: Duration,
    command_policy: CommandPolicy,
    view_tx: watch::Sender<SessionView>,
}

impl<C> SessionController<C>
where
    C: StatusClient + CommandClient,
{
    /// Start a controller for `evse_id` on the current tokio runtime.
    ///
    /// The first poll is issued immediately, then every
    /// `detail_poll_interval_ms` while not capturing.
    pub fn spawn(client: Arc<C>, evse_id: EvseId, config: &KioskConfig) -> SessionHandle {
        let state = SessionState::new(evse_id, config);
        let (view_tx, view_rx) = watch::channel(state.view());
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();

        let controller = Self {
            client,
            state,
            poll_interval: config.detail_poll_interval(),
            command_policy: config.command_policy,
            view_tx,
        };

        tracing::info!(evse_id, "opening session");
        let task = tokio::spawn(controller.run(intent_rx));

        SessionHandle {
            evse_id,
            intents: intent_tx,
            view: view_rx,
            task,
        }
    }

    async fn run(mut self, mut intents: mpsc::UnboundedReceiver<Intent>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut polls: JoinSet<PollResult> = JoinSet::new();
        let (report_tx, mut reports) = mpsc::unbounded_channel();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // One fetch outstanding at a time
                    if !polls.is_empty() {
                        tracing::debug!(evse_id = self.state.evse_id(), "previous poll outstanding, skipping tick");
                    } else if let Some(ticket) = self.state.begin_poll() {
                        let client = Arc::clone(&self.client);
                        let evse_id = self.state.evse_id();
                        tracing::debug!(evse_id, seq = ticket.seq(), "polling status");
                        polls.spawn(async move { (ticket, client.fetch_status(evse_id).await) });
                    }
                }
                Some(joined) = polls.join_next() => {
                    match joined {
                        Ok((ticket, result)) => {
                            self.state.apply_poll(ticket, result);
                        }
                        Err(err) if err.is_cancelled() => {}
                        Err(err) => {
                            tracing::warn!(evse_id = self.state.evse_id(), error = %err, "poll task failed");
                        }
                    }
                }
                Some(report) = reports.recv() => {
                    self.state.record_command(report);
                }
                intent = intents.recv() => {
                    match intent {
                        Some(intent) => self.handle_intent(intent, &mut polls, &report_tx),
                        None => break,
                    }
                }
            }
            self.publish();
        }

        tracing::info!(evse_id = self.state.evse_id(), "session closed");
    }

    fn handle_intent(
        &mut self,
        intent: Intent,
        polls: &mut JoinSet<PollResult>,
        report_tx: &mpsc::UnboundedSender<CommandReport>,
    ) {
        match intent {
            Intent::PressStart => {
                if self.state.press_start() {
                    polls.abort_all();
                }
            }
            Intent::PressStop => {
                if self.state.press_stop() {
                    polls.abort_all();
                }
            }
            Intent::Badge(input) => {
                if let Some(command) = self.state.badge_input(&input) {
                    self.dispatch(command, report_tx.clone());
                }
            }
            Intent::CancelCapture => {
                self.state.cancel_capture();
            }
        }
    }

    /// Send a command without blocking the session.
    ///
    /// The task is detached on purpose: a start/stop already on the wire
    /// completes even if the view is closed. Only the report is lost.
    fn dispatch(&self, command: PendingCommand, report_tx: mpsc::UnboundedSender<CommandReport>) {
        let client = Arc::clone(&self.client);
        let PendingCommand {
            evse_id,
            kind,
            credential,
        } = command;

        tracing::info!(evse_id, %kind, policy = ?self.command_policy, "dispatching command");

        match self.command_policy {
            CommandPolicy::FireAndForget => {
                tokio::spawn(async move {
                    if let Err(err) = client.send_command(evse_id, kind, &credential).await {
                        tracing::warn!(evse_id, %kind, error = %err, "command failed");
                    }
                });
            }
            CommandPolicy::Retry {
                attempts,
                backoff_ms,
            } => {
                let attempts = attempts.max(1);
                tokio::spawn(async move {
                    let mut attempt = 0;
                    let outcome = loop {
                        attempt += 1;
                        match client.send_command(evse_id, kind, &credential).await {
                            Ok(()) => break Ok(()),
                            Err(err) if attempt >= attempts => break Err(err),
                            Err(err) => {
                                tracing::warn!(evse_id, %kind, attempt, error = %err, "command failed, retrying");
                                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                            }
                        }
                    };
                    if let Err(err) = &outcome {
                        tracing::warn!(evse_id, %kind, attempts = attempt, error = %err, "command gave up");
                    }
                    // Receiver is gone if the session closed meanwhile
                    let _ = report_tx.send(CommandReport {
                        kind,
                        attempts: attempt,
                        outcome,
                    });
                });
            }
        }
    }

    fn publish(&self) {
        let view = self.state.view();
        self.view_tx.send_if_modified(|current| {
            if *current != view {
                *current = view;
                true
            } else {
                false
            }
        });
    }
}

/// Owner handle of a running [`SessionController`].
///
/// Dropping the handle aborts the controller.
#[derive(Debug)]
pub struct SessionHandle {
    evse_id: EvseId,
    intents: mpsc::UnboundedSender<Intent>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// EVSE this session controls.
    pub fn evse_id(&self) -> EvseId {
        self.evse_id
    }

    /// Forward an attendant intent.
    pub fn send(&self, intent: Intent) {
        if self.intents.send(intent).is_err() {
            tracing::debug!(evse_id = self.evse_id, "session already closed, intent dropped");
        }
    }

    /// "Start Charge" pressed.
    pub fn press_start(&self) {
        self.send(Intent::PressStart);
    }

    /// "Stop Charge" pressed.
    pub fn press_stop(&self) {
        self.send(Intent::PressStop);
    }

    /// Raw characters from the badge reader.
    pub fn badge_input(&self, input: impl Into<String>) {
        self.send(Intent::Badge(input.into()));
    }

    /// Back out of a capture.
    pub fn cancel_capture(&self) {
        self.send(Intent::CancelCapture);
    }

    /// Latest published view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view change.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        let mut rx = self.view.clone();
        // Only changes after this call count as new
        rx.borrow_and_update();
        rx
    }

    /// Tear the session down and wait until the task has stopped.
    pub async fn close(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        tracing::info!(evse_id = self.evse_id, "session torn down");
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
