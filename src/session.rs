//! Per-EVSE session state machine.
//!
//! [`SessionState`] holds everything a detail view shows and decides every
//! transition. It does no I/O: the [`controller`](crate::controller) actor
//! feeds it timer ticks, poll results and attendant intents, and carries
//! out the polls and commands it asks for.
//!
//! | From | Trigger | To |
//! |------|---------|----|
//! | `Loading` | poll ok / poll failed | `Idle` / `Error` |
//! | `Idle` | poll ok / poll failed | `Idle` / `Error` |
//! | `Idle` | start / stop pressed | `CapturingForStart` / `CapturingForStop` |
//! | `Capturing*` | credential complete | `Idle` (command dispatched) |
//! | `Capturing*` | capture cancelled | `Idle` |
//! | `Error` | poll ok, only with `recover_from_error` | `Idle` |

use std::fmt;

use crate::capture::{Credential, CredentialCapture};
use crate::client::CommandKind;
use crate::config::KioskConfig;
use crate::error::Error;
use crate::status::{DisplayStatus, EvseId, StatusSnapshot};

/// Prompt shown while waiting for a badge.
pub const CAPTURE_PROMPT: &str = "Please touch RFID card to the reader";

/// Controller mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// No poll has completed yet
    Loading,
    /// A poll failed
    Error,
    /// Showing the latest snapshot
    Idle,
    /// Waiting for a badge to authorize a start
    CapturingForStart,
    /// Waiting for a badge to authorize a stop
    CapturingForStop,
}

impl Mode {
    /// Whether badge input is being captured (polling suspended).
    pub fn is_capturing(&self) -> bool {
        matches!(self, Mode::CapturingForStart | Mode::CapturingForStop)
    }

    /// Whether the poll timer issues fetches in this mode.
    pub fn polls(&self) -> bool {
        !self.is_capturing()
    }

    /// Command a completed capture in this mode authorizes.
    pub fn pending_command(&self) -> Option<CommandKind> {
        match self {
            Mode::CapturingForStart => Some(CommandKind::Start),
            Mode::CapturingForStop => Some(CommandKind::Stop),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Loading => "loading",
            Mode::Error => "error",
            Mode::Idle => "idle",
            Mode::CapturingForStart => "capturing for start",
            Mode::CapturingForStop => "capturing for stop",
        };
        f.write_str(s)
    }
}

/// Tag carried by every status fetch.
///
/// `seq` orders fetches by initiation; `epoch` changes whenever a capture
/// begins, so fetches issued before the capture can never land after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    seq: u64,
    epoch: u64,
}

impl PollTicket {
    /// Initiation order of the fetch (first fetch is 1).
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What happened to a poll result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The result changed the session
    Applied,
    /// A newer fetch was already applied, or a capture began since it was issued
    Stale,
}

/// A start/stop command authorized by a completed capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    /// Target EVSE
    pub evse_id: EvseId,
    /// Start or stop
    pub kind: CommandKind,
    /// Badge that authorized it
    pub credential: Credential,
}

/// Outcome of an awaited command (`retry` policy only).
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport {
    /// Start or stop
    pub kind: CommandKind,
    /// Attempts made
    pub attempts: u32,
    /// Result of the last attempt
    pub outcome: Result<(), Error>,
}

impl CommandReport {
    /// Whether the backend accepted the command.
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Read-only copy of the session, published to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    /// EVSE shown
    pub evse_id: EvseId,
    /// Current mode
    pub mode: Mode,
    /// Latest applied snapshot
    pub snapshot: Option<StatusSnapshot>,
    /// Poll failure that put the session in `Error`
    pub error: Option<Error>,
    /// Badge characters buffered in the current capture
    pub captured_chars: usize,
    /// Last awaited command result
    pub last_command: Option<CommandReport>,
}

impl SessionView {
    /// Status to show, only while `Idle` with a snapshot.
    pub fn display_status(&self) -> Option<DisplayStatus> {
        match (self.mode, &self.snapshot) {
            (Mode::Idle, Some(snapshot)) => Some(snapshot.display_status()),
            _ => None,
        }
    }

    /// Main line of the detail screen.
    pub fn headline(&self) -> String {
        match self.mode {
            Mode::Loading => "LOADING".to_string(),
            Mode::Error => match &self.error {
                Some(err) => format!("Error: {}", err),
                None => "Error".to_string(),
            },
            Mode::CapturingForStart | Mode::CapturingForStop => CAPTURE_PROMPT.to_string(),
            Mode::Idle => self
                .display_status()
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| "LOADING".to_string()),
        }
    }
}

/// The session state machine for one EVSE.
#[derive(Debug, Clone)]
pub struct SessionState {
    evse_id: EvseId,
    mode: Mode,
    last_snapshot: Option<StatusSnapshot>,
    last_error: Option<Error>,
    last_command: Option<CommandReport>,
    capture: CredentialCapture,
    recover_from_error: bool,
    issued_seq: u64,
    applied_seq: u64,
    epoch: u64,
}

impl SessionState {
    /// Fresh session in `Loading`.
    pub fn new(evse_id: EvseId, config: &KioskConfig) -> Self {
        Self {
            evse_id,
            mode: Mode::Loading,
            last_snapshot: None,
            last_error: None,
            last_command: None,
            capture: CredentialCapture::with_min_len(config.min_credential_len),
            recover_from_error: config.recover_from_error,
            issued_seq: 0,
            applied_seq: 0,
            epoch: 0,
        }
    }

    /// EVSE this session controls.
    pub fn evse_id(&self) -> EvseId {
        self.evse_id
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Latest applied snapshot.
    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Latest poll failure.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Called on each timer tick. Returns a ticket if a fetch should be issued.
    pub fn begin_poll(&mut self) -> Option<PollTicket> {
        if !self.mode.polls() {
            tracing::trace!(evse_id = self.evse_id, mode = %self.mode, "poll suspended");
            return None;
        }
        self.issued_seq += 1;
        Some(PollTicket {
            seq: self.issued_seq,
            epoch: self.epoch,
        })
    }

    /// Apply the result of the fetch issued under `ticket`.
    ///
    /// Only the most recently issued poll may change the session. A result
    /// for a superseded poll is [`PollOutcome::Stale`], whichever order the
    /// replies arrive in.
    pub fn apply_poll(
        &mut self,
        ticket: PollTicket,
        result: Result<StatusSnapshot, Error>,
    ) -> PollOutcome {
        if ticket.epoch != self.epoch || ticket.seq != self.issued_seq || self.mode.is_capturing() {
            tracing::debug!(
                evse_id = self.evse_id,
                seq = ticket.seq,
                latest = self.issued_seq,
                applied = self.applied_seq,
                "dropping stale poll result"
            );
            return PollOutcome::Stale;
        }
        self.applied_seq = ticket.seq;

        match result {
            Ok(snapshot) => {
                self.last_snapshot = Some(snapshot);
                match self.mode {
                    Mode::Loading => self.transition(Mode::Idle),
                    Mode::Error if self.recover_from_error => {
                        self.last_error = None;
                        self.transition(Mode::Idle);
                    }
                    _ => {}
                }
            }
            Err(err) => {
                tracing::warn!(evse_id = self.evse_id, error = %err, "status poll failed");
                self.last_error = Some(err);
                self.transition(Mode::Error);
            }
        }
        PollOutcome::Applied
    }

    /// Attendant pressed "start". Only honored while `Idle`.
    pub fn press_start(&mut self) -> bool {
        self.begin_capture(Mode::CapturingForStart)
    }

    /// Attendant pressed "stop". Only honored while `Idle`.
    pub fn press_stop(&mut self) -> bool {
        self.begin_capture(Mode::CapturingForStop)
    }

    /// Raw reader input. Returns the command to dispatch once a credential completes.
    ///
    /// Input outside a capturing mode is ignored.
    pub fn badge_input(&mut self, input: &str) -> Option<PendingCommand> {
        let kind = match self.mode.pending_command() {
            Some(kind) => kind,
            None => {
                tracing::debug!(evse_id = self.evse_id, mode = %self.mode, "ignoring badge input");
                return None;
            }
        };

        let credential = self.capture.push_str(input)?;
        tracing::info!(
            evse_id = self.evse_id,
            %kind,
            credential = %credential,
            "credential captured"
        );
        self.end_capture();
        Some(PendingCommand {
            evse_id: self.evse_id,
            kind,
            credential,
        })
    }

    /// Abandon the current capture without sending anything.
    pub fn cancel_capture(&mut self) -> bool {
        if !self.mode.is_capturing() {
            return false;
        }
        self.end_capture();
        true
    }

    /// Record the outcome of an awaited command.
    pub fn record_command(&mut self, report: CommandReport) {
        self.last_command = Some(report);
    }

    /// Snapshot of the session for rendering.
    pub fn view(&self) -> SessionView {
        SessionView {
            evse_id: self.evse_id,
            mode: self.mode,
            snapshot: self.last_snapshot,
            error: self.last_error.clone(),
            captured_chars: self.capture.buffered(),
            last_command: self.last_command.clone(),
        }
    }

    fn begin_capture(&mut self, mode: Mode) -> bool {
        if self.mode != Mode::Idle {
            tracing::debug!(evse_id = self.evse_id, mode = %self.mode, "ignoring {} press", mode);
            return false;
        }
        self.epoch += 1;
        self.capture.reset();
        self.transition(mode);
        true
    }

    fn end_capture(&mut self) {
        self.capture.reset();
        self.transition(Mode::Idle);
    }

    fn transition(&mut self, to: Mode) {
        if self.mode != to {
            tracing::info!(evse_id = self.evse_id, from = %self.mode, %to, "session mode change");
            self.mode = to;
        }
    }
}
