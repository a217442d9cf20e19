//! # evse-kiosk
//!
//! Kiosk controller for EV charging points (EVSEs).
//!
//! An attendant kiosk lists the active charging points, shows live status
//! for one of them, and starts or stops a charging session after an RFID
//! badge tap. This crate is the logic behind those screens; rendering is
//! left to whatever presentation layer you put on top.
//!
//! - [`ListPoller`] keeps the list of active EVSE ids fresh (every 1 s)
//! - [`SessionController`] drives one detail view: polls status every
//!   500 ms, suspends polling while a badge is read, and dispatches the
//!   start/stop command once the badge is complete
//! - [`Client`] talks to the charging backend over HTTP
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use evse_kiosk::{Client, KioskConfig, SessionController};
//!
//! # async fn example() {
//! let config = KioskConfig::from_env();
//! let client = Arc::new(Client::from_config(&config));
//!
//! // Attendant opens the detail view of EVSE 1
//! let session = SessionController::spawn(client, 1, &config);
//! let mut view = session.subscribe();
//!
//! while view.changed().await.is_ok() {
//!     println!("{}", view.borrow().headline());
//! }
//! # }
//! ```
//!
//! ## Backend Protocol
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/evses/active/ids` | GET | Active EVSE ids |
//! | `/chargestatus/{evseId}` | GET | Status snapshot |
//! | `/start/{evseId}` | POST | Start, body `{"rfid": "..."}` |
//! | `/stop/{evseId}` | POST | Stop, body `{"rfid": "..."}` |
//!
//! ## Feature Flags
//!
//! - `yaml` - Load [`KioskConfig`] from YAML files
//! - `full` - All features

mod capture;
pub mod client;
mod config;
pub mod controller;
mod error;
pub mod list;
pub mod session;
mod status;

pub use capture::{Credential, CredentialCapture};
pub use client::{Client, CommandClient, CommandKind, StatusClient};
pub use config::{CommandPolicy, KioskConfig, BASE_URL_ENV};
pub use controller::{Intent, SessionController, SessionHandle};
pub use error::Error;
pub use list::{ListPoller, ListView};
pub use session::{CommandReport, Mode, SessionView, CAPTURE_PROMPT};
pub use status::{DisplayStatus, EvseId, StatusSnapshot};

/// Backend address of the deployed kiosk
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8090";

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Detail view status poll cadence in milliseconds
pub const DETAIL_POLL_INTERVAL_MS: u64 = 500;

/// List view active-id poll cadence in milliseconds
pub const LIST_POLL_INTERVAL_MS: u64 = 1000;

/// Badge characters needed for a complete credential
pub const MIN_CREDENTIAL_LEN: usize = 10;
