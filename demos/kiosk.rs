//! Line-oriented kiosk for a terminal.
//!
//! Run with:
//! ```sh
//! RUST_LOG=evse_kiosk=debug cargo run --example kiosk
//! ```
//!
//! Commands:
//!   list          show active EVSEs
//!   open <id>     open the detail view of an EVSE
//!   start | stop  request a start/stop (then type or scan the badge)
//!   cancel        abandon a badge read
//!   back          close the detail view
//!   quit
//!
//! Any other line is fed to the open session as badge reader input.

use std::sync::Arc;

use evse_kiosk::{Client, KioskConfig, ListPoller, ListView, Mode, SessionController, SessionHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

fn print_list(view: &ListView) {
    match view {
        ListView::Loading => println!("(loading...)"),
        ListView::Failed(err) => println!("Failed to load page: {}", err),
        ListView::Ready(ids) => {
            for id in ids {
                println!("  {}    open {}", ListView::item_label(*id), id);
            }
        }
    }
}

fn spawn_printer(session: &SessionHandle) {
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let view = rx.borrow_and_update().clone();
            match (view.mode, view.snapshot) {
                (Mode::Idle, Some(snapshot)) => println!(
                    "[EVSE {}] {} | {} | {}",
                    view.evse_id,
                    view.headline(),
                    snapshot.power_text(),
                    snapshot.energy_text()
                ),
                _ => println!("[EVSE {}] {}", view.evse_id, view.headline()),
            }
            if let Some(report) = &view.last_command {
                println!("  last {} command: {:?}", report.kind, report.outcome);
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "evse_kiosk=info".into()),
        )
        .init();

    let config = KioskConfig::from_env();
    config.validate()?;
    let client = Arc::new(Client::from_config(&config));

    let list = ListPoller::spawn(Arc::clone(&client), &config);
    let mut session: Option<SessionHandle> = None;

    println!("EVSE kiosk on {}", client.base_url());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line.split_once(' ').unwrap_or((line, "")) {
            ("quit", _) => break,
            ("list", _) => print_list(&list.view()),
            ("open", id) => {
                let Ok(id) = id.trim().parse() else {
                    println!("usage: open <id>");
                    continue;
                };
                if let Some(previous) = session.take() {
                    previous.close().await;
                }
                let handle = SessionController::spawn(Arc::clone(&client), id, &config);
                spawn_printer(&handle);
                session = Some(handle);
            }
            ("back", _) => {
                if let Some(previous) = session.take() {
                    previous.close().await;
                }
                print_list(&list.view());
            }
            (command, _) => match &session {
                None => println!("no EVSE open, try `list` or `open <id>`"),
                Some(session) => match command {
                    "start" => session.press_start(),
                    "stop" => session.press_stop(),
                    "cancel" => session.cancel_capture(),
                    _ => session.badge_input(line),
                },
            },
        }
    }

    if let Some(session) = session {
        session.close().await;
    }
    list.close().await;
    Ok(())
}
