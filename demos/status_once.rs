//! Print the status of every active EVSE once.
//!
//! Run with:
//! ```sh
//! EVSE_KIOSK_BASE_URL=http://127.0.0.1:8090 cargo run --example status_once
//! ```

use evse_kiosk::{Client, KioskConfig, ListView, StatusClient};

#[tokio::main]
async fn main() -> Result<(), evse_kiosk::Error> {
    let config = KioskConfig::from_env();
    let client = Client::from_config(&config);

    let ids = client.fetch_active_ids().await?;
    if ids.is_empty() {
        println!("No active EVSEs reported yet");
    }

    for id in ids {
        match client.fetch_status(id).await {
            Ok(status) => println!(
                "{:<10} {:<18} {:>12} {:>14}",
                ListView::item_label(id),
                status.display_status(),
                status.power_text(),
                status.energy_text()
            ),
            Err(err) => println!("{:<10} Error: {}", ListView::item_label(id), err),
        }
    }
    Ok(())
}
