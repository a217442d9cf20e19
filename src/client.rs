//! Backend clients: status polling and start/stop commands.
//!
//! The session controller only sees the [`StatusClient`] and
//! [`CommandClient`] traits. [`Client`] implements both over HTTP against
//! the charging backend:
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/evses/active/ids` | GET | Ordered list of active EVSE ids |
//! | `/chargestatus/{evseId}` | GET | One [`StatusSnapshot`] |
//! | `/start/{evseId}` | POST | Start a session, body `{"rfid": "..."}` |
//! | `/stop/{evseId}` | POST | Stop a session, body `{"rfid": "..."}` |

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::capture::Credential;
use crate::config::KioskConfig;
use crate::error::Error;
use crate::status::{EvseId, StatusSnapshot};
use crate::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Content type the backend expects on command requests.
const COMMAND_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Which command to send to an EVSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Start a charging session
    Start,
    /// Stop the running session
    Stop,
}

impl CommandKind {
    /// Path segment used by the backend (`start` / `stop`).
    pub fn path(&self) -> &'static str {
        match self {
            CommandKind::Start => "start",
            CommandKind::Stop => "stop",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Source of status snapshots and active EVSE ids.
pub trait StatusClient: Send + Sync + 'static {
    /// Fetch the current status of one EVSE.
    ///
    /// Does not retry; the poll cadence is the retry policy.
    fn fetch_status(
        &self,
        evse_id: EvseId,
    ) -> impl Future<Output = Result<StatusSnapshot, Error>> + Send;

    /// Fetch the ordered list of active EVSE ids.
    fn fetch_active_ids(&self) -> impl Future<Output = Result<Vec<EvseId>, Error>> + Send;
}

/// Sink for start/stop commands.
pub trait CommandClient: Send + Sync + 'static {
    /// Send a command authorized by `credential`.
    ///
    /// Whether the caller looks at the result is decided by
    /// [`CommandPolicy`](crate::CommandPolicy).
    fn send_command(
        &self,
        evse_id: EvseId,
        kind: CommandKind,
        credential: &Credential,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Command request body
#[derive(Debug, Serialize)]
struct RfidBody<'a> {
    rfid: &'a str,
}

/// HTTP client for the charging backend.
///
/// # Example
///
/// ```rust,no_run
/// use evse_kiosk::{Client, StatusClient};
///
/// # async fn example() -> Result<(), evse_kiosk::Error> {
/// let client = Client::new("http://127.0.0.1:8090");
///
/// for id in client.fetch_active_ids().await? {
///     let status = client.fetch_status(id).await?;
///     println!("EVSE {}: {}", id, status.display_status());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Client {
    /// Create a client for the backend at `base_url`.
    ///
    /// A trailing slash on `base_url` is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self { http, base_url }
    }

    /// Create a client from the backend settings of a [`KioskConfig`].
    pub fn from_config(config: &KioskConfig) -> Self {
        Self::with_timeout(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Set a custom HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Get the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

impl StatusClient for Client {
    async fn fetch_status(&self, evse_id: EvseId) -> Result<StatusSnapshot, Error> {
        self.get_json(&format!("/chargestatus/{}", evse_id)).await
    }

    async fn fetch_active_ids(&self) -> Result<Vec<EvseId>, Error> {
        self.get_json("/evses/active/ids").await
    }
}

impl CommandClient for Client {
    async fn send_command(
        &self,
        evse_id: EvseId,
        kind: CommandKind,
        credential: &Credential,
    ) -> Result<(), Error> {
        let url = format!("{}/{}/{}", self.base_url, kind.path(), evse_id);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, COMMAND_CONTENT_TYPE)
            .json(&RfidBody {
                rfid: credential.as_str(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        tracing::debug!(evse_id, %kind, "command accepted by backend");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;

    use super::*;

    type Seen = Arc<Mutex<Vec<(String, u32, String, String)>>>;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn backend(seen: Seen) -> Router {
        let start_seen = seen.clone();
        let stop_seen = seen;
        Router::new()
            .route("/evses/active/ids", get(|| async { "[1,2,7]" }))
            .route(
                "/chargestatus/{id}",
                get(|Path(id): Path<u32>| async move {
                    match id {
                        1 => (
                            StatusCode::OK,
                            r#"{"isEVConnected":1,"isChargingEnabled":1,"isCharging":1,"isError":0,
                               "energyActiveNet_kwh_float":4.25,"powerActiveImport_kw_float":11.0}"#,
                        ),
                        2 => (StatusCode::OK, "{not json"),
                        _ => (StatusCode::NOT_FOUND, "unknown evse"),
                    }
                }),
            )
            .route(
                "/start/{id}",
                post(
                    move |Path(id): Path<u32>, headers: HeaderMap, body: String| async move {
                        let ct = headers
                            .get("content-type")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        start_seen
                            .lock()
                            .unwrap()
                            .push(("start".into(), id, ct, body));
                    },
                ),
            )
            .route(
                "/stop/{id}",
                post(move |Path(id): Path<u32>, body: String| async move {
                    stop_seen
                        .lock()
                        .unwrap()
                        .push(("stop".into(), id, String::new(), body));
                    StatusCode::INTERNAL_SERVER_ERROR
                }),
            )
    }

    #[test]
    fn test_client_creation() {
        let client = Client::new("http://localhost:8090/");
        assert_eq!(client.base_url(), "http://localhost:8090");

        let client = Client::default();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_rfid_body_serialization() {
        let json = serde_json::to_string(&RfidBody { rfid: "0123456789" }).unwrap();
        assert_eq!(json, r#"{"rfid":"0123456789"}"#);
    }

    #[test]
    fn test_command_kind_path() {
        assert_eq!(CommandKind::Start.path(), "start");
        assert_eq!(CommandKind::Stop.to_string(), "stop");
    }

    #[tokio::test]
    async fn test_fetch_active_ids() {
        let base = serve(backend(Seen::default())).await;
        let ids = Client::new(base).fetch_active_ids().await.unwrap();
        assert_eq!(ids, vec![1, 2, 7]);
    }

    #[tokio::test]
    async fn test_fetch_status() {
        let base = serve(backend(Seen::default())).await;
        let client = Client::new(base);

        let status = client.fetch_status(1).await.unwrap();
        assert!(status.is_charging);
        assert_eq!(status.energy_text(), "4.250 kWh");

        let err = client.fetch_status(2).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));

        let err = client.fetch_status(9).await.unwrap_err();
        assert_eq!(
            err,
            Error::Api {
                status: 404,
                body: "unknown evse".into()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_status_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::with_timeout(format!("http://{}", addr), Duration::from_secs(2));
        let err = client.fetch_status(1).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_send_command_body_and_headers() {
        let seen = Seen::default();
        let base = serve(backend(seen.clone())).await;
        let client = Client::new(base);

        client
            .send_command(3, CommandKind::Start, &Credential::new("04A1B2C3D4"))
            .await
            .unwrap();

        let err = client
            .send_command(3, CommandKind::Stop, &Credential::new("04A1B2C3D4"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "start");
        assert_eq!(seen[0].1, 3);
        assert_eq!(seen[0].2, COMMAND_CONTENT_TYPE);
        assert_eq!(seen[0].3, r#"{"rfid":"04A1B2C3D4"}"#);
        assert_eq!(seen[1].0, "stop");
    }
}
