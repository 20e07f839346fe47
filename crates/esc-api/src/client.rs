// REST client for the lighting backend.
//
// Wraps `reqwest::Client` with endpoint URL construction and response
// shape checking. Collections must come back as JSON arrays and single
// records as JSON objects; anything else is handed back untouched as
// `Error::Backend` so the caller can show it to the user.

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{Line, LineGroup, LineStatus, NewLine};

const LINES_PATH: &str = "api/v1/lighting-line";
const LINE_STATE_PATH: &str = "api/v1/lighting-line-state";
const LINE_GROUP_PATH: &str = "api/v1/lighting-line-group";

/// HTTP client for the backend's lighting-line endpoints.
///
/// Every request carries the bearer token baked into the underlying
/// `reqwest::Client` by [`TransportConfig::build_client`].
pub struct LightingClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LightingClient {
    /// Create a client for `base_url` authenticating with `token`.
    pub fn new(
        base_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(token)?;
        Ok(Self { http, base_url })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET api/v1/lighting-line`
    pub async fn list_lines(&self) -> Result<Vec<Line>, Error> {
        let url = self.endpoint(LINES_PATH)?;
        expect_list(self.get(url).await?)
    }

    /// `GET api/v1/lighting-line/{id}`
    pub async fn get_line(&self, id: Uuid) -> Result<Line, Error> {
        let url = self.endpoint(&format!("{LINES_PATH}/{id}"))?;
        expect_record(self.get(url).await?)
    }

    /// `POST api/v1/lighting-line`
    pub async fn create_line(&self, line: &NewLine) -> Result<Line, Error> {
        let url = self.endpoint(LINES_PATH)?;
        expect_record(self.post(url, line).await?)
    }

    /// `GET api/v1/lighting-line-state`
    pub async fn list_line_states(&self) -> Result<Vec<LineStatus>, Error> {
        let url = self.endpoint(LINE_STATE_PATH)?;
        expect_list(self.get(url).await?)
    }

    /// `GET api/v1/lighting-line-group`
    pub async fn list_groups(&self) -> Result<Vec<LineGroup>, Error> {
        let url = self.endpoint(LINE_GROUP_PATH)?;
        expect_list(self.get(url).await?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    async fn get(&self, url: Url) -> Result<Value, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        read_json(resp).await
    }

    async fn post(&self, url: Url, body: &impl Serialize) -> Result<Value, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        read_json(resp).await
    }
}

// ── Response shape checks ────────────────────────────────────────────

/// Read the body as JSON regardless of status. Non-JSON bodies become a
/// string payload so they can still be printed.
async fn read_json(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;
    debug!(status = status.as_u16(), bytes = body.len(), "response received");

    serde_json::from_str(&body).map_err(|_| Error::Backend {
        payload: Value::String(body),
    })
}

fn expect_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, Error> {
    if !value.is_array() {
        return Err(Error::Backend { payload: value });
    }
    // A list of something other than records is shown to the user as-is.
    serde_json::from_value(value.clone()).map_err(|e| {
        debug!(error = %e, "list items do not match the record schema");
        Error::Backend { payload: value }
    })
}

fn expect_record<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    if !value.is_object() {
        return Err(Error::Backend { payload: value });
    }
    // An object that is not a record is an error document (`{"detail": ...}`).
    serde_json::from_value(value.clone()).map_err(|_| Error::Backend { payload: value })
}
