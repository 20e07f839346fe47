//! Control channel: one authenticated request/reply exchange over WebSocket.
//!
//! Each exchange opens a fresh connection to `<ws|wss>://<host>/ws`,
//! authenticates, sends exactly one command, reads exactly one reply and
//! closes the connection again. The session is closed on every exit path.
//!
//! ```rust,ignore
//! use esc_api::control::{ControlEndpoint, ControlRequest, CtlCommand, ObjectRef};
//!
//! let endpoint = ControlEndpoint::new(&base_url, ws_token, Duration::from_secs(30))?;
//! let request = ControlRequest::SendCommand {
//!     cmd: CtlCommand::RelayEnable,
//!     params: serde_json::Map::new(),
//!     objects: vec![ObjectRef::line(line_id)],
//! };
//! let exchange = endpoint.exchange(&request).await?;
//! println!("{}", exchange.reply);
//! ```

use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

use crate::error::Error;

/// Protocol version stamped on every outgoing message.
pub const PROTOCOL_VERSION: u32 = 1;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── Messages ─────────────────────────────────────────────────────────

/// Kind of object a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Line,
}

/// Target of an `objSendCtlCmdReq`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ObjectType,
}

impl ObjectRef {
    pub fn line(id: Uuid) -> Self {
        Self {
            id,
            kind: ObjectType::Line,
        }
    }
}

/// Target of a `setCtlModeReq`, carrying the requested mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeTarget {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub mode: String,
}

impl ModeTarget {
    pub fn line(id: Uuid, mode: impl Into<String>) -> Self {
        Self {
            id,
            kind: ObjectType::Line,
            mode: mode.into(),
        }
    }
}

/// Command names understood by `objSendCtlCmdReq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CtlCommand {
    RelayEnable,
    RelayDisable,
}

/// The single command sent after authentication.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ControlRequest {
    #[serde(rename = "objSendCtlCmdReq")]
    SendCommand {
        cmd: CtlCommand,
        params: serde_json::Map<String, Value>,
        objects: Vec<ObjectRef>,
    },
    #[serde(rename = "setCtlModeReq")]
    SetMode { objects: Vec<ModeTarget> },
}

impl ControlRequest {
    /// Number of objects this request addresses.
    pub fn target_count(&self) -> usize {
        match self {
            Self::SendCommand { objects, .. } => objects.len(),
            Self::SetMode { objects } => objects.len(),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename = "authReq")]
struct AuthRequest<'a> {
    token: &'a str,
}

/// Common header wrapped around every outgoing body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, B: Serialize> {
    version: u32,
    #[serde(flatten)]
    body: &'a B,
    timestamp: i64,
    session_id: u128,
}

fn encode<B: Serialize>(body: &B, session_id: u128) -> Result<String, Error> {
    let envelope = Envelope {
        version: PROTOCOL_VERSION,
        body,
        timestamp: Utc::now().timestamp_micros(),
        session_id,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Replies are shown to the user as-is; non-JSON text is kept as a string.
fn parse_reply(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

// ── Endpoint ─────────────────────────────────────────────────────────

/// Derive the control channel URL from the backend base URL.
///
/// `http` maps to `ws`, `https` to `wss`; the path is always `/ws`.
pub fn control_url(base: &Url) -> Result<Url, Error> {
    let scheme = match base.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(Error::UnsupportedScheme(other.to_owned())),
    };
    let mut url = base.join("/ws")?;
    url.set_scheme(scheme)
        .map_err(|()| Error::UnsupportedScheme(base.scheme().to_owned()))?;
    Ok(url)
}

/// Both replies of one control exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub auth_reply: Value,
    pub reply: Value,
}

/// Where and how to open control sessions.
#[derive(Debug, Clone)]
pub struct ControlEndpoint {
    url: Url,
    token: SecretString,
    reply_timeout: Duration,
}

impl ControlEndpoint {
    pub fn new(base_url: &Url, token: SecretString, reply_timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            url: control_url(base_url)?,
            token,
            reply_timeout,
        })
    }

    /// The derived `ws://` / `wss://` URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Connect, authenticate, send `request`, await one reply, close.
    pub async fn exchange(&self, request: &ControlRequest) -> Result<Exchange, Error> {
        let mut session = ControlSession::connect(&self.url, self.reply_timeout).await?;
        let result = session.run(&self.token, request).await;
        session.close().await;
        result
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Lifecycle of one control session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Authenticated,
    AwaitingAck,
    Closed,
}

/// An open WebSocket tagged with a random 128-bit session id.
pub struct ControlSession {
    stream: WsStream,
    session_id: u128,
    reply_timeout: Duration,
    state: SessionState,
}

impl ControlSession {
    /// Open the connection. Bounded by `reply_timeout`.
    pub async fn connect(url: &Url, reply_timeout: Duration) -> Result<Self, Error> {
        tracing::debug!(url = %url, "connecting to control channel");

        let (stream, _response) =
            tokio::time::timeout(reply_timeout, tokio_tungstenite::connect_async(url.as_str()))
                .await
                .map_err(|_| Error::WebSocketConnect(format!("timed out connecting to {url}")))?
                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        let session_id = Uuid::new_v4().as_u128();
        tracing::debug!(session_id, "control session connected");

        Ok(Self {
            stream,
            session_id,
            reply_timeout,
            state: SessionState::Connected,
        })
    }

    pub fn session_id(&self) -> u128 {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Send the auth request and wait for any reply.
    ///
    /// The reply is not inspected; rejecting a bad token is up to the server.
    pub async fn authenticate(&mut self, token: &SecretString) -> Result<Value, Error> {
        let auth = AuthRequest {
            token: token.expose_secret(),
        };
        self.send(&auth).await?;
        let reply = self.recv_reply().await?;
        self.transition(SessionState::Authenticated);
        Ok(reply)
    }

    /// Send one command and wait for its acknowledgement.
    pub async fn request(&mut self, request: &ControlRequest) -> Result<Value, Error> {
        self.send(request).await?;
        self.transition(SessionState::AwaitingAck);
        self.recv_reply().await
    }

    /// Close the connection. Errors while closing are logged and dropped.
    pub async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "control channel close failed");
        }
        self.transition(SessionState::Closed);
    }

    async fn run(&mut self, token: &SecretString, request: &ControlRequest) -> Result<Exchange, Error> {
        let auth_reply = self.authenticate(token).await?;
        let reply = self.request(request).await?;
        Ok(Exchange { auth_reply, reply })
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(session_id = self.session_id, from = ?self.state, to = ?next, "control session");
        self.state = next;
    }

    async fn send<B: Serialize>(&mut self, body: &B) -> Result<(), Error> {
        let text = encode(body, self.session_id)?;
        tracing::trace!(%text, "control channel send");
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))
    }

    async fn recv_reply(&mut self) -> Result<Value, Error> {
        let timeout_secs = self.reply_timeout.as_secs();
        tokio::time::timeout(self.reply_timeout, next_reply(&mut self.stream))
            .await
            .map_err(|_| Error::ReplyTimeout { timeout_secs })?
    }
}

/// Read frames until a data frame or a close arrives.
async fn next_reply(stream: &mut WsStream) -> Result<Value, Error> {
    while let Some(frame) = stream.next().await {
        match frame.map_err(|e| Error::WebSocket(e.to_string()))? {
            Message::Text(text) => return Ok(parse_reply(text.as_str())),
            Message::Binary(bytes) => return Ok(parse_reply(&String::from_utf8_lossy(&bytes))),
            Message::Close(frame) => {
                let (code, reason) = frame.map_or_else(
                    || (1005, String::new()),
                    |cf| (u16::from(cf.code), cf.reason.to_string()),
                );
                return Err(Error::WebSocketClosed { code, reason });
            }
            // Ping / Pong / raw frames: tungstenite answers pings itself.
            _ => {}
        }
    }
    Err(Error::WebSocketClosed {
        code: 1006,
        reason: "stream ended without a reply".into(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn control_url_maps_schemes() {
        let ws = control_url(&Url::parse("http://backend:8000/api").unwrap()).unwrap();
        assert_eq!(ws.as_str(), "ws://backend:8000/ws");

        let wss = control_url(&Url::parse("https://esc.example.org/").unwrap()).unwrap();
        assert_eq!(wss.as_str(), "wss://esc.example.org/ws");
    }

    #[test]
    fn control_url_rejects_other_schemes() {
        let err = control_url(&Url::parse("ftp://backend/").unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme(s) if s == "ftp"));
    }

    #[test]
    fn auth_envelope_shape() {
        let text = encode(&AuthRequest { token: "ws-secret" }, 42).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["type"], "authReq");
        assert_eq!(value["token"], "ws-secret");
        assert_eq!(value["sessionId"], 42);
        assert!(value["timestamp"].as_i64().unwrap() > 1_500_000_000_000_000);
    }

    #[test]
    fn relay_command_envelope_shape() {
        let id = Uuid::parse_str("11111111-2222-3333-4444-555555555555").unwrap();
        let request = ControlRequest::SendCommand {
            cmd: CtlCommand::RelayDisable,
            params: serde_json::Map::new(),
            objects: vec![ObjectRef::line(id)],
        };
        let value: Value = serde_json::from_str(&encode(&request, 7).unwrap()).unwrap();

        assert_eq!(value["type"], "objSendCtlCmdReq");
        assert_eq!(value["cmd"], "relayDisable");
        assert_eq!(value["params"], serde_json::json!({}));
        assert_eq!(
            value["objects"],
            serde_json::json!([{ "id": "11111111-2222-3333-4444-555555555555", "type": "line" }])
        );
    }

    #[test]
    fn mode_command_envelope_shape() {
        let id = Uuid::parse_str("11111111-2222-3333-4444-555555555555").unwrap();
        let request = ControlRequest::SetMode {
            objects: vec![ModeTarget::line(id, "auto:sch")],
        };
        let value: Value = serde_json::from_str(&encode(&request, 7).unwrap()).unwrap();

        assert_eq!(value["type"], "setCtlModeReq");
        assert_eq!(value["objects"][0]["mode"], "auto:sch");
        assert_eq!(value["objects"][0]["type"], "line");
        assert_eq!(request.target_count(), 1);
    }

    #[test]
    fn full_width_session_id_is_an_integer() {
        let text = encode(&AuthRequest { token: "t" }, u128::MAX).unwrap();
        assert!(text.contains(&format!("\"sessionId\":{}", u128::MAX)));
    }

    #[test]
    fn non_json_reply_kept_as_string() {
        assert_eq!(parse_reply("ok"), Value::String("ok".into()));
        assert_eq!(parse_reply(r#"{"status":"ok"}"#)["status"], "ok");
    }
}
