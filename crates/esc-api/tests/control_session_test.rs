#![allow(clippy::unwrap_used)]
// Integration tests for the control channel against an in-process
// WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use uuid::Uuid;

use esc_api::{
    ControlEndpoint, ControlRequest, ControlSession, CtlCommand, Error, ModeTarget, ObjectRef,
    SessionState,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// How the fake backend behaves after the auth request.
#[derive(Clone, Copy)]
enum Script {
    /// Reply to auth and to the command.
    Ack,
    /// Reply to auth, then stay silent.
    Silent,
    /// Reply to auth, then close the socket.
    Hangup,
}

/// Start a one-connection server. Every text frame the client sends is
/// forwarded verbatim to the returned receiver.
async fn spawn_server(script: Script) -> (Url, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let mut frames = 0;
        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let value: Value = serde_json::from_str(text.as_str()).unwrap();
            let kind = value["type"].as_str().unwrap_or_default().to_owned();
            let _ = seen_tx.send(text.as_str().to_owned());
            frames += 1;

            match (script, frames) {
                (_, 1) => {
                    let reply = json!({ "type": "authResp", "status": "ok" }).to_string();
                    ws.send(Message::text(reply)).await.unwrap();
                }
                (Script::Ack, _) => {
                    let reply = json!({ "type": format!("{kind}Ack"), "status": "ok" }).to_string();
                    ws.send(Message::text(reply)).await.unwrap();
                }
                (Script::Silent, _) => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                (Script::Hangup, _) => {
                    let _ = ws.close(None).await;
                    return;
                }
            }
        }
    });

    (Url::parse(&format!("http://{addr}/")).unwrap(), seen_rx)
}

async fn next_frame(seen: &mut mpsc::UnboundedReceiver<String>) -> Value {
    serde_json::from_str(&seen.recv().await.unwrap()).unwrap()
}

fn endpoint(base: &Url, timeout: Duration) -> ControlEndpoint {
    ControlEndpoint::new(base, SecretString::from("ws-secret".to_owned()), timeout).unwrap()
}

fn relay_on(ids: &[Uuid]) -> ControlRequest {
    ControlRequest::SendCommand {
        cmd: CtlCommand::RelayEnable,
        params: serde_json::Map::new(),
        objects: ids.iter().copied().map(ObjectRef::line).collect(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_exchange_authenticates_then_sends_one_command() {
    let (base, mut seen) = spawn_server(Script::Ack).await;
    let ids = [Uuid::new_v4(), Uuid::new_v4()];

    let exchange = endpoint(&base, Duration::from_secs(5))
        .exchange(&relay_on(&ids))
        .await
        .unwrap();

    assert_eq!(exchange.auth_reply["status"], "ok");
    assert_eq!(exchange.reply["type"], "objSendCtlCmdReqAck");

    let auth = next_frame(&mut seen).await;
    assert_eq!(auth["type"], "authReq");
    assert_eq!(auth["token"], "ws-secret");
    assert_eq!(auth["version"], 1);

    let command = next_frame(&mut seen).await;
    assert_eq!(command["type"], "objSendCtlCmdReq");
    assert_eq!(command["cmd"], "relayEnable");
    assert_eq!(command["objects"].as_array().unwrap().len(), 2);
    assert_eq!(command["objects"][0]["id"], ids[0].to_string());
    // Both frames of one session carry the same session id.
    assert_eq!(auth["sessionId"], command["sessionId"]);
}

#[tokio::test]
async fn test_silent_backend_times_out() {
    let (base, _seen) = spawn_server(Script::Silent).await;

    let err = endpoint(&base, Duration::from_millis(300))
        .exchange(&relay_on(&[Uuid::new_v4()]))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::ReplyTimeout { .. }),
        "expected ReplyTimeout, got: {err:?}"
    );
}

#[tokio::test]
async fn test_close_mid_exchange_is_reported() {
    let (base, _seen) = spawn_server(Script::Hangup).await;

    let err = endpoint(&base, Duration::from_secs(5))
        .exchange(&relay_on(&[Uuid::new_v4()]))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::WebSocketClosed { .. } | Error::WebSocket(_)),
        "expected a closed-channel error, got: {err:?}"
    );
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind and drop to get a port nothing listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let base = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();

    let err = endpoint(&base, Duration::from_secs(2))
        .exchange(&relay_on(&[Uuid::new_v4()]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::WebSocketConnect(_)), "got: {err:?}");
}

#[tokio::test]
async fn test_session_walks_through_its_states() {
    let (base, mut seen) = spawn_server(Script::Ack).await;
    let url = endpoint(&base, Duration::from_secs(5)).url().clone();
    let id = Uuid::new_v4();

    let mut session = ControlSession::connect(&url, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Connected);

    let auth_reply = session
        .authenticate(&SecretString::from("ws-secret".to_owned()))
        .await
        .unwrap();
    assert_eq!(auth_reply["type"], "authResp");
    assert_eq!(session.state(), SessionState::Authenticated);

    let request = ControlRequest::SetMode {
        objects: vec![ModeTarget::line(id, "manual")],
    };
    let reply = session.request(&request).await.unwrap();
    assert_eq!(reply["type"], "setCtlModeReqAck");
    assert_eq!(session.state(), SessionState::AwaitingAck);

    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);

    // Both frames carry this session's id; compared as raw text because
    // the id is wider than a JSON double.
    let tag = format!("\"sessionId\":{}", session.session_id());
    let auth = seen.recv().await.unwrap();
    let command = seen.recv().await.unwrap();
    assert!(auth.contains("\"authReq\"") && auth.contains(&tag), "{auth}");
    assert!(command.contains("\"setCtlModeReq\"") && command.contains(&tag), "{command}");
}
