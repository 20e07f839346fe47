#![allow(clippy::unwrap_used)]
// A query in one invocation, a control command in the next.

use std::cell::RefCell;
use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use esc_api::{ControlRequest, CtlCommand};
use esc_core::{
    ControlAction, ControlChannel, ControlOutcome, CoreError, Exchange, FilterSpec, Line,
    LineGroup, LineSource, LineStatus, NewLine, RelayState, ResultCache, SortKey, apply, slot,
};

// ── Fakes ───────────────────────────────────────────────────────────

struct FakeBackend {
    lines: Vec<Line>,
}

impl LineSource for FakeBackend {
    async fn fetch_lines(&self) -> Result<Vec<Line>, CoreError> {
        Ok(self.lines.clone())
    }

    async fn fetch_line(&self, id: Uuid) -> Result<Line, CoreError> {
        self.lines
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "line".into(),
                identifier: id.to_string(),
            })
    }

    async fn fetch_lines_status(&self) -> Result<Vec<LineStatus>, CoreError> {
        Ok(Vec::new())
    }

    async fn fetch_groups(&self) -> Result<Vec<LineGroup>, CoreError> {
        Ok(Vec::new())
    }

    async fn create_line(&self, _line: &NewLine) -> Result<Line, CoreError> {
        Err(CoreError::Internal("read-only fake".into()))
    }
}

#[derive(Default)]
struct RecordingChannel {
    sent: RefCell<Vec<ControlRequest>>,
}

impl ControlChannel for RecordingChannel {
    async fn exchange(&self, request: &ControlRequest) -> Result<Exchange, CoreError> {
        self.sent.borrow_mut().push(request.clone());
        Ok(Exchange {
            auth_reply: json!({ "type": "authResp" }),
            reply: json!({ "type": "objSendCtlCmdResp" }),
        })
    }
}

fn line(n: u128, name: &str, maintenance: bool) -> Line {
    Line {
        id: Uuid::from_u128(n),
        name: name.into(),
        lat: None,
        lng: None,
        maintenance,
        groups: BTreeSet::from([1]),
    }
}

// ── Flow ────────────────────────────────────────────────────────────

#[test]
fn maintenance_selection_drives_the_relay_command() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let backend = FakeBackend {
        lines: vec![
            line(3, "Mira", true),
            line(1, "Arbat", false),
            line(2, "Lenina", true),
        ],
    };

    // First invocation: `ll list --filter m:t`
    {
        let cache = ResultCache::open(&path);
        let fetched = tokio_test::block_on(backend.fetch_lines()).unwrap();
        let filter: FilterSpec = "m:t".parse().unwrap();
        let selection = apply(fetched, &SortKey::Id, None, Some(&filter));
        cache.set(slot::SELECTION, &selection).unwrap();
    }

    // Second invocation: `ll command relay on --yes`
    let cache = ResultCache::open(&path);
    let channel = RecordingChannel::default();
    let outcome = tokio_test::block_on(esc_core::run_control(
        &cache,
        &channel,
        ControlAction::Relay(RelayState::On),
        |_| Ok::<_, CoreError>(true),
    ))
    .unwrap();

    assert!(matches!(outcome, ControlOutcome::Completed { count: 2, .. }));

    let sent = channel.sent.borrow();
    assert_eq!(sent.len(), 1);
    let ControlRequest::SendCommand { cmd, objects, .. } = &sent[0] else {
        panic!("expected a relay command, got {:?}", sent[0]);
    };
    assert_eq!(*cmd, CtlCommand::RelayEnable);
    let ids: Vec<Uuid> = objects.iter().map(|o| o.id).collect();
    assert_eq!(ids, [Uuid::from_u128(2), Uuid::from_u128(3)]);
}

#[test]
fn state_lookup_requires_exactly_one_match() {
    let backend = FakeBackend {
        lines: vec![line(1, "Arbat", false)],
    };
    let err = tokio_test::block_on(backend.fetch_line_state(Uuid::from_u128(1))).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}
