// Lines joined with their live state, for `ll status` and `ll show`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use esc_api::{Line, LineStatus};

/// A line snapshot merged with its state record, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineView {
    #[serde(flatten)]
    pub line: Line,
    pub relay: Option<String>,
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl LineView {
    pub fn new(line: Line, status: Option<LineStatus>) -> Self {
        let (relay, mode, params) = match status {
            Some(s) => (s.relay, s.mode, s.params),
            None => (None, None, BTreeMap::new()),
        };
        Self {
            line,
            relay,
            mode,
            params,
        }
    }
}

/// Join `lines` with `states` by line id, keeping the order of `lines`.
/// State records for lines not in `lines` are dropped.
pub fn with_status(lines: Vec<Line>, states: Vec<LineStatus>) -> Vec<LineView> {
    let mut by_line: HashMap<Uuid, LineStatus> =
        states.into_iter().map(|s| (s.line_id, s)).collect();

    lines
        .into_iter()
        .map(|line| {
            let status = by_line.remove(&line.id);
            if status.is_none() {
                tracing::debug!(line_id = %line.id, "no state record for line");
            }
            LineView::new(line, status)
        })
        .collect()
}
