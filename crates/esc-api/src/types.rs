// Wire types for the lighting backend.
//
// Records are read-only snapshots; unknown fields are ignored and sparse
// fields default so that older backends still deserialize.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A controllable lighting circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub maintenance: bool,
    #[serde(default)]
    pub groups: BTreeSet<i64>,
}

/// Live state of one line, keyed by the line id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStatus {
    pub line_id: Uuid,
    #[serde(default)]
    pub relay: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    /// Electrical parameters. Nested and sparse: any value may be `null`.
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

/// A named collection of lines and child groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineGroup {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub children: BTreeSet<i64>,
    #[serde(default)]
    pub lines: BTreeSet<Uuid>,
}

/// Request body for creating a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLine {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}
