// ── Control commands ──
//
// Turns a user action plus the cached selection into one control request,
// guarded by a selection check and a confirmation callback.

use std::fmt;

use strum::{Display, EnumString};

use crate::cache::{ResultCache, slot};
use crate::error::CoreError;
use esc_api::{ControlEndpoint, ControlRequest, CtlCommand, Exchange, Line, ModeTarget, ObjectRef};

/// Relay position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RelayState {
    On,
    Off,
}

/// Operating mode of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum ControlMode {
    /// Scheduled automatic operation.
    #[strum(serialize = "auto:sch")]
    AutoSchedule,
    #[strum(serialize = "manual")]
    Manual,
}

/// What to do with the selected lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Relay(RelayState),
    Mode(ControlMode),
}

impl ControlAction {
    /// Build the wire request addressing `lines`, in selection order.
    pub fn request(&self, lines: &[Line]) -> ControlRequest {
        match self {
            Self::Relay(state) => ControlRequest::SendCommand {
                cmd: match state {
                    RelayState::On => CtlCommand::RelayEnable,
                    RelayState::Off => CtlCommand::RelayDisable,
                },
                params: serde_json::Map::new(),
                objects: lines.iter().map(|l| ObjectRef::line(l.id)).collect(),
            },
            Self::Mode(mode) => ControlRequest::SetMode {
                objects: lines
                    .iter()
                    .map(|l| ModeTarget::line(l.id, mode.to_string()))
                    .collect(),
            },
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay(state) => write!(f, "switch relay {state}"),
            Self::Mode(mode) => write!(f, "set mode {mode}"),
        }
    }
}

// ── Channel seam ─────────────────────────────────────────────────────

/// Something that can carry one authenticated control exchange.
#[allow(async_fn_in_trait)]
pub trait ControlChannel {
    async fn exchange(&self, request: &ControlRequest) -> Result<Exchange, CoreError>;
}

impl ControlChannel for ControlEndpoint {
    async fn exchange(&self, request: &ControlRequest) -> Result<Exchange, CoreError> {
        tracing::debug!(url = %self.url(), targets = request.target_count(), "control exchange");
        Ok(ControlEndpoint::exchange(self, request).await?)
    }
}

// ── Guarded execution ────────────────────────────────────────────────

/// Result of a guarded control command.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    /// The user said no; nothing was sent.
    Declined { count: usize },
    Completed { count: usize, exchange: Exchange },
}

/// Send `action` to the cached selection.
///
/// A missing or empty selection fails before the channel is touched.
/// `confirm` receives the prompt text and decides whether to proceed.
pub async fn run_control<C, F, E>(
    cache: &ResultCache,
    channel: &C,
    action: ControlAction,
    confirm: F,
) -> Result<ControlOutcome, E>
where
    C: ControlChannel,
    F: FnOnce(&str) -> Result<bool, E>,
    E: From<CoreError>,
{
    let selection: Vec<Line> = cache
        .get(slot::SELECTION)
        .filter(|lines: &Vec<Line>| !lines.is_empty())
        .ok_or(CoreError::SelectionMissing)?;
    let count = selection.len();

    let noun = if count == 1 { "line" } else { "lines" };
    let prompt = format!("{} for {count} {noun}?", capitalize(&action.to_string()));
    if !confirm(&prompt)? {
        tracing::info!(%action, count, "control command declined");
        return Ok(ControlOutcome::Declined { count });
    }

    let request = action.request(&selection);
    let exchange = channel.exchange(&request).await?;
    Ok(ControlOutcome::Completed { count, exchange })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
