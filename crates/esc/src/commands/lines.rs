//! Lighting line command handlers (`esc ll ...`).

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use esc_core::{
    ControlAction, ControlChannel, ControlOutcome, Exchange, Line, LineSource, LineView, NewLine,
    ResultCache, filter, run_control, slot, with_status,
};

use crate::cli::{ControlCommand, LinesArgs, LinesCommand, QueryArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Lat")]
    lat: String,
    #[tabled(rename = "Lng")]
    lng: String,
    #[tabled(rename = "M")]
    maintenance: &'static str,
    #[tabled(rename = "Groups")]
    groups: String,
}

impl From<&Line> for LineRow {
    fn from(l: &Line) -> Self {
        Self {
            id: l.id.to_string(),
            name: l.name.clone(),
            lat: output::opt(l.lat.as_ref()),
            lng: output::opt(l.lng.as_ref()),
            maintenance: if l.maintenance { "t" } else { "f" },
            groups: join_groups(&l.groups),
        }
    }
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Relay")]
    relay: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Params")]
    params: String,
}

impl From<&LineView> for StatusRow {
    fn from(v: &LineView) -> Self {
        Self {
            id: v.line.id.to_string(),
            name: v.line.name.clone(),
            relay: output::opt(v.relay.as_ref()),
            mode: output::opt(v.mode.as_ref()),
            params: flatten_params(&v.params),
        }
    }
}

fn join_groups(groups: &BTreeSet<i64>) -> String {
    groups
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// `a.b=1 c=on`, skipping nulls. Nested objects flatten to dotted keys.
fn flatten_params(params: &std::collections::BTreeMap<String, Value>) -> String {
    fn walk(prefix: &str, value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Null => {}
            Value::Object(map) => {
                for (k, v) in map {
                    walk(&format!("{prefix}.{k}"), v, out);
                }
            }
            Value::String(s) => out.push(format!("{prefix}={s}")),
            other => out.push(format!("{prefix}={other}")),
        }
    }

    let mut out = Vec::new();
    for (k, v) in params {
        walk(k, v, &mut out);
    }
    out.join(" ")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle<S, C>(
    ctx: &Context,
    source: &S,
    channel: impl FnOnce() -> Result<C, CliError>,
    args: LinesArgs,
) -> Result<(), CliError>
where
    S: LineSource,
    C: ControlChannel,
{
    match args.command {
        LinesCommand::List(query) => list(ctx, source, &query).await,
        LinesCommand::Status(query) => status(ctx, source, &query).await,
        LinesCommand::Show { id } => show(ctx, source, &id).await,
        LinesCommand::Add { name, lat, lng } => add(ctx, source, NewLine { name, lat, lng }).await,
        LinesCommand::Control(control) => {
            let action = match control.command {
                ControlCommand::Relay { state } => ControlAction::Relay(state),
                ControlCommand::Mode { mode } => ControlAction::Mode(mode),
            };
            send_control(ctx, &channel()?, action).await
        }
    }
}

/// Fetch, cache the raw list sorted by id, then filter and cache the
/// selection. `None` when a backend payload was printed instead.
async fn select<S: LineSource>(
    ctx: &Context,
    source: &S,
    query: &QueryArgs,
) -> Result<Option<Vec<Line>>, CliError> {
    let Some(lines) = util::or_payload(ctx, source.fetch_lines().await)? else {
        return Ok(None);
    };
    let lines = store_raw(ctx.cache(), lines)?;

    let selection = filter::apply(lines, &query.sort, query.group, query.filter.as_ref());
    ctx.cache().set(slot::SELECTION, &selection)?;
    tracing::debug!(selected = selection.len(), "selection stored");
    Ok(Some(selection))
}

fn store_raw(cache: &ResultCache, lines: Vec<Line>) -> Result<Vec<Line>, CliError> {
    let lines = filter::apply(lines, &esc_core::SortKey::Id, None, None);
    cache.set(slot::LINES, &lines)?;
    Ok(lines)
}

async fn list<S: LineSource>(ctx: &Context, source: &S, query: &QueryArgs) -> Result<(), CliError> {
    let Some(selection) = select(ctx, source, query).await? else {
        return Ok(());
    };

    let out = output::render_list(
        ctx.output(),
        &selection,
        |l| LineRow::from(l),
        |l| l.id.to_string(),
    )?;
    ctx.emit(slot::LINES_LIST, &out)
}

async fn status<S: LineSource>(
    ctx: &Context,
    source: &S,
    query: &QueryArgs,
) -> Result<(), CliError> {
    let Some(selection) = select(ctx, source, query).await? else {
        return Ok(());
    };
    let Some(states) = util::or_payload(ctx, source.fetch_lines_status().await)? else {
        return Ok(());
    };

    let views = with_status(selection, states);
    let out = output::render_list(
        ctx.output(),
        &views,
        |v| StatusRow::from(v),
        |v| v.line.id.to_string(),
    )?;
    ctx.emit(slot::LINES_STATUS, &out)
}

async fn show<S: LineSource>(ctx: &Context, source: &S, id: &str) -> Result<(), CliError> {
    let lines = match ctx.cache().get::<Vec<Line>>(slot::LINES) {
        Some(cached) => cached,
        None => {
            tracing::debug!("no cached lines, fetching");
            let Some(fetched) = util::or_payload(ctx, source.fetch_lines().await)? else {
                return Ok(());
            };
            store_raw(ctx.cache(), fetched)?
        }
    };
    let chosen = filter::find_by_prefix(&lines, id)?.id;

    let Some(line) = util::or_payload(ctx, source.fetch_line(chosen).await)? else {
        return Ok(());
    };
    let Some(state) = util::or_payload(ctx, source.fetch_line_state(chosen).await)? else {
        return Ok(());
    };

    let view = LineView::new(line, Some(state));
    let out = output::render_single(ctx.output(), &view, detail, |v| v.line.id.to_string())?;
    ctx.emit(slot::LINES_SHOW, &out)
}

fn detail(v: &LineView) -> String {
    let mut pairs = vec![
        ("id", v.line.id.to_string()),
        ("name", v.line.name.clone()),
        ("lat", output::opt(v.line.lat.as_ref())),
        ("lng", output::opt(v.line.lng.as_ref())),
        ("maintenance", v.line.maintenance.to_string()),
        ("groups", join_groups(&v.line.groups)),
        ("relay", output::opt(v.relay.as_ref())),
        ("mode", output::opt(v.mode.as_ref())),
    ];
    let params = flatten_params(&v.params);
    if !params.is_empty() {
        pairs.push(("params", params));
    }
    output::render_detail(&pairs)
}

async fn add<S: LineSource>(ctx: &Context, source: &S, new: NewLine) -> Result<(), CliError> {
    let Some(created) = util::or_payload(ctx, source.create_line(&new).await)? else {
        return Ok(());
    };
    tracing::info!(id = %created.id, name = %created.name, "line created");

    let out = output::render_single(
        ctx.output(),
        &created,
        |l| {
            output::render_detail(&[
                ("id", l.id.to_string()),
                ("name", l.name.clone()),
                ("lat", output::opt(l.lat.as_ref())),
                ("lng", output::opt(l.lng.as_ref())),
            ])
        },
        |l| l.id.to_string(),
    )?;
    ctx.emit(slot::LAST, &out)
}

// ── Control ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ControlReport<'a> {
    action: String,
    lines: usize,
    auth: &'a Value,
    reply: &'a Value,
}

async fn send_control<C: ControlChannel>(
    ctx: &Context,
    channel: &C,
    action: ControlAction,
) -> Result<(), CliError> {
    let yes = ctx.global().yes;
    let outcome = run_control(ctx.cache(), channel, action, |prompt| {
        util::confirm(prompt, &action.to_string(), yes)
    })
    .await?;

    match outcome {
        ControlOutcome::Declined { count } => {
            if !ctx.global().quiet {
                eprintln!("Aborted, nothing sent to {count} line(s)");
            }
            Ok(())
        }
        ControlOutcome::Completed { count, exchange } => {
            let Exchange { auth_reply, reply } = &exchange;
            let report = ControlReport {
                action: action.to_string(),
                lines: count,
                auth: auth_reply,
                reply,
            };
            let out = output::render_single(ctx.output(), &report, control_detail, |r| {
                r.reply.to_string()
            })?;
            ctx.emit(slot::LAST, &out)
        }
    }
}

fn control_detail(r: &ControlReport<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} line(s))", r.action, r.lines);
    let _ = writeln!(out, "auth:  {}", output::render_payload(r.auth));
    let _ = write!(out, "reply: {}", output::render_payload(r.reply));
    out
}
