//! Line group command handlers (`esc lg ...`).

use tabled::Tabled;

use esc_core::{LineGroup, LineSource, slot};

use crate::cli::{GroupsArgs, GroupsCommand};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Children")]
    children: String,
    #[tabled(rename = "Lines")]
    lines: usize,
}

impl From<&LineGroup> for GroupRow {
    fn from(g: &LineGroup) -> Self {
        Self {
            id: g.id,
            name: g.name.clone(),
            children: g
                .children
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
            lines: g.lines.len(),
        }
    }
}

pub async fn handle<S: LineSource>(
    ctx: &Context,
    source: &S,
    args: GroupsArgs,
) -> Result<(), CliError> {
    match args.command {
        GroupsCommand::List => {
            let Some(mut groups) = util::or_payload(ctx, source.fetch_groups().await)? else {
                return Ok(());
            };
            groups.sort_by_key(|g| g.id);

            let out = output::render_list(
                ctx.output(),
                &groups,
                |g| GroupRow::from(g),
                |g| g.id.to_string(),
            )?;
            ctx.emit(slot::GROUPS_LIST, &out)
        }
    }
}
