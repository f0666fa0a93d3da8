//! `status`: probe each role's ports without starting anything.

use std::collections::BTreeMap;

use anyhow::Result;
use devlaunch_core::{Role, RoleStatus};
use serde_json::json;

use crate::bootstrap::CliContext;
use crate::presentation::{print_separator, render_status_row};
use crate::presentation::tables::STATUS_HEADER;

/// Print the supervisor's per-role table.
pub fn print_table(status: &BTreeMap<Role, RoleStatus>) {
    println!("{STATUS_HEADER}");
    print_separator(STATUS_HEADER.len());
    for role in Role::ALL {
        if let Some(entry) = status.get(&role) {
            println!("{}", render_status_row(role, entry));
        }
    }
}

pub async fn execute(ctx: &CliContext, as_json: bool) -> Result<()> {
    let supervisor = ctx.supervisor();
    let live = supervisor.check_liveness().await;

    let mut rows = Vec::new();
    for role in [Role::Frontend, Role::Backend] {
        let url = supervisor.resolve_url(role).await;
        rows.push((role, live.get(&role).copied().unwrap_or(false), url));
    }

    if as_json {
        let value: serde_json::Map<String, serde_json::Value> = rows
            .iter()
            .map(|(role, live, url)| (role.to_string(), json!({ "live": live, "url": url })))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{:<10} {:<5} URL", "Role", "Live");
    print_separator(40);
    for (role, live, url) in rows {
        println!(
            "{:<10} {:<5} {url}",
            role.display_name(),
            if live { "up" } else { "down" }
        );
    }
    Ok(())
}
