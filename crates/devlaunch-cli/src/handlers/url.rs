//! `url`: resolve where a role is served.

use anyhow::Result;
use devlaunch_core::Role;

use crate::bootstrap::CliContext;

pub async fn execute(ctx: &CliContext, role: Role) -> Result<()> {
    println!("{}", ctx.supervisor().resolve_url(role).await);
    Ok(())
}
