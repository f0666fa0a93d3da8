//! `up`: start everything and stream output until Ctrl-C.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::handlers::session;

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let session = session::open(ctx).await?;
    println!("Servers starting. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    println!();

    session::close(ctx, session).await;
    Ok(())
}
