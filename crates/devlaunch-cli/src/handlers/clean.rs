//! `clean`: stop leftover dev-runtime listeners on the well-known ports.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::presentation::EventPrinter;

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let printer = EventPrinter::spawn(ctx.subscribe());
    let report = ctx.supervisor().clean_stray_listeners().await;
    printer.finish().await;

    if report.is_empty() {
        println!("No stray listeners found.");
    } else {
        println!(
            "Stopped {} process(es), {} warning(s).",
            report.terminated.len(),
            report.warnings.len()
        );
    }
    Ok(())
}
