//! Status command

use crate::output::format_status;
use crate::{AppContext, Cli};

pub async fn run(cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let status = ctx.service.status().await;
    println!("{}", format_status(&status, cli.output_format())?);

    if !status.connected {
        anyhow::bail!("Graph is not reachable");
    }
    Ok(())
}
