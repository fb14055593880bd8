//! Schema command

use clap::Args;

use crate::output::format_schema;
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct SchemaCmdArgs {
    /// Ignore any cached schema and regenerate
    #[arg(long)]
    pub refresh: bool,
}

pub async fn run(args: &SchemaCmdArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let schema = if args.refresh {
        ctx.service.refresh_schema().await?
    } else {
        ctx.service.schema().await?
    };

    println!("{}", format_schema(&schema, cli.output_format())?);
    Ok(())
}
