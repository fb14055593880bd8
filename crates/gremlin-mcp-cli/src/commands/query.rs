//! Query command

use clap::Args;

use crate::output::to_json;
use crate::AppContext;

#[derive(Args)]
pub struct QueryArgs {
    /// Gremlin traversal, e.g. "g.V().limit(5).valueMap()"
    pub gremlin: String,
}

pub async fn run(args: &QueryArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let rows = ctx.service.run_query(&args.gremlin).await?;
    tracing::debug!(rows = rows.len(), "Query complete");
    println!("{}", to_json(&rows)?);
    Ok(())
}
