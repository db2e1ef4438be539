//! Lists the default directory: "people I work with" or the configured
//! tenant or group scope.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use staffdir::QueryMode;

use super::{OutputArgs, load_config, run_query};

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn run(config: Option<&Path>, args: &ListArgs) -> Result<()> {
    run_query(load_config(config)?, QueryMode::Initial, &args.output).await
}
