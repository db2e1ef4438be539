//! Free-text search over display name, department and job title.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use staffdir::QueryMode;

use super::{OutputArgs, load_config, run_query};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search text; several words are searched as one phrase
    #[arg(required = true, num_args = 1..)]
    pub words: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl SearchArgs {
    pub fn text(&self) -> String {
        self.words.join(" ")
    }
}

/// Runs the search. A blank phrase falls back to the default listing.
pub async fn run(config: Option<&Path>, args: &SearchArgs) -> Result<()> {
    run_query(
        load_config(config)?,
        QueryMode::TextSearch(args.text()),
        &args.output,
    )
    .await
}
