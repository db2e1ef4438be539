//! A-Z navigation: people whose given name or surname starts with a letter.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use staffdir::QueryMode;

use super::{OutputArgs, load_config, run_query};

#[derive(Debug, Args)]
pub struct LetterArgs {
    /// A single letter, e.g. `M`
    #[arg(value_parser = parse_letter)]
    pub letter: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

fn parse_letter(value: &str) -> Result<String, String> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Ok(c.to_uppercase().collect()),
        _ => Err(format!("expected a single letter, got {value:?}")),
    }
}

pub async fn run(config: Option<&Path>, args: &LetterArgs) -> Result<()> {
    run_query(
        load_config(config)?,
        QueryMode::LetterSearch(args.letter.clone()),
        &args.output,
    )
    .await
}
