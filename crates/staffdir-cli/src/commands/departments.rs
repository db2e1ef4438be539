//! Shows the department filter options.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use console::style;

use super::{OutputFormat, load_config};

#[derive(Debug, Args)]
pub struct DepartmentsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(config: Option<&Path>, args: &DepartmentsArgs) -> Result<()> {
    let config = load_config(config)?;
    let options = config.department_options();

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    if !config.show_department_filter {
        println!(
            "{} the department filter is hidden in this directory",
            style("note:").yellow()
        );
    }

    println!("{:<20} {}", style("KEY").bold(), style("NAME").bold());
    println!("{}", "-".repeat(50));
    for option in &options {
        let key = if option.key.is_empty() { "-" } else { option.key.as_str() };
        println!("{key:<20} {}", option.display_name);
    }

    Ok(())
}
