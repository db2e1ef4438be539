//! Department filter by configured key.

use std::path::Path;

use anyhow::{Result, bail};
use clap::Args;
use staffdir::{DirectoryConfig, QueryMode};

use super::{OutputArgs, load_config, run_query};

#[derive(Debug, Args)]
pub struct DepartmentArgs {
    /// Department key from `[[departments]]`
    pub key: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Filters by a department. The key is checked before any request is sent.
pub async fn run(config: Option<&Path>, args: &DepartmentArgs) -> Result<()> {
    let loaded = load_config(config)?;
    check_department(&loaded, &args.key)?;

    run_query(loaded, QueryMode::DeptFilter(args.key.clone()), &args.output).await
}

/// Only configured departments can be queried, and only while the
/// department filter is shown.
fn check_department(config: &DirectoryConfig, key: &str) -> Result<()> {
    if !config.show_department_filter {
        bail!("the department filter is hidden in this directory (show_department_filter = false)");
    }

    if !config.departments.iter().any(|d| d.key == key) {
        let known: Vec<&str> = config.departments.iter().map(|d| d.key.as_str()).collect();
        let known = if known.is_empty() {
            "none".to_string()
        } else {
            known.join(", ")
        };
        bail!("unknown department {key:?} (configured: {known})");
    }

    Ok(())
}
