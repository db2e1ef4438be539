//! CLI command implementations.
//!
//! Every query command follows the same flow: load the config, build the
//! engine and view, run one view transition, move to the requested page and
//! print it.

pub mod department;
pub mod departments;
pub mod letter;
pub mod list;
pub mod search;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use console::style;
use serde::Serialize;
use staffdir::{DirectoryConfig, DirectoryEngine, DirectoryView, Person, QueryMode};
use tracing::debug;

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

/// Paging and output options shared by the query commands.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Page to show, starting at 1
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Overrides the configured page size (4 to 20, even)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Loads `staffdir.toml` from `path` or the usual lookup, then validates it.
///
/// Without any config file the defaults apply and the token must come from
/// the environment.
pub fn load_config(path: Option<&Path>) -> Result<DirectoryConfig> {
    let config = match path {
        Some(path) => DirectoryConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => DirectoryConfig::load_resolved()
            .context("failed to load staffdir.toml")?
            .unwrap_or_default(),
    };

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Runs `mode` against the directory and prints the requested page.
pub async fn run_query(
    mut config: DirectoryConfig,
    mode: QueryMode,
    output: &OutputArgs,
) -> Result<()> {
    debug!(?mode, page = output.page, "running directory query");
    if let Some(page_size) = output.page_size {
        config.page_size = page_size;
    }

    let engine = DirectoryEngine::from_config(&config).context("failed to create directory")?;
    let mut view = DirectoryView::new(Arc::new(engine), &config)?;

    view.refresh(mode).await;

    if view.page_count() == 0 {
        return print_page(&view, &[], output.format);
    }
    if output.page == 0 || output.page > view.page_count() {
        bail!(
            "page {} is out of range, {} page(s) available",
            output.page,
            view.page_count()
        );
    }

    let people = view.go_to_page(output.page).await?;
    print_page(&view, &people, output.format)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageOutput<'a> {
    mode: &'a QueryMode,
    page: usize,
    page_count: usize,
    page_size: u32,
    total: u64,
    items: &'a [Person],
}

fn print_page(view: &DirectoryView, people: &[Person], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let output = PageOutput {
            mode: view.mode(),
            page: view.page(),
            page_count: view.page_count(),
            page_size: view.page_size(),
            total: view.total(),
            items: people,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if !view.title().is_empty() {
        println!("{}\n", style(view.title()).bold().underlined());
    }

    if people.is_empty() {
        println!("No people found");
        return Ok(());
    }

    println!(
        "{:<28} {:<28} {:<20} {:<32} {}",
        style("NAME").bold(),
        style("JOB TITLE").bold(),
        style("DEPARTMENT").bold(),
        style("EMAIL").bold(),
        style("PHONE").bold()
    );
    println!("{}", "-".repeat(124));

    for person in people {
        let phone = person
            .business_phone
            .first()
            .or(person.mobile_phone.as_ref())
            .map_or("", String::as_str);

        println!(
            "{:<28} {:<28} {:<20} {:<32} {}",
            truncate(&person.label(), 28),
            truncate(person.job_title.as_deref().unwrap_or_default(), 28),
            truncate(person.department.as_deref().unwrap_or_default(), 20),
            truncate(person.email.as_deref().unwrap_or_default(), 32),
            phone
        );
    }

    println!(
        "\n{} page {} of {} ({} people)",
        style("✓").green(),
        view.page(),
        view.page_count(),
        view.total()
    );
    Ok(())
}

/// Cuts `text` to at most `max` characters, ending in "..." when shortened.
fn truncate(text: &str, max: usize) -> String {
    const ELLIPSIS: &str = "...";

    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_none() {
        return head;
    }

    let prefix: String = head.chars().take(max.saturating_sub(ELLIPSIS.len())).collect();
    format!("{prefix}{ELLIPSIS}")
}
