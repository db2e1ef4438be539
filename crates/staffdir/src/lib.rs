//! A staff directory over Microsoft Graph.
//!
//! This crate lists people from a Microsoft 365 tenant, searches them by free
//! text, first letter or department, pages through large result sets with
//! server-side continuation links and enriches every person with their
//! profile photo.
//!
//! # Key Components
//!
//! - **Configuration**: [`DirectoryConfig`] loaded from `staffdir.toml`
//! - **Graph access**: [`GraphClient`] wrapping the REST calls the directory needs
//! - **Query engine**: [`DirectoryEngine`] owning the result set, total and cursor
//! - **View**: [`DirectoryView`] tracking query mode, page and filter state
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use staffdir::{DirectoryConfig, DirectoryEngine, DirectoryView};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DirectoryConfig::load("staffdir.toml")?;
//! let engine = Arc::new(DirectoryEngine::from_config(&config)?);
//! let mut view = DirectoryView::new(engine, &config)?;
//!
//! view.load().await;
//! view.click_letter("M").await;
//! for person in view.visible_people() {
//!     println!("{}", person.label());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! The engine may be shared behind an `Arc`. Overlapping queries are allowed;
//! only the most recently started one commits its results.

pub mod config;
pub mod directory;
pub mod graph;
pub mod person;
pub mod photo;
pub mod query;
pub mod view;

pub use config::{ConfigError, DirectoryConfig};
pub use directory::{DirectoryEngine, DirectoryError, DirectoryPage};
pub use graph::{GraphClient, GraphError};
pub use person::{DepartmentOption, Person};
pub use photo::PhotoResolver;
pub use query::DirectoryScope;
pub use view::{DirectoryView, QueryMode, ViewError};
