//! The directory view: query modes, paging and the UI state around them.
//!
//! The view is a small state machine over [`QueryMode`]. Every transition
//! goes through [`DirectoryView::refresh`], which issues the engine query for
//! the new mode, clears the state belonging to the other modes and goes back
//! to page 1.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::{
    config::{ConfigError, DirectoryConfig, validate_page_size},
    directory::{DirectoryEngine, DirectoryPage},
    person::{DepartmentOption, Person},
};

/// What the result list currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QueryMode {
    /// Default scope, no filter.
    Initial,
    /// Free-text search.
    TextSearch(String),
    /// Given name or surname starting with a letter.
    LetterSearch(String),
    /// A configured department, by key.
    DeptFilter(String),
}

/// Errors from view transitions.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ViewError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("page {page} is out of range (1..={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },
}

/// A paged directory view over a shared [`DirectoryEngine`].
#[derive(Debug)]
pub struct DirectoryView {
    engine: Arc<DirectoryEngine>,
    title: String,
    page_size: u32,
    custom_query: Option<String>,
    departments: Vec<DepartmentOption>,
    show_department_filter: bool,
    mode: QueryMode,
    page: usize,
    search_text: String,
    selected_letter: Option<String>,
    selected_department: String,
}

impl DirectoryView {
    /// Creates a view in [`QueryMode::Initial`]. Nothing is fetched until
    /// [`DirectoryView::load`] or another transition runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured page size is out of range.
    pub fn new(engine: Arc<DirectoryEngine>, config: &DirectoryConfig) -> Result<Self, ViewError> {
        let page_size = validate_page_size(config.page_size)?;
        Ok(Self {
            engine,
            title: config.title.clone(),
            page_size,
            custom_query: config.custom_query().map(str::to_string),
            departments: config.department_options(),
            show_department_filter: config.show_department_filter,
            mode: QueryMode::Initial,
            page: 1,
            search_text: String::new(),
            selected_letter: None,
            selected_department: String::new(),
        })
    }

    /// Runs the initial load.
    pub async fn load(&mut self) -> DirectoryPage {
        self.refresh(QueryMode::Initial).await
    }

    /// Switches to `mode`, queries the engine and resets to page 1.
    ///
    /// Blank text searches, letters and department keys fall back to
    /// [`QueryMode::Initial`].
    pub async fn refresh(&mut self, mode: QueryMode) -> DirectoryPage {
        let mode = match mode {
            QueryMode::TextSearch(text) if text.trim().is_empty() => QueryMode::Initial,
            QueryMode::LetterSearch(letter) if letter.trim().is_empty() => QueryMode::Initial,
            QueryMode::DeptFilter(key) if key.trim().is_empty() => QueryMode::Initial,
            other => other,
        };

        match &mode {
            QueryMode::Initial => {
                self.search_text.clear();
                self.selected_letter = None;
                self.selected_department.clear();
            }
            QueryMode::TextSearch(text) => {
                self.search_text.clone_from(text);
                self.selected_letter = None;
                self.selected_department.clear();
            }
            QueryMode::LetterSearch(letter) => {
                self.search_text.clear();
                self.selected_letter = Some(letter.clone());
                self.selected_department.clear();
            }
            QueryMode::DeptFilter(key) => {
                self.search_text.clone_from(key);
                self.selected_letter = None;
                self.selected_department.clone_from(key);
            }
        }

        debug!(?mode, page_size = self.page_size, "refreshing directory view");
        self.mode = mode;
        self.page = 1;

        let custom_query = self.custom_query.as_deref();
        match &self.mode {
            QueryMode::Initial => {
                self.engine
                    .get_initial_load(self.page_size, custom_query)
                    .await
            }
            QueryMode::TextSearch(text) | QueryMode::DeptFilter(text) => {
                self.engine
                    .search_people(text, self.page_size, custom_query)
                    .await
            }
            QueryMode::LetterSearch(letter) => {
                self.engine
                    .search_letter(letter, self.page_size, custom_query)
                    .await
            }
        }
    }

    /// Submits the search box.
    pub async fn submit_search(&mut self, text: &str) -> DirectoryPage {
        self.refresh(QueryMode::TextSearch(text.to_string())).await
    }

    /// Clears the search box and returns to the unfiltered list.
    pub async fn clear_search(&mut self) -> DirectoryPage {
        self.refresh(QueryMode::Initial).await
    }

    /// Selects a letter; selecting the current letter again clears it.
    pub async fn click_letter(&mut self, letter: &str) -> DirectoryPage {
        if self.selected_letter.as_deref() == Some(letter) {
            self.refresh(QueryMode::Initial).await
        } else {
            self.refresh(QueryMode::LetterSearch(letter.to_string()))
                .await
        }
    }

    /// Selects a department by key. The empty key means all departments.
    pub async fn select_department(&mut self, key: &str) -> DirectoryPage {
        self.refresh(QueryMode::DeptFilter(key.to_string())).await
    }

    /// Changes the page size and reloads from the initial mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the page size is out of range; the view is left
    /// unchanged.
    pub async fn set_page_size(&mut self, page_size: u32) -> Result<DirectoryPage, ViewError> {
        self.page_size = validate_page_size(page_size)?;
        Ok(self.refresh(QueryMode::Initial).await)
    }

    /// Moves to `page`, fetching the missing pages when it lies beyond what
    /// has been loaded. Going back is client-side only.
    ///
    /// # Errors
    ///
    /// Returns an error if `page` is outside `1..=page_count()`.
    pub async fn go_to_page(&mut self, page: usize) -> Result<Vec<Person>, ViewError> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(ViewError::PageOutOfRange { page, page_count });
        }

        let loaded_pages = self.loaded_pages();
        if page > loaded_pages && self.engine.has_next_page() {
            let hops = u32::try_from(page - loaded_pages).unwrap_or(u32::MAX);
            debug!(page, loaded_pages, hops, "fetching missing pages");
            self.engine.get_next_page(hops).await;
        }

        self.page = page;
        Ok(self.visible_people())
    }

    /// Number of pager entries: `ceil(total / page_size)`.
    pub fn page_count(&self) -> usize {
        let total = usize::try_from(self.engine.total()).unwrap_or(usize::MAX);
        total.div_ceil(self.page_size as usize)
    }

    /// The people on the current page.
    pub fn visible_people(&self) -> Vec<Person> {
        let size = self.page_size as usize;
        self.engine
            .results()
            .into_iter()
            .skip((self.page - 1) * size)
            .take(size)
            .collect()
    }

    pub fn engine(&self) -> &Arc<DirectoryEngine> {
        &self.engine
    }

    pub fn mode(&self) -> &QueryMode {
        &self.mode
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total(&self) -> u64 {
        self.engine.total()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn selected_letter(&self) -> Option<&str> {
        self.selected_letter.as_deref()
    }

    pub fn selected_department(&self) -> &str {
        &self.selected_department
    }

    pub fn show_department_filter(&self) -> bool {
        self.show_department_filter
    }

    pub fn department_options(&self) -> &[DepartmentOption] {
        &self.departments
    }

    fn loaded_pages(&self) -> usize {
        self.engine.results().len().div_ceil(self.page_size as usize)
    }
}
