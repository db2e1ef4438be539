//! Directory configuration.
//!
//! The directory is configured from a `staffdir.toml` file that carries the
//! settings a host would otherwise receive from its property pane (title,
//! page size, departments, custom query) plus the Graph connection and photo
//! enrichment settings.
//!
//! # Resolution Algorithm
//!
//! 1. `STAFFDIR_CONFIG_PATH` environment variable
//! 2. Current directory
//! 3. Parent directories (walk up to filesystem root)
//! 4. XDG config directory (`~/.config/staffdir/staffdir.toml`)
//!
//! # Example
//!
//! ```toml
//! title = "Staff Directory"
//! page_size = 12
//! show_department_filter = true
//! custom_query = "companyName eq 'Contoso'"
//!
//! [[departments]]
//! key = "ENG"
//! name = "Engineering"
//!
//! [graph]
//! scope = "group"
//! group_id = "215d9254-08f3-4402-bbcb-5d99a5258aaa"
//!
//! [photos]
//! concurrency = 4
//! timeout_ms = 5000
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{person::DepartmentOption, query::DirectoryScope};

/// File name looked up in the current and parent directories.
pub const CONFIG_FILE_NAME: &str = "staffdir.toml";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "STAFFDIR_CONFIG_PATH";

/// Environment variable supplying the Graph access token.
pub const ACCESS_TOKEN_ENV: &str = "STAFFDIR_ACCESS_TOKEN";

/// Default Microsoft Graph API endpoint.
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// Smallest page size a host may configure.
pub const MIN_PAGE_SIZE: u32 = 4;

/// Largest page size a host may configure.
pub const MAX_PAGE_SIZE: u32 = 20;

const PAGE_SIZE_STEP: u32 = 2;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error when reading a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error when a config file is malformed.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file not found.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A setting is outside its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Neither the config file nor the environment supplied a token.
    #[error("no Graph access token configured (set graph.access_token or {ACCESS_TOKEN_ENV})")]
    MissingAccessToken,
}

/// Top-level directory configuration from `staffdir.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Heading shown above the directory. Empty hides it.
    #[serde(default)]
    pub title: String,

    /// Number of people per page (4 to 20, step 2).
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Departments offered by the department filter.
    #[serde(default)]
    pub departments: Vec<DepartmentConfig>,

    #[serde(default)]
    pub show_department_filter: bool,

    /// Raw OData filter fragment appended to server-side filters.
    ///
    /// This is trusted operator input and is not sanitised.
    #[serde(default)]
    pub custom_query: Option<String>,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub photos: PhotoConfig,
}

/// A configured department filter entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentConfig {
    /// Department value as stored in the directory.
    pub key: String,
    /// Label shown to users.
    pub name: String,
}

/// Which directory the default load and the queries target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// "People I work with" for the initial load, tenant users otherwise.
    #[default]
    People,
    /// All enabled member accounts in the tenant.
    Tenant,
    /// Members of a single group.
    Group,
}

/// Microsoft Graph connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer token. Falls back to `STAFFDIR_ACCESS_TOKEN` when absent.
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub scope: ScopeKind,

    /// Group ID, required when `scope = "group"`.
    #[serde(default)]
    pub group_id: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_token: None,
            scope: ScopeKind::default(),
            group_id: None,
        }
    }
}

/// Photo enrichment pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoConfig {
    /// Maximum photo requests in flight at once.
    #[serde(default = "default_photo_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_photo_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            concurrency: default_photo_concurrency(),
            timeout_ms: default_photo_timeout_ms(),
        }
    }
}

impl PhotoConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            page_size: default_page_size(),
            departments: Vec::new(),
            show_department_filter: false,
            custom_query: None,
            graph: GraphConfig::default(),
            photos: PhotoConfig::default(),
        }
    }
}

impl DirectoryConfig {
    /// Loads and parses a config file from the given path.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if:
    /// - The file cannot be read (returns `NotFound` variant)
    /// - The file cannot be parsed as TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|_e| ConfigError::NotFound(path.to_path_buf()))?;

        let config: DirectoryConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads the config using the resolution algorithm.
    ///
    /// Returns `Ok(None)` when no config file exists anywhere on the search
    /// path; missing files are not errors.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found config file cannot be read or
    /// parsed.
    pub fn load_resolved() -> Result<Option<Self>, ConfigError> {
        let current = std::env::current_dir()?;
        match resolve_path(env_override(), &current, dirs::config_dir()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading directory config");
                let contents = fs::read_to_string(&path)?;
                Ok(Some(toml::from_str(&contents)?))
            }
            None => Ok(None),
        }
    }

    /// Checks every setting that has a constrained range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `page_size` is outside 4..=20 or not a multiple of 2
    /// - the group scope is selected without a group ID
    /// - the photo pool has zero concurrency
    /// - the Graph endpoint is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_page_size(self.page_size)?;
        self.scope()?;

        if self.photos.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "photos.concurrency must be at least 1".to_string(),
            ));
        }
        if self.graph.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "graph.endpoint must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolves the configured scope into a query scope.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when `scope = "group"` has no
    /// `group_id`.
    pub fn scope(&self) -> Result<DirectoryScope, ConfigError> {
        match self.graph.scope {
            ScopeKind::People => Ok(DirectoryScope::PeopleIWorkWith),
            ScopeKind::Tenant => Ok(DirectoryScope::Tenant),
            ScopeKind::Group => match self.graph.group_id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => Ok(DirectoryScope::Group(id.to_string())),
                _ => Err(ConfigError::Invalid(
                    "graph.group_id is required when graph.scope = \"group\"".to_string(),
                )),
            },
        }
    }

    /// Returns the access token from the config or `STAFFDIR_ACCESS_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingAccessToken` if neither source has a
    /// non-blank token.
    pub fn access_token(&self) -> Result<String, ConfigError> {
        pick_access_token(
            self.graph.access_token.as_deref(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        )
    }

    /// The custom query, with blank values treated as absent.
    #[must_use]
    pub fn custom_query(&self) -> Option<&str> {
        self.custom_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Department filter options, "All departments" first.
    #[must_use]
    pub fn department_options(&self) -> Vec<DepartmentOption> {
        std::iter::once(DepartmentOption::all())
            .chain(
                self.departments
                    .iter()
                    .map(|d| DepartmentOption::new(d.key.clone(), d.name.clone())),
            )
            .collect()
    }
}

/// Checks a page size against the allowed 4..=20 range in steps of 2.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` when the value is out of range or odd.
pub fn validate_page_size(page_size: u32) -> Result<u32, ConfigError> {
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size)
        || (page_size - MIN_PAGE_SIZE) % PAGE_SIZE_STEP != 0
    {
        return Err(ConfigError::Invalid(format!(
            "page_size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE} in steps of \
             {PAGE_SIZE_STEP}, got {page_size}"
        )));
    }
    Ok(page_size)
}

fn default_page_size() -> u32 {
    12
}

fn default_endpoint() -> String {
    DEFAULT_GRAPH_ENDPOINT.to_string()
}

fn default_photo_concurrency() -> usize {
    4
}

fn default_photo_timeout_ms() -> u64 {
    5_000
}

// ===== Resolution helpers =====

fn env_override() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
}

/// Walks the resolution order and returns the first existing config path.
fn resolve_path(
    env_path: Option<PathBuf>,
    current: &Path,
    config_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = env_path
        && path.exists()
    {
        return Some(path);
    }

    for dir in current.ancestors() {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
    }

    config_dir
        .map(|dir| dir.join("staffdir").join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

fn pick_access_token(
    configured: Option<&str>,
    from_env: Option<String>,
) -> Result<String, ConfigError> {
    configured
        .map(str::to_string)
        .into_iter()
        .chain(from_env)
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .ok_or(ConfigError::MissingAccessToken)
}
