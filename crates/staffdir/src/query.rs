//! Query strategy: which endpoint each directory query hits and with which
//! OData parameters.
//!
//! A single [`DirectoryScope`] selects between the "people I work with",
//! tenant-wide and group-scoped directories. Every query shape is planned
//! here so the engine only deals with pages and cursors.

use serde::{Deserialize, Serialize};

/// Fields requested from `/me/people`.
const PEOPLE_SELECT: &str = "id,displayName,givenName,surname,jobTitle,department,\
                             scoredEmailAddresses,userPrincipalName,phones";

/// Fields requested from `/users` and group members.
const USER_SELECT: &str = "id,department,displayName,givenName,surname,jobTitle,mail,\
                           businessPhones,mobilePhone,userPrincipalName";

/// Relevant people that are real persons with a surname.
const PEOPLE_FILTER: &str = "(personType/class eq 'Person' and surname ne null)";

/// Enabled, non-guest accounts with a surname.
const MEMBER_FILTER: &str = "(userType ne 'Guest' and accountEnabled eq true and surname ne null)";

/// Which directory the queries run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryScope {
    /// Initial load from `/me/people`; search and letter queries on `/users`.
    PeopleIWorkWith,
    /// Every query on `/users`.
    Tenant,
    /// Every query on the user members of the given group.
    Group(String),
}

/// A single Graph GET: path segments below the endpoint plus query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRequest {
    pub segments: Vec<String>,
    pub params: Vec<(&'static str, String)>,
    /// Whether the request needs `ConsistencyLevel: eventual`.
    pub advanced: bool,
}

impl GraphRequest {
    pub fn segments(&self) -> Vec<&str> {
        self.segments.iter().map(String::as_str).collect()
    }

    #[cfg(test)]
    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The page request for a query and, for exact-total modes, its count
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub list: GraphRequest,
    pub count: Option<GraphRequest>,
}

impl DirectoryScope {
    /// Plans the default load. Its total is the size of the fetched batch,
    /// so no count request is issued.
    pub fn initial_plan(&self, page_size: u32, custom_query: Option<&str>) -> QueryPlan {
        let list = match self {
            Self::PeopleIWorkWith => GraphRequest {
                segments: vec!["me".into(), "people".into()],
                params: vec![
                    ("$filter", with_custom(PEOPLE_FILTER, custom_query)),
                    ("$top", page_size.to_string()),
                    ("$select", PEOPLE_SELECT.to_string()),
                ],
                advanced: false,
            },
            Self::Tenant | Self::Group(_) => GraphRequest {
                segments: self.user_segments(),
                params: vec![
                    ("$filter", with_custom(MEMBER_FILTER, custom_query)),
                    ("$top", page_size.to_string()),
                    ("$select", USER_SELECT.to_string()),
                    ("$count", "true".to_string()),
                ],
                advanced: true,
            },
        };

        QueryPlan { list, count: None }
    }

    /// Plans a free-text search across display name, department and job
    /// title.
    pub fn search_plan(&self, text: &str, page_size: u32, custom_query: Option<&str>) -> QueryPlan {
        let filter = with_custom(MEMBER_FILTER, custom_query);
        let search = search_expression(text);

        let list = GraphRequest {
            segments: self.user_segments(),
            params: vec![
                ("$filter", filter.clone()),
                ("$search", search.clone()),
                ("$top", page_size.to_string()),
                ("$select", USER_SELECT.to_string()),
                ("$count", "true".to_string()),
            ],
            advanced: true,
        };

        QueryPlan {
            list,
            count: Some(self.count_request(vec![("$filter", filter), ("$search", search)])),
        }
    }

    /// Plans a letter query: member accounts whose given name or surname
    /// starts with `letter`.
    pub fn letter_plan(
        &self,
        letter: &str,
        page_size: u32,
        custom_query: Option<&str>,
    ) -> QueryPlan {
        let filter = with_custom(&letter_filter(letter), custom_query);

        let list = GraphRequest {
            segments: self.user_segments(),
            params: vec![
                ("$filter", filter.clone()),
                ("$top", page_size.to_string()),
                ("$select", USER_SELECT.to_string()),
                ("$count", "true".to_string()),
            ],
            advanced: true,
        };

        QueryPlan {
            list,
            count: Some(self.count_request(vec![("$filter", filter)])),
        }
    }

    fn user_segments(&self) -> Vec<String> {
        match self {
            Self::PeopleIWorkWith | Self::Tenant => vec!["users".into()],
            Self::Group(id) => vec![
                "groups".into(),
                id.clone(),
                "members".into(),
                "microsoft.graph.user".into(),
            ],
        }
    }

    fn count_request(&self, params: Vec<(&'static str, String)>) -> GraphRequest {
        let mut segments = self.user_segments();
        segments.push("$count".into());
        GraphRequest {
            segments,
            params,
            advanced: true,
        }
    }
}

/// Appends the operator's raw filter fragment with `and`.
fn with_custom(filter: &str, custom_query: Option<&str>) -> String {
    match custom_query.map(str::trim) {
        Some(custom) if !custom.is_empty() => format!("{filter} and {custom}"),
        _ => filter.to_string(),
    }
}

/// Builds the OR'd `$search` clause for a search term.
fn search_expression(text: &str) -> String {
    let term = text.trim().replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"displayName:{term}\" OR \"department:{term}\" OR \"jobTitle:{term}\"")
}

fn letter_filter(letter: &str) -> String {
    let literal = letter.trim().replace('\'', "''");
    format!(
        "(startsWith(givenName,'{literal}') or startsWith(surname,'{literal}')) and surname ne \
         null and userType eq 'Member' and accountEnabled eq true"
    )
}
