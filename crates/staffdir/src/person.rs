//! Directory records and result ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A person as shown in the directory.
///
/// Built fresh from every Graph response and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub business_phone: Vec<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    /// `data:` URI of the profile photo, when one could be fetched.
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub upn: Option<String>,
}

impl Person {
    /// Name to show when a display name is missing.
    pub fn label(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match self.first_name.as_deref() {
            Some(first) if !first.is_empty() => format!("{first} {}", self.last_name),
            _ => self.last_name.clone(),
        }
    }
}

/// An entry of the department filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentOption {
    /// Department value. Empty for "All departments".
    pub key: String,
    pub display_name: String,
}

impl DepartmentOption {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
        }
    }

    /// The unfiltered option, always listed first.
    pub fn all() -> Self {
        Self::new("", "All departments")
    }
}

/// Compares two names ignoring case, falling back to the raw text so the
/// ordering stays total.
fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

/// Orders people by last name, then first name, then display name.
pub fn by_last_name(a: &Person, b: &Person) -> Ordering {
    compare_names(&a.last_name, &b.last_name)
        .then_with(|| {
            compare_names(
                a.first_name.as_deref().unwrap_or_default(),
                b.first_name.as_deref().unwrap_or_default(),
            )
        })
        .then_with(|| {
            compare_names(
                a.display_name.as_deref().unwrap_or_default(),
                b.display_name.as_deref().unwrap_or_default(),
            )
        })
}

/// Sorts a result set in place by last name ascending.
pub fn sort_people(people: &mut [Person]) {
    people.sort_by(by_last_name);
}

#[cfg(test)]
pub(crate) fn person(id: &str, first: &str, last: &str) -> Person {
    Person {
        id: id.to_string(),
        first_name: Some(first.to_string()),
        last_name: last.to_string(),
        department: None,
        display_name: Some(format!("{first} {last}")),
        job_title: None,
        email: None,
        business_phone: Vec::new(),
        mobile_phone: None,
        picture: None,
        upn: None,
    }
}
