//! Wire types for the Microsoft Graph directory endpoints.

use serde::Deserialize;

use crate::person::Person;

/// A page of a Graph collection response.
#[derive(Debug, Deserialize)]
pub struct GraphListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    /// Continuation URL for the next page, absent on the last page.
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// One entry of `/me/people`, `/users` or a group's members.
///
/// The three endpoints return overlapping shapes: `/me/people` carries
/// `scoredEmailAddresses` and `phones`, the user endpoints carry `mail`,
/// `businessPhones` and `mobilePhone`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub business_phones: Option<Vec<String>>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub scored_email_addresses: Option<Vec<ScoredEmailAddress>>,
    #[serde(default)]
    pub phones: Option<Vec<Phone>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoredEmailAddress {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Phone {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
}

impl DirectoryEntry {
    /// Converts the entry into a [`Person`] without a picture.
    ///
    /// Entries without an ID or a surname are not shown in the directory and
    /// map to `None`.
    pub fn into_person(self) -> Option<Person> {
        let id = self.id.filter(|id| !id.trim().is_empty())?;
        let last_name = self.surname.filter(|s| !s.trim().is_empty())?;

        let phones = self.phones.unwrap_or_default();
        let phone_numbers = |kind: &str| -> Vec<String> {
            phones
                .iter()
                .filter(|p| p.kind.as_deref() == Some(kind))
                .filter_map(|p| p.number.clone())
                .collect()
        };

        let email = self.mail.or_else(|| {
            self.scored_email_addresses
                .unwrap_or_default()
                .into_iter()
                .find_map(|e| e.address)
        });

        let business_phone = match self.business_phones {
            Some(numbers) if !numbers.is_empty() => numbers,
            _ => phone_numbers("business"),
        };

        let mobile_phone = self
            .mobile_phone
            .or_else(|| phone_numbers("mobile").into_iter().next());

        Some(Person {
            id,
            first_name: self.given_name,
            last_name,
            department: self.department,
            display_name: self.display_name,
            job_title: self.job_title,
            email,
            business_phone,
            mobile_phone,
            picture: None,
            upn: self.user_principal_name,
        })
    }
}
