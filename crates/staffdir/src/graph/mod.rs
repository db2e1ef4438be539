//! Minimal Microsoft Graph HTTP client.
//!
//! Only what the directory needs: JSON collection reads, plain-text `$count`
//! reads and binary photo reads, all authenticated with a bearer token.

pub mod types;

use reqwest::{StatusCode, Url, header};
use serde::Deserialize;

/// Header Graph requires for advanced directory queries.
const CONSISTENCY_LEVEL: (&str, &str) = ("ConsistencyLevel", "eventual");

/// Errors returned by [`GraphClient`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GraphError {
    #[error("invalid Graph URL: {0}")]
    InvalidUrl(String),

    #[error("access_token must not be empty")]
    EmptyToken,

    #[error("failed to send Graph request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("authentication failed: invalid or expired access token")]
    Unauthorized,

    #[error("permission denied: insufficient permissions to access this resource")]
    Forbidden,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("Microsoft Graph request failed ({status}): {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse Graph response: {0}")]
    Decode(String),
}

/// A binary photo as returned by `/users/{id}/photo/$value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Graph API client shared by every directory query.
#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    /// Creates a client for `endpoint` (e.g. `https://graph.microsoft.com/v1.0`).
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint or the token is blank, or the endpoint
    /// is not an absolute URL.
    pub fn new(endpoint: &str, access_token: impl Into<String>) -> Result<Self, GraphError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(GraphError::EmptyToken);
        }

        let base_url = normalize_base_url(endpoint)?;
        Url::parse(&base_url).map_err(|e| GraphError::InvalidUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            access_token,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a URL by appending path segments to the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry path segments.
    pub fn url_with_segments(&self, segments: &[&str]) -> Result<Url, GraphError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GraphError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| GraphError::InvalidUrl("base_url must be an absolute URL".into()))?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Parses a continuation link returned by a previous response.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is not an absolute URL.
    pub fn parse_next_link(link: &str) -> Result<Url, GraphError> {
        Url::parse(link).map_err(|e| GraphError::InvalidUrl(format!("{link}: {e}")))
    }

    /// GETs a JSON document.
    ///
    /// When `advanced` is set the request carries `ConsistencyLevel: eventual`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status or an
    /// undecodable body.
    pub async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: Url,
        query: &[(&str, String)],
        advanced: bool,
    ) -> Result<T, GraphError> {
        let mut request = self.http.get(url).query(query);
        if advanced {
            request = request.header(CONSISTENCY_LEVEL.0, CONSISTENCY_LEVEL.1);
        }

        let response = self.send_request(request, "application/json").await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GraphError::Decode(e.to_string()))
    }

    /// GETs a `$count` endpoint, which answers with a bare number.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status or a body
    /// that is not an integer.
    pub async fn get_count(&self, url: Url, query: &[(&str, String)]) -> Result<u64, GraphError> {
        let request = self
            .http
            .get(url)
            .query(query)
            .header(CONSISTENCY_LEVEL.0, CONSISTENCY_LEVEL.1);

        let response = self.send_request(request, "text/plain").await?;
        let body = response.text().await?;
        // Some tenants prefix the count with a UTF-8 BOM.
        body.trim_start_matches('\u{feff}')
            .trim()
            .parse()
            .map_err(|e| GraphError::Decode(format!("invalid count {body:?}: {e}")))
    }

    /// GETs a user's photo. A user without a photo yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or any status other than success
    /// and 404.
    pub async fn get_photo(&self, user_id: &str) -> Result<Option<PhotoBlob>, GraphError> {
        let url = self.url_with_segments(&["users", user_id, "photo", "$value"])?;
        let request = self.http.get(url);

        let response = match self.send_request(request, "image/*").await {
            Ok(response) => response,
            Err(GraphError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await?;

        if bytes.is_empty() {
            return Ok(None);
        }

        Ok(Some(PhotoBlob {
            content_type,
            bytes: bytes.to_vec(),
        }))
    }

    async fn send_request(
        &self,
        request: reqwest::RequestBuilder,
        accept: &str,
    ) -> Result<reqwest::Response, GraphError> {
        let response = request
            .bearer_auth(&self.access_token)
            .header(header::ACCEPT, accept)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());

        match status {
            StatusCode::UNAUTHORIZED => Err(GraphError::Unauthorized),
            StatusCode::FORBIDDEN => Err(GraphError::Forbidden),
            StatusCode::NOT_FOUND => Err(GraphError::NotFound(body)),
            _ => Err(GraphError::Status { status, body }),
        }
    }
}

fn normalize_base_url(endpoint: &str) -> Result<String, GraphError> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(GraphError::InvalidUrl(
            "endpoint must not be empty".to_string(),
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
