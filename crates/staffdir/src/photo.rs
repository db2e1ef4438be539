//! Photo enrichment.
//!
//! Photos are fetched through a bounded pool: at most `concurrency` requests
//! are in flight and each one is abandoned after `timeout`. A missing, failed
//! or timed-out photo only leaves that person's `picture` empty.

use std::time::Duration;

use base64::Engine;
use futures::{StreamExt, stream};
use tracing::debug;

use crate::{
    graph::{GraphClient, PhotoBlob},
    person::Person,
};

/// Resolves profile photos into `data:` URIs.
#[derive(Debug, Clone)]
pub struct PhotoResolver {
    graph: GraphClient,
    concurrency: usize,
    timeout: Duration,
}

impl PhotoResolver {
    /// `concurrency` is clamped to at least one request.
    pub fn new(graph: GraphClient, concurrency: usize, timeout: Duration) -> Self {
        Self {
            graph,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Attaches a picture to every person, keeping the input order.
    pub async fn enrich(&self, people: Vec<Person>) -> Vec<Person> {
        stream::iter(people)
            .map(|mut person| async move {
                person.picture = self.resolve(&person.id).await;
                person
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Fetches one photo. Never fails; problems are logged and yield `None`.
    pub async fn resolve(&self, user_id: &str) -> Option<String> {
        match tokio::time::timeout(self.timeout, self.graph.get_photo(user_id)).await {
            Ok(Ok(photo)) => photo.as_ref().map(data_uri),
            Ok(Err(e)) => {
                debug!(user_id, error = %e, "photo unavailable");
                None
            }
            Err(_) => {
                debug!(user_id, timeout = ?self.timeout, "photo request timed out");
                None
            }
        }
    }
}

fn data_uri(photo: &PhotoBlob) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(&photo.bytes);
    format!("data:{};base64,{encoded}", photo.content_type)
}
