//! The directory query engine.
//!
//! [`DirectoryEngine`] owns the result set, the total and the page cursor of
//! the last issued query. Its four operations (initial load, text search,
//! letter search, next page) never fail: errors are logged and turn into an
//! empty result, so callers always have something to render.
//!
//! # Staleness
//!
//! Every replacing query takes a ticket from a monotonic generation counter
//! before it touches the network and commits its results only if no newer
//! query has started in the meantime. A slow request that was superseded by a
//! later one cannot overwrite the later one's results. Next-page fetches take
//! no ticket of their own; they run under the ticket of the query that owns
//! the cursor and are dropped once a newer query starts.
//!
//! # Totals
//!
//! Text and letter queries report the exact server-side count. The initial
//! load reports the size of the batch it fetched, which undercounts whenever
//! the server holds more than one page.

use std::sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::{ConfigError, DirectoryConfig},
    graph::{
        GraphClient, GraphError,
        types::{DirectoryEntry, GraphListResponse},
    },
    person::{Person, sort_people},
    photo::PhotoResolver,
    query::{DirectoryScope, GraphRequest, QueryPlan},
};

/// Errors raised inside the engine before they are logged and swallowed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DirectoryError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("page size must be at least 1")]
    InvalidPageSize,
}

/// Result of a query operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryPage {
    pub items: Vec<Person>,
    pub total: u64,
}

/// Continuation of the last issued query.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageCursor {
    next_link: String,
    /// Whether follow-up requests need `ConsistencyLevel: eventual`.
    advanced: bool,
}

#[derive(Debug, Default)]
struct DirectoryState {
    results: Vec<Person>,
    total: u64,
    cursor: Option<PageCursor>,
    /// Ticket of the query these results and the cursor belong to.
    generation: u64,
}

impl DirectoryState {
    fn cleared(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }
}

/// First page of a freshly issued query.
struct FetchedQuery {
    items: Vec<Person>,
    total: u64,
    cursor: Option<PageCursor>,
}

/// Query engine over one Graph directory scope.
#[derive(Debug)]
pub struct DirectoryEngine {
    graph: GraphClient,
    photos: PhotoResolver,
    scope: DirectoryScope,
    state: Mutex<DirectoryState>,
    generation: AtomicU64,
}

impl DirectoryEngine {
    pub fn new(graph: GraphClient, scope: DirectoryScope, photos: PhotoResolver) -> Self {
        Self {
            graph,
            photos,
            scope,
            state: Mutex::new(DirectoryState::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Builds an engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no access token is
    /// available or the Graph endpoint is not a valid URL.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        config.validate()?;
        let graph = GraphClient::new(&config.graph.endpoint, config.access_token()?)?;
        let photos = PhotoResolver::new(
            graph.clone(),
            config.photos.concurrency,
            config.photos.timeout(),
        );
        Ok(Self::new(graph, config.scope()?, photos))
    }

    pub fn scope(&self) -> &DirectoryScope {
        &self.scope
    }

    /// Snapshot of the current result set, sorted by last name.
    pub fn results(&self) -> Vec<Person> {
        self.lock_state().results.clone()
    }

    pub fn total(&self) -> u64 {
        self.lock_state().total
    }

    /// Whether the last query has more pages on the server.
    pub fn has_next_page(&self) -> bool {
        self.lock_state().cursor.is_some()
    }

    /// Loads the default page for the scope and replaces the result set.
    ///
    /// The reported total is the number of people in the fetched batch.
    #[instrument(skip(self, custom_query))]
    pub async fn get_initial_load(
        &self,
        page_size: u32,
        custom_query: Option<&str>,
    ) -> DirectoryPage {
        let ticket = self.begin();
        let plan = self.scope.initial_plan(page_size, custom_query);
        self.run_replacing(ticket, page_size, &plan, "initial load")
            .await
    }

    /// Searches display name, department and job title.
    ///
    /// Blank text falls back to the initial load.
    #[instrument(skip(self, custom_query))]
    pub async fn search_people(
        &self,
        text: &str,
        page_size: u32,
        custom_query: Option<&str>,
    ) -> DirectoryPage {
        if text.trim().is_empty() {
            return self.get_initial_load(page_size, custom_query).await;
        }

        let ticket = self.begin();
        let plan = self.scope.search_plan(text, page_size, custom_query);
        self.run_replacing(ticket, page_size, &plan, "search").await
    }

    /// Lists accounts whose given name or surname starts with `letter`.
    #[instrument(skip(self, custom_query))]
    pub async fn search_letter(
        &self,
        letter: &str,
        page_size: u32,
        custom_query: Option<&str>,
    ) -> DirectoryPage {
        let ticket = self.begin();
        let plan = self.scope.letter_plan(letter, page_size, custom_query);
        self.run_replacing(ticket, page_size, &plan, "letter search")
            .await
    }

    /// Follows the stored cursor up to `page_count` times and appends what it
    /// finds to the result set.
    ///
    /// Hops past the last page are skipped, so asking for more pages than the
    /// server has returns only what was available. Returns the newly fetched
    /// people.
    ///
    /// A next page belongs to the query that produced the cursor. It never
    /// supersedes a newer query: if one has started, nothing is fetched, and
    /// if one starts while the pages are in flight, they are dropped.
    #[instrument(skip(self))]
    pub async fn get_next_page(&self, page_count: u32) -> Vec<Person> {
        let (owner, cursor) = {
            let state = self.lock_state();
            (state.generation, state.cursor.clone())
        };
        if !self.is_current(owner) {
            debug!(owner, "newer query in flight, skipping next page");
            return Vec::new();
        }
        if cursor.is_none() {
            return Vec::new();
        }

        match self.follow_cursor(cursor.clone(), page_count).await {
            Ok((items, next)) => {
                let mut state = self.lock_state();
                if self.is_current(owner) && state.cursor == cursor {
                    state.results.extend(items.iter().cloned());
                    sort_people(&mut state.results);
                    state.cursor = next;
                    info!(
                        fetched = items.len(),
                        loaded = state.results.len(),
                        "appended next pages"
                    );
                } else {
                    debug!(owner, "discarding superseded next page");
                }
                items
            }
            Err(e) => {
                warn!(error = %e, "next page failed");
                let mut state = self.lock_state();
                if self.is_current(owner) && state.cursor == cursor {
                    *state = DirectoryState::cleared(owner);
                }
                Vec::new()
            }
        }
    }

    async fn run_replacing(
        &self,
        ticket: u64,
        page_size: u32,
        plan: &QueryPlan,
        operation: &'static str,
    ) -> DirectoryPage {
        match self.fetch_query(page_size, plan).await {
            Ok(fetched) => {
                let page = DirectoryPage {
                    items: fetched.items.clone(),
                    total: fetched.total,
                };
                let mut state = self.lock_state();
                if self.is_current(ticket) {
                    info!(
                        operation,
                        count = fetched.items.len(),
                        total = fetched.total,
                        "replaced results"
                    );
                    state.results = fetched.items;
                    state.total = fetched.total;
                    state.cursor = fetched.cursor;
                    state.generation = ticket;
                } else {
                    debug!(operation, ticket, "discarding superseded results");
                }
                page
            }
            Err(e) => {
                warn!(operation, error = %e, "directory query failed");
                self.reset(ticket);
                DirectoryPage::default()
            }
        }
    }

    async fn fetch_query(
        &self,
        page_size: u32,
        plan: &QueryPlan,
    ) -> Result<FetchedQuery, DirectoryError> {
        if page_size == 0 {
            return Err(DirectoryError::InvalidPageSize);
        }

        let (page, count) = tokio::try_join!(self.fetch_list(&plan.list), async {
            match &plan.count {
                Some(request) => self.fetch_count(request).await.map(Some),
                None => Ok(None),
            }
        })?;

        let items = self.people_from(page.value).await;
        let total = count.unwrap_or(items.len() as u64);
        let cursor = page.next_link.map(|next_link| PageCursor {
            next_link,
            advanced: plan.list.advanced,
        });

        Ok(FetchedQuery {
            items,
            total,
            cursor,
        })
    }

    async fn follow_cursor(
        &self,
        mut cursor: Option<PageCursor>,
        page_count: u32,
    ) -> Result<(Vec<Person>, Option<PageCursor>), DirectoryError> {
        let mut entries = Vec::new();

        for hop in 0..page_count {
            let Some(current) = cursor.take() else {
                debug!(hop, "no further pages");
                break;
            };

            let url = GraphClient::parse_next_link(&current.next_link)?;
            let page: GraphListResponse<DirectoryEntry> =
                self.graph.get_json(url, &[], current.advanced).await?;

            entries.extend(page.value);
            cursor = page.next_link.map(|next_link| PageCursor {
                next_link,
                advanced: current.advanced,
            });
        }

        Ok((self.people_from(entries).await, cursor))
    }

    async fn fetch_list(
        &self,
        request: &GraphRequest,
    ) -> Result<GraphListResponse<DirectoryEntry>, DirectoryError> {
        let url = self.graph.url_with_segments(&request.segments())?;
        Ok(self
            .graph
            .get_json(url, &request.params, request.advanced)
            .await?)
    }

    async fn fetch_count(&self, request: &GraphRequest) -> Result<u64, DirectoryError> {
        let url = self.graph.url_with_segments(&request.segments())?;
        Ok(self.graph.get_count(url, &request.params).await?)
    }

    /// Drops entries without a surname, attaches photos and sorts.
    async fn people_from(&self, entries: Vec<DirectoryEntry>) -> Vec<Person> {
        let people: Vec<Person> = entries
            .into_iter()
            .filter_map(DirectoryEntry::into_person)
            .collect();
        let mut people = self.photos.enrich(people).await;
        sort_people(&mut people);
        people
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    fn reset(&self, ticket: u64) {
        let mut state = self.lock_state();
        if self.is_current(ticket) {
            *state = DirectoryState::cleared(ticket);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, path_regex, query_param, query_param_is_missing},
    };

    use super::*;

    fn user(id: &str, given: &str, surname: Option<&str>) -> Value {
        json!({
            "id": id,
            "givenName": given,
            "surname": surname,
            "displayName": format!("{given} {}", surname.unwrap_or_default()),
            "mail": format!("{id}@contoso.com"),
            "businessPhones": [],
        })
    }

    fn endpoint_for(server: &MockServer) -> String {
        format!("{}/v1.0", server.uri())
    }

    fn engine_for(server: &MockServer, scope: DirectoryScope) -> DirectoryEngine {
        let graph = GraphClient::new(&endpoint_for(server), "test-token").unwrap();
        let photos = PhotoResolver::new(graph.clone(), 4, Duration::from_secs(2));
        DirectoryEngine::new(graph, scope, photos)
    }

    async fn mount_no_photos(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/v1\.0/users/[^/]+/photo/\$value$"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    fn last_names(people: &[Person]) -> Vec<&str> {
        people.iter().map(|p| p.last_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_initial_load_sorts_and_counts_batch() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/people"))
            .and(query_param("$top", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    user("3", "Cy", Some("Young")),
                    user("1", "Ann", Some("Adams")),
                    user("2", "Bo", None),
                    user("4", "Di", Some("Moss")),
                ],
                "@odata.nextLink": format!("{}/me/people?$skip=10", endpoint_for(&server)),
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server, DirectoryScope::PeopleIWorkWith);
        let page = engine.get_initial_load(10, None).await;

        assert_eq!(last_names(&page.items), ["Adams", "Moss", "Young"]);
        assert_eq!(page.total, 3);
        assert_eq!(engine.total(), 3);
        assert_eq!(engine.results(), page.items);
        assert!(engine.has_next_page());
    }

    #[tokio::test]
    async fn test_initial_load_failure_clears_state() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param("$search", "\"displayName:x\" OR \"department:x\" OR \"jobTitle:x\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [user("1", "Xi", Some("Xu"))],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users/$count"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/people"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let engine = engine_for(&server, DirectoryScope::PeopleIWorkWith);
        let found = engine.search_people("x", 10, None).await;
        assert_eq!(found.total, 1);

        let page = engine.get_initial_load(10, None).await;
        assert_eq!(page, DirectoryPage::default());
        assert!(engine.results().is_empty());
        assert_eq!(engine.total(), 0);
        assert!(!engine.has_next_page());
    }

    #[tokio::test]
    async fn test_search_people_blank_text_delegates_to_initial_load() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/people"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [user("1", "Ann", Some("Adams"))],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let engine = engine_for(&server, DirectoryScope::PeopleIWorkWith);
        let page = engine.search_people("   ", 10, None).await;

        assert_eq!(last_names(&page.items), ["Adams"]);
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_search_people_uses_exact_count_and_custom_query() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        let filter = "(userType ne 'Guest' and accountEnabled eq true and surname ne null) and \
                      companyName eq 'Contoso'";
        let search = "\"displayName:Engineering\" OR \"department:Engineering\" OR \
                      \"jobTitle:Engineering\"";

        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(header("ConsistencyLevel", "eventual"))
            .and(query_param("$filter", filter))
            .and(query_param("$search", search))
            .and(query_param("$top", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    user("2", "Zed", Some("Zulu")),
                    user("1", "Amy", Some("Baker")),
                ],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users/$count"))
            .and(query_param("$search", search))
            .respond_with(ResponseTemplate::new(200).set_body_string("42"))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server, DirectoryScope::Tenant);
        let page = engine
            .search_people("Engineering", 4, Some("companyName eq 'Contoso'"))
            .await;

        assert_eq!(last_names(&page.items), ["Baker", "Zulu"]);
        assert_eq!(page.total, 42);
        assert_eq!(engine.total(), 42);
    }

    #[tokio::test]
    async fn test_search_letter_filters_group_members() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/groups/g-1/members/microsoft.graph.user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    user("1", "Mia", Some("Stone")),
                    user("2", "Al", Some("Moss")),
                ],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/groups/g-1/members/microsoft.graph.user/$count"))
            .respond_with(ResponseTemplate::new(200).set_body_string("2"))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server, DirectoryScope::Group("g-1".into()));
        let page = engine.search_letter("M", 10, None).await;

        assert_eq!(last_names(&page.items), ["Moss", "Stone"]);
        assert_eq!(page.total, 2);

        let requests = server.received_requests().await.unwrap();
        let list = requests
            .iter()
            .find(|r| r.url.path().ends_with("microsoft.graph.user"))
            .unwrap();
        let filter = list
            .url
            .query_pairs()
            .find(|(k, _)| k == "$filter")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(filter.starts_with("(startsWith(givenName,'M') or startsWith(surname,'M'))"));
    }

    #[tokio::test]
    async fn test_next_page_appends_available_pages_without_error() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        let base = endpoint_for(&server);

        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param_is_missing("$skiptoken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [user("1", "Ann", Some("Moss")), user("2", "Bo", Some("Zane"))],
                "@odata.nextLink": format!("{base}/users?$skiptoken=p2"),
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param("$skiptoken", "p2"))
            .and(header("ConsistencyLevel", "eventual"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [user("3", "Cy", Some("Adams")), user("4", "Di", None)],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users/$count"))
            .respond_with(ResponseTemplate::new(200).set_body_string("3"))
            .mount(&server)
            .await;

        let engine = engine_for(&server, DirectoryScope::Tenant);
        engine.search_letter("A", 2, None).await;
        assert!(engine.has_next_page());

        let fetched = engine.get_next_page(3).await;

        assert_eq!(last_names(&fetched), ["Adams"]);
        assert_eq!(last_names(&engine.results()), ["Adams", "Moss", "Zane"]);
        assert_eq!(engine.total(), 3);
        assert!(!engine.has_next_page());
    }

    #[tokio::test]
    async fn test_next_page_without_cursor_is_a_no_op() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/people"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [user("1", "Ann", Some("Adams"))],
            })))
            .mount(&server)
            .await;

        let engine = engine_for(&server, DirectoryScope::PeopleIWorkWith);
        engine.get_initial_load(12, None).await;

        let fetched = engine.get_next_page(2).await;
        assert!(fetched.is_empty());
        assert_eq!(last_names(&engine.results()), ["Adams"]);
        assert_eq!(engine.total(), 1);
    }

    #[tokio::test]
    async fn test_one_failed_photo_keeps_person_in_results() {
        let server = MockServer::start().await;
        let people: Vec<Value> = (0..10)
            .map(|i| user(&format!("u-{i}"), "First", Some(&format!("Last{i}"))))
            .collect();
        Mock::given(method("GET"))
            .and(path("/v1.0/me/people"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": people })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users/u-7/photo/$value"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v1\.0/users/[^/]+/photo/\$value$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![0xff_u8, 0xd8]),
            )
            .mount(&server)
            .await;

        let engine = engine_for(&server, DirectoryScope::PeopleIWorkWith);
        let page = engine.get_initial_load(10, None).await;

        assert_eq!(page.items.len(), 10);
        for p in &page.items {
            if p.id == "u-7" {
                assert!(p.picture.is_none());
            } else {
                assert!(p.picture.is_some(), "{} should have a photo", p.id);
            }
        }
    }

    #[tokio::test]
    async fn test_superseded_slow_search_does_not_overwrite_newer_results() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param_is_missing("$search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [user("m", "Mia", Some("Moss"))],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param(
                "$search",
                "\"displayName:slow\" OR \"department:slow\" OR \"jobTitle:slow\"",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "value": [user("s", "Sam", Some("Slow"))] }))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users/$count"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1"))
            .mount(&server)
            .await;

        let engine = engine_for(&server, DirectoryScope::Tenant);
        let (slow, fast) = tokio::join!(engine.search_people("slow", 10, None), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.search_letter("M", 10, None).await
        });

        // The superseded call still reports what it fetched...
        assert_eq!(last_names(&slow.items), ["Slow"]);
        assert_eq!(last_names(&fast.items), ["Moss"]);
        // ...but only the newer query lands in the engine.
        assert_eq!(last_names(&engine.results()), ["Moss"]);
    }

    async fn mount_paged_letter_and_slow_search(server: &MockServer) {
        let base = endpoint_for(server);
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param_is_missing("$search"))
            .and(query_param_is_missing("$skiptoken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [user("a1", "Abel", Some("Abel"))],
                "@odata.nextLink": format!("{base}/users?$skiptoken=p2"),
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param("$skiptoken", "p2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "value": [user("a2", "Avery", Some("Avery"))] }))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param(
                "$search",
                "\"displayName:bee\" OR \"department:bee\" OR \"jobTitle:bee\"",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "value": [user("b", "Bea", Some("Brown"))] }))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users/$count"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_next_page_does_not_supersede_search_in_flight() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        mount_paged_letter_and_slow_search(&server).await;

        let engine = engine_for(&server, DirectoryScope::Tenant);
        engine.search_letter("A", 1, None).await;
        assert!(engine.has_next_page());

        let (search, next) = tokio::join!(engine.search_people("bee", 1, None), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.get_next_page(1).await
        });

        assert_eq!(last_names(&search.items), ["Brown"]);
        assert!(next.is_empty());
        assert_eq!(last_names(&engine.results()), ["Brown"]);
        assert!(!engine.has_next_page());
    }

    #[tokio::test]
    async fn test_search_started_during_next_page_wins() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        mount_paged_letter_and_slow_search(&server).await;

        let engine = engine_for(&server, DirectoryScope::Tenant);
        engine.search_letter("A", 1, None).await;

        let (next, search) = tokio::join!(engine.get_next_page(1), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.search_people("bee", 1, None).await
        });

        // The next page still reports what it fetched but is not committed.
        assert_eq!(last_names(&next), ["Avery"]);
        assert_eq!(last_names(&search.items), ["Brown"]);
        assert_eq!(last_names(&engine.results()), ["Brown"]);
        assert_eq!(engine.total(), 1);
    }

    #[tokio::test]
    async fn test_next_page_without_cursor_keeps_search_in_flight() {
        let server = MockServer::start().await;
        mount_no_photos(&server).await;
        mount_paged_letter_and_slow_search(&server).await;

        let engine = engine_for(&server, DirectoryScope::Tenant);
        let (search, next) = tokio::join!(engine.search_people("bee", 1, None), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.get_next_page(2).await
        });

        assert!(next.is_empty());
        assert_eq!(last_names(&search.items), ["Brown"]);
        assert_eq!(last_names(&engine.results()), ["Brown"]);
    }

    #[tokio::test]
    async fn test_zero_page_size_yields_empty_result() {
        let server = MockServer::start().await;
        let engine = engine_for(&server, DirectoryScope::Tenant);
        let page = engine.search_letter("A", 0, None).await;
        assert_eq!(page, DirectoryPage::default());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
