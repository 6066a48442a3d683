//! End-to-end directory tests using wiremock.
//!
//! Each provider defines a `DirectoryTestSpec` that declares how its
//! directory shapes a page of results and which request fields it expects.
//! Adding a new provider = add one spec; every parameterized test then runs
//! against it.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
};

use rstest::rstest;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

use crate::{
    config::{DirectoryConfig, Provider},
    connection::{Connection, ConnectionError, TransportError},
};

const SEARCH_PATH: &str = "/directory/v1/ou=people,dc=example,dc=com/subtree";

// =============================================================================
// Directory Test Specification
// =============================================================================

#[derive(Debug)]
pub struct DirectoryTestSpec {
    /// Value of `driver.provider` in the config file.
    pub provider: &'static str,
    /// Wraps a page of entries the way this directory does.
    pub page: fn(Vec<Value>, Option<&str>) -> Value,
    /// Expected `searchScope` request parameter.
    pub search_scope: Option<&'static str>,
    /// Whether the request carries an `offset` parameter.
    pub sends_offset: bool,
}

fn scim_page(entries: Vec<Value>, _cursor: Option<&str>) -> Value {
    Value::Array(entries)
}

fn ping_directory_page(entries: Vec<Value>, cursor: Option<&str>) -> Value {
    let mut page = json!({
        "size": entries.len(),
        "_embedded": { "entries": entries },
    });
    if let Some(cursor) = cursor {
        page["_links"] = json!({ "next": { "data": { "cursor": cursor } } });
    }
    page
}

pub static SCIM_SPEC: DirectoryTestSpec = DirectoryTestSpec {
    provider: "scim",
    page: scim_page,
    search_scope: None,
    sends_offset: true,
};

pub static PING_DIRECTORY_SPEC: DirectoryTestSpec = DirectoryTestSpec {
    provider: "ping_directory",
    page: ping_directory_page,
    search_scope: Some("wholeSubtree"),
    sends_offset: false,
};

fn people(range: std::ops::Range<usize>) -> Vec<Value> {
    range
        .map(|n| json!({ "uid": format!("user{n}"), "mail": format!("user{n}@example.com") }))
        .collect()
}

// =============================================================================
// Harness
// =============================================================================

struct DirectoryHarness {
    mock_server: MockServer,
    connection: Connection,
}

impl DirectoryHarness {
    async fn new(provider: &str, http_method: &str) -> Self {
        let mock_server = MockServer::start().await;
        let config = DirectoryConfig::from_str(&format!(
            r#"
            name = "e2e"

            [driver]
            url = "{}{}"
            method = "{}"
            provider = "{}"
            timeout_secs = 5

            [driver.auth]
            username = "cn=reader"
            password = "secret"
            "#,
            mock_server.uri(),
            SEARCH_PATH,
            http_method,
            provider,
        ))
        .unwrap();
        let connection = Connection::from_config(&config).unwrap();
        Self {
            mock_server,
            connection,
        }
    }

    async fn received_queries(&self) -> Vec<Vec<(String, String)>> {
        self.mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| {
                request
                    .url
                    .query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .collect()
    }
}

fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// A wiremock responder that returns different responses on successive calls.
///
/// After exhausting the list, it repeats the last response. Clone it before
/// mounting to read the call count afterwards.
#[derive(Clone)]
struct SequentialResponder {
    state: Arc<SequentialResponderState>,
}

struct SequentialResponderState {
    responses: Vec<ResponseTemplate>,
    call_count: AtomicUsize,
}

impl SequentialResponder {
    fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(
            !responses.is_empty(),
            "SequentialResponder requires at least one response"
        );
        Self {
            state: Arc::new(SequentialResponderState {
                responses,
                call_count: AtomicUsize::new(0),
            }),
        }
    }

    fn call_count(&self) -> usize {
        self.state.call_count.load(AtomicOrdering::SeqCst)
    }
}

impl wiremock::Respond for SequentialResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let count = self.state.call_count.fetch_add(1, AtomicOrdering::SeqCst);
        let idx = count.min(self.state.responses.len() - 1);
        self.state.responses[idx].clone()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[rstest]
#[case::scim(&SCIM_SPEC)]
#[case::ping_directory(&PING_DIRECTORY_SPEC)]
#[tokio::test]
async fn test_get_returns_entries(#[case] spec: &'static DirectoryTestSpec) {
    let harness = DirectoryHarness::new(spec.provider, "get").await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json((spec.page)(people(0..3), None)))
        .expect(1)
        .mount(&harness.mock_server)
        .await;

    let mut query = harness.connection.query();
    query
        .where_starts_with("mail", "user")
        .where_not_present("nsAccountLock")
        .select(["uid", "mail"]);
    let entries = query.get(&harness.connection).await.unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2]["uid"], "user2");

    let queries = harness.received_queries().await;
    let sent = &queries[0];
    assert_eq!(
        param(sent, "filter"),
        Some(r#"mail sw "user" and not (nsAccountLock pr)"#)
    );
    assert_eq!(param(sent, "includeAttributes"), Some("uid,mail"));
    assert_eq!(param(sent, "limit"), Some("100"));
    assert_eq!(param(sent, "searchScope"), spec.search_scope);
    assert_eq!(param(sent, "offset").is_some(), spec.sends_offset);
}

#[rstest]
#[case::scim(&SCIM_SPEC)]
#[case::ping_directory(&PING_DIRECTORY_SPEC)]
#[tokio::test]
async fn test_find_by_uid(#[case] spec: &'static DirectoryTestSpec) {
    let harness = DirectoryHarness::new(spec.provider, "get").await;
    Mock::given(method("GET"))
        .and(query_param("filter", r#"uid eq "user7""#))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json((spec.page)(people(7..8), None)))
        .expect(1)
        .mount(&harness.mock_server)
        .await;

    let entry = harness
        .connection
        .query()
        .find(&harness.connection, "user7")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry["mail"], "user7@example.com");
}

#[rstest]
#[case::scim(&SCIM_SPEC)]
#[case::ping_directory(&PING_DIRECTORY_SPEC)]
#[tokio::test]
async fn test_post_sends_json_body(#[case] spec: &'static DirectoryTestSpec) {
    let harness = DirectoryHarness::new(spec.provider, "post").await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json((spec.page)(people(0..1), None)))
        .expect(1)
        .mount(&harness.mock_server)
        .await;

    let mut query = harness.connection.query();
    query.where_in("uid", ["user0", "user1"]);
    let entries = query.get(&harness.connection).await.unwrap();
    assert_eq!(entries.len(), 1);

    let requests = harness.mock_server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["filter"], r#"uid eq "user0" or uid eq "user1""#);
    assert_eq!(body["includeAttributes"], "*");
    assert_eq!(body.get("offset").is_some(), spec.sends_offset);
}

#[rstest]
#[case::scim(&SCIM_SPEC)]
#[case::ping_directory(&PING_DIRECTORY_SPEC)]
#[tokio::test]
async fn test_pretend_sends_nothing(#[case] spec: &'static DirectoryTestSpec) {
    let harness = DirectoryHarness::new(spec.provider, "get").await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&harness.mock_server)
        .await;

    let log = harness
        .connection
        .pretend(|connection| async move {
            let mut query = connection.query();
            query.where_equals("uid", "user1");
            let entries = query.cursor(&connection).try_collect().await.unwrap();
            assert!(entries.is_empty());
        })
        .await;

    assert_eq!(log.len(), 1);
    assert_eq!(log[0].query.filter, r#"uid eq "user1""#);
    assert_eq!(log[0].query.search_scope.as_deref(), spec.search_scope);
}

#[rstest]
#[case::scim(&SCIM_SPEC)]
#[case::ping_directory(&PING_DIRECTORY_SPEC)]
#[tokio::test]
async fn test_error_status_surfaces(#[case] spec: &'static DirectoryTestSpec) {
    let harness = DirectoryHarness::new(spec.provider, "get").await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficient access rights"))
        .mount(&harness.mock_server)
        .await;

    let err = harness
        .connection
        .query()
        .get(&harness.connection)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConnectionError::Transport(TransportError::Status { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_cursor_follows_continuation_token() {
    let harness = DirectoryHarness::new("ping_directory", "get").await;
    let responder = SequentialResponder::new(vec![
        ResponseTemplate::new(200).set_body_json(ping_directory_page(people(0..100), Some("X"))),
        ResponseTemplate::new(200).set_body_json(ping_directory_page(people(100..110), None)),
    ]);
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(responder.clone())
        .mount(&harness.mock_server)
        .await;

    let mut query = harness.connection.query();
    query.where_present("uid");
    let entries = query.cursor(&harness.connection).try_collect().await.unwrap();

    assert_eq!(entries.len(), 110);
    assert_eq!(entries[0]["uid"], "user0");
    assert_eq!(entries[109]["uid"], "user109");
    assert_eq!(responder.call_count(), 2);

    let queries = harness.received_queries().await;
    assert_eq!(param(&queries[0], "cursor"), None);
    assert_eq!(param(&queries[1], "cursor"), Some("X"));
    assert_eq!(param(&queries[1], "limit"), Some("100"));
    assert_eq!(param(&queries[1], "filter"), Some("uid pr"));
}

#[tokio::test]
async fn test_cursor_stops_after_failed_page() {
    let harness = DirectoryHarness::new("ping_directory", "get").await;
    let responder = SequentialResponder::new(vec![
        ResponseTemplate::new(200).set_body_json(ping_directory_page(people(0..100), Some("X"))),
        ResponseTemplate::new(502).set_body_string("bad gateway"),
    ]);
    Mock::given(method("GET"))
        .respond_with(responder.clone())
        .mount(&harness.mock_server)
        .await;

    let query = harness.connection.query();
    let mut cursor = query.cursor(&harness.connection);
    let mut ok = 0;
    let mut errors = 0;
    while let Some(entry) = cursor.next_entry().await {
        match entry {
            Ok(_) => ok += 1,
            Err(_) => errors += 1,
        }
    }

    assert_eq!(ok, 100);
    assert_eq!(errors, 1);
    assert_eq!(responder.call_count(), 2);
}

#[test]
fn test_provider_names_match_config() {
    for (spec, provider) in [
        (&SCIM_SPEC, Provider::Scim),
        (&PING_DIRECTORY_SPEC, Provider::PingDirectory),
    ] {
        let config = DirectoryConfig::from_str(&format!(
            "[driver]\nurl = \"http://localhost\"\nprovider = \"{}\"\n",
            spec.provider
        ))
        .unwrap();
        assert_eq!(config.driver.provider, provider);
    }
}
