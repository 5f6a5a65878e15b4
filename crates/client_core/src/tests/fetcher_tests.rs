use super::*;
use std::collections::HashMap;

use axum::{
    extract::{Query as QueryParams, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::{Role, SortDirection, UserId},
    error::ErrorCode,
    protocol::UserRecord,
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::error::ErrorCategory;

#[derive(Clone, Default)]
struct ServerState {
    seen: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

fn user_json(i: usize) -> Value {
    json!({
        "_id": format!("u{i}"),
        "username": format!("user{i}"),
        "email": format!("user{i}@example.com"),
        "phoneNumber": "555-0100",
        "role": "user"
    })
}

async fn list_users_ok(
    State(state): State<ServerState>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Json<Value> {
    state.seen.lock().await.push(params);
    let users: Vec<Value> = (0..10).map(user_json).collect();
    Json(json!({ "users": users, "totalPages": 3 }))
}

async fn list_users_failing() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "code": "internal", "message": "database offline" })),
    )
}

async fn list_users_forbidden() -> impl IntoResponse {
    (StatusCode::FORBIDDEN, "admins only")
}

async fn list_users_wrong_shape() -> Json<Value> {
    Json(json!({ "data": [], "totalPages": 1 }))
}

async fn list_users_not_json() -> &'static str {
    "<html>maintenance</html>"
}

async fn spawn_list_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn source(server_url: &str) -> HttpListSource {
    HttpListSource::new(server_url, ListEndpoint::default(), Duration::from_secs(5))
        .expect("client")
}

async fn fetch_users(
    source: &HttpListSource,
    query: &Query,
) -> Result<Page<UserRecord>, FetchError> {
    source.fetch_page(query).await
}

#[tokio::test]
async fn sends_query_parameters_and_parses_page() {
    let state = ServerState::default();
    let app = Router::new()
        .route(DEFAULT_LIST_PATH, get(list_users_ok))
        .with_state(state.clone());
    let server_url = spawn_list_server(app).await;

    let mut query = Query::default();
    query.search_term = "ann".into();
    query.sort_direction = SortDirection::Desc;
    query.page = 2;
    let page = fetch_users(&source(&server_url), &query).await.expect("page");

    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.current_page, 2);
    assert_eq!(page.items[0].id, UserId::new("u0"));
    assert_eq!(page.items[0].role, Role::User);

    let seen = state.seen.lock().await;
    let params = &seen[0];
    assert_eq!(params.get("searchTerm").map(String::as_str), Some("ann"));
    assert_eq!(params.get("page").map(String::as_str), Some("2"));
    assert_eq!(params.get("limit").map(String::as_str), Some("10"));
    assert_eq!(params.get("sortBy").map(String::as_str), Some("username"));
    assert_eq!(params.get("sortOrder").map(String::as_str), Some("desc"));
}

#[tokio::test]
async fn empty_search_term_is_not_sent() {
    let state = ServerState::default();
    let app = Router::new()
        .route(DEFAULT_LIST_PATH, get(list_users_ok))
        .with_state(state.clone());
    let server_url = spawn_list_server(app).await;

    fetch_users(&source(&server_url), &Query::default())
        .await
        .expect("page");
    assert!(!state.seen.lock().await[0].contains_key("searchTerm"));
}

#[tokio::test]
async fn server_error_maps_to_status_with_body_detail() {
    let app = Router::new().route(DEFAULT_LIST_PATH, get(list_users_failing));
    let server_url = spawn_list_server(app).await;

    let err = fetch_users(&source(&server_url), &Query::default())
        .await
        .expect_err("must fail");
    match &err {
        FetchError::Status { status, detail } => {
            assert_eq!(*status, 500);
            assert_eq!(detail.message, "database offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.requires_reauth());
}

#[tokio::test]
async fn forbidden_requires_reauth() {
    let app = Router::new().route(DEFAULT_LIST_PATH, get(list_users_forbidden));
    let server_url = spawn_list_server(app).await;

    let err = fetch_users(&source(&server_url), &Query::default())
        .await
        .expect_err("must fail");
    assert_eq!(err.category(), ErrorCategory::Status);
    match &err {
        FetchError::Status { detail, .. } => assert_eq!(detail.code, ErrorCode::Forbidden),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.requires_reauth());
}

#[tokio::test]
async fn missing_collection_key_is_malformed() {
    let app = Router::new().route(DEFAULT_LIST_PATH, get(list_users_wrong_shape));
    let server_url = spawn_list_server(app).await;

    let err = fetch_users(&source(&server_url), &Query::default())
        .await
        .expect_err("must fail");
    assert_eq!(err.category(), ErrorCategory::Malformed);
    assert!(err.to_string().contains("users"), "unexpected error: {err}");
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let app = Router::new().route(DEFAULT_LIST_PATH, get(list_users_not_json));
    let server_url = spawn_list_server(app).await;

    let err = fetch_users(&source(&server_url), &Query::default())
        .await
        .expect_err("must fail");
    assert_eq!(err.category(), ErrorCategory::Malformed);
}

#[tokio::test]
async fn refused_connection_is_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = fetch_users(&source(&format!("http://{addr}")), &Query::default())
        .await
        .expect_err("must fail");
    assert_eq!(err.category(), ErrorCategory::Transport);
}

#[test]
fn decode_page_normalizes_zero_total_pages() {
    let page: Page<UserRecord> =
        decode_page(json!({ "users": [], "totalPages": 0 }), "users", 1).expect("page");
    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, 1);
}

#[test]
fn decode_page_prefers_reported_current_page() {
    let page: Page<UserRecord> = decode_page(
        json!({ "users": [user_json(1)], "totalPages": 4, "currentPage": 3 }),
        "users",
        2,
    )
    .expect("page");
    assert_eq!(page.current_page, 3);
}

#[test]
fn decode_page_supports_other_collection_keys() {
    let page: Page<UserRecord> = decode_page(
        json!({ "customers": [user_json(1), user_json(2)], "totalPages": 1 }),
        "customers",
        1,
    )
    .expect("page");
    assert_eq!(page.items.len(), 2);
}

#[test]
fn decode_page_rejects_missing_total_pages_and_bad_rows() {
    let err = decode_page::<UserRecord>(json!({ "users": [] }), "users", 1)
        .expect_err("missing totalPages");
    assert_eq!(err.category(), ErrorCategory::Malformed);

    let err = decode_page::<UserRecord>(
        json!({ "users": [{ "username": "no id" }], "totalPages": 1 }),
        "users",
        1,
    )
    .expect_err("row without _id");
    assert_eq!(err.category(), ErrorCategory::Malformed);

    let err = decode_page::<UserRecord>(json!([1, 2, 3]), "users", 1).expect_err("array body");
    assert_eq!(err.category(), ErrorCategory::Malformed);
}

struct DelayedSource {
    delays: HashMap<u32, Duration>,
}

#[async_trait]
impl ListSource<UserRecord> for DelayedSource {
    async fn fetch_page(&self, query: &Query) -> Result<Page<UserRecord>, FetchError> {
        if let Some(delay) = self.delays.get(&query.page) {
            tokio::time::sleep(*delay).await;
        }
        Ok(Page {
            items: Vec::new(),
            total_pages: 5,
            current_page: query.page,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn newer_request_supersedes_slower_older_one() {
    let source = DelayedSource {
        delays: HashMap::from([
            (1, Duration::from_millis(500)),
            (2, Duration::from_millis(50)),
        ]),
    };
    let (mut fetcher, mut outcomes) = DataFetcher::<UserRecord>::new(Arc::new(source));

    let mut first = Query::default();
    first.page = 1;
    let mut second = Query::default();
    second.page = 2;
    let first_seq = fetcher.issue(first);
    let second_seq = fetcher.issue(second);
    assert!(second_seq > first_seq);

    let outcome = outcomes.recv().await.expect("outcome");
    assert_eq!(outcome.seq, second_seq);
    let page = fetcher.accept(outcome).expect("current");
    assert_eq!(page.current_page, 2);
    assert!(!fetcher.is_in_flight());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(outcomes.try_recv().is_err(), "aborted request must not report");
}

#[tokio::test]
async fn accept_rejects_outdated_sequence_numbers() {
    let source = DelayedSource {
        delays: HashMap::new(),
    };
    let (mut fetcher, mut outcomes) = DataFetcher::<UserRecord>::new(Arc::new(source));
    let seq = fetcher.issue(Query::default());
    let outcome = outcomes.recv().await.expect("outcome");
    assert_eq!(outcome.seq, seq);

    fetcher.issue(Query::default());
    let err = fetcher.accept(outcome).expect_err("stale");
    assert!(matches!(err, FetchError::Stale { seq: 1, latest: 2 }));
}

#[tokio::test]
async fn cancel_makes_late_results_stale() {
    let source = DelayedSource {
        delays: HashMap::new(),
    };
    let (mut fetcher, _outcomes) = DataFetcher::<UserRecord>::new(Arc::new(source));
    let seq = fetcher.issue(Query::default());
    fetcher.cancel();
    assert!(!fetcher.is_in_flight());

    let err = fetcher
        .accept(FetchOutcome {
            seq,
            result: Ok(Page {
                items: Vec::new(),
                total_pages: 1,
                current_page: 1,
            }),
        })
        .expect_err("cancelled");
    assert_eq!(err.category(), ErrorCategory::Stale);
}
