//! Both sources against a local HTTP server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::NaiveDateTime;
use grid_fetcher::{
    build_http_client, ApiHubSource, Credential, DataPortalSource, FetchError, GridFetcher,
    GridSource, HttpConfig, RetryPolicy, SampleRequest,
};
use kma_common::{parse_tm, GridCell, GridSpec, Variable, NX, NY};
use test_utils::{create_index_grid, flat_grid_payload, portal_document, PortalItem};

/// Canned responses served in order; the last one repeats.
struct Scripted {
    responses: Vec<(StatusCode, String)>,
    hits: AtomicUsize,
    last_query: Mutex<HashMap<String, String>>,
}

impl Scripted {
    fn new(responses: Vec<(StatusCode, String)>) -> Arc<Self> {
        Arc::new(Self {
            responses,
            hits: AtomicUsize::new(0),
            last_query: Mutex::new(HashMap::new()),
        })
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn query(&self, key: &str) -> Option<String> {
        self.last_query.lock().unwrap().get(key).cloned()
    }
}

async fn scripted_handler(
    State(script): State<Arc<Scripted>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let n = script.hits.fetch_add(1, Ordering::SeqCst);
    *script.last_query.lock().unwrap() = params;
    let index = n.min(script.responses.len() - 1);
    script.responses[index].clone()
}

/// Serve `script` on an ephemeral port and return the endpoint URL.
async fn serve(script: Arc<Scripted>) -> String {
    let app = Router::new()
        .route("/api", get(scripted_handler))
        .with_state(script);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn tm(s: &str) -> NaiveDateTime {
    parse_tm(s).unwrap()
}

fn request(variable: Variable, effective: &str) -> SampleRequest {
    SampleRequest::new(
        variable,
        tm("202501010200"),
        tm(effective),
        GridCell::new(67, 101),
    )
}

fn full_grid_body() -> String {
    flat_grid_payload(&create_index_grid(NX, NY), 6)
}

// ============================================================================
// APIHub flat grid
// ============================================================================

#[tokio::test]
async fn test_apihub_extracts_cell_from_full_grid() {
    let script = Scripted::new(vec![(StatusCode::OK, full_grid_body())]);
    let url = serve(script.clone()).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = ApiHubSource::new(client, url, Credential::fixed("KMA_API_KEY", "test-key"));

    let value = source
        .fetch_value(&request(Variable::Tmp, "202501010400"))
        .await
        .unwrap();

    // Index grid encodes y * 1000 + x
    assert_eq!(value, 101_067.0);
    assert_eq!(script.query("tmfc").as_deref(), Some("202501010200"));
    assert_eq!(script.query("tmef").as_deref(), Some("202501010400"));
    assert_eq!(script.query("vars").as_deref(), Some("TMP"));
    assert_eq!(script.query("authKey").as_deref(), Some("test-key"));
}

#[tokio::test]
async fn test_apihub_full_grid_length() {
    let script = Scripted::new(vec![(StatusCode::OK, full_grid_body())]);
    let url = serve(script).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = ApiHubSource::new(client, url, Credential::fixed("KMA_API_KEY", "k"));

    let grid = source
        .fetch_variable_grid(Variable::Sky, tm("202501010200"), tm("202501010500"))
        .await
        .unwrap();
    assert_eq!(grid.len(), GridSpec::kma().len());
    assert_eq!(grid[0], 0.0);
    assert_eq!(grid[NX], 1000.0);
}

#[tokio::test]
async fn test_apihub_retries_server_error_then_succeeds() {
    let script = Scripted::new(vec![
        (StatusCode::SERVICE_UNAVAILABLE, "busy".to_string()),
        (StatusCode::OK, "=HDR\n1.0, 2.0".to_string()),
        (StatusCode::OK, full_grid_body()),
    ]);
    let url = serve(script.clone()).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = Arc::new(ApiHubSource::new(client, url, Credential::fixed("KMA_API_KEY", "k")));
    let fetcher = GridFetcher::new(source, RetryPolicy::immediate(5));

    let value = fetcher.fetch_sample(&request(Variable::Tmp, "202501010400")).await;
    assert_eq!(value, Some(101_067.0));
    assert_eq!(script.hits(), 3);
}

#[tokio::test]
async fn test_apihub_gives_up_after_five_attempts() {
    let script = Scripted::new(vec![(StatusCode::BAD_GATEWAY, String::new())]);
    let url = serve(script.clone()).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = Arc::new(ApiHubSource::new(client, url, Credential::fixed("KMA_API_KEY", "k")));
    let fetcher = GridFetcher::new(source, RetryPolicy::immediate(5));

    assert_eq!(fetcher.fetch_sample(&request(Variable::Tmp, "202501010400")).await, None);
    assert_eq!(script.hits(), 5);
}

#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let script = Scripted::new(vec![(StatusCode::OK, full_grid_body())]);
    let url = serve(script.clone()).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = Arc::new(ApiHubSource::new(client, url, Credential::missing("KMA_API_KEY")));
    let fetcher = GridFetcher::new(source, RetryPolicy::immediate(5));

    assert!(matches!(
        fetcher.fetch_with_retry(&request(Variable::Tmp, "202501010400")).await,
        Err(FetchError::MissingCredential("KMA_API_KEY"))
    ));
    assert_eq!(script.hits(), 0);
}

#[tokio::test]
async fn test_error_text_does_not_leak_key() {
    let script = Scripted::new(vec![(StatusCode::FORBIDDEN, String::new())]);
    let url = serve(script).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = ApiHubSource::new(client, url, Credential::fixed("KMA_API_KEY", "very-secret"));

    let err = source
        .fetch_value(&request(Variable::Tmp, "202501010400"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus { .. }));
    assert!(!err.to_string().contains("very-secret"));
}

// ============================================================================
// Data portal JSON
// ============================================================================

fn portal_body() -> String {
    portal_document(
        "00",
        "202501010200",
        &[
            PortalItem::new("TMP", "202501010400", "5"),
            PortalItem::new("SKY", "202501010400", "1"),
            PortalItem::new("PTY", "202501010400", "0"),
            PortalItem::new("TMP", "202501010500", "4"),
            PortalItem::new("PCP", "202501010500", "강수없음"),
        ],
    )
}

#[tokio::test]
async fn test_portal_values_and_query() {
    let script = Scripted::new(vec![(StatusCode::OK, portal_body())]);
    let url = serve(script.clone()).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = DataPortalSource::new(client, url, Credential::fixed("DATA_GO_KR_API_KEY", "pk"));

    assert_eq!(source.fetch_value(&request(Variable::Tmp, "202501010400")).await.unwrap(), 5.0);
    assert_eq!(source.fetch_value(&request(Variable::Pcp, "202501010500")).await.unwrap(), 0.0);

    assert_eq!(script.query("base_date").as_deref(), Some("20250101"));
    assert_eq!(script.query("base_time").as_deref(), Some("0200"));
    assert_eq!(script.query("nx").as_deref(), Some("67"));
    assert_eq!(script.query("ny").as_deref(), Some("101"));
    assert_eq!(script.query("dataType").as_deref(), Some("JSON"));
    assert_eq!(script.query("serviceKey").as_deref(), Some("pk"));
}

#[tokio::test]
async fn test_portal_document_fetched_once_for_concurrent_tasks() {
    let script = Scripted::new(vec![(StatusCode::OK, portal_body())]);
    let url = serve(script.clone()).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = Arc::new(DataPortalSource::new(
        client,
        url,
        Credential::fixed("DATA_GO_KR_API_KEY", "pk"),
    ));

    let mut handles = Vec::new();
    for (variable, hour) in [
        (Variable::Tmp, "202501010400"),
        (Variable::Sky, "202501010400"),
        (Variable::Pty, "202501010400"),
        (Variable::Tmp, "202501010500"),
    ] {
        let source = source.clone();
        let req = request(variable, hour);
        handles.push(tokio::spawn(async move { source.fetch_value(&req).await }));
    }
    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(values, vec![5.0, 1.0, 0.0, 4.0]);
    assert_eq!(script.hits(), 1);
    assert_eq!(source.cached_documents().await, 1);
}

#[tokio::test]
async fn test_portal_missing_item_is_no_data() {
    let script = Scripted::new(vec![(StatusCode::OK, portal_body())]);
    let url = serve(script.clone()).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = Arc::new(DataPortalSource::new(
        client,
        url,
        Credential::fixed("DATA_GO_KR_API_KEY", "pk"),
    ));
    let fetcher = GridFetcher::new(source, RetryPolicy::immediate(5));

    assert_eq!(fetcher.fetch_sample(&request(Variable::Wsd, "202501010400")).await, None);
    assert_eq!(script.hits(), 1);
}

#[tokio::test]
async fn test_portal_no_data_code_not_retried() {
    let script = Scripted::new(vec![(StatusCode::OK, portal_document("03", "202501010200", &[]))]);
    let url = serve(script.clone()).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = Arc::new(DataPortalSource::new(
        client,
        url,
        Credential::fixed("DATA_GO_KR_API_KEY", "pk"),
    ));
    let fetcher = GridFetcher::new(source, RetryPolicy::immediate(5));

    match fetcher.fetch_with_retry(&request(Variable::Tmp, "202501010400")).await {
        Err(FetchError::Provider { code, .. }) => assert_eq!(code, "03"),
        other => panic!("expected provider error, got {:?}", other),
    }
    assert_eq!(script.hits(), 1);
}

#[tokio::test]
async fn test_portal_failed_fetch_is_not_cached() {
    let script = Scripted::new(vec![
        (StatusCode::INTERNAL_SERVER_ERROR, String::new()),
        (StatusCode::OK, portal_body()),
    ]);
    let url = serve(script.clone()).await;
    let client = build_http_client(&HttpConfig::default()).unwrap();
    let source = Arc::new(DataPortalSource::new(
        client,
        url,
        Credential::fixed("DATA_GO_KR_API_KEY", "pk"),
    ));
    let fetcher = GridFetcher::new(source, RetryPolicy::immediate(5));

    assert_eq!(
        fetcher.fetch_sample(&request(Variable::Sky, "202501010400")).await,
        Some(1.0)
    );
    assert_eq!(script.hits(), 2);
}
