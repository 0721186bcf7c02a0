use axum::{
    extract::{Path, Query, Request},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Duration, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const EXPECTED_API_KEY: &str = "test_key";

// Identifiers with scripted failures, used by the integration tests.
const MISSING_CVE: &str = "CVE-9999-0000";
const BROKEN_CVE: &str = "CVE-0000-0500";

fn timestamp(days_ago: i64) -> String {
    (Utc::now() - Duration::days(days_ago)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

// --- Data Structures (aligning with the Mallory entity payloads) ---
#[derive(Debug, Clone, Serialize)]
struct MockMention {
    overview: String,
    reference_source: String,
    reference_url: String,
    published_at: String,
}

#[derive(Debug, Clone, Serialize)]
struct MockThreatActor {
    uuid: String,
    name: String,
    display_name: String,
    created_at: String,
    updated_at: String,
    mentions: Vec<MockMention>,
}

#[derive(Debug, Clone, Serialize)]
struct MockVulnerability {
    uuid: String,
    cve_id: String,
    description: String,
    cvss_base_score: f64,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct MockListQuery {
    filter: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
    sort: Option<String>,
    order: Option<String>,
}

struct MockData {
    threat_actors: Vec<MockThreatActor>,
    vulnerabilities: Vec<MockVulnerability>,
}

static MOCK_DATA: Lazy<MockData> = Lazy::new(|| {
    let threat_actors = vec![
        MockThreatActor {
            uuid: "u1".to_string(),
            name: "dark_cloud_shield".to_string(),
            display_name: "Dark Cloud Shield".to_string(),
            created_at: timestamp(30),
            updated_at: timestamp(2),
            mentions: vec![MockMention {
                overview: "Bulletproof hosting provider linked to ransomware infrastructure."
                    .to_string(),
                reference_source: "blog".to_string(),
                reference_url: "http://example.com/dark-cloud-shield".to_string(),
                published_at: "2024-01-01".to_string(),
            }],
        },
        MockThreatActor {
            uuid: "u2".to_string(),
            name: "lazarus_group".to_string(),
            display_name: "Lazarus Group".to_string(),
            created_at: timestamp(400),
            updated_at: timestamp(1),
            mentions: vec![],
        },
    ];

    let vulnerabilities = vec![
        MockVulnerability {
            uuid: "v1".to_string(),
            cve_id: "CVE-2024-3400".to_string(),
            description: "Command injection in the GlobalProtect feature of PAN-OS.".to_string(),
            cvss_base_score: 10.0,
            created_at: timestamp(200),
            updated_at: timestamp(3),
        },
        MockVulnerability {
            uuid: "v2".to_string(),
            cve_id: "CVE-2021-44228".to_string(),
            description: "Apache Log4j2 JNDI features do not protect against attacker controlled LDAP endpoints."
                .to_string(),
            cvss_base_score: 10.0,
            created_at: timestamp(1000),
            updated_at: timestamp(10),
        },
    ];

    MockData {
        threat_actors,
        vulnerabilities,
    }
});

fn error_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn page<T: Serialize + Clone>(items: Vec<T>, query: &MockListQuery) -> Response {
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(10);
    let total = items.len();
    let data: Vec<T> = items.into_iter().skip(offset).take(limit).collect();
    (
        StatusCode::OK,
        Json(json!({
            "total": total,
            "offset": offset,
            "limit": limit,
            "message": null,
            "data": data,
        })),
    )
        .into_response()
}

fn find_vulnerability(identifier: &str) -> Option<&'static MockVulnerability> {
    MOCK_DATA
        .vulnerabilities
        .iter()
        .find(|v| v.cve_id.eq_ignore_ascii_case(identifier) || v.uuid == identifier)
}

async fn require_api_key(headers: HeaderMap, request: Request, next: Next) -> Response {
    let provided = headers.get("X-API-KEY").and_then(|v| v.to_str().ok());
    if provided != Some(EXPECTED_API_KEY) {
        warn!("Rejecting request with invalid API key: {:?}", provided);
        return error_response(StatusCode::UNAUTHORIZED, "Invalid API key");
    }
    next.run(request).await
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

async fn get_threat_actor(Path(identifier): Path<String>) -> Response {
    info!("GET /v1/threat_actors/{}", identifier);
    match MOCK_DATA
        .threat_actors
        .iter()
        .find(|a| a.uuid == identifier || a.name == identifier)
    {
        Some(actor) => (StatusCode::OK, Json(actor.clone())).into_response(),
        None => {
            warn!("Threat actor not found: {}", identifier);
            error_response(StatusCode::NOT_FOUND, "Threat actor not found")
        }
    }
}

async fn list_threat_actors(Query(query): Query<MockListQuery>) -> Response {
    info!("GET /v1/threat_actors with {:?}", query);
    let mut actors: Vec<MockThreatActor> = MOCK_DATA
        .threat_actors
        .iter()
        .filter(|actor| match query.filter.as_deref() {
            None => true,
            Some(f) => match f.split_once(':') {
                Some(("uuid", value)) => actor.uuid == value,
                Some(("name", value)) => actor
                    .display_name
                    .to_lowercase()
                    .contains(&value.to_lowercase()),
                _ => false,
            },
        })
        .cloned()
        .collect();

    match query.sort.as_deref() {
        Some("created_at") => actors.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        Some("updated_at") => actors.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
        _ => actors.sort_by(|a, b| a.name.cmp(&b.name)),
    }
    if query.order.as_deref() == Some("desc") {
        actors.reverse();
    }
    page(actors, &query)
}

async fn list_mentioned_threat_actors(Query(query): Query<MockListQuery>) -> Response {
    info!("GET /v1/mentions/threat_actors with {:?}", query);
    let mentions: Vec<Value> = MOCK_DATA
        .threat_actors
        .iter()
        .flat_map(|actor| {
            actor.mentions.iter().map(move |m| {
                json!({
                    "threat_actor_uuid": actor.uuid,
                    "threat_actor_name": actor.display_name,
                    "overview": m.overview,
                    "reference_url": m.reference_url,
                    "published_at": m.published_at,
                })
            })
        })
        .collect();
    page(mentions, &query)
}

async fn get_vulnerability(Path(identifier): Path<String>) -> Response {
    info!("GET /v1/vulnerabilities/{}", identifier);

    if identifier == BROKEN_CVE {
        warn!("Simulating server error for {}", identifier);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    }
    if identifier == MISSING_CVE {
        return error_response(StatusCode::NOT_FOUND, "Vulnerability not found");
    }

    match find_vulnerability(&identifier) {
        Some(vulnerability) => (StatusCode::OK, Json(vulnerability.clone())).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Vulnerability not found"),
    }
}

async fn list_vulnerabilities(Query(query): Query<MockListQuery>) -> Response {
    info!("GET /v1/vulnerabilities with {:?}", query);
    let mut vulnerabilities: Vec<MockVulnerability> = MOCK_DATA
        .vulnerabilities
        .iter()
        .filter(|v| match query.filter.as_deref() {
            None => true,
            Some(f) => {
                let f = f.to_lowercase();
                v.cve_id.to_lowercase().contains(&f) || v.description.to_lowercase().contains(&f)
            }
        })
        .cloned()
        .collect();

    vulnerabilities.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    if query.order.as_deref() != Some("asc") {
        vulnerabilities.reverse();
    }
    page(vulnerabilities, &query)
}

async fn list_mentioned_vulnerabilities(Query(query): Query<MockListQuery>) -> Response {
    info!("GET /v1/mentions/vulnerabilities with {:?}", query);
    let mentions: Vec<Value> = MOCK_DATA
        .vulnerabilities
        .iter()
        .map(|v| {
            json!({
                "cve_id": v.cve_id,
                "overview": format!("{} discussed in threat report", v.cve_id),
                "published_at": v.updated_at,
            })
        })
        .collect();
    page(mentions, &query)
}

async fn get_detection_signatures(Path(identifier): Path<String>) -> Response {
    info!("GET /v1/vulnerabilities/{}/detection_signatures", identifier);
    match find_vulnerability(&identifier) {
        Some(v) => (
            StatusCode::OK,
            Json(json!([
                {
                    "uuid": "sig-1",
                    "source": "nuclei",
                    "method": "network",
                    "vulnerability": v.cve_id,
                    "created_at": v.created_at,
                }
            ])),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Vulnerability not found"),
    }
}

async fn get_exploitations(
    Path(identifier): Path<String>,
    Query(query): Query<MockListQuery>,
) -> Response {
    info!("GET /v1/vulnerabilities/{}/exploitations", identifier);
    match find_vulnerability(&identifier) {
        Some(v) => page(
            vec![json!({
                "uuid": "exp-1",
                "vulnerability": v.cve_id,
                "count": 12,
                "first_seen": v.created_at,
                "last_seen": v.updated_at,
            })],
            &query,
        ),
        None => error_response(StatusCode::NOT_FOUND, "Vulnerability not found"),
    }
}

async fn get_configurations(
    Path(identifier): Path<String>,
    Query(query): Query<MockListQuery>,
) -> Response {
    info!("GET /v1/vulnerabilities/{}/configurations", identifier);
    match find_vulnerability(&identifier) {
        Some(v) => page(
            vec![json!({
                "vulnerability": v.cve_id,
                "cpe": "cpe:2.3:o:paloaltonetworks:pan-os:11.1.0:*:*:*:*:*:*:*",
                "vendor": "paloaltonetworks",
                "product": "pan-os",
                "is_vulnerable": true,
            })],
            &query,
        ),
        None => error_response(StatusCode::NOT_FOUND, "Vulnerability not found"),
    }
}

async fn catch_all(method: axum::http::Method, uri: axum::http::Uri) -> impl IntoResponse {
    let path = uri.path().to_string();
    warn!("Unhandled request: {} {}", method, path);

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "detail": format!("No handler for: {} {}", method, path),
            "available_routes_info": [
                "GET /health",
                "GET /v1/threat_actors",
                "GET /v1/threat_actors/:identifier",
                "GET /v1/mentions/threat_actors",
                "GET /v1/vulnerabilities",
                "GET /v1/vulnerabilities/:identifier",
                "GET /v1/vulnerabilities/:identifier/detection_signatures",
                "GET /v1/vulnerabilities/:identifier/exploitations",
                "GET /v1/vulnerabilities/:identifier/configurations",
                "GET /v1/mentions/vulnerabilities"
            ]
        })),
    )
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr) // Log to stderr for tests
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Starting Mock Mallory Server...");

    let api = Router::new()
        .route("/threat_actors", get(list_threat_actors))
        .route("/threat_actors/:identifier", get(get_threat_actor))
        .route("/mentions/threat_actors", get(list_mentioned_threat_actors))
        .route("/vulnerabilities", get(list_vulnerabilities))
        .route("/vulnerabilities/:identifier", get(get_vulnerability))
        .route(
            "/vulnerabilities/:identifier/detection_signatures",
            get(get_detection_signatures),
        )
        .route(
            "/vulnerabilities/:identifier/exploitations",
            get(get_exploitations),
        )
        .route(
            "/vulnerabilities/:identifier/configurations",
            get(get_configurations),
        )
        .route("/mentions/vulnerabilities", get(list_mentioned_vulnerabilities))
        .route_layer(middleware::from_fn(require_api_key));

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/v1", api)
        .fallback(catch_all)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let port = addr.port();

    println!("MOCK_SERVER_PORT={}", port); // Critical for test harness
    info!("Mock server listening on 127.0.0.1:{}", port);

    axum::serve(listener, app).await.unwrap();
}
