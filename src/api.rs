//! HTTP surface for the chat service.
//!
//! Three routes wrap the chat pipeline:
//!
//! - `GET /` – Liveness probe returning a fixed message.
//! - `POST /chat` – Answer `{ "query": "..." }` and return the answer, cited sources and the
//!   session history. A session can be selected with a `session_id` body field or the
//!   `x-session-id` header; without one the shared default session is used.
//! - `GET /reset_memory` – Clear the selected session (`?session_id=` or `x-session-id`).
//!
//! Cross-origin requests are accepted from any origin with credentials.

use crate::chat::{ChatApi, ChatError, ChatOutcome, SourceReference};
use crate::memory::{ChatTurn, DEFAULT_SESSION_ID, Role};
use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";

const HEALTH_MESSAGE: &str = "RAG Chatbot (MongoDB Atlas) is running!";
const RESET_MESSAGE: &str = "Memory cleared!";
const CHAT_FAILURE_DETAIL: &str = "Failed to generate an answer from downstream providers";

/// Build the HTTP router exposing the chat API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ChatApi + 'static,
{
    Router::new()
        .route("/", get(health))
        .route("/chat", post(chat::<S>))
        .route("/reset_memory", get(reset_memory::<S>))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Any origin, method and header, with credentials. Origins are mirrored because browsers
/// reject a wildcard origin on credentialed requests.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Fixed-message response body.
#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn health() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: HEALTH_MESSAGE,
    })
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    /// Question text; surrounding whitespace is ignored.
    query: String,
    /// Optional session id; takes precedence over the header.
    #[serde(default)]
    session_id: Option<String>,
}

/// Success response for `POST /chat`.
#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    sources: Vec<SourceReference>,
    chat_history: Vec<HistoryEntry>,
}

/// One history record, serialized as `{"user": text}` or `{"bot": text}`.
#[derive(Debug, PartialEq, Serialize)]
enum HistoryEntry {
    #[serde(rename = "user")]
    User(String),
    #[serde(rename = "bot")]
    Bot(String),
}

impl From<ChatTurn> for HistoryEntry {
    fn from(turn: ChatTurn) -> Self {
        match turn.role() {
            Role::User => Self::User(turn.text().to_string()),
            Role::Assistant => Self::Bot(turn.text().to_string()),
        }
    }
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            answer: outcome.answer,
            sources: outcome.sources,
            chat_history: outcome
                .chat_history
                .into_iter()
                .map(HistoryEntry::from)
                .collect(),
        }
    }
}

/// Answer a question and return the updated session history.
async fn chat<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError>
where
    S: ChatApi,
{
    let Json(ChatRequest { query, session_id }) = payload?;
    let session = resolve_session(session_id.as_deref(), &headers);
    let span = tracing::info_span!("chat", request_id = %Uuid::new_v4(), session = %session);

    let outcome = service.chat(&session, &query).instrument(span).await?;
    Ok(Json(outcome.into()))
}

/// Query parameters for `GET /reset_memory`.
#[derive(Deserialize)]
struct ResetParams {
    #[serde(default)]
    session_id: Option<String>,
}

/// Clear the selected session's memory.
async fn reset_memory<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    Query(params): Query<ResetParams>,
) -> Json<MessageResponse>
where
    S: ChatApi,
{
    let session = resolve_session(params.session_id.as_deref(), &headers);
    service.reset_memory(&session).await;
    tracing::info!(session = %session, "Memory reset");
    Json(MessageResponse {
        message: RESET_MESSAGE,
    })
}

/// Pick the session id: explicit value, then header, then the default session.
fn resolve_session(explicit: Option<&str>, headers: &HeaderMap) -> String {
    explicit
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}

enum ApiError {
    Validation(JsonRejection),
    Chat(ChatError),
}

/// One entry of a 422 `detail` array: where the body went wrong, what happened, and the
/// error kind.
#[derive(Debug, PartialEq, Serialize)]
struct ValidationIssue {
    loc: Vec<String>,
    msg: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl ValidationIssue {
    fn from_rejection(rejection: &JsonRejection) -> Self {
        let msg = rejection.body_text();
        let (field, kind) = match rejection {
            JsonRejection::JsonDataError(_) => {
                let (field, kind) = data_error_field(&msg);
                (Some(field), kind)
            }
            JsonRejection::JsonSyntaxError(_) => (None, "json_invalid"),
            JsonRejection::MissingJsonContentType(_) => (None, "content_type"),
            _ => (None, "body_unreadable"),
        };

        let mut loc = vec!["body".to_string()];
        if let Some(field) = field {
            loc.extend(field.split('.').map(str::to_string));
        }
        Self { loc, msg, kind }
    }
}

/// Field path and error kind of a well-formed body that does not fit [`ChatRequest`].
///
/// Missing fields are named in the message itself; mistyped fields carry a `path: ` prefix.
/// When neither is present the only required field, `query`, is blamed.
fn data_error_field(message: &str) -> (String, &'static str) {
    let detail = message.split_once(": ").map_or(message, |(_, rest)| rest);

    if let Some(rest) = detail.strip_prefix("missing field `")
        && let Some((field, _)) = rest.split_once('`')
    {
        return (field.to_string(), "missing");
    }
    if let Some((path, _)) = detail.split_once(": ")
        && !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return (path.to_string(), "type_error");
    }
    ("query".to_string(), "type_error")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(rejection) => {
                let issue = ValidationIssue::from_rejection(&rejection);
                tracing::debug!(
                    loc = ?issue.loc,
                    detail = %issue.msg,
                    "Rejected chat request body"
                );
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "detail": [issue] })),
                )
                    .into_response()
            }
            Self::Chat(error) => {
                tracing::error!(error = %error, "Chat request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": CHAT_FAILURE_DETAIL })),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection)
    }
}

impl From<ChatError> for ApiError {
    fn from(inner: ChatError) -> Self {
        Self::Chat(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use serde_json::Value;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubChatService {
        calls: Mutex<Vec<(String, String)>>,
        resets: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatApi for StubChatService {
        async fn chat(&self, session_id: &str, query: &str) -> Result<ChatOutcome, ChatError> {
            self.calls
                .lock()
                .await
                .push((session_id.to_string(), query.to_string()));
            if self.fail {
                return Err(ChatError::EmptyEmbedding);
            }
            Ok(ChatOutcome {
                answer: "stub answer".into(),
                sources: vec![SourceReference {
                    source: "a.pdf".into(),
                }],
                chat_history: vec![ChatTurn::user(query), ChatTurn::assistant("stub answer")],
            })
        }

        async fn reset_memory(&self, session_id: &str) {
            self.resets.lock().await.push(session_id.to_string());
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn post_chat(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[test]
    fn history_entries_are_tagged_by_role() {
        let user = serde_json::to_value(HistoryEntry::from(ChatTurn::user("hi"))).expect("json");
        let bot =
            serde_json::to_value(HistoryEntry::from(ChatTurn::assistant("hello"))).expect("json");
        assert_eq!(user, json!({ "user": "hi" }));
        assert_eq!(bot, json!({ "bot": "hello" }));
    }

    #[test]
    fn session_resolution_prefers_explicit_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(resolve_session(None, &headers), DEFAULT_SESSION_ID);

        headers.insert(SESSION_HEADER, "from-header".parse().expect("header value"));
        assert_eq!(resolve_session(None, &headers), "from-header");
        assert_eq!(resolve_session(Some("  "), &headers), "from-header");
        assert_eq!(resolve_session(Some(" body "), &headers), "body");
    }

    #[tokio::test]
    async fn chat_route_returns_outcome_shape() {
        let service = Arc::new(StubChatService::default());
        let (status, json) = send(
            create_router(service.clone()),
            post_chat(r#"{"query": "hello"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "answer": "stub answer",
                "sources": [{ "source": "a.pdf" }],
                "chat_history": [{ "user": "hello" }, { "bot": "stub answer" }]
            })
        );
        assert_eq!(
            *service.calls.lock().await,
            vec![(DEFAULT_SESSION_ID.to_string(), "hello".to_string())]
        );
    }

    #[tokio::test]
    async fn chat_route_reads_session_header() {
        let service = Arc::new(StubChatService::default());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header("content-type", "application/json")
            .header(SESSION_HEADER, "tab-7")
            .body(Body::from(r#"{"query": "hello"}"#))
            .expect("request");

        let (status, _) = send(create_router(service.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(service.calls.lock().await[0].0, "tab-7");
    }

    #[tokio::test]
    async fn malformed_bodies_are_unprocessable() {
        let cases = [
            (r#"{}"#, json!(["body", "query"]), "missing"),
            (r#"{"query": 5}"#, json!(["body", "query"]), "type_error"),
            (r#"{"query": "#, json!(["body"]), "json_invalid"),
            ("not json", json!(["body"]), "json_invalid"),
        ];
        for (body, loc, kind) in cases {
            let service = Arc::new(StubChatService::default());
            let (status, json) = send(create_router(service.clone()), post_chat(body)).await;

            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body {body}");
            let issues = json["detail"].as_array().expect("detail array");
            assert_eq!(issues.len(), 1, "body {body}");
            assert_eq!(issues[0]["loc"], loc, "body {body}");
            assert_eq!(issues[0]["type"], kind, "body {body}");
            assert!(issues[0]["msg"].is_string(), "body {body}");
            assert!(service.calls.lock().await.is_empty());
        }
    }

    #[tokio::test]
    async fn missing_content_type_points_at_body() {
        let service = Arc::new(StubChatService::default());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .body(Body::from(r#"{"query": "hello"}"#))
            .expect("request");

        let (status, json) = send(create_router(service.clone()), request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"][0]["loc"], json!(["body"]));
        assert_eq!(json["detail"][0]["type"], "content_type");
        assert!(service.calls.lock().await.is_empty());
    }

    #[test]
    fn data_errors_name_the_offending_field() {
        assert_eq!(
            data_error_field(
                "Failed to deserialize the JSON body into the target type: \
                 missing field `query` at line 1 column 2"
            ),
            ("query".to_string(), "missing")
        );
        assert_eq!(
            data_error_field(
                "Failed to deserialize the JSON body into the target type: \
                 session_id: invalid type: integer `5`, expected a string at line 1 column 33"
            ),
            ("session_id".to_string(), "type_error")
        );
        assert_eq!(
            data_error_field(
                "Failed to deserialize the JSON body into the target type: \
                 invalid type: integer `5`, expected a string"
            ),
            ("query".to_string(), "type_error")
        );
    }

    #[tokio::test]
    async fn chat_failure_is_a_generic_server_error() {
        let service = Arc::new(StubChatService {
            fail: true,
            ..Default::default()
        });
        let (status, json) = send(create_router(service), post_chat(r#"{"query": "q"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({ "detail": CHAT_FAILURE_DETAIL }));
    }

    #[tokio::test]
    async fn reset_route_targets_query_session() {
        let service = Arc::new(StubChatService::default());
        let request = Request::builder()
            .uri("/reset_memory?session_id=abc")
            .body(Body::empty())
            .expect("request");

        let (status, json) = send(create_router(service.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "message": "Memory cleared!" }));
        assert_eq!(*service.resets.lock().await, vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn health_route_reports_liveness() {
        let service = Arc::new(StubChatService::default());
        let request = Request::builder().uri("/").body(Body::empty()).expect("request");

        let (status, json) = send(create_router(service.clone()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({ "message": "RAG Chatbot (MongoDB Atlas) is running!" })
        );
        assert!(service.calls.lock().await.is_empty());
        assert!(service.resets.lock().await.is_empty());
    }

    #[tokio::test]
    async fn cors_mirrors_origin_with_credentials() {
        let service = Arc::new(StubChatService::default());
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/chat")
            .header("origin", "https://app.example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .expect("request");

        let response = create_router(service)
            .oneshot(request)
            .await
            .expect("router response");

        let headers = response.headers();
        assert_eq!(
            headers["access-control-allow-origin"],
            "https://app.example.com"
        );
        assert_eq!(headers["access-control-allow-credentials"], "true");
        assert_eq!(headers["access-control-allow-methods"], "POST");
    }
}
