//! Route definitions for the Confab gateway.
//!
//! Provides the chat, upload, clear and status endpoints plus the bundled
//! single-page client. Validation failures answer 400 with a plain message;
//! upstream failures are translated to fixed user-facing messages so vendor
//! detail never leaks to the client.

use crate::chat::ChatService;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use confab_common::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outer request body cap. Leaves headroom above the per-file limit so the
/// handler's own size check produces the client-visible message.
const BODY_LIMIT_BYTES: usize = 32 * 1024 * 1024;

const CHAT_FIELDS_REQUIRED: &str = "Message and sessionId are required";
const UPLOAD_FIELDS_REQUIRED: &str = "File, query and sessionId are required";
const SESSION_ID_REQUIRED: &str = "SessionId is required";
const FILE_TOO_LARGE: &str = "File size exceeds 10MB limit";
const HISTORY_CLEARED: &str = "Conversation history cleared";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
    /// Startup instant as Unix epoch milliseconds.
    pub started_at_ms: i64,
    pub max_upload_bytes: usize,
}

/// Chat request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
}

/// Clear request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRequest {
    pub session_id: Option<String>,
}

/// Successful chat or upload answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub response: String,
}

/// Confirmation message body.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Server status response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerStatusResponse {
    #[serde(rename = "startTime")]
    pub start_time: i64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the gateway router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/server-status", get(server_status_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/upload-and-query", post(upload_handler))
        .route("/api/clear", post(clear_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

async fn server_status_handler(State(state): State<AppState>) -> Json<ServerStatusResponse> {
    Json(ServerStatusResponse {
        start_time: state.started_at_ms,
    })
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AnswerResponse>, (StatusCode, Json<ErrorResponse>)> {
    let message = request.message.unwrap_or_default();
    let session_id = request.session_id.unwrap_or_default();
    if message.is_empty() || session_id.is_empty() {
        return Err(error_reply(Error::MissingField(
            CHAT_FIELDS_REQUIRED.into(),
        )));
    }

    let response = state
        .service
        .chat(&session_id, &message)
        .await
        .map_err(error_reply)?;

    Ok(Json(AnswerResponse { response }))
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnswerResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut query = String::new();
    let mut session_id = String::new();

    let missing_parts = || error_reply(Error::MissingField(UPLOAD_FIELDS_REQUIRED.into()));

    while let Some(field) = multipart.next_field().await.map_err(|_| missing_parts())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|_| missing_parts())?;
                file = Some((file_name, bytes.to_vec()));
            }
            "query" => {
                query = field.text().await.map_err(|_| missing_parts())?;
            }
            "sessionId" => {
                session_id = field.text().await.map_err(|_| missing_parts())?;
            }
            _ => {}
        }
    }

    let Some((file_name, bytes)) = file else {
        return Err(missing_parts());
    };
    if query.is_empty() || session_id.is_empty() {
        return Err(missing_parts());
    }
    if bytes.len() > state.max_upload_bytes {
        return Err(error_reply(Error::SizeLimit(FILE_TOO_LARGE.into())));
    }

    let response = state
        .service
        .document_query(&session_id, &file_name, &bytes, &query)
        .await
        .map_err(error_reply)?;

    Ok(Json(AnswerResponse { response }))
}

async fn clear_handler(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = request.session_id.unwrap_or_default();
    if session_id.is_empty() {
        return Err(error_reply(Error::MissingField(SESSION_ID_REQUIRED.into())));
    }

    state.service.clear(&session_id).await;

    Ok(Json(MessageResponse {
        message: HISTORY_CLEARED.into(),
    }))
}

/// Translate an error to its wire form: the status from the error taxonomy
/// and the client-facing message, never the internal detail.
fn error_reply(e: Error) -> (StatusCode, Json<ErrorResponse>) {
    if e.is_validation() {
        tracing::debug!(error = %e, "Request rejected");
    } else {
        tracing::error!(error = %e, "Request failed");
    }
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: e.user_message(),
        }),
    )
}
