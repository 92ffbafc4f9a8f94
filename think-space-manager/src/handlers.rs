use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};

use crate::error::ApiError;
use crate::state::{
    AppState, BrainstormRequest, BrainstormResponse, ClearSessionRequest, HealthResponse,
    MessageResponse, TestResponse,
};

pub async fn brainstorm_handler(
    State(state): State<AppState>,
    payload: Result<Json<BrainstormRequest>, JsonRejection>,
) -> Result<Json<BrainstormResponse>, ApiError> {
    let Json(payload) = payload?;
    let reply = state
        .relay
        .brainstorm(&payload.prompt, payload.session_id.as_deref())
        .await?;

    Ok(Json(BrainstormResponse {
        response: reply.response,
        session_id: reply.session_id,
    }))
}

/// Accepts the session id from the query string or a JSON body. Always 200.
pub async fn clear_session_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearSessionRequest>,
    body: Option<Json<ClearSessionRequest>>,
) -> Json<MessageResponse> {
    let session_id = body
        .and_then(|Json(body)| body.session_id)
        .or(query.session_id);

    let cleared = match session_id.as_deref() {
        Some(id) => state.relay.clear_session(id),
        None => false,
    };
    tracing::info!("Clear session request for {:?}: cleared={}", session_id, cleared);

    let message = if cleared {
        "Session cleared"
    } else {
        "Session not found"
    };
    Json(MessageResponse {
        message: message.to_string(),
    })
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online".to_string(),
        model: format!("{} API", state.relay.provider_label()),
        client_ready: state.relay.is_ready(),
        active_sessions: state.sessions().len(),
    })
}

pub async fn test_handler(State(state): State<AppState>) -> Json<TestResponse> {
    let client_status = if state.relay.is_ready() {
        "initialized"
    } else {
        "missing_api_key"
    };
    Json(TestResponse {
        message: "Backend is running!".to_string(),
        groq_client: client_status.to_string(),
        sessions_count: state.sessions().len(),
    })
}
