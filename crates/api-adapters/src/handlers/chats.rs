use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use domains::{ChatId, ChatMessage, ChatSummary, UserId};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    extract::{JsonBody, PathParam, QueryParams},
    ApiError, AppState,
};

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    pub q: Option<String>,
}

/// First contact from a design page: opens or reuses the thread.
#[derive(Debug, Deserialize)]
pub struct DesignerMessage {
    pub designer_id: UserId,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

pub async fn inbox(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    QueryParams(query): QueryParams<InboxQuery>,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
    Ok(Json(
        state
            .services
            .chats
            .inbox(&viewer, query.q.as_deref())
            .await?,
    ))
}

pub async fn message_designer(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    JsonBody(request): JsonBody<DesignerMessage>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let message = state
        .services
        .chats
        .send_to_designer(&viewer, &request.designer_id, &request.text)
        .await?;
    state.metrics.message();
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn history(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    PathParam(id): PathParam<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(
        state
            .services
            .chats
            .messages(&viewer, &ChatId::new(id))
            .await?,
    ))
}

pub async fn post_message(
    State(state): State<AppState>,
    AuthUser(sender): AuthUser,
    PathParam(id): PathParam<String>,
    JsonBody(request): JsonBody<MessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let message = state
        .services
        .chats
        .post_message(&sender, &ChatId::new(id), &request.text)
        .await?;
    state.metrics.message();
    Ok((StatusCode::CREATED, Json(message)))
}
