//! Workspace chat handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::state::AppState;
use quickonboard_common::{
    auth::AuthContext,
    errors::{AppError, Result},
};
use quickonboard_context::welcome_message;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub confidence: i32,
    pub sources: Vec<String>,
    pub workspace_name: String,
}

#[derive(Serialize)]
pub struct WelcomeResponse {
    pub message: String,
    pub workspace: WelcomeWorkspace,
}

#[derive(Serialize)]
pub struct WelcomeWorkspace {
    pub name: String,
    pub document_count: usize,
}

/// Answer a question from the workspace's documents
pub async fn chat(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    request.validate()?;
    let question = request.message.trim();
    if question.is_empty() {
        return Err(AppError::validation("message", "Message is required"));
    }

    let (workspace, _) = state.repo.require_member(workspace_id, auth.user_id).await?;

    let answer = state.generator.answer(workspace_id, question).await?;

    if let Err(e) = state
        .repo
        .record_chat_query(
            workspace_id,
            auth.user_id,
            question.to_string(),
            answer.answer.clone(),
            answer.confidence,
            &answer.sources,
        )
        .await
    {
        tracing::warn!(workspace_id = %workspace_id, error = %e, "Failed to log chat query");
    }

    Ok(Json(ChatResponse {
        response: answer.answer,
        confidence: answer.confidence,
        sources: answer.sources,
        workspace_name: workspace.name,
    }))
}

/// Greeting listing the workspace's documents
pub async fn welcome(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<WelcomeResponse>> {
    let (workspace, _) = state.repo.require_member(workspace_id, auth.user_id).await?;

    let names: Vec<String> = state
        .repo
        .list_documents(workspace_id)
        .await?
        .into_iter()
        .map(|d| d.name)
        .collect();

    Ok(Json(WelcomeResponse {
        message: welcome_message(&workspace.name, &names),
        workspace: WelcomeWorkspace {
            name: workspace.name,
            document_count: names.len(),
        },
    }))
}
