//! Workspace management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::members::MemberView;
use crate::state::AppState;
use quickonboard_common::{
    auth::{require_role, AuthContext},
    db::{
        models::{Document, Role, Workspace},
        WorkspaceSummary,
    },
    errors::{AppError, Result},
    notifications::{log_failure, notify_user, Notice},
};

/// Request to create a workspace
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkspaceRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// Unique company identifier
    #[validate(length(min = 1, max = 64))]
    pub company_id: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWorkspaceRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct WorkspaceListResponse {
    pub workspaces: Vec<WorkspaceSummary>,
}

#[derive(Serialize)]
pub struct WorkspaceResponse {
    pub workspace: Workspace,
}

/// Workspace info as seen by a member
#[derive(Serialize)]
pub struct WorkspaceInfoResponse {
    pub workspace: Workspace,
    pub role: Role,
    pub member_count: usize,
    pub document_count: usize,
    pub members: Vec<MemberView>,
    pub documents: Vec<Document>,
}

/// List workspaces the caller belongs to
pub async fn list_workspaces(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<WorkspaceListResponse>> {
    let workspaces = state.repo.list_workspaces_for_user(auth.user_id).await?;
    Ok(Json(WorkspaceListResponse { workspaces }))
}

/// Create a workspace owned by the caller
pub async fn create_workspace(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<WorkspaceResponse>)> {
    request.validate()?;

    let name = request.name.trim().to_string();
    let company_id = request.company_id.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("name", "Name is required"));
    }
    if company_id.is_empty() {
        return Err(AppError::validation("company_id", "Company ID is required"));
    }

    let workspace = state
        .repo
        .create_workspace(auth.user_id, name, company_id, request.description)
        .await?;

    tracing::info!(
        workspace_id = %workspace.id,
        owner_id = %auth.user_id,
        "Workspace created"
    );

    log_failure(
        notify_user(
            &state.repo,
            auth.user_id,
            Some(workspace.id),
            &Notice::workspace_created(&workspace.name),
        )
        .await,
        "workspace_created",
    );

    Ok((StatusCode::CREATED, Json(WorkspaceResponse { workspace })))
}

/// Workspace details with members and documents
pub async fn get_workspace(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<WorkspaceInfoResponse>> {
    let (workspace, member) = state.repo.require_member(workspace_id, auth.user_id).await?;

    let members: Vec<MemberView> = state
        .repo
        .list_members(workspace_id)
        .await?
        .into_iter()
        .map(MemberView::from)
        .collect();
    let documents = state.repo.list_documents(workspace_id).await?;

    Ok(Json(WorkspaceInfoResponse {
        workspace,
        role: member.role(),
        member_count: members.len(),
        document_count: documents.len(),
        members,
        documents,
    }))
}

/// Update name or description (owner/admin)
pub async fn update_workspace(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
    Json(request): Json<UpdateWorkspaceRequest>,
) -> Result<Json<WorkspaceResponse>> {
    request.validate()?;

    let (_, member) = state.repo.require_member(workspace_id, auth.user_id).await?;
    require_role(&member, &[Role::Owner, Role::Admin])?;

    let name = request.name.map(|n| n.trim().to_string());
    if name.as_deref() == Some("") {
        return Err(AppError::validation("name", "Name cannot be blank"));
    }

    let workspace = state
        .repo
        .update_workspace(workspace_id, name, request.description)
        .await?;

    tracing::info!(workspace_id = %workspace_id, user_id = %auth.user_id, "Workspace updated");

    Ok(Json(WorkspaceResponse { workspace }))
}

/// Delete a workspace and everything in it (owner only)
pub async fn delete_workspace(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
) -> Result<StatusCode> {
    let (_, member) = state.repo.require_member(workspace_id, auth.user_id).await?;
    require_role(&member, &[Role::Owner])?;

    let documents = state.repo.list_documents(workspace_id).await?;
    state.repo.delete_workspace(workspace_id).await?;

    for document in &documents {
        if let Err(e) = state.blobs.delete(&document.url).await {
            tracing::warn!(document_id = %document.id, error = %e, "Failed to delete document blob");
        }
    }

    tracing::info!(
        workspace_id = %workspace_id,
        user_id = %auth.user_id,
        documents = documents.len(),
        "Workspace deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
