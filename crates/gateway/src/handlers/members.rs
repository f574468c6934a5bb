//! Team management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use quickonboard_common::{
    auth::{require_role, AuthContext},
    db::{models::Role, MemberWithUser},
    errors::{AppError, Result},
    notifications::{log_failure, notify_user, Notice},
};

/// A member with the user details the team page shows
#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub role: Role,
    pub joined_at: String,
}

impl From<MemberWithUser> for MemberView {
    fn from(row: MemberWithUser) -> Self {
        Self {
            id: row.member.id,
            user_id: row.user.id,
            role: row.member.role(),
            name: row.user.name,
            email: row.user.email,
            image: row.user.image,
            joined_at: row.member.joined_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct MemberListResponse {
    pub members: Vec<MemberView>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Serialize)]
pub struct MemberResponse {
    pub member: MemberView,
}

/// List members of a workspace
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<MemberListResponse>> {
    state.repo.require_member(workspace_id, auth.user_id).await?;

    let members = state
        .repo
        .list_members(workspace_id)
        .await?
        .into_iter()
        .map(MemberView::from)
        .collect();

    Ok(Json(MemberListResponse { members }))
}

/// Change a member's role (owner/admin)
pub async fn update_member_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((workspace_id, member_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<MemberResponse>> {
    let role = Role::parse(&request.role)
        .ok_or_else(|| AppError::validation("role", format!("Invalid role: {}", request.role)))?;

    let (workspace, caller) = state.repo.require_member(workspace_id, auth.user_id).await?;
    require_role(&caller, &[Role::Owner, Role::Admin])?;

    let target = state
        .repo
        .find_member_by_id(workspace_id, member_id)
        .await?
        .ok_or_else(|| AppError::MemberNotFound {
            id: member_id.to_string(),
        })?;

    // Admins may manage everyone except the owner
    let targets_owner = target.role() == Role::Owner || target.user_id == workspace.owner_id;
    if targets_owner && caller.user_id != workspace.owner_id {
        return Err(AppError::Forbidden {
            message: "Only the workspace owner can change the owner's role".to_string(),
        });
    }

    let updated = state.repo.update_member_role(target, role).await?;

    tracing::info!(
        workspace_id = %workspace_id,
        member_id = %member_id,
        role = %role,
        changed_by = %auth.user_id,
        "Member role updated"
    );

    log_failure(
        notify_user(
            &state.repo,
            updated.user_id,
            Some(workspace_id),
            &Notice::role_changed(&workspace.name, role.as_str()),
        )
        .await,
        "role_changed",
    );

    let user = state
        .repo
        .find_user_by_id(updated.user_id)
        .await?
        .ok_or_else(|| AppError::MemberNotFound {
            id: member_id.to_string(),
        })?;

    Ok(Json(MemberResponse {
        member: MemberView::from(MemberWithUser {
            member: updated,
            user,
        }),
    }))
}

/// Remove a member (owner/admin); the owner cannot be removed
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((workspace_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    let (workspace, caller) = state.repo.require_member(workspace_id, auth.user_id).await?;
    require_role(&caller, &[Role::Owner, Role::Admin])?;

    let target = state
        .repo
        .find_member_by_id(workspace_id, member_id)
        .await?
        .ok_or_else(|| AppError::MemberNotFound {
            id: member_id.to_string(),
        })?;

    if target.role() == Role::Owner {
        return Err(AppError::validation("member_id", "Cannot remove workspace owner"));
    }

    state.repo.remove_member(target.id).await?;

    tracing::info!(
        workspace_id = %workspace_id,
        member_id = %member_id,
        removed_by = %auth.user_id,
        "Member removed"
    );

    log_failure(
        notify_user(
            &state.repo,
            target.user_id,
            Some(workspace_id),
            &Notice::removed_from_workspace(&workspace.name),
        )
        .await,
        "member_removed",
    );

    Ok(StatusCode::NO_CONTENT)
}
