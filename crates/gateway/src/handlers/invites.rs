//! Workspace invitation handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::state::AppState;
use quickonboard_common::{
    auth::{generate_invite_token, require_role, AuthContext},
    db::{
        models::{Invite, Role},
        normalize_email,
    },
    errors::{AppError, Result},
    notifications::{log_failure, notify_user, notify_workspace_members, Notice},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInviteRequest {
    #[validate(email)]
    pub email: String,
    pub role: String,
}

/// Invitation with its shareable link
#[derive(Serialize)]
pub struct InviteView {
    #[serde(flatten)]
    pub invite: Invite,
    pub invite_url: String,
}

#[derive(Serialize)]
pub struct InviteResponse {
    pub invite: InviteView,
}

#[derive(Serialize)]
pub struct InviteListResponse {
    pub invites: Vec<InviteView>,
}

#[derive(Serialize)]
pub struct InviteWorkspace {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// What an invitee sees before accepting
#[derive(Serialize)]
pub struct InviteDetails {
    pub email: String,
    pub role: String,
    pub expires_at: String,
    pub workspace: InviteWorkspace,
}

#[derive(Serialize)]
pub struct InviteLookupResponse {
    pub invite: InviteDetails,
}

#[derive(Serialize)]
pub struct AcceptInviteResponse {
    pub success: bool,
    pub workspace_id: Uuid,
    pub role: Role,
}

fn invite_url(state: &AppState, token: &str) -> String {
    format!(
        "{}/invite/{}",
        state.config.invites.public_base_url.trim_end_matches('/'),
        token
    )
}

fn view(state: &AppState, invite: Invite) -> InviteView {
    InviteView {
        invite_url: invite_url(state, &invite.token),
        invite,
    }
}

/// Find an invitation that can still be accepted
async fn usable_invite(state: &AppState, token: &str) -> Result<Invite> {
    let invite = state
        .repo
        .find_invite_by_token(token)
        .await?
        .ok_or(AppError::InviteNotFound)?;

    if invite.accepted {
        return Err(AppError::validation("token", "Invite has already been accepted"));
    }
    if invite.is_expired(Utc::now()) {
        return Err(AppError::validation("token", "Invite has expired"));
    }

    Ok(invite)
}

/// Invite someone by email (owner/admin)
pub async fn create_invite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
    Json(request): Json<CreateInviteRequest>,
) -> Result<(StatusCode, Json<InviteResponse>)> {
    request.validate()?;

    let role = match Role::parse(&request.role) {
        Some(role @ (Role::Admin | Role::Member)) => role,
        _ => {
            return Err(AppError::validation(
                "role",
                format!("Invalid role: {}", request.role),
            ))
        }
    };

    let (_, member) = state.repo.require_member(workspace_id, auth.user_id).await?;
    require_role(&member, &[Role::Owner, Role::Admin])?;

    let email = normalize_email(&request.email);

    if state.repo.is_member_email(workspace_id, &email).await? {
        return Err(AppError::Conflict {
            message: "User is already a member of this workspace".to_string(),
        });
    }
    if state.repo.find_live_invite(workspace_id, &email).await?.is_some() {
        return Err(AppError::Conflict {
            message: "An invite has already been sent to this email".to_string(),
        });
    }

    let expires_at = Utc::now() + Duration::days(state.config.invites.ttl_days);
    let invite = state
        .repo
        .create_invite(
            workspace_id,
            &email,
            role,
            auth.user_id,
            generate_invite_token(),
            expires_at,
        )
        .await?;

    tracing::info!(
        invite_id = %invite.id,
        workspace_id = %workspace_id,
        role = %role,
        invited_by = %auth.user_id,
        "Invite created"
    );

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            invite: view(&state, invite),
        }),
    ))
}

/// Pending invitations of a workspace
pub async fn list_invites(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<InviteListResponse>> {
    state.repo.require_member(workspace_id, auth.user_id).await?;

    let invites = state
        .repo
        .list_invites(workspace_id)
        .await?
        .into_iter()
        .map(|invite| view(&state, invite))
        .collect();

    Ok(Json(InviteListResponse { invites }))
}

/// Public lookup by token
pub async fn get_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InviteLookupResponse>> {
    let invite = usable_invite(&state, &token).await?;
    let workspace = state
        .repo
        .find_workspace(invite.workspace_id)
        .await?
        .ok_or(AppError::InviteNotFound)?;

    Ok(Json(InviteLookupResponse {
        invite: InviteDetails {
            email: invite.email,
            role: invite.role,
            expires_at: invite.expires_at.to_rfc3339(),
            workspace: InviteWorkspace {
                id: workspace.id,
                name: workspace.name,
                description: workspace.description,
            },
        },
    }))
}

/// Accept an invitation addressed to the caller's email
pub async fn accept_invite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(token): Path<String>,
) -> Result<Json<AcceptInviteResponse>> {
    let invite = usable_invite(&state, &token).await?;

    if normalize_email(&invite.email) != normalize_email(&auth.email) {
        return Err(AppError::Forbidden {
            message: "This invite was sent to a different email address".to_string(),
        });
    }

    let workspace_id = invite.workspace_id;
    if state
        .repo
        .find_membership(workspace_id, auth.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict {
            message: "You are already a member of this workspace".to_string(),
        });
    }

    let workspace = state
        .repo
        .find_workspace(workspace_id)
        .await?
        .ok_or(AppError::InviteNotFound)?;

    let member = state.repo.accept_invite(invite, auth.user_id).await?;
    let role = member.role();

    tracing::info!(
        workspace_id = %workspace_id,
        user_id = %auth.user_id,
        role = %role,
        "Invite accepted"
    );

    log_failure(
        notify_user(
            &state.repo,
            auth.user_id,
            Some(workspace_id),
            &Notice::joined_workspace(&workspace.name, role.as_str()),
        )
        .await,
        "invite_accepted",
    );
    log_failure(
        notify_workspace_members(
            &state.repo,
            workspace_id,
            Some(auth.user_id),
            &Notice::member_joined(auth.display_name(), &workspace.name),
        )
        .await,
        "invite_accepted",
    );

    Ok(Json(AcceptInviteResponse {
        success: true,
        workspace_id,
        role,
    }))
}
