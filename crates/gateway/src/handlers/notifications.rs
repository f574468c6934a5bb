//! Notification handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::state::AppState;
use quickonboard_common::{
    auth::AuthContext,
    db::{models::Notification, NotificationWithWorkspace},
    errors::{AppError, Result},
};

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub workspace_id: Option<Uuid>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 2000))]
    pub message: String,

    pub workspace_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub workspace_id: Option<Uuid>,
    pub workspace_name: Option<String>,
    pub created_at: String,
}

impl From<NotificationWithWorkspace> for NotificationView {
    fn from(row: NotificationWithWorkspace) -> Self {
        let n = row.notification;
        Self {
            id: n.id,
            title: n.title,
            message: n.message,
            read: n.read,
            workspace_id: n.workspace_id,
            workspace_name: row.workspace_name,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationView>,
    pub unread_count: usize,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub notification: Notification,
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// The caller's notifications; `workspace_id` narrows the list unless `all=true`
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<NotificationListResponse>> {
    let scope = if query.all { None } else { query.workspace_id };

    let notifications: Vec<NotificationView> = state
        .repo
        .list_notifications(auth.user_id, scope)
        .await?
        .into_iter()
        .map(NotificationView::from)
        .collect();
    let unread_count = notifications.iter().filter(|n| !n.read).count();

    Ok(Json(NotificationListResponse {
        notifications,
        unread_count,
    }))
}

/// Create a notification for the caller
pub async fn create_notification(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationResponse>)> {
    request.validate()?;

    if let Some(workspace_id) = request.workspace_id {
        state.repo.require_member(workspace_id, auth.user_id).await?;
    }

    let notification = state
        .repo
        .create_notification(
            auth.user_id,
            request.workspace_id,
            &request.title,
            &request.message,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(NotificationResponse { notification })))
}

/// Mark all of the caller's notifications read
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MarkAllReadResponse>> {
    let updated = state.repo.mark_all_notifications_read(auth.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// Mark one notification read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state
        .repo
        .mark_notification_read(auth.user_id, notification_id)
        .await?
    {
        return Err(AppError::NotificationNotFound {
            id: notification_id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
