//! Current user profile

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::state::AppState;
use quickonboard_common::{
    auth::AuthContext,
    db::models::{Role, User},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    /// Highest role held in any workspace
    pub role: Option<Role>,
    pub created_at: String,
}

impl ProfileResponse {
    fn new(user: User, role: Option<Role>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
            role,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Get the authenticated user's profile
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ProfileResponse>> {
    let user = state
        .repo
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("user no longer exists"))?;
    let role = state.repo.highest_role(auth.user_id).await?;

    Ok(Json(ProfileResponse::new(user, role)))
}

/// Update the authenticated user's display name
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    request.validate()?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("name", "Name cannot be blank"));
    }

    let user = state.repo.update_user_name(auth.user_id, name).await?;
    let role = state.repo.highest_role(auth.user_id).await?;

    tracing::info!(user_id = %auth.user_id, "Profile updated");

    Ok(Json(ProfileResponse::new(user, role)))
}
