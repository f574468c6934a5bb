//! Document management handlers
//!
//! Uploads are processed synchronously so the response reports the outcome.
//! `process` runs in a background task and reports through notifications.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;
use quickonboard_common::{
    auth::AuthContext,
    db::models::Document,
    errors::{AppError, Result},
    notifications::{log_failure, notify_user, notify_workspace_members, Notice},
    storage::upload_path,
};
use quickonboard_ingestion::{IngestionError, ProcessingOutcome};

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub document: Document,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentStatusView {
    pub id: Uuid,
    pub name: String,
    pub processed: bool,
    pub chunk_count: u64,
    pub size: i64,
    pub mime_type: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct DocumentStatusResponse {
    pub documents: Vec<DocumentStatusView>,
    pub total: usize,
    pub processed: usize,
}

#[derive(Serialize)]
pub struct ReprocessResult {
    pub document_id: Uuid,
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ReprocessAllResponse {
    pub results: Vec<ReprocessResult>,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Serialize)]
pub struct ProcessAcceptedResponse {
    pub document_id: Uuid,
    pub status: &'static str,
}

/// Failure text safe to show users; upstream details stay in the logs
fn public_error(err: IngestionError) -> String {
    AppError::from(err).public_message()
}

/// List documents in a workspace
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<DocumentListResponse>> {
    state.repo.require_member(workspace_id, auth.user_id).await?;
    let documents = state.repo.list_documents(workspace_id).await?;
    Ok(Json(DocumentListResponse { documents }))
}

/// Upload a file (multipart field `file`), store it, and process it
pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    state.repo.require_member(workspace_id, auth.user_id).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::InvalidFormat {
        message: format!("Malformed multipart body: {}", e),
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::validation("file", "File name is required"))?;
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| AppError::InvalidFormat {
            message: format!("Failed to read upload: {}", e),
        })?;
        upload = Some((name, mime_type, bytes));
        break;
    }

    let (name, mime_type, bytes) = upload.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;

    let limit = state.config.server.max_upload_bytes;
    if bytes.len() > limit {
        return Err(AppError::PayloadTooLarge {
            size: bytes.len(),
            limit,
        });
    }
    if bytes.is_empty() {
        return Err(AppError::validation("file", "File is empty"));
    }

    let path = upload_path(workspace_id, &name, Utc::now().timestamp_millis());
    let url = state.blobs.put(&path, bytes.to_vec(), &mime_type).await?;

    let mut document = state
        .repo
        .create_document(
            workspace_id,
            name,
            url,
            bytes.len() as i64,
            mime_type.clone(),
            auth.user_id,
        )
        .await?;

    tracing::info!(
        document_id = %document.id,
        workspace_id = %workspace_id,
        size = bytes.len(),
        mime_type = %mime_type,
        "Document uploaded"
    );

    let outcome = state
        .processor
        .process_bytes(document.id, &bytes, &mime_type)
        .await;
    notify_outcome(&state, auth.user_id, &document, &outcome).await;

    let response = match outcome {
        Ok(outcome) => {
            document.processed = true;
            UploadResponse {
                document,
                message: "Document uploaded and processed successfully".to_string(),
                chunk_count: Some(outcome.chunk_count),
                error: None,
            }
        }
        Err(e) => UploadResponse {
            document,
            message: "Document uploaded but processing failed. Please try re-uploading.".to_string(),
            chunk_count: None,
            error: Some(public_error(e)),
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Processed flag and chunk count for every document
pub async fn document_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<DocumentStatusResponse>> {
    state.repo.require_member(workspace_id, auth.user_id).await?;

    let documents: Vec<DocumentStatusView> = state
        .repo
        .document_statuses(workspace_id)
        .await?
        .into_iter()
        .map(|status| DocumentStatusView {
            id: status.document.id,
            name: status.document.name,
            processed: status.document.processed,
            chunk_count: status.chunk_count,
            size: status.document.size,
            mime_type: status.document.mime_type,
            created_at: status.document.created_at.to_rfc3339(),
        })
        .collect();

    let processed = documents.iter().filter(|d| d.processed).count();
    Ok(Json(DocumentStatusResponse {
        total: documents.len(),
        processed,
        documents,
    }))
}

/// Reprocess every document in the workspace; failures do not stop the rest
pub async fn reprocess_all(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ReprocessAllResponse>> {
    state.repo.require_member(workspace_id, auth.user_id).await?;

    let documents = state.repo.list_documents(workspace_id).await?;
    let mut results = Vec::with_capacity(documents.len());

    for document in documents {
        let result = match state.processor.process_stored(&document).await {
            Ok(outcome) => ReprocessResult {
                document_id: document.id,
                name: document.name,
                success: true,
                chunk_count: Some(outcome.chunk_count),
                error: None,
            },
            Err(e) => {
                tracing::warn!(document_id = %document.id, error = %e, "Reprocessing failed");
                ReprocessResult {
                    document_id: document.id,
                    name: document.name,
                    success: false,
                    chunk_count: None,
                    error: Some(public_error(e)),
                }
            }
        };
        results.push(result);
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    let failed = results.len() - succeeded;
    tracing::info!(workspace_id = %workspace_id, succeeded, failed, "Workspace reprocessed");

    Ok(Json(ReprocessAllResponse {
        results,
        succeeded,
        failed,
    }))
}

/// Reprocess one document and wait for the result
pub async fn reprocess_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((workspace_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ReprocessResult>> {
    let document = find_document(&state, &auth, workspace_id, document_id).await?;

    let result = match state.processor.process_stored(&document).await {
        Ok(outcome) => ReprocessResult {
            document_id,
            name: document.name,
            success: true,
            chunk_count: Some(outcome.chunk_count),
            error: None,
        },
        Err(e) => ReprocessResult {
            document_id,
            name: document.name,
            success: false,
            chunk_count: None,
            error: Some(public_error(e)),
        },
    };

    Ok(Json(result))
}

/// Start processing in the background; completion arrives as a notification
pub async fn process_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((workspace_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<ProcessAcceptedResponse>)> {
    let document = find_document(&state, &auth, workspace_id, document_id).await?;

    let task_state = state.clone();
    tokio::spawn(async move {
        let outcome = task_state.processor.process_stored(&document).await;
        notify_outcome(&task_state, document.uploaded_by, &document, &outcome).await;
    });

    tracing::info!(document_id = %document_id, "Background processing started");

    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessAcceptedResponse {
            document_id,
            status: "processing",
        }),
    ))
}

/// Delete a document, its chunks, and its stored file
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((workspace_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    let document = find_document(&state, &auth, workspace_id, document_id).await?;

    if let Err(e) = state.blobs.delete(&document.url).await {
        tracing::warn!(document_id = %document_id, error = %e, "Failed to delete document blob");
    }

    state.repo.delete_document(document_id).await?;

    tracing::info!(
        document_id = %document_id,
        workspace_id = %workspace_id,
        deleted_by = %auth.user_id,
        "Document deleted"
    );

    log_failure(
        notify_user(
            &state.repo,
            auth.user_id,
            Some(workspace_id),
            &Notice::document_deleted_by_you(&document.name),
        )
        .await,
        "document_deleted",
    );
    log_failure(
        notify_workspace_members(
            &state.repo,
            workspace_id,
            Some(auth.user_id),
            &Notice::document_deleted_by(auth.display_name(), &document.name),
        )
        .await,
        "document_deleted",
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn find_document(
    state: &AppState,
    auth: &AuthContext,
    workspace_id: Uuid,
    document_id: Uuid,
) -> Result<Document> {
    state.repo.require_member(workspace_id, auth.user_id).await?;
    state
        .repo
        .find_document(workspace_id, document_id)
        .await?
        .ok_or_else(|| AppError::DocumentNotFound {
            id: document_id.to_string(),
        })
}

async fn notify_outcome(
    state: &AppState,
    user_id: Uuid,
    document: &Document,
    outcome: &std::result::Result<ProcessingOutcome, IngestionError>,
) {
    let notice = match outcome {
        Ok(_) => Notice::document_processed(&document.name),
        Err(_) => Notice::document_failed(&document.name),
    };
    log_failure(
        notify_user(&state.repo, user_id, Some(document.workspace_id), &notice).await,
        "document_processed",
    );
}
